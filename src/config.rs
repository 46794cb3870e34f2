//! Plain, `Default`-implementing configuration structs, passed into
//! constructors rather than parsed from any textual format by the engine
//! itself (parsing configuration is a collaborator's job).

use std::time::Duration;

/// Trickle algorithm parameters for one endpoint (§4.3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrickleConfig {
    /// `I_min`: the shortest interval trickle ever uses.
    pub i_min: Duration,
    /// `I_max`: the longest interval trickle doubles up to.
    pub i_max: Duration,
    /// `k`: redundancy constant — suppress our own transmission once we've
    /// heard at least this many consistent summaries in the interval.
    pub k: u32,
}

impl Default for TrickleConfig {
    fn default() -> Self {
        Self {
            i_min: Duration::from_millis(200),
            i_max: Duration::from_secs(40),
            k: 1,
        }
    }
}

/// Per-endpoint configuration (§3 "Endpoint").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    pub trickle: TrickleConfig,
    /// How often we emit an unsolicited keepalive NET_STATE to multicast.
    pub keepalive_interval: Duration,
    /// A neighbour is reaped once `now - last_heard_at` exceeds
    /// `keepalive_multiplier * peer_interval + jitter` (§4.3).
    pub keepalive_multiplier: u32,
    /// Minimum spacing between REQ_NET_STATE sent to the same peer (§4.4
    /// reactive rule 1's "have not requested recently").
    pub request_backoff: Duration,
    /// Budget under which a full NODE_STATE is multicast rather than
    /// switched to unicast (§4.4, §7 `Oversize`); default matches the
    /// spec's illustrative link MTU budget.
    pub multicast_mtu_budget: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            trickle: TrickleConfig::default(),
            keepalive_interval: Duration::from_secs(20),
            keepalive_multiplier: 4,
            request_backoff: Duration::from_millis(500),
            multicast_mtu_budget: 1400,
        }
    }
}

/// Engine-wide configuration not specific to any one endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay mutations are coalesced for before a republish re-hashes and
    /// floods (§4.2).
    pub republish_coalesce: Duration,
    /// How long an unreachable node is kept before being reaped (§4.5, §9
    /// Open Question 1). Defaults to `2 * I_max` of the default
    /// [`TrickleConfig`], as the source does, but is independently settable
    /// since different endpoints may run different trickle bounds.
    pub reachability_grace: Duration,
    /// Upper bound on clock skew tolerated between nodes' `origination_time`
    /// values during convergence checks (§4.4 "Adaptive origination time"),
    /// expressed as a per-hop budget; multiplied by `node_count - 1` by
    /// callers that need the network-wide bound.
    pub max_propagation_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            republish_coalesce: Duration::from_millis(20),
            reachability_grace: TrickleConfig::default().i_max * 2,
            max_propagation_delay: Duration::from_millis(100),
        }
    }
}
