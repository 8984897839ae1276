use super::*;

/// Parameters of the reconfiguration protocol.
///
/// Missing fields fall back to the defaults when deserialized,
/// so a host can load a partial table from its own configuration file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RaftParams {
    /// Base interval of the heartbeat toward each peer.
    pub heartbeat_interval: Duration,
    /// Failed requests to a peer back off by doubling the heartbeat interval up to this value.
    /// A failure at this interval gives up on the peer.
    pub max_heartbeat_interval: Duration,
    /// A joining server silent for `response_limit * heartbeat_interval` is considered dead.
    pub response_limit: u32,
    /// The joining server is put into the cluster once its log is within this gap.
    pub log_sync_stop_gap: u64,
    /// Maximum number of entries shipped in one log pack.
    pub log_sync_batch_size: u64,
    /// Commit index a joining server starts from.
    pub initial_commit_index: u64,
}

impl Default for RaftParams {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(500),
            max_heartbeat_interval: Duration::from_millis(1000),
            response_limit: 20,
            log_sync_stop_gap: 99999,
            log_sync_batch_size: 1000,
            initial_commit_index: 0,
        }
    }
}

impl RaftParams {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.heartbeat_interval.is_zero(),
            "heartbeat interval must be positive"
        );
        ensure!(
            self.max_heartbeat_interval >= self.heartbeat_interval,
            "max heartbeat interval ({:?}) is shorter than heartbeat interval ({:?})",
            self.max_heartbeat_interval,
            self.heartbeat_interval
        );
        ensure!(self.log_sync_batch_size > 0, "log sync batch size must be positive");
        Ok(())
    }

    /// How long a joining server may stay silent before its session is reclaimed.
    pub fn join_activity_timeout(&self) -> Duration {
        self.heartbeat_interval * self.response_limit
    }
}
