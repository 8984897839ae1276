use super::*;

use tokio::time::Instant;

/// State the leader keeps for each remote server, the joining one included.
pub struct PeerSession {
    config: Arc<ServerConfig>,
    /// The log entries `[.., matched_idx]` are replicated with this server.
    pub matched_idx: LogIndex,
    /// Index of the next entry to send to this server.
    pub next_log_idx: LogIndex,
    leave_requested: bool,
    stepped_down: bool,
    hb_enabled: bool,
    hb_interval: Duration,
    base_hb_interval: Duration,
    max_hb_interval: Duration,
    last_active: Instant,
    snapshot_sync: Option<SnapshotSync>,
}

impl PeerSession {
    pub fn new(config: Arc<ServerConfig>, params: &RaftParams, next_log_idx: LogIndex) -> Self {
        Self {
            config,
            matched_idx: 0,
            next_log_idx,
            leave_requested: false,
            stepped_down: false,
            hb_enabled: true,
            hb_interval: params.heartbeat_interval,
            base_hb_interval: params.heartbeat_interval,
            max_hb_interval: params.max_heartbeat_interval,
            last_active: Instant::now(),
            snapshot_sync: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn set_leave_flag(&mut self) {
        self.leave_requested = true;
    }

    pub fn clear_leave_flag(&mut self) {
        self.leave_requested = false;
    }

    pub fn is_leave_flag_set(&self) -> bool {
        self.leave_requested
    }

    /// Stop using this session for anything but the pending removal.
    pub fn step_down(&mut self) {
        self.stepped_down = true;
        self.hb_enabled = false;
    }

    pub fn is_stepped_down(&self) -> bool {
        self.stepped_down
    }

    pub fn enable_hb(&mut self, enable: bool) {
        self.hb_enabled = enable;
    }

    pub fn is_hb_enabled(&self) -> bool {
        self.hb_enabled
    }

    pub fn current_hb_interval(&self) -> Duration {
        self.hb_interval
    }

    /// Back off after a failed request.
    pub fn slow_down_hb(&mut self) {
        self.hb_interval = Duration::min(self.hb_interval * 2, self.max_hb_interval);
    }

    pub fn resume_hb_speed(&mut self) {
        self.hb_interval = self.base_hb_interval;
    }

    /// The back-off reached its ceiling: a further failure means giving up.
    pub fn is_backoff_exhausted(&self) -> bool {
        self.hb_interval >= self.max_hb_interval
    }

    pub fn reset_active_timer(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn inactive_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    pub fn snapshot_sync_mut(&mut self) -> Option<&mut SnapshotSync> {
        self.snapshot_sync.as_mut()
    }

    pub fn set_snapshot_sync(&mut self, sync: SnapshotSync) {
        self.snapshot_sync = Some(sync);
    }

    /// The snapshot transfer context leaves the session with its ownership.
    pub fn take_snapshot_sync(&mut self) -> Option<SnapshotSync> {
        self.snapshot_sync.take()
    }
}
