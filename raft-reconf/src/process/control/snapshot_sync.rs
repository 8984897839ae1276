use super::*;

/// Progress of a snapshot being sent to a joining server.
pub struct SnapshotSync {
    pub snapshot: SnapshotMeta,
    /// Offset of the next chunk to send.
    pub offset: u64,
    /// The chunk at `offset` is the last one.
    pub done: bool,
    /// Handle opened by the state machine while reading the snapshot.
    pub user_ctx: Option<UserSnapshotContext>,
}

impl SnapshotSync {
    pub fn new(snapshot: SnapshotMeta) -> Self {
        Self {
            snapshot,
            offset: 0,
            done: false,
            user_ctx: None,
        }
    }

    pub fn into_user_ctx(self) -> Option<UserSnapshotContext> {
        self.user_ctx
    }
}
