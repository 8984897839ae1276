use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// Abandon the pending join. Does nothing if there is none.
    pub async fn exec(self) {
        let Some(join) = self.ctrl.srv_to_join.take() else {
            return;
        };
        let id = join.srv.id;
        info!("abandon joining server {id}");
        self.ctrl.discard_peer(join.peer).await;
        self.ctrl.emit(RaftEvent::JoinAbandoned { id });
    }
}
