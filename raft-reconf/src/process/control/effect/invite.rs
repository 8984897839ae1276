use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// Send the joining server the committed configuration to start from.
    pub async fn exec(self) -> Result<()> {
        let Some(join) = &self.ctrl.srv_to_join else {
            return Ok(());
        };
        let dst = join.srv.id;
        let endpoint = join.peer.endpoint().to_owned();

        let mut req = self
            .ctrl
            .new_request(MessageKind::JoinClusterRequest, dst)
            .await?;
        let conf = self.ctrl.read_config();
        req.entries
            .push(LogEntry::new(req.term, conf.serialize()?, LogValueType::Conf));

        info!(
            "invite server {dst} at {endpoint} to join (last_log_idx={}, commit_idx={})",
            req.last_log_idx, req.commit_idx
        );
        self.ctrl.send(req);
        Ok(())
    }
}
