use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// Append the configuration with the joining server added.
    pub async fn exec(self) -> Result<()> {
        let Some(join) = &self.ctrl.srv_to_join else {
            return Ok(());
        };
        let srv = join.srv.clone();

        let next_slot = self.ctrl.log.next_slot().await?;
        let cur = self.ctrl.latest_config();
        let new_config = cur.derive_next(next_slot).with_server((*srv).clone());
        info!(
            "add server {} to the configuration and save it to the log at {}",
            srv.id, new_config.log_idx
        );

        self.ctrl.append_config_entry(new_config).await?;

        // The join is finished. The session now belongs to a member.
        if let Some(mut join) = self.ctrl.srv_to_join.take() {
            let sync = join.peer.take_snapshot_sync();
            self.ctrl.release_snapshot_sync(sync).await;
            join.peer.resume_hb_speed();
            join.peer.reset_active_timer();
            self.ctrl.peers.insert(srv.id, join.peer);
        }

        Ok(())
    }
}
