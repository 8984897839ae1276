use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// Append the configuration with server `id` removed.
    pub async fn exec(self, id: ServerId) -> Result<()> {
        let cur = self.ctrl.latest_config();
        if !cur.contains(id) {
            warn!("server {id} is not in the configuration, nothing to remove");
            return Ok(());
        }

        match self.ctrl.peers.get_mut(&id) {
            Some(peer) => peer.step_down(),
            None => info!("peer {id} cannot be found, no action for stepping down"),
        }

        let next_slot = self.ctrl.log.next_slot().await?;
        let new_config = cur.derive_next(next_slot).without_server(id);
        info!(
            "remove server {id} from the configuration and save it to the log at {}",
            new_config.log_idx
        );

        self.ctrl.append_config_entry(new_config).await?;
        Ok(())
    }
}
