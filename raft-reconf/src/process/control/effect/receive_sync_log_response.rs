use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, resp: Response) -> Result<()> {
        if !self.ctrl.is_leader() {
            debug!("not the leader anymore, drop the sync log response from {}", resp.src);
            return Ok(());
        }
        if !self.ctrl.is_joining(resp.src) {
            debug!("drop sync log response from {} as it is not joining", resp.src);
            return Ok(());
        }
        let Some(join) = self.ctrl.srv_to_join.as_mut() else {
            return Ok(());
        };
        join.peer.reset_active_timer();
        // The heartbeat interval doubles as the retry back-off.
        join.peer.resume_hb_speed();

        if !resp.accepted {
            warn!("server {} refused the log pack, stop syncing", resp.src);
            return Ok(());
        }

        join.peer.next_log_idx = resp.next_idx;
        join.peer.matched_idx = resp.next_idx.saturating_sub(1);

        sync_log::Effect {
            ctrl: &mut *self.ctrl,
        }
        .exec(resp.next_idx)
        .await
    }
}
