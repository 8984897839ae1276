use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, resp: Response) -> Result<()> {
        if !self.ctrl.is_leader() {
            debug!("not the leader anymore, drop the snapshot response from {}", resp.src);
            return Ok(());
        }
        if !self.ctrl.is_joining(resp.src) {
            debug!("drop snapshot response from {} as it is not joining", resp.src);
            return Ok(());
        }
        let Some(join) = self.ctrl.srv_to_join.as_mut() else {
            return Ok(());
        };
        join.peer.reset_active_timer();
        join.peer.resume_hb_speed();

        if !resp.accepted {
            warn!("server {} refused the snapshot chunk, stop syncing", resp.src);
            return Ok(());
        }

        let Some(sync) = join.peer.snapshot_sync_mut() else {
            debug!("no snapshot in transfer to {}", resp.src);
            return Ok(());
        };
        if !sync.done {
            sync.offset = resp.next_idx;
            return send_snapshot::Effect {
                ctrl: &mut *self.ctrl,
            }
            .exec()
            .await;
        }

        let sync = join.peer.take_snapshot_sync();
        join.peer.next_log_idx = resp.next_idx;
        join.peer.matched_idx = resp.next_idx.saturating_sub(1);
        info!(
            "[server {}] snapshot is installed, continue syncing from {}",
            resp.src, resp.next_idx
        );
        self.ctrl.release_snapshot_sync(sync).await;

        sync_log::Effect {
            ctrl: &mut *self.ctrl,
        }
        .exec(resp.next_idx)
        .await
    }
}
