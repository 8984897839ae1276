use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// Bring the joining server's log forward from `start`.
    /// Called again after every sync response until the gap is small enough.
    pub async fn exec(self, start: LogIndex) -> Result<()> {
        let Some(join) = &self.ctrl.srv_to_join else {
            return Ok(());
        };
        let dst = join.srv.id;

        let commit_idx = self.ctrl.quick_commit_index;
        let gap = commit_idx as i64 - start as i64;
        if gap < self.ctrl.params.log_sync_stop_gap as i64 {
            info!("[server {dst}] log is synced (gap={gap}), add it to the cluster");
            return finalize_add_server::Effect {
                ctrl: &mut *self.ctrl,
            }
            .exec()
            .await;
        }

        let start_index = self.ctrl.log.start_index().await?;
        if start < start_index {
            info!("[server {dst}] log {start} is already compacted (start_index={start_index}), send a snapshot");
            return send_snapshot::Effect {
                ctrl: &mut *self.ctrl,
            }
            .exec()
            .await;
        }

        let n = u64::min(gap as u64, self.ctrl.params.log_sync_batch_size);
        let pack = self
            .ctrl
            .log
            .pack(start, n)
            .await
            .context(Error::BadLogState)?;

        let mut req = self
            .ctrl
            .new_request(MessageKind::SyncLogRequest, dst)
            .await?;
        req.last_log_idx = start - 1;
        req.entries
            .push(LogEntry::new(req.term, pack, LogValueType::LogPack));

        debug!("[server {dst}] sync {n} entries from {start} (gap={gap})");
        self.ctrl.send(req);
        Ok(())
    }
}
