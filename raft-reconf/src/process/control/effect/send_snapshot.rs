use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// Send the next chunk of the latest snapshot to the joining server.
    pub async fn exec(self) -> Result<()> {
        let snapshot = self
            .ctrl
            .app
            .latest_snapshot()
            .await?
            .context(Error::SnapshotNotFound)?;

        let Some(join) = self.ctrl.srv_to_join.as_mut() else {
            return Ok(());
        };
        let dst = join.srv.id;

        let mut sync = match join.peer.take_snapshot_sync() {
            Some(sync) if sync.snapshot.last_log_idx == snapshot.last_log_idx => sync,
            old => {
                if old.is_some() {
                    info!(
                        "[server {dst}] snapshot {} is superseded, restart the transfer",
                        snapshot.last_log_idx
                    );
                }
                self.ctrl.release_snapshot_sync(old).await;
                SnapshotSync::new(snapshot)
            }
        };

        let chunk = match self
            .ctrl
            .app
            .read_snapshot_chunk(&sync.snapshot, &mut sync.user_ctx, sync.offset)
            .await
        {
            Ok(chunk) => chunk,
            Err(e) => {
                self.ctrl.release_snapshot_sync(Some(sync)).await;
                return Err(e);
            }
        };
        sync.done = chunk.is_last;

        let body = SnapshotSyncRequest {
            snapshot: sync.snapshot.clone(),
            offset: sync.offset,
            data: chunk.data,
            done: chunk.is_last,
        };
        match self.ctrl.srv_to_join.as_mut() {
            Some(join) => join.peer.set_snapshot_sync(sync),
            None => self.ctrl.release_snapshot_sync(Some(sync)).await,
        }

        let mut req = self
            .ctrl
            .new_request(MessageKind::InstallSnapshotRequest, dst)
            .await?;
        req.last_log_idx = body.snapshot.last_log_idx;
        req.last_log_term = body.snapshot.last_log_term;
        req.entries.push(LogEntry::new(
            req.term,
            body.serialize()?,
            LogValueType::SnapshotSyncRequest,
        ));

        debug!(
            "[server {dst}] send snapshot {} chunk {} (done={})",
            body.snapshot.last_log_idx, body.offset, body.done
        );
        self.ctrl.send(req);
        Ok(())
    }
}
