use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self, req: Request) -> Result<Response> {
        let mut resp = self
            .ctrl
            .new_response(MessageKind::InstallSnapshotResponse, req.src)
            .await?;

        let Some(entry) = req.single_entry(LogValueType::SnapshotSyncRequest) else {
            warn!("receive an invalid snapshot request, it must carry exactly one chunk");
            return Ok(resp);
        };
        if !self.ctrl.catching_up {
            warn!("this server is not catching up, drop the snapshot from {}", req.src);
            return Ok(resp);
        }
        let chunk = SnapshotSyncRequest::deserialize(&entry.buf).context(Error::BadPayload(req.kind))?;

        let snapshot = chunk.snapshot;
        self.ctrl
            .app
            .save_snapshot_chunk(&snapshot, chunk.offset, chunk.data, chunk.done)
            .await?;
        if !chunk.done {
            resp.accept(chunk.offset + 1);
            return Ok(resp);
        }

        let idx = snapshot.last_log_idx;
        info!("install snapshot {idx} sent by {}", req.src);
        self.ctrl.app.install_snapshot(&snapshot).await?;
        self.ctrl.log.compact(idx).await?;

        self.ctrl.precommit_index = u64::max(self.ctrl.precommit_index, idx);
        self.ctrl.advance_commit_index(idx);
        self.ctrl.advance_sm_commit_index(idx);
        self.ctrl
            .reconfigure(Arc::new(snapshot.last_config))
            .await?;

        resp.accept(idx + 1);
        Ok(resp)
    }
}
