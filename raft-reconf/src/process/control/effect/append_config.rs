use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// A configuration entry replicated from the leader is in the local log.
    pub async fn exec(self, config: ClusterConfig) -> Result<()> {
        if config.log_idx <= self.ctrl.config.log_idx {
            debug!(
                "config at {} is older than the committed one at {}, ignore",
                config.log_idx, self.ctrl.config.log_idx
            );
            return Ok(());
        }

        info!(
            "config appended at log {} (prev log {})",
            config.log_idx, config.prev_log_idx
        );
        let log_idx = config.log_idx;
        self.ctrl.uncommitted_config = Some(Arc::new(config));
        self.ctrl.config_changing = true;
        self.ctrl.emit(RaftEvent::ConfigAppended { log_idx });
        Ok(())
    }
}
