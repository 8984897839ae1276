use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    /// The log is committed through `index`.
    pub async fn exec(self, index: LogIndex) -> Result<()> {
        let Some(conf) = self.ctrl.uncommitted_config.clone() else {
            return Ok(());
        };
        if conf.log_idx > index {
            return Ok(());
        }

        info!("config at log {} is committed", conf.log_idx);
        self.ctrl.uncommitted_config = None;
        self.ctrl.config_changing = false;
        self.ctrl.reconfigure(conf.clone()).await?;
        self.ctrl.emit(RaftEvent::ConfigCommitted {
            log_idx: conf.log_idx,
        });

        if self.ctrl.catching_up && conf.contains(self.ctrl.id) {
            info!("joined the cluster as a member");
            self.ctrl.catching_up = false;
            self.ctrl.emit(RaftEvent::JoinedCluster);
        }
        Ok(())
    }
}
