use super::*;

pub struct Effect<'a> {
    pub ctrl: &'a mut Control,
}

impl Effect<'_> {
    pub async fn exec(self) -> Result<()> {
        if self.ctrl.steps_to_down == 0 {
            return Ok(());
        }
        self.ctrl.steps_to_down -= 1;
        if self.ctrl.steps_to_down > 0 {
            info!("step down in {} ticks", self.ctrl.steps_to_down);
            return Ok(());
        }

        info!("left the cluster");
        self.ctrl.apply_role(RoleTrigger::LeftCluster);
        self.ctrl.leader = None;
        self.ctrl.catching_up = false;
        self.ctrl.removed = true;
        self.ctrl.emit(RaftEvent::RemovedFromCluster);
        Ok(())
    }
}
