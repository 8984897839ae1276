use super::*;

pub struct Thread {
    ctrl_actor: Actor<Control>,
    interval: Duration,
}

impl Thread {
    async fn run_once(&self) -> Result<()> {
        control::effect::tick::Effect {
            ctrl: &mut *self.ctrl_actor.write().await,
        }
        .exec()
        .await?;

        Ok(())
    }

    fn do_loop(self) -> ThreadHandle {
        let fut = async move {
            let mut interval = tokio::time::interval(self.interval);
            loop {
                interval.tick().await;
                // Counting down the steps after being asked to leave.
                self.run_once().await.ok();
            }
        };
        let hdl = tokio::spawn(fut).abort_handle();
        ThreadHandle(hdl)
    }
}

pub fn run(ctrl_actor: Actor<Control>, interval: Duration) -> ThreadHandle {
    Thread {
        ctrl_actor,
        interval,
    }
    .do_loop()
}
