//! Budgeted execution and the asynchronous run loop.

use super::pending::{DeviceReply, DeviceRequest};
use super::{RuntimeError, Vm, VmState};
use crate::codegen::QBasicProgram;
use std::rc::Rc;
use std::time::Instant;
use tokio::time::MissedTickBehavior;

impl Vm {
    /// Runs one scheduler slice: up to the instruction budget or the time
    /// slice, whichever runs out first. Stops early on suspension.
    pub fn tick(&mut self) -> Result<VmState, RuntimeError> {
        let started = Instant::now();
        let budget = self.config().instruction_budget;
        let slice = self.config().time_slice;

        let mut executed = 0;
        while executed < budget {
            if !self.step()? {
                break;
            }
            executed += 1;
            if started.elapsed() >= slice {
                break;
            }
        }
        log::trace!("vm: tick ran {} instruction(s)", executed);
        Ok(self.state())
    }

    /// Runs `program` on a repeating tokio interval until it finishes.
    ///
    /// While suspended no bytecode runs; the pending request is performed
    /// on the next tick. `SLEEP` waits on the tokio clock instead of
    /// blocking the thread.
    pub async fn run_async(
        &mut self,
        program: impl Into<Rc<QBasicProgram>>,
    ) -> Result<(), RuntimeError> {
        self.load(program);
        let mut interval = tokio::time::interval(self.config().tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.state() {
                VmState::Idle | VmState::Running => {
                    self.tick()?;
                }
                VmState::Suspended => self.service_pending_async().await?,
                VmState::Finished | VmState::Error => return Ok(()),
            }
        }
    }

    async fn service_pending_async(&mut self) -> Result<(), RuntimeError> {
        match self.pending().map(|p| p.request.clone()) {
            Some(DeviceRequest::Sleep(duration)) => {
                tokio::time::sleep(duration).await;
                self.resume(Ok(DeviceReply::Done))
            }
            Some(_) => self.service_pending(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::Registry;
    use crate::vm::{Devices, VmConfig};
    use qbvm_runtime::RecordingConsole;

    fn compile(source: &str) -> QBasicProgram {
        crate::compile(source, &Registry::standard()).unwrap()
    }

    #[test]
    fn test_tick_respects_budget() {
        let console = RecordingConsole::new();
        let mut vm = Vm::new(Devices::new(console), Rc::new(Registry::standard())).with_config(
            VmConfig {
                instruction_budget: 3,
                ..VmConfig::default()
            },
        );
        vm.load(compile("FOR i = 1 TO 100\nNEXT i\n"));
        vm.tick().unwrap();
        assert_eq!(vm.state(), VmState::Running);
        assert_eq!(vm.pc(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_async_finishes() {
        let console = RecordingConsole::new();
        let mut vm = Vm::new(Devices::new(console.clone()), Rc::new(Registry::standard()));
        vm.run_async(compile("FOR i% = 1 TO 3\nPRINT i%\nNEXT i%\n"))
            .await
            .unwrap();
        assert_eq!(vm.state(), VmState::Finished);
        assert_eq!(console.output(), "1\n2\n3\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_uses_tokio_clock() {
        let console = RecordingConsole::new();
        let mut vm = Vm::new(Devices::new(console.clone()), Rc::new(Registry::standard()));
        let started = tokio::time::Instant::now();
        vm.run_async(compile("PRINT \"a\"\nSLEEP 5\nPRINT \"b\"\n"))
            .await
            .unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_secs(5));
        assert_eq!(console.output(), "a\nb\n");
    }
}
