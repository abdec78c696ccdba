//! HTTP and WebSocket access through the network device.
//!
//! FETCH$ and WSOPEN suspend the VM until the host answers. Sending and
//! polling a socket are immediate.

use super::{Builtin, Registry};
use crate::types::{Type, Value};
use crate::vm::{Completion, DeviceRequest, RuntimeError, Vm};
use qbvm_runtime::NetworkDevice;

pub(super) fn register(registry: &mut Registry) {
    registry.register_function(Builtin::function("FETCH$", Type::String, vec![Type::String], fetch));
    registry.register_function(Builtin::function("WSOPEN", Type::Long, vec![Type::String], ws_open));
    registry.register_sub(Builtin::sub("WSSEND", vec![Type::Long, Type::String], ws_send));
    registry.register_function(Builtin::function("WSRECV$", Type::String, vec![Type::Long], ws_recv));
}

fn network(vm: &mut Vm) -> Result<&mut (dyn NetworkDevice + 'static), RuntimeError> {
    match vm.devices.network.as_deref_mut() {
        Some(network) => Ok(network),
        None => Err(RuntimeError::unavailable("network").recoverable()),
    }
}

fn fetch(vm: &mut Vm) -> Result<(), RuntimeError> {
    let url = vm.pop_string()?;
    vm.suspend(DeviceRequest::Fetch { url }, Completion::PushString)
}

fn ws_open(vm: &mut Vm) -> Result<(), RuntimeError> {
    let url = vm.pop_string()?;
    vm.suspend(DeviceRequest::WsOpen { url }, Completion::PushLong)
}

fn ws_send(vm: &mut Vm) -> Result<(), RuntimeError> {
    let message = vm.pop_string()?;
    let handle = vm.pop_i64()? as i32;
    network(vm)?.ws_send(handle, &message)?;
    vm.set_status(0);
    Ok(())
}

/// The next queued message, or "" when none has arrived.
fn ws_recv(vm: &mut Vm) -> Result<(), RuntimeError> {
    let handle = vm.pop_i64()? as i32;
    let message = network(vm)?.ws_recv(handle)?.unwrap_or_default();
    vm.set_status(0);
    vm.push(Value::String(message));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::builtins::testing::run_on;
    use crate::vm::{Devices, DeviceReply, DeviceRequest, Vm, VmState};
    use qbvm_runtime::{DeviceError, NetworkDevice, RecordingConsole};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Loopback {
        sent: Rc<RefCell<VecDeque<String>>>,
    }

    impl NetworkDevice for Loopback {
        fn fetch(&mut self, url: &str) -> Result<String, DeviceError> {
            match url {
                "http://example.test/hello" => Ok("hello body".to_string()),
                _ => Err(DeviceError::NotFound(url.to_string())),
            }
        }

        fn ws_open(&mut self, _url: &str) -> Result<i32, DeviceError> {
            Ok(7)
        }

        fn ws_send(&mut self, _handle: i32, message: &str) -> Result<(), DeviceError> {
            self.sent.borrow_mut().push_back(message.to_string());
            Ok(())
        }

        fn ws_recv(&mut self, _handle: i32) -> Result<Option<String>, DeviceError> {
            Ok(self.sent.borrow_mut().pop_front())
        }
    }

    fn run_net(source: &str) -> String {
        let console = RecordingConsole::new();
        let devices = Devices::new(console.clone()).with_network(Loopback::default());
        let (_, result) = run_on(source, devices);
        result.unwrap();
        console.output()
    }

    #[test]
    fn test_fetch() {
        assert_eq!(run_net("PRINT FETCH$(\"http://example.test/hello\")"), "hello body\n");
        assert_eq!(
            run_net("b$ = FETCH$(\"http://example.test/none\")\nPRINT ERR; LEN(b$)"),
            "530\n"
        );
    }

    #[test]
    fn test_websocket_roundtrip() {
        let source = "h& = WSOPEN(\"ws://echo\")\nWSSEND h&, \"ping\"\nPRINT h&; WSRECV$(h&); \"|\"; WSRECV$(h&); \"|\"";
        assert_eq!(run_net(source), "7ping||\n");
    }

    #[test]
    fn test_missing_network_is_recoverable() {
        let console = RecordingConsole::new();
        let (_, result) = run_on("WSSEND 1, \"x\"\nPRINT ERR", Devices::new(console.clone()));
        result.unwrap();
        assert_eq!(console.output(), "73\n");
    }

    #[test]
    fn test_host_resumes_fetch() {
        let registry = Rc::new(crate::builtins::Registry::standard());
        let program = crate::compile("PRINT FETCH$(\"u\")", &registry).unwrap();
        let console = RecordingConsole::new();
        let mut vm = Vm::new(Devices::new(console.clone()), registry);
        vm.load(program);
        while vm.step().unwrap() {}
        assert_eq!(vm.state(), VmState::Suspended);
        assert_eq!(
            vm.pending().map(|p| p.request.clone()),
            Some(DeviceRequest::Fetch { url: "u".to_string() })
        );
        vm.resume(Ok(DeviceReply::Text("from host".to_string()))).unwrap();
        while vm.step().unwrap() {}
        assert_eq!(vm.state(), VmState::Finished);
        assert_eq!(console.output(), "from host\n");
    }
}
