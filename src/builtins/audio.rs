//! Sound statements.

use super::{Builtin, Registry};
use crate::types::Type;
use crate::vm::{Completion, DeviceRequest, RuntimeError, Vm};
use qbvm_runtime::AudioDevice;

pub(super) fn register(registry: &mut Registry) {
    registry.register_sub(Builtin::sub("PLAY", vec![Type::String], play));
    registry.register_sub(Builtin::sub("SOUND", vec![Type::Double, Type::Double], sound));
    registry.register_sub(Builtin::sub(
        "LOADSOUND",
        vec![Type::String, Type::String],
        load_sound,
    ));
    registry.register_sub(Builtin::sub("PLAYSOUND", vec![Type::String], play_sound));
}

fn audio(vm: &mut Vm) -> Result<&mut (dyn AudioDevice + 'static), RuntimeError> {
    match vm.devices.audio.as_deref_mut() {
        Some(audio) => Ok(audio),
        None => Err(RuntimeError::unavailable("audio").recoverable()),
    }
}

fn play(vm: &mut Vm) -> Result<(), RuntimeError> {
    let music = vm.pop_string()?;
    audio(vm)?.play(&music)?;
    vm.set_status(0);
    Ok(())
}

/// `SOUND frequency, duration`; duration is in 18.2 Hz clock ticks.
fn sound(vm: &mut Vm) -> Result<(), RuntimeError> {
    let duration = vm.pop_f64()?;
    let frequency = vm.pop_f64()?;
    if !(37.0..=32767.0).contains(&frequency) || duration < 0.0 {
        return Err(RuntimeError::illegal_call(format!(
            "SOUND {}, {}",
            frequency, duration
        )));
    }
    audio(vm)?.sound(frequency, duration)?;
    vm.set_status(0);
    Ok(())
}

/// `LOADSOUND name$, url$` suspends while the sample downloads.
fn load_sound(vm: &mut Vm) -> Result<(), RuntimeError> {
    let url = vm.pop_string()?;
    let name = vm.pop_string()?;
    vm.suspend(DeviceRequest::LoadSound { name, url }, Completion::Ignore)
}

fn play_sound(vm: &mut Vm) -> Result<(), RuntimeError> {
    let name = vm.pop_string()?;
    audio(vm)?.play_sound(&name)?;
    vm.set_status(0);
    Ok(())
}
