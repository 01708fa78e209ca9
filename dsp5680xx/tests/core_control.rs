mod common;

use std::sync::Arc;
use std::time::Duration;

use dsp5680xx::architecture::dsp5680xx::once::{CoreMode, JtagStatus};
use dsp5680xx::core::ManualClock;
use dsp5680xx::{CoreInterface, Dsp5680xxError, TargetState};
use pretty_assertions::assert_eq;

#[test]
fn poll_a_running_target() {
    let (fake, mut target) = common::attach();

    assert_eq!(target.poll().unwrap(), TargetState::Running);
    assert!(fake.is_running());
}

/// A core that stops on its own is picked up by the next poll.
#[test]
fn poll_notices_debug_mode() {
    let (fake, mut target) = common::attach();
    target.poll().unwrap();

    fake.break_into_debug();

    assert_eq!(target.poll().unwrap(), TargetState::Halted);
    assert_eq!(target.poll().unwrap(), TargetState::Halted);
}

#[test]
fn poll_reports_a_refused_debug_request() {
    let (fake, mut target) = common::attach();
    fake.refuse_debug_mode(true);
    fake.script_jtag_status([JtagStatus::Debug]);

    let error = target.poll().unwrap_err();

    assert!(matches!(error, Dsp5680xxError::DebugModeNotEntered(0x00)));
    assert_eq!(target.state(), TargetState::Unknown);
}

#[test]
fn refused_debug_request_forgets_the_state() {
    let (fake, mut target) = common::attach();
    assert_eq!(target.poll().unwrap(), TargetState::Running);
    fake.refuse_debug_mode(true);

    assert!(target.halt().is_err());
    assert_eq!(target.state(), TargetState::Unknown);
}

#[test]
fn dead_link_forgets_the_state() {
    let (fake, mut target) = common::halted();
    fake.set_link_dead(true);

    assert!(matches!(target.poll(), Err(Dsp5680xxError::TargetDead)));
    assert_eq!(target.state(), TargetState::Unknown);
}

#[test]
fn unknown_state_with_busy_core() {
    let (fake, mut target) = common::attach();
    fake.script_jtag_status([JtagStatus::Busy]);

    assert!(matches!(
        target.poll(),
        Err(Dsp5680xxError::CommunicationFailure(JtagStatus::Busy))
    ));
    assert_eq!(target.state(), TargetState::Unknown);
}

#[test]
fn jtag_and_eonce_disagree() {
    let (fake, mut target) = common::halted();
    fake.script_jtag_status([JtagStatus::Normal]);

    assert!(matches!(
        target.poll(),
        Err(Dsp5680xxError::InconsistentState(CoreMode::Debug))
    ));
    assert_eq!(target.state(), TargetState::Unknown);
}

/// After a reset the core is halted once and released again.
#[test]
fn poll_after_reset() {
    let (fake, mut target) = common::attach();
    target.assert_reset();
    assert_eq!(target.state(), TargetState::Reset);

    assert_eq!(target.poll().unwrap(), TargetState::Running);
    assert!(fake.is_running());
}

#[test]
fn deassert_reset_marks_the_core_running() {
    let (_fake, mut target) = common::halted();

    target.assert_reset();
    target.deassert_reset();

    assert_eq!(target.state(), TargetState::Running);
}

#[test]
fn halt_captures_the_program_counter() {
    let (fake, mut target) = common::attach();
    fake.set_pc(0x01_2345);

    target.halt().unwrap();

    assert_eq!(target.state(), TargetState::Halted);
    assert_eq!(target.stored_pc(), 0x01_2345);
    assert!(!fake.is_running());
}

#[test]
fn halting_a_halted_core_does_nothing() {
    let (fake, mut target) = common::halted();
    let scans = fake.scan_count();

    target.halt().unwrap();

    assert_eq!(fake.scan_count(), scans);
}

#[test]
fn halt_on_a_secured_device() {
    let (fake, mut target) = common::attach();
    fake.refuse_debug_mode(true);

    assert!(matches!(
        target.halt(),
        Err(Dsp5680xxError::DebugModeNotEntered(_))
    ));
    assert_eq!(target.state(), TargetState::Unknown);
}

#[test]
fn resume_where_the_core_stopped() {
    let (fake, mut target) = common::halted();

    target.resume(None).unwrap();

    assert_eq!(target.state(), TargetState::Running);
    assert!(fake.is_running());
}

#[test]
fn resume_at_an_address() {
    let (fake, mut target) = common::halted();

    target.resume(Some(0x0420)).unwrap();

    assert_eq!(fake.pc(), 0x0420);
    assert_eq!(target.state(), TargetState::Running);
}

#[test]
fn resume_waits_for_the_core() {
    let (fake, mut target) = common::halted();
    fake.script_jtag_status([JtagStatus::Busy; 19]);

    target.resume(None).unwrap();

    assert_eq!(target.state(), TargetState::Running);
}

#[test]
fn resume_gives_up_after_twenty_attempts() {
    let (fake, mut target) = common::halted();
    fake.script_jtag_status([JtagStatus::Busy; 20]);

    assert!(matches!(
        target.resume(None),
        Err(Dsp5680xxError::ResumeFailed(20))
    ));
    assert_eq!(target.state(), TargetState::Unknown);
}

/// After a failed resume the core is halted again for real, not assumed halted.
#[test]
fn halt_after_a_failed_resume() {
    let (fake, mut target) = common::halted();
    fake.script_jtag_status([JtagStatus::Busy; 20]);
    assert!(target.resume(None).is_err());
    assert!(fake.is_running());
    let scans = fake.scan_count();

    target.halt().unwrap();

    assert!(fake.scan_count() > scans);
    assert!(!fake.is_running());
    assert_eq!(target.state(), TargetState::Halted);
}

#[test]
fn core_stuck_in_debug_mode() {
    let (fake, mut target) = common::halted();
    fake.hold_in_debug_mode(true);

    assert!(matches!(
        target.resume(None),
        Err(Dsp5680xxError::ResumeFailed(20))
    ));
    assert_eq!(target.state(), TargetState::Unknown);
    assert!(matches!(
        target.read_memory(0x20_0100, 2, 1),
        Err(Dsp5680xxError::NotHalted(TargetState::Unknown))
    ));
}

#[test]
fn reset_release_that_does_not_run() {
    let (fake, mut target) = common::attach();
    fake.hold_in_debug_mode(true);
    target.assert_reset();

    assert!(matches!(
        target.poll(),
        Err(Dsp5680xxError::InconsistentState(CoreMode::Debug))
    ));
    assert_eq!(target.state(), TargetState::Unknown);
}

#[test]
fn resume_times_out() {
    let (fake, target) = common::halted();
    let clock = Arc::new(ManualClock::new(Duration::from_millis(400)));
    let mut target = target.with_clock(clock);
    fake.script_jtag_status([JtagStatus::Busy; 20]);

    assert!(matches!(target.resume(None), Err(Dsp5680xxError::Timeout)));
    assert_eq!(target.state(), TargetState::Unknown);
}

#[test]
fn resuming_a_running_core_does_nothing() {
    let (fake, mut target) = common::attach();
    target.poll().unwrap();
    let scans = fake.scan_count();

    target.resume(None).unwrap();

    assert_eq!(fake.scan_count(), scans);
}

#[test]
fn soft_reset_halt_resets_the_peripherals() {
    let (fake, mut target) = common::attach();

    target.soft_reset_halt().unwrap();

    assert_eq!(target.state(), TargetState::Halted);
    assert_eq!(fake.sim_writes(), vec![0x10]);
}

#[test]
fn soft_reset_halt_without_a_known_sim() {
    let fake = dsp5680xx::probe::fake_probe::FakeDsp::new();
    let mut target = dsp5680xx::Dsp5680xx::attach(Box::new(fake.clone()), "MC56F8023")
        .expect("MC56F8023 is a built-in target");

    target.soft_reset_halt().unwrap();

    assert_eq!(target.state(), TargetState::Halted);
    assert!(fake.sim_writes().is_empty());
}

#[test]
fn unsupported_operations() {
    let (_fake, mut target) = common::halted();
    let host: &mut dyn CoreInterface = &mut target;

    let capabilities = host.capabilities();
    assert!(!capabilities.step);
    assert!(!capabilities.bulk_write);
    assert!(!capabilities.checksum);
    assert!(capabilities.flash);

    for result in [
        host.step(),
        host.bulk_write(0x20_0000, &[0]),
        host.checksum_memory(0, 16).map(|_| ()),
    ] {
        assert!(matches!(
            result,
            Err(dsp5680xx::Error::Dsp5680xx(Dsp5680xxError::NotImplemented(_)))
        ));
    }
}

#[test]
fn host_interface_drives_the_session() {
    let (fake, mut target) = common::attach();
    let host: &mut dyn CoreInterface = &mut target;

    assert_eq!(host.poll().unwrap(), TargetState::Running);
    host.halt().unwrap();
    assert_eq!(host.status(), TargetState::Halted);
    host.resume(None).unwrap();
    assert_eq!(host.status(), TargetState::Running);
    host.assert_reset().unwrap();
    assert_eq!(host.status(), TargetState::Reset);
    assert!(fake.is_running());
}

#[test]
fn unknown_chips_are_rejected() {
    let fake = dsp5680xx::probe::fake_probe::FakeDsp::new();

    let error = dsp5680xx::Dsp5680xx::attach(Box::new(fake), "MC56F9999").unwrap_err();

    assert!(matches!(error, dsp5680xx::Error::ChipNotFound(_)));
}
