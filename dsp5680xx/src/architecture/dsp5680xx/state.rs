//! Target state tracking.

use super::once::JtagStatus;

/// State of the target as last observed by the session.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TargetState {
    Unknown,
    Reset,
    Running,
    Halted,
}

/// What a poll has to do after reading the JTAG status.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PollAction {
    /// The core is in debug mode but the session does not know it is halted.
    EnterDebugMode,
    /// The core came out of reset. Halt it and let it run again.
    ReleaseFromReset,
    /// The core runs, confirm with the EOnCE status before trusting it.
    ConfirmRunning,
    /// The link is dead.
    LinkDead,
    /// Nothing is known and the JTAG status does not tell more.
    CommunicationFailure,
    Keep,
}

pub fn poll_action(state: TargetState, status: JtagStatus) -> PollAction {
    match (status, state) {
        (JtagStatus::Debug, TargetState::Halted) => PollAction::Keep,
        (JtagStatus::Debug, _) => PollAction::EnterDebugMode,
        (JtagStatus::Normal, TargetState::Reset) => PollAction::ReleaseFromReset,
        (JtagStatus::Normal, TargetState::Running) => PollAction::Keep,
        (JtagStatus::Normal, _) => PollAction::ConfirmRunning,
        (JtagStatus::Dead, _) => PollAction::LinkDead,
        (_, TargetState::Unknown) => PollAction::CommunicationFailure,
        _ => PollAction::Keep,
    }
}
