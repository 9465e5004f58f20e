//! The appointment status state machine. Every status mutation in the
//! application funnels through `validate_transition`.

use crate::models::{AppointmentError, AppointmentStatus};

/// The statuses reachable from `from` in one step. Terminal statuses have
/// no successors.
pub fn allowed_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
    match from {
        AppointmentStatus::Scheduled => &[
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ],
        AppointmentStatus::Confirmed => &[
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ],
        AppointmentStatus::Completed
        | AppointmentStatus::Cancelled
        | AppointmentStatus::NoShow => &[],
    }
}

pub fn validate_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), AppointmentError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(AppointmentError::InvalidTransition { from, to })
    }
}
