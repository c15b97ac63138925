use super::FormError;

/// Lifecycle of one upload form.
///
/// `Success` and `Failed` are only observable until the form resets, which
/// always brings it back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Idle,
    FileSelected,
    Uploading,
    Uploaded,
    Submitting,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    FileChosen,
    UploadStarted,
    UploadCompleted,
    UploadFailed,
    SubmitStarted,
    SubmitSucceeded,
    SubmitFailed,
    Reset,
}

impl FormState {
    pub fn transition(self, event: FormEvent) -> Result<FormState, FormError> {
        use FormEvent::*;
        use FormState::*;

        match (self, event) {
            (Idle | FileSelected | Uploaded, FileChosen) => Ok(FileSelected),
            (FileSelected, UploadStarted) => Ok(Uploading),
            (Uploading, UploadCompleted) => Ok(Uploaded),
            (Uploading, UploadFailed) => Ok(FileSelected),
            (Uploaded, SubmitStarted) => Ok(Submitting),
            (Submitting, SubmitSucceeded) => Ok(Success),
            (Submitting, SubmitFailed) => Ok(Failed),
            // an in-flight request has to settle first
            (Submitting | Uploading, Reset) => Err(FormError::InvalidTransition {
                from: self,
                event,
            }),
            (_, Reset) => Ok(Idle),
            (from, event) => Err(FormError::InvalidTransition { from, event }),
        }
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(self) -> bool {
        self != FormState::Submitting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut state = FormState::Idle;
        for (event, expected) in [
            (FormEvent::FileChosen, FormState::FileSelected),
            (FormEvent::UploadStarted, FormState::Uploading),
            (FormEvent::UploadCompleted, FormState::Uploaded),
            (FormEvent::SubmitStarted, FormState::Submitting),
            (FormEvent::SubmitSucceeded, FormState::Success),
            (FormEvent::Reset, FormState::Idle),
        ] {
            state = state.transition(event).unwrap();
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn test_failed_submission_resets_to_idle() {
        let state = FormState::Submitting
            .transition(FormEvent::SubmitFailed)
            .unwrap();
        assert_eq!(state, FormState::Failed);
        assert_eq!(state.transition(FormEvent::Reset).unwrap(), FormState::Idle);
    }

    #[test]
    fn test_cannot_submit_before_upload_completes() {
        for state in [
            FormState::Idle,
            FormState::FileSelected,
            FormState::Uploading,
        ] {
            assert!(state.transition(FormEvent::SubmitStarted).is_err());
        }
    }

    #[test]
    fn test_upload_failure_returns_to_file_selected() {
        let state = FormState::Uploading
            .transition(FormEvent::UploadFailed)
            .unwrap();
        assert_eq!(state, FormState::FileSelected);
    }

    #[test]
    fn test_new_file_replaces_uploaded_one() {
        assert_eq!(
            FormState::Uploaded
                .transition(FormEvent::FileChosen)
                .unwrap(),
            FormState::FileSelected
        );
        assert!(
            FormState::Submitting
                .transition(FormEvent::FileChosen)
                .is_err()
        );
    }

    #[test]
    fn test_in_flight_states_cannot_reset() {
        assert!(FormState::Submitting.transition(FormEvent::Reset).is_err());
        assert!(FormState::Uploading.transition(FormEvent::Reset).is_err());
    }

    #[test]
    fn test_submit_control_disabled_while_submitting() {
        assert!(!FormState::Submitting.can_submit());
        assert!(FormState::Uploaded.can_submit());
        assert!(FormState::Idle.can_submit());
    }
}
