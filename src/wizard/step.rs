use serde::Serialize;

/// Which in-flight step a failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Authenticating,
    Provisioning,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Idle,
    ConfigureInstance,
    Authenticating,
    Authenticated,
    Provisioning,
    Complete,
    Failed(FailedStage),
}

impl WizardStep {
    /// Position shown by the stepper. A failure sits on the step it failed in.
    pub fn index(&self) -> u8 {
        match self {
            WizardStep::Idle => 0,
            WizardStep::ConfigureInstance => 1,
            WizardStep::Authenticating | WizardStep::Failed(FailedStage::Authenticating) => 2,
            WizardStep::Authenticated => 3,
            WizardStep::Provisioning | WizardStep::Failed(FailedStage::Provisioning) => 4,
            WizardStep::Complete => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WizardStep::Idle => "idle",
            WizardStep::ConfigureInstance => "configure_instance",
            WizardStep::Authenticating => "authenticating",
            WizardStep::Authenticated => "authenticated",
            WizardStep::Provisioning => "provisioning",
            WizardStep::Complete => "complete",
            WizardStep::Failed(FailedStage::Authenticating) => "failed_authenticating",
            WizardStep::Failed(FailedStage::Provisioning) => "failed_provisioning",
        }
    }

    /// Steps that only exist while an upstream call is awaited.
    pub fn is_transient(&self) -> bool {
        matches!(self, WizardStep::Authenticating | WizardStep::Provisioning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_keep_their_step_index() {
        assert_eq!(WizardStep::Failed(FailedStage::Authenticating).index(), WizardStep::Authenticating.index());
        assert_eq!(WizardStep::Failed(FailedStage::Provisioning).index(), WizardStep::Provisioning.index());
    }

    #[test]
    fn indices_increase_along_happy_path() {
        let path = [
            WizardStep::Idle,
            WizardStep::ConfigureInstance,
            WizardStep::Authenticating,
            WizardStep::Authenticated,
            WizardStep::Provisioning,
            WizardStep::Complete,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].index() < pair[1].index());
        }
    }
}
