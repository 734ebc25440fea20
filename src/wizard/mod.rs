//! Provisioning wizard: configure instance, authenticate, create.
pub mod controller;
pub mod form;
pub mod step;

pub use controller::{ReferenceData, WizardController, WizardSnapshot, WizardState, CONFIGURE_STEP, PROVISION_STEP};
pub use form::{ServerInstanceForm, DEFAULT_KEYCLOAK_PORT};
pub use step::{FailedStage, WizardStep};
