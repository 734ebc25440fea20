use std::collections::BTreeMap;

use chrono::Utc;
use futures_util::future::join3;
use serde::Serialize;
use serde_json::{json, Value};

use super::form::ServerInstanceForm;
use super::step::{FailedStage, WizardStep};
use crate::api::OpenStackApi;
use crate::error::ApiError;
use crate::models::{
    AuthSession, AuthSummary, AuthToken, CreatedInstance, Credentials, Flavor, InstanceRequest, Keypair,
    Network, Notification,
};

pub const CONFIGURE_STEP: &str = "configure_instance";
pub const PROVISION_STEP: &str = "provision";

const INTERRUPTED_MESSAGE: &str = "The previous request was interrupted before OpenStack answered";

/// Selector contents for the configure-instance step.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReferenceData {
    pub flavors: Vec<Flavor>,
    pub keypairs: Vec<Keypair>,
    pub networks: Vec<Network>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub current_step: u8,
    pub step: WizardStep,
    /// Accepted answers keyed by step name. Survive failures and retries.
    pub answers: BTreeMap<String, Value>,
    pub last_error: Option<String>,
}

/// What the console shows for one wizard.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot<'a> {
    #[serde(flatten)]
    pub state: &'a WizardState,
    pub reference: &'a ReferenceData,
    pub session: Option<AuthSummary>,
    pub instance: Option<&'a CreatedInstance>,
}

/// Drives one provisioning run: configure, authenticate, create.
///
/// Every operation takes `&mut self`, so whoever owns the controller decides
/// how concurrent requests are serialized. A step found in a transient state
/// when an operation starts belongs to a call that was dropped mid-flight and
/// is turned into the matching failure.
#[derive(Debug, Default)]
pub struct WizardController {
    state: WizardState,
    reference: ReferenceData,
    request: Option<InstanceRequest>,
    session: Option<AuthSession>,
    instance: Option<CreatedInstance>,
    notifications: Vec<Notification>,
}

impl WizardController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn step(&self) -> WizardStep {
        self.state.step
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    pub fn instance(&self) -> Option<&CreatedInstance> {
        self.instance.as_ref()
    }

    pub fn snapshot(&self) -> WizardSnapshot<'_> {
        WizardSnapshot {
            state: &self.state,
            reference: &self.reference,
            session: self.session.as_ref().map(AuthSession::summary),
            instance: self.instance.as_ref(),
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Enter (or refresh) the configure-instance step.
    ///
    /// The three selector lists load concurrently. A list that fails stays
    /// empty and produces an error notification; the step is entered anyway.
    pub async fn start(&mut self, api: &dyn OpenStackApi, token: Option<&AuthToken>) -> Result<(), ApiError> {
        self.recover_interrupted();
        if !matches!(self.state.step, WizardStep::Idle | WizardStep::ConfigureInstance) {
            return Err(self.conflict("start"));
        }

        self.reference = match token {
            Some(token) => {
                let (flavors, keypairs, networks) =
                    join3(api.list_flavors(token), api.list_keypairs(token), api.list_networks(token)).await;
                ReferenceData {
                    flavors: self.or_empty("flavors", flavors),
                    keypairs: self.or_empty("keypairs", keypairs),
                    networks: self.or_empty("networks", networks),
                }
            }
            None => {
                self.notifications
                    .push(Notification::error("Sign in to OpenStack to load flavors, keypairs and networks"));
                ReferenceData::default()
            }
        };
        self.set_step(WizardStep::ConfigureInstance);
        Ok(())
    }

    /// Validate the form, authenticate, then request the server.
    ///
    /// Authentication and creation are each attempted exactly once; a failure
    /// parks the wizard in `Failed` until [`retry`](Self::retry).
    pub async fn submit(
        &mut self,
        api: &dyn OpenStackApi,
        form: &ServerInstanceForm,
        credentials: &Credentials,
    ) -> Result<(), ApiError> {
        self.accept_form(form)?;
        self.authenticate(api, credentials).await?;
        self.provision(api).await
    }

    /// Like [`submit`](Self::submit), but with a session the caller already
    /// holds. An expired session is rejected before anything is sent.
    pub async fn submit_with_session(
        &mut self,
        api: &dyn OpenStackApi,
        form: &ServerInstanceForm,
        session: AuthSession,
    ) -> Result<(), ApiError> {
        self.accept_form(form)?;
        if session.is_expired_at(Utc::now()) {
            let e = ApiError::AuthRejected("OpenStack session has expired".into());
            self.set_step(WizardStep::ConfigureInstance);
            self.fail_with(&e, "Invalid credentials");
            return Err(e);
        }
        tracing::info!(user_id = %session.user_id, "Reusing OpenStack session");
        self.session = Some(session);
        self.set_step(WizardStep::Authenticated);
        self.provision(api).await
    }

    fn accept_form(&mut self, form: &ServerInstanceForm) -> Result<(), ApiError> {
        self.recover_interrupted();
        if !matches!(self.state.step, WizardStep::ConfigureInstance | WizardStep::Failed(_)) {
            return Err(self.conflict("submit"));
        }

        let request = match form.validate() {
            Ok(request) => request,
            Err(e) => {
                self.state.last_error = Some(e.to_string());
                return Err(e);
            }
        };
        self.state
            .answers
            .insert(CONFIGURE_STEP.to_string(), serde_json::to_value(&request).unwrap_or_default());
        self.state.answers.remove(PROVISION_STEP);
        self.request = Some(request);
        self.session = None;
        self.instance = None;
        self.state.last_error = None;
        Ok(())
    }

    /// Resume after a failure without re-entering the form.
    ///
    /// A still-valid session from an earlier authentication is reused, so a
    /// failed creation does not cost another token.
    pub async fn retry(&mut self, api: &dyn OpenStackApi, credentials: &Credentials) -> Result<(), ApiError> {
        self.recover_interrupted();
        match self.state.step {
            WizardStep::Failed(FailedStage::Authenticating) => {
                self.authenticate(api, credentials).await?;
                self.provision(api).await
            }
            WizardStep::Failed(FailedStage::Provisioning) | WizardStep::Authenticated => {
                let usable = self
                    .session
                    .as_ref()
                    .map(|s| !s.is_expired_at(Utc::now()))
                    .unwrap_or(false);
                if !usable {
                    self.authenticate(api, credentials).await?;
                }
                self.provision(api).await
            }
            _ => Err(self.conflict("retry")),
        }
    }

    pub fn back(&mut self) -> Result<(), ApiError> {
        self.recover_interrupted();
        let previous = match self.state.step {
            WizardStep::ConfigureInstance => WizardStep::Idle,
            WizardStep::Authenticated | WizardStep::Failed(_) => WizardStep::ConfigureInstance,
            _ => return Err(self.conflict("go back")),
        };
        self.set_step(previous);
        self.state.last_error = None;
        Ok(())
    }

    /// Discard everything, including the authenticated session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn recover_interrupted(&mut self) {
        let stage = match self.state.step {
            WizardStep::Authenticating => FailedStage::Authenticating,
            WizardStep::Provisioning => FailedStage::Provisioning,
            _ => return,
        };
        tracing::warn!(step = self.state.step.name(), "Wizard step was interrupted");
        self.set_step(WizardStep::Failed(stage));
        self.state.last_error = Some(INTERRUPTED_MESSAGE.to_string());
        self.notifications.push(Notification::error(INTERRUPTED_MESSAGE));
    }

    async fn authenticate(&mut self, api: &dyn OpenStackApi, credentials: &Credentials) -> Result<(), ApiError> {
        self.set_step(WizardStep::Authenticating);
        match api.authenticate(credentials).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user_id, "OpenStack authentication succeeded");
                self.session = Some(session);
                self.set_step(WizardStep::Authenticated);
                self.notifications
                    .push(Notification::success("OpenStack API access granted successfully"));
                Ok(())
            }
            Err(e @ ApiError::AuthRejected(_)) => {
                self.session = None;
                self.set_step(WizardStep::ConfigureInstance);
                self.fail_with(&e, "Invalid credentials");
                Err(e)
            }
            Err(e) => {
                self.session = None;
                self.set_step(WizardStep::Failed(FailedStage::Authenticating));
                self.fail_with(&e, "Could not reach OpenStack Identity");
                Err(e)
            }
        }
    }

    async fn provision(&mut self, api: &dyn OpenStackApi) -> Result<(), ApiError> {
        let (request, session) = match (self.request.clone(), self.session.clone()) {
            (Some(request), Some(session)) => (request, session),
            _ => return Err(ApiError::StepConflict("no authenticated submission to provision".into())),
        };

        self.set_step(WizardStep::Provisioning);
        match api.create_instance(&request, &session).await {
            Ok(instance) => {
                tracing::info!(server_id = %instance.id, "Keycloak instance creation accepted");
                self.state
                    .answers
                    .insert(PROVISION_STEP.to_string(), json!({ "serverId": instance.id }));
                self.instance = Some(instance);
                self.set_step(WizardStep::Complete);
                self.notifications
                    .push(Notification::success("Keycloak instance creation requested"));
                Ok(())
            }
            Err(e) => {
                self.set_step(WizardStep::Failed(FailedStage::Provisioning));
                self.fail_with(&e, "Instance creation failed");
                Err(e)
            }
        }
    }

    fn or_empty<T>(&mut self, what: &str, result: Result<Vec<T>, ApiError>) -> Vec<T> {
        match result {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(%e, what, "Reference data unavailable");
                self.notifications
                    .push(Notification::error(format!("Could not load {}: {}", what, e)));
                Vec::new()
            }
        }
    }

    fn fail_with(&mut self, error: &ApiError, headline: &str) {
        self.state.last_error = Some(error.to_string());
        self.notifications.push(Notification::error(headline));
    }

    fn conflict(&self, action: &str) -> ApiError {
        ApiError::StepConflict(format!("cannot {} from step {}", action, self.state.step.name()))
    }

    fn set_step(&mut self, step: WizardStep) {
        self.state.step = step;
        self.state.current_step = step.index();
    }
}
