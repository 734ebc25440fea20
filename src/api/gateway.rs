use async_trait::async_trait;

use super::retry::{with_backoff, RetryPolicy};
use super::{compute, identity, keycloak};
use crate::error::ApiError;
use crate::models::{
    AuthSession, AuthToken, CreatedInstance, Credentials, Flavor, InstanceRequest, KeycloakUser, Keypair,
    Network, ServerSettings,
};

/// OpenStack Compute and Identity as seen by the console.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OpenStackApi: Send + Sync {
    async fn list_flavors(&self, token: &AuthToken) -> Result<Vec<Flavor>, ApiError>;
    async fn list_keypairs(&self, token: &AuthToken) -> Result<Vec<Keypair>, ApiError>;
    async fn list_networks(&self, token: &AuthToken) -> Result<Vec<Network>, ApiError>;
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthSession, ApiError>;
    async fn create_instance(
        &self,
        request: &InstanceRequest,
        session: &AuthSession,
    ) -> Result<CreatedInstance, ApiError>;
}

/// Keycloak Admin REST API, user endpoints of one realm.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeycloakAdminApi: Send + Sync {
    async fn obtain_token(&self, username: &str, password: &str) -> Result<AuthToken, ApiError>;
    async fn list_users(&self, token: &AuthToken) -> Result<Vec<KeycloakUser>, ApiError>;
    async fn create_user(&self, token: &AuthToken, user: &KeycloakUser) -> Result<(), ApiError>;
    async fn update_user(&self, token: &AuthToken, user_id: &str, user: &KeycloakUser) -> Result<(), ApiError>;
    async fn delete_user(&self, token: &AuthToken, user_id: &str) -> Result<(), ApiError>;
}

/// reqwest-backed [`OpenStackApi`]. Listings are retried on
/// `UpstreamUnavailable`; authentication and creation never are.
pub struct OpenStackGateway {
    pub client: reqwest::Client,
    pub compute_url: String,
    pub identity_url: String,
    pub server: ServerSettings,
    pub retry: RetryPolicy,
}

#[async_trait]
impl OpenStackApi for OpenStackGateway {
    async fn list_flavors(&self, token: &AuthToken) -> Result<Vec<Flavor>, ApiError> {
        let (client, url) = (&self.client, self.compute_url.as_str());
        with_backoff(self.retry, "flavors", move || compute::list_flavors(client, url, token)).await
    }

    async fn list_keypairs(&self, token: &AuthToken) -> Result<Vec<Keypair>, ApiError> {
        let (client, url) = (&self.client, self.compute_url.as_str());
        with_backoff(self.retry, "keypairs", move || compute::list_keypairs(client, url, token)).await
    }

    async fn list_networks(&self, token: &AuthToken) -> Result<Vec<Network>, ApiError> {
        let (client, url) = (&self.client, self.compute_url.as_str());
        with_backoff(self.retry, "networks", move || compute::list_networks(client, url, token)).await
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        identity::authenticate(&self.client, &self.identity_url, credentials).await
    }

    async fn create_instance(
        &self,
        request: &InstanceRequest,
        session: &AuthSession,
    ) -> Result<CreatedInstance, ApiError> {
        compute::create_instance(&self.client, &self.compute_url, &self.server, request, session).await
    }
}

/// reqwest-backed [`KeycloakAdminApi`].
pub struct KeycloakGateway {
    pub client: reqwest::Client,
    pub base_url: String,
    pub realm: String,
    pub retry: RetryPolicy,
}

#[async_trait]
impl KeycloakAdminApi for KeycloakGateway {
    async fn obtain_token(&self, username: &str, password: &str) -> Result<AuthToken, ApiError> {
        keycloak::obtain_admin_token(&self.client, &self.base_url, username, password).await
    }

    async fn list_users(&self, token: &AuthToken) -> Result<Vec<KeycloakUser>, ApiError> {
        let (client, base, realm) = (&self.client, self.base_url.as_str(), self.realm.as_str());
        with_backoff(self.retry, "users", move || keycloak::list_users(client, base, realm, token)).await
    }

    async fn create_user(&self, token: &AuthToken, user: &KeycloakUser) -> Result<(), ApiError> {
        keycloak::create_user(&self.client, &self.base_url, &self.realm, token, user).await
    }

    async fn update_user(&self, token: &AuthToken, user_id: &str, user: &KeycloakUser) -> Result<(), ApiError> {
        keycloak::update_user(&self.client, &self.base_url, &self.realm, token, user_id, user).await
    }

    async fn delete_user(&self, token: &AuthToken, user_id: &str) -> Result<(), ApiError> {
        keycloak::delete_user(&self.client, &self.base_url, &self.realm, token, user_id).await
    }
}
