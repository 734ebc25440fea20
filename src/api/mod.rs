// Atomic API modules
pub mod client;
pub mod compute;
pub mod gateway;
pub mod identity;
pub mod keycloak;
pub mod retry;

// Re-export commonly used items
pub use client::{send, set_silent, Payload, UpstreamResponse};
pub use gateway::{KeycloakAdminApi, KeycloakGateway, OpenStackApi, OpenStackGateway};
#[cfg(test)]
pub use gateway::{MockKeycloakAdminApi, MockOpenStackApi};
pub use retry::{with_backoff, RetryPolicy};
