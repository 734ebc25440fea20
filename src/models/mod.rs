pub mod app_state;
pub mod auth;
pub mod flavor;
pub mod instance;
pub mod keycloak_user;
pub mod keypair;
pub mod network;
pub mod notification;
pub mod realm_config;

pub use app_state::{AppState, ConsoleSession};
pub use auth::{AuthSession, AuthSummary, AuthToken, Credentials};
pub use flavor::{Flavor, FlavorList};
pub use instance::{CreatedInstance, InstanceRequest, ServerSettings};
pub use keycloak_user::{KeycloakUser, UserPatch};
pub use keypair::{Keypair, KeypairEntry, KeypairList};
pub use network::{Network, NetworkList};
pub use notification::{Notification, NotificationLevel};
pub use realm_config::{
    ClientConfig, ClientRepresentation, ConfigDocument, ConfigDraft, RealmSettings, TokenLifespans,
};
