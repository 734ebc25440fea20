pub mod assembler;
pub mod credential_store;
pub mod notifications;
pub mod user_directory;

// Re-export commonly used items
pub use assembler::{assemble, to_export_json, write_export, EXPORT_FILE_NAME};
pub use credential_store::{
    clear_session, cookie_max_age, load_credentials, store_session, CookieStore, CredentialStore, ScopedSession,
    AUTH_TOKEN_KEY, USER_ID_KEY,
};
pub use notifications::NotificationStore;
pub use user_directory::{UserDirectory, UserQuery};
