pub mod config;
pub mod helpers;
pub mod middleware;
pub mod openstack;
pub mod system;
pub mod users;
pub mod wizard;

pub use config::{client_put, config_export, config_get, realm_put, tokens_put};
pub use openstack::{auth_post, flavors_get, instances_post, keypairs_get, logout_post, networks_get};
pub use system::{health, notifications_get};
pub use users::{users_create, users_delete, users_list, users_update};
pub use wizard::{wizard_back, wizard_delete, wizard_get, wizard_retry, wizard_start, wizard_submit};
