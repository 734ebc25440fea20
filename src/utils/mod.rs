// URL handling utilities
pub mod url_builder;

// Secrets in logs
pub mod mask;

// Client-side paging of cached lists
pub mod pagination;

pub use url_builder::{join_url, path_segment};
pub use mask::mask_secret;
pub use pagination::{paginate, Page};
