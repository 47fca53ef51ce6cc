//! GitLab client modules
//!
//! Authenticated access to the GitLab users API: configuration, the HTTP
//! client itself, and lazy traversal of the paginated listing.

pub mod api;
pub mod config;
pub mod error;
pub mod pages;

#[cfg(test)]
pub(crate) mod tests;

// Re-export main types for convenience
pub use api::GitlabApi;
pub use config::ClientConfig;
pub use error::ClientError;
