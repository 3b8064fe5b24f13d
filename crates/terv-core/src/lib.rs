//! terv-core - version resolution, verified retrieval, and process proxying
//! for the Terraform-family CLIs (OpenTofu, Terraform, Terragrunt,
//! Terramate, Atmos).

pub mod check;
pub mod config;
pub mod constraint;
pub mod download;
pub mod error;
pub mod extract;
pub mod github;
pub mod html;
pub mod iac;
pub mod lastuse;
pub mod lock;
pub mod manager;
pub mod proxy;
pub mod resolver;
pub mod retriever;
pub mod version;
pub mod versionfile;

pub mod reporter;

pub use error::TervError;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for remote requests
pub const USER_AGENT: &str = concat!("terv/", env!("CARGO_PKG_VERSION"));
