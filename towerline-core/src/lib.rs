//! Towerline Core
//!
//! Core types and abstractions shared by the Towerline client and CLI.
//!
//! This crate contains:
//! - Domain types: template kinds, launch parameters, credential buckets
//! - Version handling for Ansible Tower / AWX release strings
//! - Export extraction from streamed job output

pub mod credentials;
pub mod exports;
pub mod launch;
pub mod template;
pub mod version;

pub use credentials::CredentialBucket;
pub use exports::ExportMap;
pub use launch::LaunchSpec;
pub use template::{InvalidTemplateKind, TemplateDetail, TemplateKind};
pub use version::{TowerVersion, VersionError};
