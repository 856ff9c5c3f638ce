//! HTTP adapter for the ingestion portal's group and user API.
//!
//! [`DirectoryClient`] talks to the portal over JSON and implements the
//! engine's [`GroupCatalog`](portal_access_core::GroupCatalog) and
//! [`Directory`](portal_access_core::Directory) traits, so an edit session
//! can run against the live service.

pub mod client;
mod directory;

pub use client::error::ClientError;
pub use client::{DirectoryClient, DirectoryClientBuilder};
