//! drive_shell - An interactive console for a Google Shared Drive listing.
//!
//! This library provides functionality to:
//! - Authenticate with a service identity (domain-wide delegation) or an
//!   interactive OAuth login backed by a local token cache
//! - Walk a shared drive's file listing page by page
//! - Time the pagination loop or print every file record
//!
//! # Example
//!
//! ```no_run
//! use drive_shell::{timed_listing, Authenticator, DriveClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::service_account("service-account.json", None)?;
//!     let client = DriveClient::new(auth, "drive-id".to_string());
//!
//!     let report = timed_listing(&client).await?;
//!     println!("{} files in {} pages", report.total_files, report.cycles);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod listing;
pub mod models;
pub mod shell;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use listing::{print_listing, timed_listing, FetchPage, ListingReport};
pub use models::{FileListPage, FileRecord};
