//! # GitHub Reaper
//!
//! A Rust library for searching GitHub repositories and batch-cloning a
//! selection of the results, with rate-limit-aware retries and progress
//! visualization.
//!
//! ## Main Components
//!
//! - [`GitHubClient`]: Lazily streams search results page by page, retrying
//!   rate limits and network failures with capped exponential backoff
//! - [`SelectionSet`]: Parses range selections such as `"1-5,10,15-20"`
//! - [`RepositoryCloner`]: Runs `git clone` for each selected result
//! - [`Config`]: Token and tuning knobs, resolved once from [`Args`]
//!
//! ## Example
//!
//! ```no_run
//! use github_reaper::{collect_results, Config, GitHubClient, RepositoryCloner, SelectionSet};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = Config::new(std::env::var("GITHUB_TOKEN")?);
//!     let client = GitHubClient::new(config.clone())?;
//!
//!     // Fetch every page for the query
//!     let (results, error) = collect_results(client.search("language:rust tui", 100)).await;
//!     if let Some(e) = error {
//!         eprintln!("search stopped early: {}", e);
//!     }
//!
//!     // Clone the first three and the tenth result
//!     let selection = SelectionSet::parse("1-3,10", results.len())?;
//!     let cloner = RepositoryCloner::from_config(&config).await?;
//!     let report = cloner.clone_selected(&results, &selection).await;
//!     println!("{} cloned, {} failed", report.cloned.len(), report.failed.len());
//!
//!     Ok(())
//! }
//! ```

mod args;
mod cloner;
pub mod config;
pub mod error;
mod github_client;
pub mod models;
pub mod retry;
pub mod selection;

// Re-export main components for documentation and external use
pub use crate::args::Args;
pub use crate::cloner::RepositoryCloner;
pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::github_client::{collect_results, GitHubClient};
pub use crate::models::{CloneOutcome, CloneReport, SearchResult};
pub use crate::selection::SelectionSet;
