//! GitHub activity aggregation.
//!
//! Profile, repositories, language breakdown, recent commits and a
//! contribution calendar are fetched in two concurrent stages and merged
//! into one [`GitHubData`] snapshot. Any single upstream failure degrades
//! that part of the snapshot to a neutral value; only a missing user or an
//! empty repository list turns the whole snapshot into an error.

pub mod activity;
pub mod client;
pub mod languages;
pub mod models;
pub mod service;

pub use client::{GitHubClient, GitHubError};
pub use models::GitHubData;
pub use service::GitHubService;
