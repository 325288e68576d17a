/**
 * Routes Module
 * HTTP handlers; all of them take the shared `AppState`
 */

pub mod blog;
pub mod contact;
pub mod github;
pub mod health;
pub mod rss;
