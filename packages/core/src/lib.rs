// Library root: exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod api;
pub mod cache;
pub mod derive;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod price;
pub mod render;
pub mod scheduler;
pub mod services;
pub mod types;
pub mod widget;

// Binary-only plumbing, public so integration tests can reach it.
pub mod cli;
pub mod config;
pub mod logging;
