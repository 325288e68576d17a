//! Tracing setup: console plus daily-rolled files under the log directory.
//! Production writes JSON; development writes pretty console output.

pub mod middleware;

use std::io;

use tracing::Subscriber;
use tracing_appender::{
    non_blocking,
    non_blocking::{NonBlocking, WorkerGuard},
    rolling,
};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::Config;

fn default_level(config: &Config) -> String {
    config.log_level.clone().unwrap_or_else(|| {
        if config.environment.is_production() {
            "info".to_string()
        } else {
            "debug".to_string()
        }
    })
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("portfolio_site={level},tower_http=info,axum=info")
}

/// JSON sink for `error` events only. Generic over the subscriber so each
/// branch of [`init`] can stack it on its own file layer.
fn error_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .json()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(LevelFilter::ERROR)
}

/// Install the global subscriber. The returned guards flush the background
/// writers on drop and must live as long as the process.
pub fn init(config: &Config) -> Vec<WorkerGuard> {
    let is_production = config.environment.is_production();

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!(
            "could not create log directory {}: {e}",
            config.log_dir.display()
        );
    }

    let (file_writer, file_guard) = non_blocking(rolling::daily(&config.log_dir, "app.log"));
    let (error_writer, error_guard) = non_blocking(rolling::daily(&config.log_dir, "error.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&default_level(config))));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = if is_production {
        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber
            .with(file_layer)
            .with(error_layer(error_writer))
            .with(console_layer)
            .try_init()
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_ansi(false);
        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber
            .with(file_layer)
            .with(error_layer(error_writer))
            .with(console_layer)
            .try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {e}");
    }

    tracing::info!(environment = %config.environment, "logging initialized");
    vec![file_guard, error_guard, console_guard]
}
