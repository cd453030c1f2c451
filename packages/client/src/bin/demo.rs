//! Headless demo
//!
//! Enters a route against the live TMDB API, waits for the engine to
//! settle, and prints what landed in state.
//!
//! Usage: `demo [route] [search query]`, e.g. `demo /upcoming` or
//! `demo /search alien`.

use anyhow::{Context, Result};
use client_core::{Config, ClientDeps, MovieAction, Route};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,client_core=debug,relay=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "/popular".to_string());
    let route = Route::parse(&path).with_context(|| format!("Unknown route: {}", path))?;
    let query: Vec<String> = args.collect();

    tracing::info!(route = %route, "Starting movie client");

    let handle = client_core::start(ClientDeps::tmdb(config.tmdb_options()), &config);

    for action in route.entry_actions() {
        handle.dispatch(action);
    }
    if route == Route::Search && !query.is_empty() {
        handle.dispatch(MovieAction::SearchMovies {
            query: query.join(" "),
        });
    }

    let state = handle.settle().await.context("Engine did not settle")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&state).context("Failed to render state")?
    );

    handle.abort();
    Ok(())
}
