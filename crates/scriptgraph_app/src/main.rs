// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless scriptgraph editor session.
//!
//! Usage: `scriptgraph_editor [PREFERENCES] [OUTPUT]`
//!
//! Loads editor preferences (defaults when the file is absent), runs a
//! scripted editing session against an in-memory view and, when `OUTPUT` is
//! given, writes the resulting graph and view state there as RON.
//!
//! Set `RUST_LOG=scriptgraph_editor=debug` together with
//! `verbose_diagnostics: true` to see dependency and rebuild diagnostics.

mod demo;

use demo::Session;
use scriptgraph_editor::config::PREFERENCES_FILE_NAME;
use scriptgraph_editor::EditorPreferences;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scriptgraph_app=info,scriptgraph_editor=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting scriptgraph editor v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let preferences_path = args.next().map_or_else(|| PathBuf::from(PREFERENCES_FILE_NAME), PathBuf::from);
    let output = args.next().map(PathBuf::from);

    let preferences = match EditorPreferences::load_or_default(&preferences_path) {
        Ok(preferences) => preferences,
        Err(e) => {
            tracing::error!("Failed to load preferences from {}: {e}", preferences_path.display());
            std::process::exit(1);
        }
    };

    let mut session = Session::new(preferences);
    let report = match session.run() {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Session failed: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        "Session finished: {} passes, {} aligned, {} stack relayouts, {} undo steps left",
        report.passes.len(),
        report.aligned,
        report.relayouts,
        report.undo_depth
    );

    if let Some(output) = output {
        if let Err(e) = session.save(&output) {
            tracing::error!("Failed to write {}: {e}", output.display());
            std::process::exit(1);
        }
        tracing::info!("Wrote {}", output.display());
    }
}
