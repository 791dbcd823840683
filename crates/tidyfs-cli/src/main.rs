//! TidyFS line driver
//!
//! Reads one agent reply per stdin line, runs it through the core and prints
//! one JSON turn outcome per line on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tidyfs_core::{ActionRequestProtocol, OrganizerSettings, Session, TracingAuditSink};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const ROOT_VAR: &str = "TIDYFS_ROOT";
const SETTINGS_VAR: &str = "TIDYFS_SETTINGS";

fn load_settings() -> Result<OrganizerSettings> {
    match std::env::var_os(SETTINGS_VAR) {
        Some(path) => OrganizerSettings::from_file(&path)
            .with_context(|| format!("loading settings from {:?}", path)),
        None => Ok(OrganizerSettings::default()),
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!("TidyFS v{}", env!("CARGO_PKG_VERSION"));

    let root = std::env::var(ROOT_VAR).with_context(|| format!("{} must be set", ROOT_VAR))?;
    let settings = load_settings()?;

    let protocol = ActionRequestProtocol::new(&root, &settings, Arc::new(TracingAuditSink))
        .with_context(|| format!("cannot organize {}", root))?;
    let mut session = Session::new(protocol, settings.history_capacity);

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let outcome = session.handle_reply(&line);
        serde_json::to_writer(&mut stdout, &outcome)?;
        writeln!(stdout)?;
        stdout.flush()?;
    }

    info!("Session ended after {} history entries", session.history().len());
    Ok(())
}
