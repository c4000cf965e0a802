mod access;
mod app;
mod auth;
mod components;
mod config;
mod db;
mod error;
mod lifecycle;
mod models;
mod services;
mod slots;
mod tui;
mod validation;

use anyhow::{Context, Result};
use app::App;
use config::Config;
use db::Database;
use log::{error, info, warn};
use tui::Tui;

fn main() -> Result<()> {
    let config = Config::from_env();
    simple_logging::log_to_file(&config.log_path, config.log_level)
        .with_context(|| format!("cannot open log file {}", config.log_path.display()))?;
    if let Some(level) = &config.rejected_log_level {
        warn!("Unknown log level {level:?}, using info");
    }
    info!("Starting CareWell");

    let db = Database::open(&config.db_path)?;
    if auth::ensure_admin(&db, &config.admin_email, &config.admin_password)? {
        info!("Seeded admin account {}", config.admin_email);
    }

    // Puts the terminal back even when the UI panics.
    let _restore = RestoreOnDrop;
    let mut tui = Tui::new()?;
    tui.init()?;

    let outcome = App::new(db).run(&mut tui);
    tui.exit()?;

    if let Err(e) = outcome {
        error!("CareWell stopped on error: {e:#}");
        eprintln!("CareWell stopped on error: {e}");
    }
    info!("CareWell stopped");
    Ok(())
}

struct RestoreOnDrop;

impl Drop for RestoreOnDrop {
    fn drop(&mut self) {
        let _ = tui::restore();
    }
}
