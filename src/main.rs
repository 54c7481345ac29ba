//! capy-status - event-driven status line for the X root window
//!
//! One task per source, one aggregator, one `xsetroot` per visible change.

mod config;
mod display;
mod functions;
mod services;

use config::Config;
use display::Display;
use log::info;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting capy-status v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::default_path() {
        Some(path) => Config::load(&path),
        None => Config::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let status_line = services::status_line(&config);
    info!("Running {} sources", status_line.len());
    runtime.block_on(status_line.run(Display::new(config.sink)));

    info!("All sources stopped, exiting");
    Ok(())
}
