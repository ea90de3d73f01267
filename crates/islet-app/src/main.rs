//! Binary entry point.

use clap::Parser;

use islet_app::platform::PlatformDirs;
use islet_config::{CliArgs, Config};

fn main() {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve_and_create() {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("failed to initialize platform directories: {e}");
            std::process::exit(1);
        }
    };

    let config_dir = args.config.clone().unwrap_or_else(|| dirs.config_dir.clone());
    let mut config = match Config::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    config.apply_cli_overrides(&args);

    islet_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));

    if let Err(e) = islet_app::window::run(config) {
        tracing::error!("fatal: {e}");
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}
