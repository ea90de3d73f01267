//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Islet command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "islet", about = "Procedural terrain/ocean diorama")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Simulation buffer resolution (texels per side).
    #[arg(long)]
    pub resolution: Option<u32>,

    /// Generation seed for a reproducible island.
    #[arg(long)]
    pub seed: Option<f32>,

    /// Maximum LOD quadtree depth.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Render ocean tiles as wireframe.
    #[arg(long)]
    pub wireframe: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(res) = args.resolution {
            self.simulation.resolution = res;
        }
        if let Some(seed) = args.seed {
            self.simulation.seed = Some(seed);
        }
        if let Some(depth) = args.max_depth {
            self.lod.max_depth = depth;
        }
        if args.wireframe {
            self.debug.wireframe = true;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            width: None,
            height: None,
            resolution: None,
            seed: None,
            max_depth: None,
            wireframe: false,
            log_level: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(1920),
            seed: Some(42.0),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.simulation.seed, Some(42.0));
        // Non-overridden fields retain defaults
        assert_eq!(config.window.height, 720);
        assert_eq!(config.lod.max_depth, 5);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }
}
