//! OS directory resolution.

use std::path::PathBuf;

/// Errors from platform directory setup.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("could not determine OS configuration directory")]
    NoConfigDir,

    #[error("platform I/O error: {0}")]
    Io(#[from] std::io::Error),
}

const APP_NAME: &str = "islet";

/// OS-appropriate directories for config and logs.
pub struct PlatformDirs {
    /// User configuration: `config.ron`.
    pub config_dir: PathBuf,
    /// Log files (debug builds write JSON logs here).
    pub log_dir: PathBuf,
}

impl PlatformDirs {
    /// Resolve the paths following OS conventions.
    pub fn resolve() -> Result<Self, PlatformError> {
        let config_dir = dirs::config_dir()
            .ok_or(PlatformError::NoConfigDir)?
            .join(APP_NAME);
        let log_dir = dirs::data_local_dir()
            .ok_or(PlatformError::NoConfigDir)?
            .join(APP_NAME)
            .join("logs");
        Ok(Self {
            config_dir,
            log_dir,
        })
    }

    /// Resolve and create the directories.
    pub fn resolve_and_create() -> Result<Self, PlatformError> {
        let dirs = Self::resolve()?;
        std::fs::create_dir_all(&dirs.config_dir)?;
        std::fs::create_dir_all(&dirs.log_dir)?;
        Ok(dirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Both paths end with the application segment.
    #[test]
    fn test_paths_are_namespaced() {
        let Ok(dirs) = PlatformDirs::resolve() else {
            // Headless CI may have no home directory.
            return;
        };
        assert!(dirs.config_dir.ends_with(APP_NAME));
        assert!(dirs.log_dir.ends_with("logs"));
        assert!(dirs.log_dir.to_string_lossy().contains(APP_NAME));
    }
}
