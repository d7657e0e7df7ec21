//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::config::{CliConfig, CONFIG_FILE_NAMES};
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Loaded configuration, with credentials filled from the environment.
    pub config: CliConfig,
    /// File the config came from, if any.
    pub config_path: Option<PathBuf>,
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from the given config file, or search for one.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (mut config, config_path) = match config_path {
            Some(path) => (CliConfig::load(path)?, Some(PathBuf::from(path))),
            None => match find_config(&cwd) {
                Some(path) => {
                    output.debug(&format!("Using config {}", path.display()));
                    (CliConfig::load(&path.to_string_lossy())?, Some(path))
                }
                None => (CliConfig::default(), None),
            },
        };

        config.site = config.site.with_env();

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Resolve a path relative to the config file's directory, falling back
    /// to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            return path;
        }
        self.base_dir().join(path)
    }

    fn base_dir(&self) -> &Path {
        self.config_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(self.cwd.as_path())
    }
}

/// Walk up from `start` looking for a config file.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}
