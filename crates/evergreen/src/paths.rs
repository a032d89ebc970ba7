use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "EVERGREEN_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "EVERGREEN_DATA_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Evergreen";
const APPLICATION: &str = "Evergreen";
const CONFIG_FILE: &str = "evergreen.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;

        let config_dir = resolve_dir(ENV_CONFIG_DIR, project_dirs.config_dir())
            .context("failed to resolve evergreen config directory")?;
        let data_dir = resolve_dir(ENV_DATA_DIR, project_dirs.data_dir())
            .context("failed to resolve evergreen data directory")?;

        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Directory searched for gesture scripts given by bare name.
    pub fn scripts_dir(&self) -> PathBuf {
        self.data_dir.join("scripts")
    }

    /// Resolves `--script` values: existing paths win, then `<scripts>/<name>`,
    /// then `<scripts>/<name>.toml`.
    pub fn resolve_script(&self, requested: &Path) -> Option<PathBuf> {
        if requested.is_file() {
            return Some(requested.to_path_buf());
        }
        if requested.components().count() != 1 {
            return None;
        }
        let candidate = self.scripts_dir().join(requested);
        if candidate.is_file() {
            return Some(candidate);
        }
        let with_extension = candidate.with_extension("toml");
        with_extension.is_file().then_some(with_extension)
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
        }
    }
}

fn resolve_dir(env_var: &str, default: &Path) -> Result<PathBuf> {
    if let Some(value) = env_override(env_var) {
        return Ok(value);
    }
    Ok(default.to_path_buf())
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
