use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{JobsConfig, RawJobsConfig};
use crate::errors::Result;
use crate::fs::FileSystem;

/// Load a configuration file and return the raw `RawJobsConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawJobsConfig> {
    let path = path.as_ref();
    let contents = fs.read_to_string(path)?;

    let config: RawJobsConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for duplicate job ids, empty fields and unknown app references.
pub fn load_and_validate(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<JobsConfig> {
    let raw_config = load_from_path(fs, &path)?;
    let config = JobsConfig::try_from(raw_config)?;
    debug!(
        path = %path.as_ref().display(),
        jobs = config.jobs.len(),
        apps = config.apps.len(),
        "loaded job configuration"
    );
    Ok(config)
}

/// Serialize `config` to TOML and write it to `path`.
pub fn save_to_path(fs: &dyn FileSystem, path: impl AsRef<Path>, config: &JobsConfig) -> Result<()> {
    let mut contents = String::from("# Job runner configuration\n\n");
    contents.push_str(&toml::to_string(&config.to_raw())?);
    fs.write(path.as_ref(), contents.as_bytes())?;
    Ok(())
}

/// Default config location: `jobs.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("jobs.toml")
}
