// src/config/store.rs

//! The definition store the supervisor reads from.
//!
//! Definitions are immutable until mutated explicitly through this trait;
//! the supervisor itself never writes configuration.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};

use crate::config::loader::{load_and_validate, save_to_path};
use crate::config::model::{AppDefinition, GlobalSettings, JobDefinition, JobsConfig};
use crate::config::validate::validate_config;
use crate::errors::{JobRunnerError, Result};
use crate::fs::FileSystem;

pub trait ConfigStore: Send + Sync + Debug {
    fn job(&self, id: &str) -> Option<JobDefinition>;
    fn jobs(&self) -> Vec<JobDefinition>;
    fn app(&self, id: &str) -> Option<AppDefinition>;
    fn apps(&self) -> Vec<AppDefinition>;
    fn global(&self) -> GlobalSettings;

    /// Insert a new job or replace the one with the same id.
    fn upsert_job(&self, job: JobDefinition) -> Result<()>;
    fn remove_job(&self, id: &str) -> Result<JobDefinition>;
    fn upsert_app(&self, app: AppDefinition) -> Result<()>;
    fn remove_app(&self, id: &str) -> Result<AppDefinition>;
    fn update_global(&self, global: GlobalSettings) -> Result<()>;

    /// Re-read definitions from the backing file, if there is one.
    fn reload(&self) -> Result<()>;

    /// Where mutations are persisted, if anywhere.
    fn location(&self) -> Option<PathBuf>;
}

/// `ConfigStore` backed by a TOML file (or purely in memory).
///
/// Every successful mutation is validated and then written back to the file.
/// A mutation that would leave the config invalid is rejected and the
/// in-memory state is left untouched.
#[derive(Debug)]
pub struct TomlConfigStore {
    path: Option<PathBuf>,
    fs: Arc<dyn FileSystem>,
    config: RwLock<JobsConfig>,
}

impl TomlConfigStore {
    /// Load `path`. If it does not exist, start from defaults and write them
    /// out so the operator has a file to edit.
    pub fn open(fs: Arc<dyn FileSystem>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = if fs.exists(&path) {
            let cfg = load_and_validate(fs.as_ref(), &path)?;
            info!(path = %path.display(), jobs = cfg.jobs.len(), "using job configuration");
            cfg
        } else {
            let cfg = JobsConfig::default();
            save_to_path(fs.as_ref(), &path, &cfg)?;
            info!(path = %path.display(), "created default job configuration");
            cfg
        };

        Ok(Self {
            path: Some(path),
            fs,
            config: RwLock::new(config),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory(fs: Arc<dyn FileSystem>, config: JobsConfig) -> Self {
        Self {
            path: None,
            fs,
            config: RwLock::new(config),
        }
    }

    /// Snapshot of the whole configuration.
    pub fn snapshot(&self) -> JobsConfig {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, JobsConfig> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobsConfig> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy, validate, persist, then publish.
    fn mutate<T>(&self, change: impl FnOnce(&mut JobsConfig) -> Result<T>) -> Result<T> {
        let mut guard = self.write();
        let mut next = guard.clone();
        let out = change(&mut next)?;
        validate_config(&next)?;
        if let Some(path) = &self.path {
            save_to_path(self.fs.as_ref(), path, &next)?;
        }
        *guard = next;
        Ok(out)
    }
}

impl ConfigStore for TomlConfigStore {
    fn job(&self, id: &str) -> Option<JobDefinition> {
        self.read().job(id).cloned()
    }

    fn jobs(&self) -> Vec<JobDefinition> {
        self.read().jobs.clone()
    }

    fn app(&self, id: &str) -> Option<AppDefinition> {
        self.read().app(id).cloned()
    }

    fn apps(&self) -> Vec<AppDefinition> {
        self.read().apps.values().cloned().collect()
    }

    fn global(&self) -> GlobalSettings {
        self.read().global.clone()
    }

    fn upsert_job(&self, job: JobDefinition) -> Result<()> {
        self.mutate(|cfg| {
            match cfg.jobs.iter_mut().find(|existing| existing.id == job.id) {
                Some(existing) => *existing = job,
                None => cfg.jobs.push(job),
            }
            Ok(())
        })
    }

    fn remove_job(&self, id: &str) -> Result<JobDefinition> {
        self.mutate(|cfg| {
            let index = cfg
                .jobs
                .iter()
                .position(|job| job.id == id)
                .ok_or_else(|| JobRunnerError::job_not_found(id))?;
            Ok(cfg.jobs.remove(index))
        })
    }

    fn upsert_app(&self, app: AppDefinition) -> Result<()> {
        self.mutate(|cfg| {
            cfg.apps.insert(app.id.clone(), app);
            Ok(())
        })
    }

    fn remove_app(&self, id: &str) -> Result<AppDefinition> {
        self.mutate(|cfg| {
            cfg.apps
                .remove(id)
                .ok_or_else(|| JobRunnerError::app_not_found(id))
        })
    }

    fn update_global(&self, global: GlobalSettings) -> Result<()> {
        self.mutate(|cfg| {
            cfg.global = global;
            Ok(())
        })
    }

    fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            warn!("reload requested for an in-memory config store; ignoring");
            return Ok(());
        };
        let cfg = load_and_validate(self.fs.as_ref(), path)?;
        info!(path = %path.display(), jobs = cfg.jobs.len(), "configuration reloaded");
        *self.write() = cfg;
        Ok(())
    }

    fn location(&self) -> Option<PathBuf> {
        self.path.clone()
    }
}
