use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::JobType;

/// Environment variable pointing children at their Java runtime.
pub const RUNTIME_HOME_VAR: &str = "JAVA_HOME";

/// Top-level configuration as read from `jobs.toml`.
///
/// ```toml
/// [global]
/// java_home = "/opt/java/openjdk"
/// java_opts = "-Xms256m -Xmx512m"
/// config_dir = "/opt/config"
/// logs_dir = "/opt/logs/jobs"
///
/// [apps.billing]
/// name = "Billing"
/// webapp_path = "/srv/webapps/billing"
///
/// [[jobs]]
/// id = "import"
/// app = ["billing"]
/// main_class = "com.example.Import"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawJobsConfig {
    #[serde(default)]
    pub global: GlobalSettings,

    /// Apps keyed by id (`[apps.<id>]`).
    #[serde(default)]
    pub apps: BTreeMap<String, RawAppConfig>,

    /// Jobs in declaration order (`[[jobs]]`).
    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
}

/// Validated configuration.
///
/// Can only be constructed via `TryFrom<RawJobsConfig>` (see `validate.rs`),
/// or [`JobsConfig::default`] for an empty config.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobsConfig {
    pub global: GlobalSettings,
    pub apps: BTreeMap<String, AppDefinition>,
    pub jobs: Vec<JobDefinition>,
}

impl JobsConfig {
    pub(crate) fn new_unchecked(
        global: GlobalSettings,
        apps: BTreeMap<String, AppDefinition>,
        jobs: Vec<JobDefinition>,
    ) -> Self {
        Self { global, apps, jobs }
    }

    pub fn job(&self, id: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn app(&self, id: &str) -> Option<&AppDefinition> {
        self.apps.get(id)
    }

    /// Convert back into the on-disk shape.
    pub fn to_raw(&self) -> RawJobsConfig {
        RawJobsConfig {
            global: self.global.clone(),
            apps: self
                .apps
                .iter()
                .map(|(id, app)| {
                    (
                        id.clone(),
                        RawAppConfig {
                            name: Some(app.name.clone()),
                            webapp_path: app.webapp_path.clone(),
                        },
                    )
                })
                .collect(),
            jobs: self.jobs.clone(),
        }
    }
}

/// `[global]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Exported to every child as `JAVA_HOME`.
    #[serde(default = "default_java_home")]
    pub java_home: PathBuf,

    /// Explicit executable; defaults to `<java_home>/bin/java`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_cmd: Option<PathBuf>,

    /// Launch options applied to every job, before per-job options.
    #[serde(default = "default_java_opts")]
    pub java_opts: String,

    /// Appended once at the end of every classpath. Empty disables it.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Per-job log files live here; also the children's working directory.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

impl GlobalSettings {
    /// The executable every job is launched with.
    pub fn executable(&self) -> PathBuf {
        match &self.java_cmd {
            Some(cmd) => cmd.clone(),
            None => {
                let name = if cfg!(windows) { "java.exe" } else { "java" };
                self.java_home.join("bin").join(name)
            }
        }
    }
}

fn default_java_home() -> PathBuf {
    std::env::var_os(RUNTIME_HOME_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/opt/java/openjdk"))
}

fn default_java_opts() -> String {
    "-Xms256m -Xmx512m".to_string()
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("/opt/config")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("/opt/logs/jobs")
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            java_home: default_java_home(),
            java_cmd: None,
            java_opts: default_java_opts(),
            config_dir: default_config_dir(),
            logs_dir: default_logs_dir(),
        }
    }
}

/// `[apps.<id>]` section as written on disk; the id is the table key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub webapp_path: PathBuf,
}

/// A deployed web application whose classes and jars jobs run against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppDefinition {
    pub id: String,
    pub name: String,
    pub webapp_path: PathBuf,
}

impl AppDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, webapp_path: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            webapp_path: webapp_path.as_ref().to_path_buf(),
        }
    }

    pub fn classes_dir(&self) -> PathBuf {
        self.webapp_path.join("WEB-INF").join("classes")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.webapp_path.join("WEB-INF").join("lib")
    }
}

/// `[[jobs]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// App ids contributing classpath entries, in order.
    ///
    /// Written as `app = "x"` or `app = ["x", "y"]`.
    #[serde(
        rename = "app",
        default,
        deserialize_with = "one_or_many",
        serialize_with = "single_or_list"
    )]
    pub apps: Vec<String>,

    pub main_class: String,

    #[serde(rename = "type", default)]
    pub job_type: JobType,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,

    /// Per-job launch options, appended after `[global].java_opts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java_opts: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// UI hint: ask for runtime arguments before starting.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub args_required: bool,
}

impl JobDefinition {
    pub fn new(id: impl Into<String>, main_class: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            apps: Vec::new(),
            main_class: main_class.into(),
            job_type: JobType::default(),
            enabled: default_enabled(),
            params: Vec::new(),
            java_opts: None,
            description: String::new(),
            args_required: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(app) => vec![app],
        OneOrMany::Many(apps) => apps,
    })
}

#[allow(clippy::ptr_arg)]
fn single_or_list<S>(apps: &Vec<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match apps.as_slice() {
        [single] => serializer.serialize_str(single),
        many => many.serialize(serializer),
    }
}
