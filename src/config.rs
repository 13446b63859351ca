//! Configuration loader and validator for the post classification service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema. Every section may be
/// omitted, in which case its defaults apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub app: App,
    pub server: Server,
    pub classifier: Classifier,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    pub data_dir: String,
    pub poll_interval_ms: u64,
    /// Re-scan posts whose classifier invocation failed on later ticks.
    pub retry_failed: bool,
}

impl Default for App {
    fn default() -> Self {
        Self {
            data_dir: ".".into(),
            poll_interval_ms: 10_000,
            retry_failed: false,
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// External text-generation process and the label vocabulary handed to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Classifier {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub categories: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            program: "ollama".into(),
            args: vec!["run".into(), "llama3.2".into()],
            timeout_secs: None,
            categories: default_categories(),
        }
    }
}

impl Classifier {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

pub fn default_categories() -> Vec<String> {
    [
        "Technology",
        "Health & Wellness",
        "Environment",
        "Social Issues",
        "Personal Development",
        "Travel",
        "Lifestyle",
        "Business",
        "Education",
        "Entertainment",
        "Food & Drink",
        "Sports",
        "Finance",
        "Politics",
        "Science",
        "Art & Culture",
        "Parenting",
        "History",
        "Music",
        "Gaming",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Database URL, honouring `DATABASE_URL` when set.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.default_database_url())
    }

    pub fn default_database_url(&self) -> String {
        format!(
            "sqlite://{}/posts.db",
            self.app.data_dir.trim_end_matches('/')
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.app.poll_interval_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is given, the file must exist.
/// - If `path` is None, uses `config.yaml` in the current working directory
///   when present, and the built-in defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Parse and validate YAML content.
pub fn parse(content: &str) -> Result<Config, ConfigError> {
    // An empty document deserializes to unit, not to an all-default struct.
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = serde_yaml::from_str(content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid("app.poll_interval_ms must be > 0"));
    }

    if cfg.server.host.trim().is_empty() {
        return Err(ConfigError::Invalid("server.host must be non-empty"));
    }

    if cfg.classifier.program.trim().is_empty() {
        return Err(ConfigError::Invalid("classifier.program must be non-empty"));
    }
    if cfg.classifier.timeout_secs == Some(0) {
        return Err(ConfigError::Invalid("classifier.timeout_secs must be > 0 when set"));
    }
    if !cfg.classifier.categories.iter().any(|c| !c.trim().is_empty()) {
        return Err(ConfigError::Invalid(
            "classifier.categories must contain at least one category",
        ));
    }

    Ok(())
}

/// Returns the documented example YAML content.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  poll_interval_ms: 10000
  retry_failed: false

server:
  host: "0.0.0.0"
  port: 5000

classifier:
  program: "ollama"
  args: ["run", "llama3.2"]
  # Unbounded when omitted.
  timeout_secs: 120
  categories:
    - "Technology"
    - "Health & Wellness"
    - "Environment"
    - "Social Issues"
    - "Personal Development"
    - "Travel"
    - "Lifestyle"
    - "Business"
    - "Education"
    - "Entertainment"
    - "Food & Drink"
    - "Sports"
    - "Finance"
    - "Politics"
    - "Science"
    - "Art & Culture"
    - "Parenting"
    - "History"
    - "Music"
    - "Gaming"
"#
}
