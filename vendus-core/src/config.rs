use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ConfigError, Result};

pub const BASE_URL: &str = "base-url";
pub const USER: &str = "user";
pub const PASSWORD: &str = "password";
pub const OUTPUT: &str = "output";
pub const MONTH: &str = "month";

/// Checked in this order; the first absent key is the one reported.
pub const REQUIRED_KEYS: [&str; 4] = [BASE_URL, USER, PASSWORD, OUTPUT];

pub const APP_NAME: &str = "vendus-export";
pub const CONFIG_PATH_ENV: &str = "VENDUS_EXPORT_CONFIG";

/// Per-invocation settings layered over the persisted store.
pub type ConfigOverrides = BTreeMap<String, String>;

/// Settings of one export run after merging and validation.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    pub base_url: String,
    pub user: String,
    pub password: String,
    pub output: String,
    pub month: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl Configuration {
    pub fn from_values(mut values: BTreeMap<String, String>) -> Result<Self> {
        for key in REQUIRED_KEYS {
            let present = values.get(key).is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(ConfigError::MissingKey(key.to_string()));
            }
        }
        let mut take = |key: &str| values.remove(key).unwrap_or_default();
        let base_url = take(BASE_URL);
        let user = take(USER);
        let password = take(PASSWORD);
        let output = take(OUTPUT);
        let month = values.remove(MONTH).filter(|value| !value.trim().is_empty());
        Ok(Self {
            base_url,
            user,
            password,
            output,
            month,
            extra: values,
        })
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("output", &self.output)
            .field("month", &self.month)
            .field("extra", &self.extra)
            .finish()
    }
}

/// Flat key-value JSON document kept in the user's config directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// `$VENDUS_EXPORT_CONFIG`, falling back to `~/.config/vendus-export/.config.json`.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_NAME)
            .join(".config.json")
    }

    pub fn at<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Opens the store, creating its directory and an empty document if needed.
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let store = Self::at(path.unwrap_or_else(Self::default_path));
        store.ensure_exists()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                source,
                path: parent.to_path_buf(),
            })?;
        }
        debug!(path = %self.path.display(), "creating empty configuration store");
        std::fs::write(&self.path, "{}").map_err(|source| ConfigError::Write {
            source,
            path: self.path.clone(),
        })
    }

    /// Reads every stored value as a string. A missing file reads as empty.
    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        let document = self.read_document()?;
        Ok(document
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(text) => Some((key, text)),
                other => Some((key, other.to_string())),
            })
            .collect())
    }

    pub fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(name))
    }

    /// Upserts one key and rewrites the whole document.
    pub fn set(&self, name: &str, value: &str) -> Result<()> {
        self.ensure_exists()?;
        let mut document = self.read_document()?;
        document.insert(name.to_string(), Value::String(value.to_string()));
        let rendered =
            serde_json::to_string_pretty(&Value::Object(document)).map_err(|source| {
                ConfigError::Parse {
                    source,
                    path: self.path.clone(),
                }
            })?;
        std::fs::write(&self.path, rendered).map_err(|source| ConfigError::Write {
            source,
            path: self.path.clone(),
        })?;
        debug!(path = %self.path.display(), key = name, "configuration value stored");
        Ok(())
    }

    /// Merges `overrides` over the stored values and validates required keys.
    pub fn resolve(&self, overrides: &ConfigOverrides) -> Result<Configuration> {
        let stored = self.load()?;
        resolve_values(stored, overrides)
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(ConfigError::Io {
                    source,
                    path: self.path.clone(),
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            source,
            path: self.path.clone(),
        })
    }
}

/// Shallow merge, overrides winning on collisions, then validation.
pub fn resolve_values(
    mut stored: BTreeMap<String, String>,
    overrides: &ConfigOverrides,
) -> Result<Configuration> {
    for (key, value) in overrides {
        stored.insert(key.clone(), value.clone());
    }
    Configuration::from_values(stored)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chromium: ChromiumSection,
    pub viewport: ViewportSection,
    pub timing: TimingSection,
    pub selectors: SelectorSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChromiumSection {
    pub executable_path: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub disable_gpu: bool,
    pub request_timeout_seconds: Option<u64>,
}

impl Default for ChromiumSection {
    fn default() -> Self {
        Self {
            executable_path: None,
            headless: true,
            sandbox: true,
            disable_gpu: true,
            request_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewportSection {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportSection {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 1152,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub settle_ms: u64,
    pub selector_timeout_seconds: u64,
    pub ready_timeout_seconds: u64,
    pub poll_interval_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            settle_ms: 2_000,
            selector_timeout_seconds: 30,
            ready_timeout_seconds: 600,
            poll_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SelectorSection {
    pub login_path: String,
    pub email: String,
    pub password: String,
    pub submit: String,
    pub documents_menu: String,
    pub invoice_menu: String,
    pub calendar_toggle: String,
    pub filter_start: String,
    pub filter_end: String,
    pub filter_submit: String,
    pub export_cancel: String,
    pub export_button: String,
    pub export_done_link: String,
    /// Text shown when the filtered period has no documents. `None` disables the check.
    pub no_documents_text: Option<String>,
}

impl Default for SelectorSection {
    fn default() -> Self {
        Self {
            login_path: "/login/".into(),
            email: "#email".into(),
            password: "[type=\"password\"]".into(),
            submit: "[type=\"submit\"]".into(),
            documents_menu: "#menu_documents".into(),
            invoice_menu: "#menu_office-invoice".into(),
            calendar_toggle: ".icon-calendar".into(),
            filter_start: "#list-filter-start".into(),
            filter_end: "#list-filter-end".into(),
            filter_submit: "#office-list-filter > [type=\"submit\"]".into(),
            export_cancel: "#office-export-cancel".into(),
            export_button: "#office-export-btn".into(),
            export_done_link: "#office-export-done-link".into(),
            no_documents_text: Some("Não existem documentos".into()),
        }
    }
}

pub fn load_browser_config<P: AsRef<Path>>(path: P) -> Result<BrowserConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Toml {
        source,
        path: path.to_path_buf(),
    })
}
