use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml;

use crate::providers::ProviderIdentifier;
use crate::warn;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("failed to read config \"{}\"", .0.display())]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config \"{}\": {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
}

/// What happens when a stored key does not look like one of the provider's keys.
/// Saving a key is never blocked; the policy only applies when a request is sent.
#[derive(Deserialize, Serialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum KeyFormatPolicy {
    #[default]
    Warn,
    Reject,
}

#[derive(Deserialize, Serialize, Default, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Keybindings {
    #[default]
    Emacs,
    Vi,
}

#[derive(Deserialize, Serialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RecordBackend {
    #[default]
    Local,
    Supabase,
    Disabled,
}

#[derive(Deserialize, Serialize, Default, Debug, Clone)]
pub(crate) struct ProviderOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Providers {
    #[serde(default)]
    pub deepseek: ProviderOverrides,
    #[serde(default)]
    pub openrouter: ProviderOverrides,
    #[serde(default)]
    pub openai: ProviderOverrides,
}

impl Providers {
    pub(crate) fn get(&self, id: ProviderIdentifier) -> &ProviderOverrides {
        match id {
            ProviderIdentifier::DeepSeek => &self.deepseek,
            ProviderIdentifier::OpenRouter => &self.openrouter,
            ProviderIdentifier::OpenAI => &self.openai,
        }
    }

    #[cfg(test)]
    pub(crate) fn get_mut(&mut self, id: ProviderIdentifier) -> &mut ProviderOverrides {
        match id {
            ProviderIdentifier::DeepSeek => &mut self.deepseek,
            ProviderIdentifier::OpenRouter => &mut self.openrouter,
            ProviderIdentifier::OpenAI => &mut self.openai,
        }
    }
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Credentials {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Records {
    #[serde(default)]
    pub backend: RecordBackend,
    /// Location of the local record file
    pub path: Option<PathBuf>,
    /// Base URL of the hosted project, e.g. `https://<project>.supabase.co`
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// A user access token; the anonymous key is used when absent
    pub access_token: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Config {
    /// The provider used when no provider has been selected
    pub default_provider: Option<ProviderIdentifier>,
    #[serde(default)]
    pub key_format_policy: KeyFormatPolicy,
    /// Whether generated queries are saved to the record store
    pub save_queries: Option<bool>,
    #[serde(default)]
    pub keybindings: Keybindings,
    #[serde(default)]
    pub providers: Providers,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub records: Records,
}

impl Config {
    pub(crate) fn save_queries(&self) -> bool {
        self.save_queries.unwrap_or(true)
    }

    pub(crate) fn credentials_path(&self) -> Option<PathBuf> {
        self.credentials
            .path
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("credentials.toml")))
    }

    pub(crate) fn records_path(&self) -> Option<PathBuf> {
        self.records
            .path
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("records.json")))
    }

    /// The identity records are scoped to.
    pub(crate) fn user_id(&self) -> String {
        if let Some(user_id) = &self.records.user_id {
            return user_id.clone();
        }

        match std::env::var("USER") {
            Ok(user) if !user.is_empty() => user,
            _ => "local".to_string(),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

pub(crate) fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".config/nlsql"))
}

fn get_config_path() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        const USER_PATHS: [&str; 2] = [".config/nlsql/config.toml", ".nlsql.toml"];

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from("/etc/nlsql.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn extra_fields_helper<'a>(
    path: &mut Vec<&'a String>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
    extra: &mut Vec<String>,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        if let Some(config_value) = config.get(user_key) {
            if let (toml::Value::Table(user_value), toml::Value::Table(config_value)) =
                (user_value, config_value)
            {
                extra_fields_helper(path, user_value, config_value, extra)
            }
        } else {
            let path: Vec<&str> = path.iter().map(|&s| s.as_str()).collect();

            extra.push(path.join("."));
        }

        path.pop();
    }
}

/// Lists the dotted paths of keys present in `raw_config` which the parsed
/// config does not know about.
fn extra_fields(config: &Config, raw_config: &str) -> Vec<String> {
    let user_config: toml::Table = match toml::from_str(raw_config) {
        Ok(table) => table,
        Err(_) => return Vec::new(),
    };

    let config: toml::Table = match toml::to_string(config).map(|s| toml::from_str(&s)) {
        Ok(Ok(table)) => table,
        _ => return Vec::new(),
    };

    let mut path = Vec::new();
    let mut extra = Vec::new();

    extra_fields_helper(&mut path, &user_config, &config, &mut extra);

    extra
}

pub(crate) fn parse_config(path: &Path, raw_config: &str) -> Result<Config, Error> {
    let config: Config =
        toml::from_str(raw_config).map_err(|e| Error::Parse(path.to_path_buf(), e))?;

    for key in extra_fields(&config, raw_config) {
        warn!("config contains extraneous key \"{}\", ignoring", key);
    }

    Ok(config)
}

pub(crate) fn read_config(config: Option<PathBuf>) -> Result<Config, Error> {
    let config_path = config.or_else(get_config_path);

    if let Some(path) = config_path {
        let raw_config =
            std::fs::read_to_string(&path).map_err(|e| Error::Read(path.clone(), e))?;

        parse_config(&path, &raw_config)
    } else {
        Ok(Config::default())
    }
}
