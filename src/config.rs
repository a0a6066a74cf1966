use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::util::{strip_quotes, urljoin};

pub const DEFAULT_BASE_URL: &str = "https://api.refinitiv.com";
pub const DEFAULT_AUTH_PATH: &str = "/auth/oauth2/v1/token";
pub const DEFAULT_ESG_PATH: &str = "/data/environmental-social-governance/v2/views/scores-full";
pub const DEFAULT_SEARCH_PATH: &str = "/discovery/search/v1/explore";

/// Endpoints and credentials for one platform account.
///
/// `Debug` redacts the password.
#[derive(Clone)]
pub struct Config {
    /// Platform host, e.g. `https://api.refinitiv.com`.
    pub base_url: String,
    pub auth_path: String,
    pub esg_path: String,
    pub search_path: String,
    pub username: String,
    pub password: String,
    pub client_id: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("auth_path", &self.auth_path)
            .field("esg_path", &self.esg_path)
            .field("search_path", &self.search_path)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables and/or an env file.
    ///
    /// Each key is taken from (in order of precedence):
    /// - the process environment (`RDP_BASE_URL`, `RDP_AUTH_URL`, `RDP_ESG_URL`,
    ///   `RDP_SEARCH_EXPLORE_URL`, `RDP_USERNAME`, `RDP_PASSWORD`, `RDP_CLIENTID`)
    /// - the first env file found: `RDP_ENV_FILE`, `./.env`, `~/.rdp.env`
    pub fn from_env() -> Result<Self> {
        let candidates = env_file_candidates();
        let mut file = EnvFile::default();
        for path in &candidates {
            if path.exists() {
                file = read_env_file(path).with_context(|| {
                    format!("failed to read configuration file {}", path.display())
                })?;
                break;
            }
        }

        let lookup = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.get(key))
        };

        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(v) => Ok(v),
                None if candidates.is_empty() => {
                    bail!("Missing configuration: {key} (set it in the environment or create .env)")
                }
                None => bail!(
                    "Missing configuration: {key} (set it in the environment or in one of: {})",
                    candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            }
        };

        Ok(Config {
            base_url: lookup("RDP_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            auth_path: lookup("RDP_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_PATH.to_string()),
            esg_path: lookup("RDP_ESG_URL").unwrap_or_else(|| DEFAULT_ESG_PATH.to_string()),
            search_path: lookup("RDP_SEARCH_EXPLORE_URL")
                .unwrap_or_else(|| DEFAULT_SEARCH_PATH.to_string()),
            username: required("RDP_USERNAME")?,
            password: required("RDP_PASSWORD")?,
            client_id: required("RDP_CLIENTID")?,
        })
    }

    pub fn auth_url(&self) -> String {
        urljoin(&self.base_url, &self.auth_path)
    }

    pub fn esg_url(&self) -> String {
        urljoin(&self.base_url, &self.esg_path)
    }

    pub fn search_url(&self) -> String {
        urljoin(&self.base_url, &self.search_path)
    }
}

#[derive(Debug, Default)]
struct EnvFile {
    entries: Vec<(String, String)>,
}

impl EnvFile {
    // Later assignments win, as when the file is sourced by a shell.
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .iter()
            .rev()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
    }
}

fn read_env_file(path: &Path) -> Result<EnvFile> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_env_file(&text))
}

fn parse_env_file(text: &str) -> EnvFile {
    let mut file = EnvFile::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        if let Some((k, v)) = line.split_once('=') {
            let k = k.trim();
            if k.is_empty() {
                continue;
            }
            file.entries
                .push((k.to_string(), strip_quotes(v.trim()).to_string()));
        }
    }

    file
}

fn env_file_candidates() -> Vec<PathBuf> {
    // 1) RDP_ENV_FILE (explicit)
    // 2) ./.env
    // 3) ~/.rdp.env
    if let Ok(p) = std::env::var("RDP_ENV_FILE") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".env"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".rdp.env"));
    }
    v
}
