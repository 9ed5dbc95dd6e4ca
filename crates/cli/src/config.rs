use common::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const APP_NAME: &str = "questlog";

/// Environment variable that overrides the configured JWT secret
pub const JWT_SECRET_ENV: &str = "QUESTLOG_JWT_SECRET";

const MASK: &str = "********";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl() -> i64 {
    accounts::token::DEFAULT_TTL_HOURS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: default_token_ttl(),
        }
    }
}

impl AuthConfig {
    /// The signing secret, preferring the environment over the file
    pub fn secret(&self) -> Option<String> {
        std::env::var(JWT_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.jwt_secret.clone())
    }
}

/// Database configuration - re-exported from db crate
pub use db::DatabaseConfig;

/// A fresh random secret for signing session tokens
pub fn generate_secret() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

pub fn get_config_dir() -> Result<PathBuf> {
    // QUESTLOG_CONFIG_PATH overrides the default config directory
    if let Ok(path) = std::env::var("QUESTLOG_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| Error::Other("Could not determine config directory".to_string()))
}

pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn get_db_path(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.database.path {
        return Ok(path.clone());
    }
    Ok(get_config_dir()?.join("db"))
}

pub fn parse_config(contents: &str) -> Result<Config> {
    Ok(toml::from_str(contents)?)
}

pub fn load_config() -> Result<Config> {
    let config_file = get_config_file()?;

    if !config_file.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(&config_file)?;
    parse_config(&contents)
}

pub fn save_config(config: &Config) -> Result<()> {
    let config_file = get_config_file()?;
    let config_dir = get_config_dir()?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&config_dir, perms)?;
        }
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(&config_file, contents)?;

    // The file holds the token secret
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&config_file, perms)?;
    }

    Ok(())
}

/// Keys accepted by `config get` and `config set`
pub const CONFIG_KEYS: [&str; 9] = [
    "server.host",
    "server.port",
    "database.path",
    "database.url",
    "database.namespace",
    "database.username",
    "database.password",
    "auth.jwt_secret",
    "auth.token_ttl_hours",
];

pub fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "server.host" => Some(config.server.host.clone()),
        "server.port" => Some(config.server.port.to_string()),
        "database.path" => config.database.path.as_ref().map(|p| p.display().to_string()),
        "database.url" => config.database.url.clone(),
        "database.namespace" => config.database.namespace.clone(),
        "database.username" => config.database.username.clone(),
        // Secrets are never echoed
        "database.password" => config.database.password.as_ref().map(|_| MASK.to_string()),
        "auth.jwt_secret" => config.auth.jwt_secret.as_ref().map(|_| MASK.to_string()),
        "auth.token_ttl_hours" => Some(config.auth.token_ttl_hours.to_string()),
        _ => None,
    }
}

pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server.host" => config.server.host = value.to_string(),
        "server.port" => {
            config.server.port = value
                .parse()
                .map_err(|_| Error::Other(format!("Invalid port: {}", value)))?
        }
        "database.path" => config.database.path = Some(PathBuf::from(value)),
        "database.url" => config.database.url = Some(value.to_string()),
        "database.namespace" => config.database.namespace = Some(value.to_string()),
        "database.username" => config.database.username = Some(value.to_string()),
        "database.password" => config.database.password = Some(value.to_string()),
        "auth.jwt_secret" => config.auth.jwt_secret = Some(value.to_string()),
        "auth.token_ttl_hours" => {
            config.auth.token_ttl_hours = value
                .parse()
                .ok()
                .filter(|h: &i64| *h > 0)
                .ok_or_else(|| Error::Other(format!("Invalid token lifetime: {}", value)))?
        }
        _ => return Err(Error::Other(format!("Unknown config key: {}", key))),
    }
    Ok(())
}
