use std::path::{Path, PathBuf};
use std::str::FromStr;

use flashdeck_core::model::{ParseIdError, SessionUser, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::GlobalArgs;

pub const DEFAULT_DB_URL: &str = "sqlite://flashdeck.sqlite3";
pub const LOCAL_CONFIG_FILE: &str = ".flashdeck.toml";
const DEFAULT_EMAIL: &str = "local";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid database url: {raw}")]
    InvalidDbUrl { raw: String },
    #[error("invalid user id {raw:?}: {source}")]
    InvalidUserId {
        raw: String,
        #[source]
        source: ParseIdError,
    },
    #[error("could not read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// On-disk TOML configuration. Every field is optional so partial files work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: Option<DatabaseConfig>,
    pub user: Option<UserConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: Option<String>,
    pub email: Option<String>,
}

/// Load the explicit config file, or `.flashdeck.toml` from the working directory if present.
///
/// An explicitly named file must exist; the implicit one is optional.
pub fn load(explicit: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    match explicit {
        Some(path) => read(path),
        None => {
            let path = Path::new(LOCAL_CONFIG_FILE);
            if path.exists() {
                read(path)
            } else {
                Ok(ConfigFile::default())
            }
        }
    }
}

fn read(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `overlay` values take precedence over `base`.
#[must_use]
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        database: Some(DatabaseConfig {
            url: overlay
                .database
                .and_then(|d| d.url)
                .or_else(|| base.database.and_then(|d| d.url)),
        }),
        user: Some(UserConfig {
            id: overlay
                .user
                .as_ref()
                .and_then(|u| u.id.clone())
                .or_else(|| base.user.as_ref().and_then(|u| u.id.clone())),
            email: overlay
                .user
                .and_then(|u| u.email)
                .or_else(|| base.user.and_then(|u| u.email)),
        }),
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_url: String,
    /// `None` means nobody is signed in.
    pub user: Option<SessionUser>,
}

impl Settings {
    /// Flags and environment override the file, which overrides built-in defaults.
    pub fn resolve(args: &GlobalArgs, file: ConfigFile) -> Result<Self, ConfigError> {
        let from_args = ConfigFile {
            database: Some(DatabaseConfig {
                url: args.db.clone(),
            }),
            user: Some(UserConfig {
                id: args.user_id.clone(),
                email: args.email.clone(),
            }),
        };
        let merged = merge(file, from_args);

        let raw_url = merged
            .database
            .and_then(|d| d.url)
            .unwrap_or_else(|| DEFAULT_DB_URL.to_owned());
        if raw_url.trim().is_empty() {
            return Err(ConfigError::InvalidDbUrl { raw: raw_url });
        }

        let user_config = merged.user.unwrap_or_default();
        let user = match user_config.id.filter(|raw| !raw.trim().is_empty()) {
            Some(raw) => {
                let id = UserId::from_str(&raw)
                    .map_err(|source| ConfigError::InvalidUserId { raw, source })?;
                let email = user_config
                    .email
                    .unwrap_or_else(|| DEFAULT_EMAIL.to_owned());
                Some(SessionUser::new(id, email))
            }
            None => None,
        };

        Ok(Self {
            db_url: normalize_sqlite_url(&raw_url),
            user,
        })
    }
}

fn is_in_memory(url: &str) -> bool {
    url == "sqlite::memory:" || url.contains("mode=memory")
}

/// Turn a bare path or relative `sqlite:` url into an absolute `sqlite://` url.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_in_memory(trimmed) || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directory if they do not exist yet.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), ConfigError> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl {
            raw: db_url.to_owned(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl {
            raw: db_url.to_owned(),
        });
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}
