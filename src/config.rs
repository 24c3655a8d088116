//! Loading of the Reg.ru credentials file.
//!
//! The file uses the same flat `key = value` layout as certbot credential INI files:
//!
//! ```text
//! # Reg.ru account
//! dns_regru_username = user@example.com
//! dns_regru_password = "secret"
//! ```
//!
//! On unix, the file must not be accessible by anyone except its owner.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use thiserror::Error;

/// Prefix certbot puts in front of every key belonging to this plugin
pub const KEY_PREFIX: &str = "dns_regru_";
/// Default location of the credentials file
pub const DEFAULT_CREDENTIALS_PATH: &str = "/etc/letsencrypt/regru.ini";

const USERNAME_KEY: &str = "username";
const PASSWORD_KEY: &str = "password";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read credentials file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error(
        "credentials file {} is accessible by other users (mode {mode:o}), restrict it with `chmod 600`",
        path.display()
    )]
    Permissions { path: PathBuf, mode: u32 },
    #[error("malformed line {line} in credentials file, expected `key = value`")]
    Malformed { line: usize },
    #[error("missing required credential `{key}`")]
    MissingKey { key: String },
}

/// Login data for the Reg.ru API. Loaded once and never written back.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Parse credentials from the contents of a credentials file.
    ///
    /// Both the plugin-prefixed keys (`dns_regru_username`) and the bare keys (`username`) are accepted,
    /// the prefixed form wins if both are present.
    pub fn parse(contents: &str) -> Result<Credentials, ConfigError> {
        let mut values: HashMap<&str, &str> = HashMap::new();

        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with(';')
                || (line.starts_with('[') && line.ends_with(']'))
            {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or(ConfigError::Malformed { line: idx + 1 })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Malformed { line: idx + 1 });
            }
            trace!("Read credentials key {}", key);
            values.insert(key, parse_value(value.trim()));
        }

        let username = lookup(&values, USERNAME_KEY)?;
        let password = lookup(&values, PASSWORD_KEY)?;

        for key in values.keys() {
            if !is_known_key(key) {
                debug!("Ignoring unknown credentials key {}", key);
            }
        }

        Ok(Credentials { username, password })
    }
}

/// Load and validate the credentials file at `path`.
///
/// Permissions are checked before the file is read, so a leaky file is rejected even if its contents are invalid.
pub fn load_credentials(path: &Path) -> Result<Credentials, ConfigError> {
    check_permissions(path)?;
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    let credentials = Credentials::parse(&contents)?;
    debug!(
        "Loaded credentials for user {} from {}",
        credentials.username,
        path.display()
    );
    Ok(credentials)
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)
        .map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?
        .permissions()
        .mode();
    if mode & 0o077 != 0 {
        return Err(ConfigError::Permissions {
            path: path.to_owned(),
            mode: mode & 0o777,
        });
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

fn lookup(values: &HashMap<&str, &str>, key: &str) -> Result<String, ConfigError> {
    let prefixed = format!("{}{}", KEY_PREFIX, key);
    values
        .get(prefixed.as_str())
        .filter(|v| !v.is_empty())
        .or_else(|| values.get(key).filter(|v| !v.is_empty()))
        .map(|v| v.to_string())
        .ok_or(ConfigError::MissingKey { key: prefixed })
}

fn is_known_key(key: &str) -> bool {
    let bare = key.strip_prefix(KEY_PREFIX).unwrap_or(key);
    bare == USERNAME_KEY || bare == PASSWORD_KEY
}

// Quoted values end at their closing quote. Unquoted ones end where a `#` comment starts,
// which needs whitespace in front so that `#` can still appear inside a value.
fn parse_value(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(end) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.find(quote).map(|end| &rest[..end]))
        {
            return end;
        }
    }
    let end = value
        .char_indices()
        .find(|&(i, c)| c == '#' && (i == 0 || value[..i].ends_with(char::is_whitespace)))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].trim_end()
}
