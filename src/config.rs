//! `network_config.txt` – where the room server lives.
//!
//! Plain `key=value` lines:
//!
//! ```text
//! host=127.0.0.1
//! port=8000
//! ```
//!
//! Values follow INI rules: surrounding quotes are stripped and backslash
//! escapes such as `\t` are expanded.
//!
//! The file is created with the defaults on first run. A broken file never
//! stops the client; it falls back to the defaults and says so.

use std::fs;
use std::io;
use std::path::Path;

use ::config::{Config, ConfigError, File, FileFormat};
use log::{info, warn};
use serde::Serialize;

use crate::transport::TcpTransport;

pub const DEFAULT_CONFIG_FILE: &str = "network_config.txt";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl NetworkConfig {
    /// Read `path`, writing the defaults there first if it does not exist.
    pub fn load_or_create(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            match fs::write(path, Self::default().render()) {
                Ok(()) => info!("wrote default network config to {}", path.display()),
                Err(e) => warn!("could not create {}: {}", path.display(), e),
            }
        }

        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("bad network config {}: {}; using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    fn load(path: &Path) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_text(&text)?)
    }

    /// Layer the usable lines of `text` over the defaults.
    pub fn from_text(text: &str) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .add_source(File::from_str(&sanitize(text), FileFormat::Ini))
            .build()?;

        let host = cfg.get_string("host")?;
        let port = cfg.get_int("port")?;
        let port = u16::try_from(port)
            .map_err(|_| ConfigError::Message(format!("port {} out of range", port)))?;
        Ok(Self { host, port })
    }

    /// File contents for this config.
    pub fn render(&self) -> String {
        format!("host={}\nport={}\n", self.host, self.port)
    }

    pub fn transport(&self) -> TcpTransport {
        TcpTransport::new(self.host.clone(), self.port)
    }
}

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Keep only well-formed `key=value` lines.
fn sanitize(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('[') || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() {
            continue;
        }
        if key.eq_ignore_ascii_case("port") && value.parse::<u16>().is_err() {
            warn!("ignoring invalid port {:?}", value);
            continue;
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}
