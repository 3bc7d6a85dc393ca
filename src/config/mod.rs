use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub parking: ParkingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_admin_token")]
    pub admin_token: String,
    /// Email for the bootstrap admin account (created on startup if missing)
    pub admin_email: Option<String>,
    /// Password for the bootstrap admin account
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_token: default_admin_token(),
            admin_email: None,
            admin_password: None,
        }
    }
}

fn default_admin_token() -> String {
    // Generate a random token if not provided
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParkingConfig {
    /// Total number of spaces in the lot
    #[serde(default = "default_total_spaces")]
    pub total_spaces: u32,
    /// Spaces per section; section letters advance every `section_size` slots
    #[serde(default = "default_section_size")]
    pub section_size: u32,
    /// Charge per started hour, minimum one hour per session
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            total_spaces: default_total_spaces(),
            section_size: default_section_size(),
            hourly_rate: default_hourly_rate(),
        }
    }
}

fn default_total_spaces() -> u32 {
    300
}

fn default_section_size() -> u32 {
    20
}

fn default_hourly_rate() -> f64 {
    5.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse configuration file")?
        } else {
            info!("No config file found, using defaults");
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            parking: ParkingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.parking.total_spaces > 0,
            "parking.total_spaces must be at least 1"
        );
        ensure!(
            self.parking.section_size > 0,
            "parking.section_size must be at least 1"
        );
        // Section letters run A..Z
        ensure!(
            self.parking.total_spaces <= 26 * self.parking.section_size,
            "parking.total_spaces must fit in 26 sections of {} spaces",
            self.parking.section_size
        );
        ensure!(
            self.parking.hourly_rate >= 0.0,
            "parking.hourly_rate must not be negative"
        );
        Ok(())
    }
}
