//! Configuration management

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default ignore list consulted by the hotplug path
pub const DEFAULT_IGNORE_LIST: &str = "/etc/libvirt-helper/usb-ignorelist.conf";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub usb: UsbSettings,
    #[serde(default)]
    pub hotplug: HotplugSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default = "GeneralSettings::default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl GeneralSettings {
    fn default_log_level() -> String {
        "warn".to_string()
    }
}

/// Transport used to reach the libvirt daemon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Native bindings, one connection for the whole run
    #[default]
    Libvirt,
    /// The `virsh` client, one process per call
    Virsh,
}

/// How to reach the libvirt daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// libvirt connection URI
    #[serde(default = "ConnectionSettings::default_uri")]
    pub uri: String,
    #[serde(default)]
    pub backend: Backend,
    /// virsh binary used by the `virsh` backend
    #[serde(default = "ConnectionSettings::default_virsh")]
    pub virsh: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            backend: Backend::default(),
            virsh: Self::default_virsh(),
        }
    }
}

impl ConnectionSettings {
    fn default_uri() -> String {
        "qemu:///system".to_string()
    }

    fn default_virsh() -> String {
        "virsh".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Command printing one `Bus .. Device .. ID vvvv:pppp tag` line per device
    #[serde(default = "UsbSettings::default_list_command")]
    pub list_command: String,
    /// Devices never auto-attached by the hotplug path
    #[serde(default = "UsbSettings::default_ignore_list")]
    pub ignore_list: PathBuf,
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            list_command: Self::default_list_command(),
            ignore_list: Self::default_ignore_list(),
        }
    }
}

impl UsbSettings {
    fn default_list_command() -> String {
        "lsusb".to_string()
    }

    fn default_ignore_list() -> PathBuf {
        PathBuf::from(DEFAULT_IGNORE_LIST)
    }

    /// Ignore list path with `~` expanded
    pub fn ignore_list_path(&self) -> PathBuf {
        expand_path(&self.ignore_list)
    }
}

/// Hotplug (udev) settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HotplugSettings {
    /// Domain receiving hotplugged devices; the first running domain when unset
    #[serde(default)]
    pub domain: Option<String>,
}

impl Config {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            expand_path(&p)
        } else {
            // Try standard locations in order
            let candidates = vec![Self::default_path(), PathBuf::from("/etc/virt-usb/config.toml")];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::debug!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {:#}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("virt-usb").join("config.toml")
        } else {
            PathBuf::from(".config/virt-usb/config.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.connection.uri.trim().is_empty() {
            return Err(anyhow!("Connection URI must not be empty"));
        }

        if self.connection.backend == Backend::Virsh && self.connection.virsh.trim().is_empty() {
            return Err(anyhow!("virsh command must not be empty"));
        }

        if self.usb.list_command.trim().is_empty() {
            return Err(anyhow!("USB list command must not be empty"));
        }

        if let Some(domain) = &self.hotplug.domain {
            if domain.trim().is_empty() {
                return Err(anyhow!("Hotplug domain must not be empty when set"));
            }
        }

        Ok(())
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}
