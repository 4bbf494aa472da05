//! Typed view of `peercall.conf` with every default filled in.
use std::{
    net::IpAddr,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use crate::config::{Config, ConfigError};
use crate::media::MediaConstraints;
use crate::negotiation::UdpLinkConfig;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "PEERCALL_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "peercall.conf";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaSource {
    #[default]
    TestPattern,
    Camera,
}

impl FromStr for MediaSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "test" | "pattern" => Ok(Self::TestPattern),
            "camera" => Ok(Self::Camera),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_addr: String,
    pub listen_addr: String,
    pub display_name: String,
    pub media_source: MediaSource,
    pub camera_device: i32,
    pub constraints: MediaConstraints,
    pub link: UdpLinkConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            display_name: default_display_name(),
            media_source: MediaSource::default(),
            camera_device: 0,
            constraints: MediaConstraints::default(),
            link: UdpLinkConfig::default(),
        }
    }
}

fn default_display_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "Anonymous".to_string())
}

impl Settings {
    /// Resolves every key, using defaults for the missing ones.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] for a present value that does not parse.
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let d = Self::default();

        let advertise_ip = match cfg.get_non_empty("Link", "advertise_ip") {
            None => None,
            Some(_) => Some(cfg.get_parsed::<IpAddr>("Link", "advertise_ip", d.link.bind_ip)?),
        };
        let idle_ms = cfg.get_parsed(
            "Link",
            "idle_timeout_ms",
            u64::try_from(d.link.idle_timeout.as_millis()).unwrap_or(5_000),
        )?;
        let fps = cfg.get_parsed("Media", "fps", d.constraints.fps)?;

        Ok(Self {
            server_addr: cfg
                .get_non_empty_or_default("Signaling", "server_addr", &d.server_addr)
                .to_string(),
            listen_addr: cfg
                .get_non_empty_or_default("Signaling", "listen_addr", &d.listen_addr)
                .to_string(),
            display_name: cfg
                .get_non_empty_or_default("Client", "display_name", &d.display_name)
                .to_string(),
            media_source: cfg.get_parsed("Media", "source", d.media_source)?,
            camera_device: cfg.get_parsed("Media", "device", d.camera_device)?,
            constraints: MediaConstraints {
                video: cfg.get_parsed("Media", "video", d.constraints.video)?,
                audio: cfg.get_parsed("Media", "audio", d.constraints.audio)?,
                width: cfg.get_parsed("Media", "width", d.constraints.width)?,
                height: cfg.get_parsed("Media", "height", d.constraints.height)?,
                fps,
                ..d.constraints
            },
            link: UdpLinkConfig {
                bind_ip: cfg.get_parsed("Link", "bind_ip", d.link.bind_ip)?,
                advertise_ip,
                idle_timeout: Duration::from_millis(idle_ms),
                fps,
                ..d.link
            },
        })
    }
}

/// `$PEERCALL_CONFIG`, or `peercall.conf` in the working directory.
#[must_use]
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

/// Loads the config file; a missing or unreadable file means all defaults.
#[must_use]
pub fn load_config() -> (Config, Option<ConfigError>) {
    match Config::load(config_path()) {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::empty(), Some(e)),
    }
}
