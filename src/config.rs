// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Configuration.
//!
//! Resolution order: command line → environment variables → config file → defaults.
//!
//! Config file location:
//!   1. `--config <PATH>`
//!   2. $BOARDLINK_CONFIG
//!   3. $XDG_CONFIG_HOME/boardlink/config.toml
//!   4. ~/.config/boardlink/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pacing::PacingConfig;
use crate::protocol::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Ethernet: separate file and command ports
    Tcp,
    /// UART: one channel, commands are framed
    Serial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportKind,
    pub board: BoardSettings,
    pub serial: SerialSettings,
    pub transfer: TransferSettings,
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub host: String,
    pub file_port: u16,
    pub command_port: u16,
    pub connect_timeout_ms: u64,
    /// 0 = block until the OS gives up.
    pub write_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud: u32,
    pub data_bits: u8,
    pub parity: String,
    pub stop_bits: u8,
    /// Applies to reads and writes.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Relative file names are looked up here when not found as given.
    pub data_dir: PathBuf,
    pub sample_width: usize,
    pub samples_per_chunk: usize,
    /// Keep one connection for every chunk instead of reconnecting per chunk.
    pub reuse_connection: bool,
    pub chunk_gap_ms: u64,
    /// Single files and commands.
    pub pacing: PacingConfig,
    /// Frames of a chunked transfer.
    pub chunk_pacing: PacingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub output: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportKind::Tcp,
            board: BoardSettings::default(),
            serial: SerialSettings::default(),
            transfer: TransferSettings::default(),
            capture: CaptureSettings::default(),
        }
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_BOARD_HOST.to_string(),
            file_port: DEFAULT_FILE_PORT,
            command_port: DEFAULT_COMMAND_PORT,
            connect_timeout_ms: 5_000,
            write_timeout_ms: 10_000,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERIAL_PORT.to_string(),
            baud: DEFAULT_BAUD,
            data_bits: 8,
            parity: "none".to_string(),
            stop_bits: 1,
            timeout_ms: 1_000,
        }
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data").join("training_data"),
            sample_width: DEFAULT_SAMPLE_WIDTH,
            samples_per_chunk: DEFAULT_SAMPLES_PER_CHUNK,
            reuse_connection: false,
            chunk_gap_ms: DEFAULT_CHUNK_GAP_MS,
            pacing: PacingConfig::fixed_ms(DEFAULT_PACING_MS),
            chunk_pacing: PacingConfig::fixed_ms(DEFAULT_CHUNK_PACING_MS),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("data_output.csv"),
        }
    }
}

impl BoardSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        match self.write_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("boardlink")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl Config {
    /// Load config: env vars → file → defaults.
    ///
    /// An explicit path must exist; the default location may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::file_path(),
        };

        let mut config = if explicit.is_some() || path.exists() {
            Self::from_file(&path)?
        } else {
            Config::default()
        };
        config.apply_env_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        let config = toml::from_str(&text)
            .map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("BOARDLINK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply BOARDLINK_* overrides, reading variables through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var, value })
        }

        if let Some(v) = lookup("BOARDLINK_TRANSPORT") {
            self.transport = match v.to_lowercase().as_str() {
                "tcp" => TransportKind::Tcp,
                "serial" => TransportKind::Serial,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "BOARDLINK_TRANSPORT",
                        value: v,
                    });
                }
            };
        }
        if let Some(v) = lookup("BOARDLINK_BOARD__HOST") {
            self.board.host = v;
        }
        if let Some(v) = lookup("BOARDLINK_BOARD__FILE_PORT") {
            self.board.file_port = parsed("BOARDLINK_BOARD__FILE_PORT", v)?;
        }
        if let Some(v) = lookup("BOARDLINK_BOARD__COMMAND_PORT") {
            self.board.command_port = parsed("BOARDLINK_BOARD__COMMAND_PORT", v)?;
        }
        if let Some(v) = lookup("BOARDLINK_SERIAL__PORT") {
            self.serial.port = v;
        }
        if let Some(v) = lookup("BOARDLINK_SERIAL__BAUD") {
            self.serial.baud = parsed("BOARDLINK_SERIAL__BAUD", v)?;
        }
        if let Some(v) = lookup("BOARDLINK_TRANSFER__DATA_DIR") {
            self.transfer.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("BOARDLINK_TRANSFER__SAMPLE_WIDTH") {
            self.transfer.sample_width = parsed("BOARDLINK_TRANSFER__SAMPLE_WIDTH", v)?;
        }
        Ok(())
    }
}
