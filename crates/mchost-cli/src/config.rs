//! YAML configuration file for the `mchost` binary.
//!
//! ```yaml
//! serial:
//!   path: /dev/ttyACM0
//!   baud_rate: 115200
//! companion:
//!   command_timeout_ms: 5000
//!   message_chunk_limit: 120
//! ```
//!
//! Every section and field is optional. Command-line flags override the file.

use std::path::Path;

use mchost_client::{CompanionConfig, SerialConfig, TcpConfig};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub serial: Option<SerialConfig>,
    pub tcp: Option<TcpConfig>,
    pub companion: CompanionConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, CliError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

/// The link to open, after merging the file with the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    Serial(SerialConfig),
    Tcp(TcpConfig),
}

/// Command-line overrides for [`resolve_link`].
#[derive(Debug, Clone, Default)]
pub struct LinkOverrides {
    pub serial: Option<String>,
    pub tcp: Option<String>,
    pub baud: Option<u32>,
}

/// Pick the link: a flag wins over the file, and serial wins over TCP when
/// the file names both.
pub fn resolve_link(file: &FileConfig, overrides: &LinkOverrides) -> Result<Link, CliError> {
    if let Some(path) = &overrides.serial {
        let mut serial = file.serial.clone().unwrap_or_default();
        serial.path = path.clone();
        if let Some(baud) = overrides.baud {
            serial.baud_rate = baud;
        }
        return Ok(Link::Serial(serial));
    }
    if let Some(address) = &overrides.tcp {
        let mut tcp = file.tcp.clone().unwrap_or_default();
        tcp.address = address.clone();
        return Ok(Link::Tcp(tcp));
    }
    match (&file.serial, &file.tcp) {
        (Some(serial), _) if !serial.path.is_empty() => {
            let mut serial = serial.clone();
            if let Some(baud) = overrides.baud {
                serial.baud_rate = baud;
            }
            Ok(Link::Serial(serial))
        }
        (_, Some(tcp)) if !tcp.address.is_empty() => Ok(Link::Tcp(tcp.clone())),
        _ => Err(CliError::NoLink),
    }
}
