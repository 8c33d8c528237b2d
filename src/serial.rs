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

use std::io::{Read, Write};
use std::time::Duration;
use serialport::{SerialPort as SerialPortTrait, DataBits, Parity, StopBits};
use crate::config::SerialSettings;
use crate::transport::{Connector, Link, TransportError};

// ============================================================================
// Line Settings
// ============================================================================

pub fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

pub fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

pub fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

// ============================================================================
// Real Serial Port Implementation
// ============================================================================

/// Link over a UART, wrapping the serialport crate
pub struct RealSerialPort {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialPort {
    pub fn open(settings: &SerialSettings) -> Result<Self, TransportError> {
        let invalid = |msg: String| TransportError::Open {
            port: settings.port.clone(),
            source: serialport::Error::new(serialport::ErrorKind::InvalidInput, msg),
        };
        let data_bits = parse_data_bits(settings.data_bits).map_err(invalid)?;
        let parity = parse_parity(&settings.parity).map_err(invalid)?;
        let stop_bits = parse_stop_bits(settings.stop_bits).map_err(invalid)?;

        tracing::debug!(
            port = %settings.port,
            baud = settings.baud,
            ?data_bits,
            ?parity,
            ?stop_bits,
            "opening serial port"
        );

        // The port timeout bounds writes as well as reads
        let port = serialport::new(&settings.port, settings.baud)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(settings.timeout_ms))
            .open()
            .map_err(|source| TransportError::Open {
                port: settings.port.clone(),
                source,
            })?;

        Ok(RealSerialPort { port })
    }
}

impl Link for RealSerialPort {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        self.port.set_timeout(timeout)
            .map_err(std::io::Error::other)?;
        self.port.read(buf)
    }
}

// ============================================================================
// Connector
// ============================================================================

pub struct SerialConnector {
    settings: SerialSettings,
}

impl SerialConnector {
    pub fn new(settings: SerialSettings) -> Self {
        SerialConnector { settings }
    }
}

impl Connector for SerialConnector {
    fn connect(&mut self) -> Result<Box<dyn Link>, TransportError> {
        Ok(Box::new(RealSerialPort::open(&self.settings)?))
    }

    fn endpoint(&self) -> String {
        format!("{}@{}", self.settings.port, self.settings.baud)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_settings() {
        assert_eq!(parse_data_bits(8), Ok(DataBits::Eight));
        assert_eq!(parse_data_bits(5), Ok(DataBits::Five));
        assert!(parse_data_bits(9).is_err());

        assert_eq!(parse_parity("None"), Ok(Parity::None));
        assert_eq!(parse_parity("EVEN"), Ok(Parity::Even));
        assert!(parse_parity("mark").is_err());

        assert_eq!(parse_stop_bits(2), Ok(StopBits::Two));
        assert!(parse_stop_bits(0).is_err());
    }

    #[test]
    fn test_invalid_settings_fail_before_open() {
        let settings = SerialSettings {
            parity: "sideways".to_string(),
            ..SerialSettings::default()
        };
        match RealSerialPort::open(&settings) {
            Err(TransportError::Open { port, source }) => {
                assert_eq!(port, settings.port);
                assert_eq!(source.kind(), serialport::ErrorKind::InvalidInput);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("open should fail"),
        }
    }

    #[test]
    fn test_endpoint() {
        let connector = SerialConnector::new(SerialSettings::default());
        assert_eq!(connector.endpoint(), "/dev/ttyUSB0@115200");
    }
}
