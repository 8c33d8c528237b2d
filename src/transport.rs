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

use std::io::ErrorKind;
use std::time::Duration;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    #[error("write timed out")]
    TimedOut,

    #[error("connection closed by peer")]
    Closed,

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Map a raw write/read failure onto the transport taxonomy.
    pub fn classify(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::TimedOut,
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::WriteZero => TransportError::Closed,
            _ => TransportError::Io(err),
        }
    }
}

// ============================================================================
// Link Trait
// ============================================================================

/// A blocking byte stream to the board (TCP socket or serial port).
pub trait Link: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;
}

/// Opens fresh links to one endpoint.
pub trait Connector {
    fn connect(&mut self) -> Result<Box<dyn Link>, TransportError>;

    /// Human-readable endpoint, for logs.
    fn endpoint(&self) -> String;
}

// ============================================================================
// Mock Link for Testing
// ============================================================================

#[cfg(test)]
pub use mock::{MockConnector, MockLink};


// ============================================================================
// Tests
// ============================================================================
