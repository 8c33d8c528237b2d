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
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;
use crate::transport::{Connector, Link, TransportError};

// ============================================================================
// TCP Link
// ============================================================================

pub struct TcpLink {
    stream: TcpStream,
}

impl TcpLink {
    pub fn new(stream: TcpStream, write_timeout: Option<Duration>) -> std::io::Result<Self> {
        stream.set_write_timeout(write_timeout)?;
        stream.set_nodelay(true)?;
        Ok(TcpLink { stream })
    }
}

impl Link for TcpLink {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(buf)?;
        self.stream.flush()
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        // A zero duration is rejected by set_read_timeout
        self.stream.set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;
        self.stream.read(buf)
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

// ============================================================================
// Connector
// ============================================================================

pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
    write_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(host: &str, port: u16, connect_timeout: Duration, write_timeout: Option<Duration>) -> Self {
        TcpConnector {
            host: host.to_string(),
            port,
            connect_timeout,
            write_timeout,
        }
    }

    fn open(&self) -> std::io::Result<TcpStream> {
        let mut last_err = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
        }))
    }
}

impl Connector for TcpConnector {
    fn connect(&mut self) -> Result<Box<dyn Link>, TransportError> {
        let connect_err = |source| TransportError::Connect {
            addr: self.endpoint(),
            source,
        };
        let stream = self.open().map_err(connect_err)?;
        let link = TcpLink::new(stream, self.write_timeout).map_err(connect_err)?;
        tracing::debug!(endpoint = %self.endpoint(), "connected");
        Ok(Box::new(link))
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Tests
// ============================================================================
