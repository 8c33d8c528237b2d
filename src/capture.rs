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

//! Capturing result lines printed by the board.
//!
//! Each non-empty line replaces the contents of the output file, so the
//! file always holds the latest result.

use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::transport::{Link, TransportError};

const READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Read lines from `link` until `max_lines` non-empty lines were captured
/// (forever when `None`). Returns the number of lines captured.
pub fn capture_lines(link: &mut dyn Link, output: &Path, max_lines: Option<usize>) -> Result<usize, CaptureError> {
    let mut pending: Vec<u8> = Vec::new();
    let mut captured = 0;
    let mut buf = [0u8; 256];

    while max_lines.is_none_or(|max| captured < max) {
        let n = match link.read_timeout(&mut buf, READ_TIMEOUT) {
            Ok(n) => n,
            Err(e) => match TransportError::classify(e) {
                // Idle line, keep listening
                TransportError::TimedOut => continue,
                other => return Err(other.into()),
            },
        };
        if n == 0 {
            return Err(TransportError::Closed.into());
        }
        pending.extend_from_slice(&buf[..n]);

        while let Some(end) = pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            tracing::info!(line, "received");
            std::fs::write(output, format!("{}\n", line)).map_err(|source| CaptureError::Write {
                path: output.to_path_buf(),
                source,
            })?;
            tracing::debug!(path = %output.display(), "data written");

            captured += 1;
            if max_lines.is_some_and(|max| captured >= max) {
                break;
            }
        }
    }

    Ok(captured)
}

// ============================================================================
// Tests
// ============================================================================
