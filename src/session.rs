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

//! Connection lifecycle around the senders.
//!
//! Every operation opens its own connection and closes it when done; nothing
//! survives between operations.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::capture::{capture_lines, CaptureError};
use crate::chunk::{partition, ChunkLayout, ChunkReader};
use crate::config::{Config, TransportKind};
use crate::frame::{self, DecodeError, FrameId};
use crate::protocol::*;
use crate::sender::{ChunkOptions, FrameSender, SendError, TransferSummary};
use crate::serial::SerialConnector;
use crate::tcp::TcpConnector;
use crate::transport::Connector;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not a frame capture: {source}")]
    Decode {
        path: PathBuf,
        source: DecodeError,
    },

    #[error(transparent)]
    Send(#[from] SendError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("{0}")]
    Unsupported(String),
}

// ============================================================================
// Operation Parameters
// ============================================================================

/// Groups of weight matrices that are loaded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MatrixSet {
    /// w_in.dat
    Win,
    /// w_x.dat
    Wx,
    /// w_out.dat
    Wout,
    /// w_in.dat and w_x.dat, when w_out is trained on the board
    Reservoir,
    /// w_in.dat, w_x.dat and w_out.dat
    All,
}

impl MatrixSet {
    /// (file name, frame id) pairs in send order.
    pub fn files(self) -> &'static [(&'static str, &'static str)] {
        match self {
            MatrixSet::Win => &[(WIN_FILE, ID_WIN)],
            MatrixSet::Wx => &[(WX_FILE, ID_WX)],
            MatrixSet::Wout => &[(WOUT_FILE, ID_WOUT)],
            MatrixSet::Reservoir => &[(WIN_FILE, ID_WIN), (WX_FILE, ID_WX)],
            MatrixSet::All => &[(WIN_FILE, ID_WIN), (WX_FILE, ID_WX), (WOUT_FILE, ID_WOUT)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ControlCommand {
    /// Reset every array on the board
    Reset,
    /// Reset only the input samples
    Rdi,
    /// Turn online training on
    TrnOn,
    /// Turn online training off
    TrnOff,
    /// Run the computation
    Esn,
}

impl ControlCommand {
    pub fn token(self) -> &'static str {
        match self {
            ControlCommand::Reset => CMD_RESET,
            ControlCommand::Rdi => CMD_RDI,
            ControlCommand::TrnOn => CMD_TRN_ON,
            ControlCommand::TrnOff => CMD_TRN_OFF,
            ControlCommand::Esn => CMD_ESN,
        }
    }

    /// Identifier used when the command has to travel as a frame.
    pub fn frame_id(self) -> Option<&'static str> {
        match self {
            ControlCommand::Reset => Some(ID_CMD_RST),
            ControlCommand::Rdi => Some(ID_CMD_RDI),
            ControlCommand::Esn => Some(ID_CMD_ESN),
            ControlCommand::TrnOn | ControlCommand::TrnOff => None,
        }
    }
}

/// One frame found in a capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub id: FrameId,
    pub size: usize,
}

// ============================================================================
// Session
// ============================================================================

pub struct Session {
    config: Config,
    files: Box<dyn Connector>,
    // None on single-channel links
    commands: Option<Box<dyn Connector>>,
    sender: FrameSender,
    chunk_sender: FrameSender,
}

impl Session {
    /// Build connectors for the configured transport. Nothing is opened yet.
    pub fn open(config: Config) -> Self {
        let (files, commands): (Box<dyn Connector>, Option<Box<dyn Connector>>) = match config.transport {
            TransportKind::Tcp => {
                let board = &config.board;
                let connector = |port| {
                    Box::new(TcpConnector::new(
                        &board.host,
                        port,
                        board.connect_timeout(),
                        board.write_timeout(),
                    )) as Box<dyn Connector>
                };
                (connector(board.file_port), Some(connector(board.command_port)))
            }
            TransportKind::Serial => (Box::new(SerialConnector::new(config.serial.clone())), None),
        };

        let sender = FrameSender::new(config.transfer.pacing.build());
        let chunk_sender = FrameSender::new(config.transfer.chunk_pacing.build());
        Self::with_parts(config, files, commands, sender, chunk_sender)
    }

    pub fn with_parts(
        config: Config,
        files: Box<dyn Connector>,
        commands: Option<Box<dyn Connector>>,
        sender: FrameSender,
        chunk_sender: FrameSender,
    ) -> Self {
        Session {
            config,
            files,
            commands,
            sender,
            chunk_sender,
        }
    }

    /// Send one whole file as a single frame.
    pub fn send_file(&mut self, id: &str, path: &Path) -> Result<usize, SessionError> {
        let path = self.resolve(path);
        let payload = std::fs::read(&path).map_err(|source| SessionError::ReadFile {
            path: path.clone(),
            source,
        })?;
        // Reject a bad id before connecting
        FrameId::new(id).map_err(SendError::from)?;

        let mut link = self.files.connect().map_err(SendError::from)?;
        tracing::info!(endpoint = %self.files.endpoint(), "connected, sending header, file data and EOF marker");
        let written = self.sender.send_frame(link.as_mut(), id, &payload)?;
        tracing::info!(file = %path.display(), id, size = payload.len(), "sent file");
        Ok(written)
    }

    pub fn send_matrices(&mut self, set: MatrixSet) -> Result<(), SessionError> {
        for &(file, id) in set.files() {
            self.send_file(id, Path::new(file))?;
        }
        Ok(())
    }

    /// Golden `data_out` file the board checks its outputs against.
    pub fn send_golden(&mut self, path: &Path) -> Result<usize, SessionError> {
        self.send_file(ID_DATAOUT, path)
    }

    /// Stream a large sample file as consecutive `DATAIN__` chunks.
    pub fn stream_samples(&mut self, path: &Path, samples_per_chunk: usize) -> Result<TransferSummary, SessionError> {
        let layout = ChunkLayout::new(samples_per_chunk, self.config.transfer.sample_width).map_err(SendError::from)?;
        let path = self.resolve(path);
        let open = |path: &Path| {
            File::open(path).map(BufReader::new).map_err(|source| SessionError::ReadFile {
                path: path.to_path_buf(),
                source,
            })
        };

        let total_lines = count_lines(open(&path)?).map_err(|source| SessionError::ReadFile {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            file = %path.display(),
            values = total_lines,
            chunks = layout.chunk_count(total_lines),
            samples_per_chunk = layout.samples_per_chunk(),
            sample_width = layout.sample_width(),
            "streaming samples"
        );

        // The serial port stays open for the whole transfer
        let reuse_connection = match self.config.transport {
            TransportKind::Serial => true,
            TransportKind::Tcp => self.config.transfer.reuse_connection,
        };
        let options = ChunkOptions {
            reuse_connection,
            gap: Duration::from_millis(self.config.transfer.chunk_gap_ms),
        };

        let id = FrameId::new(ID_DATAIN).map_err(SendError::from)?;
        let chunks = ChunkReader::new(open(&path)?, layout);
        let summary = self.chunk_sender.send_chunks(self.files.as_mut(), id, chunks, options)?;
        tracing::info!(
            chunks = summary.chunks,
            bytes = summary.payload_bytes,
            connections = summary.connections,
            "transfer complete"
        );
        Ok(summary)
    }

    /// Raw token on the command port, or a command frame on single-channel links.
    pub fn send_command(&mut self, command: ControlCommand) -> Result<(), SessionError> {
        match self.commands.as_mut() {
            Some(connector) => {
                let mut link = connector.connect().map_err(SendError::from)?;
                self.sender.send_command(link.as_mut(), command.token())?;
            }
            None => {
                let id = command.frame_id().ok_or_else(|| {
                    SessionError::Unsupported(format!(
                        "{} has no framed form; it needs a separate command channel",
                        command.token()
                    ))
                })?;
                let mut link = self.files.connect().map_err(SendError::from)?;
                self.sender.send_frame(link.as_mut(), id, command.token().as_bytes())?;
            }
        }
        tracing::info!(command = command.token(), "sent command");
        Ok(())
    }

    /// Listen on the serial link and record result lines.
    pub fn capture(&mut self, output: &Path, max_lines: Option<usize>) -> Result<usize, SessionError> {
        if self.config.transport == TransportKind::Tcp {
            return Err(SessionError::Unsupported(
                "results are printed on the serial console; capture with --transport serial".to_string(),
            ));
        }
        let mut link = self.files.connect().map_err(SendError::from)?;
        tracing::info!(endpoint = %self.files.endpoint(), "listening");
        Ok(capture_lines(link.as_mut(), output, max_lines)?)
    }

    /// Write the frames `send_file` would send (or `stream_samples`, when
    /// `samples_per_chunk` is given) to `output` instead of the board.
    /// Returns the number of frames written.
    pub fn dump_frames(
        &self,
        id: &str,
        path: &Path,
        samples_per_chunk: Option<usize>,
        output: &Path,
    ) -> Result<usize, SessionError> {
        let id = FrameId::new(id).map_err(SendError::from)?;
        let path = self.resolve(path);
        let data = std::fs::read(&path).map_err(|source| SessionError::ReadFile {
            path: path.clone(),
            source,
        })?;

        let mut wire = Vec::new();
        let mut frames = 0;
        match samples_per_chunk {
            Some(samples) => {
                let layout = ChunkLayout::new(samples, self.config.transfer.sample_width).map_err(SendError::from)?;
                for chunk in partition(data.split_inclusive(|&b| b == b'\n'), layout) {
                    let encoded = frame::encode_with_id(id, &chunk.data).map_err(SendError::from)?;
                    wire.extend(encoded.to_bytes());
                    frames += 1;
                }
            }
            None => {
                let encoded = frame::encode_with_id(id, &data).map_err(SendError::from)?;
                wire = encoded.to_bytes();
                frames = 1;
            }
        }

        std::fs::write(output, &wire).map_err(|source| SessionError::WriteFile {
            path: output.to_path_buf(),
            source,
        })?;
        tracing::info!(file = %path.display(), output = %output.display(), frames, bytes = wire.len(), "frames written");
        Ok(frames)
    }

    /// List the frames in a capture of raw wire bytes.
    pub fn inspect_frames(&self, path: &Path) -> Result<Vec<FrameInfo>, SessionError> {
        let path = self.resolve(path);
        let wire = std::fs::read(&path).map_err(|source| SessionError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let frames = frame::decode_all(&wire).map_err(|source| SessionError::Decode {
            path: path.clone(),
            source,
        })?;

        Ok(frames
            .iter()
            .map(|f| FrameInfo {
                id: f.id,
                size: f.payload.len(),
            })
            .collect())
    }

    /// Paths that do not exist as given are looked up in the data directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.exists() {
            path.to_path_buf()
        } else {
            self.config.transfer.data_dir.join(path)
        }
    }
}

fn count_lines<R: BufRead>(mut reader: R) -> std::io::Result<usize> {
    let mut lines = 0;
    let mut line = Vec::new();
    while reader.read_until(b'\n', &mut line)? > 0 {
        lines += 1;
        line.clear();
    }
    Ok(lines)
}

// ============================================================================
// Tests
// ============================================================================
