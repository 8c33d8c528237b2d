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

//! Board transfer protocol constants

/// Header length: identifier (8) + payload size (4, little-endian) + reserved (4)
pub const HEADER_SIZE: usize = 16;

/// Width of the identifier field
pub const ID_LEN: usize = 8;

/// Fill byte used to right-pad short identifiers
pub const ID_FILL: u8 = b'_';

/// Terminator written after every payload
pub const EOF_MARKER: &[u8; 6] = b"<EOF>\n";

// ============================================================================
// Well-known frame identifiers
// ============================================================================

/// Input weight matrix
pub const ID_WIN: &str = "WIN_____";

/// Reservoir weight matrix
pub const ID_WX: &str = "WX______";

/// Output weight matrix
pub const ID_WOUT: &str = "WOUT____";

/// Input samples
pub const ID_DATAIN: &str = "DATAIN__";

/// Golden output samples
pub const ID_DATAOUT: &str = "DATAOUT_";

/// Framed "run computation" command (single-channel links)
pub const ID_CMD_ESN: &str = "CMD_ESN_";

/// Framed full reset command (single-channel links)
pub const ID_CMD_RST: &str = "CMD_RST_";

/// Framed data-in reset command (single-channel links)
pub const ID_CMD_RDI: &str = "CMD_RDI_";

// ============================================================================
// Command tokens (unframed, command channel)
// ============================================================================

/// Soft reset of every array on the board
pub const CMD_RESET: &str = "RESET";

/// Reset only the input samples
pub const CMD_RDI: &str = "RDI";

/// Enable online training
pub const CMD_TRN_ON: &str = "TRN_ON";

/// Disable online training
pub const CMD_TRN_OFF: &str = "TRN_OFF";

/// Run the computation on the samples loaded so far
pub const CMD_ESN: &str = "ESN";

// ============================================================================
// Deployment defaults
// ============================================================================

pub const DEFAULT_BOARD_HOST: &str = "192.168.1.10";
pub const DEFAULT_FILE_PORT: u16 = 5001;
pub const DEFAULT_COMMAND_PORT: u16 = 5002;
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD: u32 = 115_200;

/// Scalar values per input sample
pub const DEFAULT_SAMPLE_WIDTH: usize = 128;
pub const DEFAULT_SAMPLES_PER_CHUNK: usize = 10;

/// Pause between segments of a single file or after a command
pub const DEFAULT_PACING_MS: u64 = 100;

/// Pause between segments of a chunk frame
pub const DEFAULT_CHUNK_PACING_MS: u64 = 50;

/// Pause between consecutive chunk frames
pub const DEFAULT_CHUNK_GAP_MS: u64 = 500;

/// Matrix file names expected in the data directory
pub const WIN_FILE: &str = "w_in.dat";
pub const WX_FILE: &str = "w_x.dat";
pub const WOUT_FILE: &str = "w_out.dat";

/// Golden output the board scores its predictions against
pub const GOLDEN_FILE: &str = "data_out.dat";
