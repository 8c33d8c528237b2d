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

// Host side of the board transfer protocol
mod capture;
mod chunk;
mod config;
mod frame;
mod logging;
mod pacing;
mod protocol;
mod sender;
mod serial;
mod session;
mod tcp;
mod transport;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use config::{Config, TransportKind};
use frame::FrameId;
use logging::{init_logging, LogFormat, LogLevel};
use pacing::PacingConfig;
use session::{ControlCommand, MatrixSet, Session};

#[derive(Parser)]
#[command(name = "boardlink")]
#[command(about = "Send weight matrices, input samples and commands to the ESN board", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Config file (default: $BOARDLINK_CONFIG or ~/.config/boardlink/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Link to the board
    #[arg(short, long, value_enum)]
    transport: Option<TransportKind>,

    /// Board address
    #[arg(long)]
    host: Option<String>,

    /// TCP port for file frames
    #[arg(long, value_name = "PORT")]
    file_port: Option<u16>,

    /// TCP port for command tokens
    #[arg(long, value_name = "PORT")]
    command_port: Option<u16>,

    /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, value_name = "BITS")]
    data_bits: Option<u8>,

    /// Parity (none, odd, or even)
    #[arg(long)]
    parity: Option<String>,

    /// Stop bits (1 or 2)
    #[arg(long, value_name = "BITS")]
    stop_bits: Option<u8>,

    /// Delay in milliseconds after each segment of a file frame or command
    #[arg(long, value_name = "MS")]
    pacing: Option<u64>,

    /// Delay in milliseconds after each segment of a chunk frame
    #[arg(long, value_name = "MS")]
    chunk_pacing: Option<u64>,

    /// Values per input sample
    #[arg(long, value_name = "N")]
    sample_width: Option<usize>,

    /// Directory searched for relative file names
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log output format (stderr)
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a file as a single frame
    Send {
        /// Frame identifier, padded with '_' to 8 characters
        #[arg(short, long, default_value = protocol::ID_DATAIN)]
        id: FrameId,

        /// File to send
        file: PathBuf,
    },
    /// Send the golden output file the board scores its results against
    Golden {
        #[arg(default_value = protocol::GOLDEN_FILE)]
        file: PathBuf,
    },
    /// Send weight matrix files from the data directory
    Matrices {
        #[arg(value_enum, default_value = "all")]
        set: MatrixSet,
    },
    /// Send a large input file in sample-aligned chunks
    Stream {
        /// File with one value per line
        file: PathBuf,

        /// Samples per chunk
        #[arg(short, long, value_name = "N")]
        samples_per_chunk: Option<usize>,

        /// Send all chunks over one connection
        #[arg(long, conflicts_with = "no_reuse_connection")]
        reuse_connection: bool,

        /// Open a new connection for every chunk
        #[arg(long)]
        no_reuse_connection: bool,

        /// Delay in milliseconds between chunks
        #[arg(long, value_name = "MS")]
        gap: Option<u64>,
    },
    /// Send a control command
    Command {
        #[arg(value_enum)]
        command: ControlCommand,
    },
    /// Write result lines printed by the board to a CSV file
    Capture {
        /// Output file (rewritten with every line)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many lines
        #[arg(long, value_name = "N")]
        max_lines: Option<usize>,
    },
    /// Write the encoded frames to a file instead of sending them
    Dump {
        /// Frame identifier, padded with '_' to 8 characters
        #[arg(short, long, default_value = protocol::ID_DATAIN)]
        id: FrameId,

        /// File to encode
        file: PathBuf,

        /// Split into chunks of this many samples, as `stream` does
        #[arg(short, long, value_name = "N")]
        samples_per_chunk: Option<usize>,

        /// Where to write the wire bytes
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List the frames in a file of raw wire bytes
    Inspect {
        file: PathBuf,
    },
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    if let Some(host) = &cli.host {
        config.board.host = host.clone();
    }
    if let Some(port) = cli.file_port {
        config.board.file_port = port;
    }
    if let Some(port) = cli.command_port {
        config.board.command_port = port;
    }
    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud = baud;
    }
    if let Some(bits) = cli.data_bits {
        config.serial.data_bits = bits;
    }
    if let Some(parity) = &cli.parity {
        config.serial.parity = parity.clone();
    }
    if let Some(bits) = cli.stop_bits {
        config.serial.stop_bits = bits;
    }
    if let Some(ms) = cli.pacing {
        config.transfer.pacing = PacingConfig::fixed_ms(ms);
    }
    if let Some(ms) = cli.chunk_pacing {
        config.transfer.chunk_pacing = PacingConfig::fixed_ms(ms);
    }
    if let Some(width) = cli.sample_width {
        config.transfer.sample_width = width;
    }
    if let Some(dir) = &cli.data_dir {
        config.transfer.data_dir = dir.clone();
    }

    match &cli.command {
        Commands::Stream {
            reuse_connection,
            no_reuse_connection,
            gap,
            ..
        } => {
            if *reuse_connection {
                config.transfer.reuse_connection = true;
            }
            if *no_reuse_connection {
                config.transfer.reuse_connection = false;
            }
            if let Some(ms) = gap {
                config.transfer.chunk_gap_ms = *ms;
            }
        }
        Commands::Capture { output: Some(output), .. } => {
            config.capture.output = output.clone();
        }
        _ => {}
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    apply_overrides(&cli, &mut config);

    match config.transport {
        TransportKind::Tcp => tracing::info!(
            host = %config.board.host,
            file_port = config.board.file_port,
            command_port = config.board.command_port,
            "using TCP"
        ),
        TransportKind::Serial => tracing::info!(
            port = %config.serial.port,
            baud = config.serial.baud,
            "using serial port"
        ),
    }

    let samples_per_chunk = config.transfer.samples_per_chunk;
    let capture_output = config.capture.output.clone();
    let mut session = Session::open(config);

    let result = match cli.command {
        Commands::Send { id, file } => session
            .send_file(id.as_str(), &file)
            .map(|bytes| println!("Sent '{}' with ID '{}', {} bytes on the wire.", file.display(), id, bytes)),
        Commands::Golden { file } => session
            .send_golden(&file)
            .map(|bytes| println!("Sent golden file '{}', {} bytes on the wire.", file.display(), bytes)),
        Commands::Matrices { set } => session
            .send_matrices(set)
            .map(|()| println!("Matrix files sent.")),
        Commands::Stream { file, samples_per_chunk: samples, .. } => session
            .stream_samples(&file, samples.unwrap_or(samples_per_chunk))
            .map(|summary| {
                println!(
                    "Sent {} values in {} chunk(s), {} payload bytes.",
                    summary.lines, summary.chunks, summary.payload_bytes
                )
            }),
        Commands::Command { command } => session
            .send_command(command)
            .map(|()| println!("Sent command: {}", command.token())),
        Commands::Capture { max_lines, .. } => session
            .capture(&capture_output, max_lines)
            .map(|lines| println!("Captured {} line(s) to {}.", lines, capture_output.display())),
        Commands::Dump {
            id,
            file,
            samples_per_chunk,
            output,
        } => session
            .dump_frames(id.as_str(), &file, samples_per_chunk, &output)
            .map(|frames| println!("Wrote {} frame(s) to {}.", frames, output.display())),
        Commands::Inspect { file } => session.inspect_frames(&file).map(|frames| {
            for frame in &frames {
                println!("{}  {} bytes", frame.id, frame.size);
            }
            println!("{} frame(s).", frames.len());
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
