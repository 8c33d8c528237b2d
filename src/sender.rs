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

use std::time::Duration;
use crate::chunk::{Chunk, PartitionError};
use crate::frame::{self, EncodedFrame, EncodingError, FrameId};
use crate::pacing::{Pacer, Segment};
use crate::transport::{Connector, Link, TransportError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error("failed to read chunk {index}: {source}")]
    Read {
        index: usize,
        source: std::io::Error,
    },
}

// ============================================================================
// Chunked Transfer Options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOptions {
    /// Send every chunk over one connection instead of reconnecting per chunk.
    pub reuse_connection: bool,
    /// Quiet period between two consecutive chunk frames.
    pub gap: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub chunks: usize,
    pub lines: usize,
    pub payload_bytes: usize,
    pub connections: usize,
}

// ============================================================================
// Sender
// ============================================================================

/// Writes frames and command tokens to a link, pausing between segments.
///
/// The sender never owns a connection; callers hand in a borrowed link and
/// must not share it with another send in flight.
pub struct FrameSender {
    pacer: Box<dyn Pacer>,
    sleep: Box<dyn FnMut(Duration) + Send>,
}

impl FrameSender {
    pub fn new(pacer: Box<dyn Pacer>) -> Self {
        Self::with_sleep(pacer, std::thread::sleep)
    }

    /// Use `sleep` instead of blocking the thread for pacing delays.
    pub fn with_sleep(pacer: Box<dyn Pacer>, sleep: impl FnMut(Duration) + Send + 'static) -> Self {
        FrameSender {
            pacer,
            sleep: Box::new(sleep),
        }
    }

    /// Encode and send one frame, returning the number of bytes put on the wire.
    ///
    /// Encoding happens first: a rejected identifier or payload leaves the
    /// link untouched.
    pub fn send_frame(&mut self, link: &mut dyn Link, id: &str, payload: &[u8]) -> Result<usize, SendError> {
        let frame = frame::encode(id, payload)?;
        self.send_encoded(link, &frame)?;
        Ok(frame.wire_len())
    }

    /// Header, pause, payload, pause, terminator, pause.
    ///
    /// A failure leaves a partial frame on the link; the connection must be
    /// discarded.
    pub fn send_encoded(&mut self, link: &mut dyn Link, frame: &EncodedFrame<'_>) -> Result<(), TransportError> {
        self.pacer.reset();
        self.write_segment(link, &frame.header, Segment::Header)?;
        self.write_segment(link, frame.payload, Segment::Payload)?;
        self.write_segment(link, frame.terminator(), Segment::Terminator)?;
        tracing::debug!(id = %frame.id, size = frame.payload.len(), "frame sent");
        Ok(())
    }

    /// Send a bare command token: no header, no terminator, no reply.
    pub fn send_command(&mut self, link: &mut dyn Link, token: &str) -> Result<(), SendError> {
        if token.is_empty() {
            return Err(EncodingError::EmptyToken.into());
        }
        frame::check_ascii(token.as_bytes())?;

        self.pacer.reset();
        self.write_segment(link, token.as_bytes(), Segment::Command)?;
        tracing::debug!(token, "command sent");
        Ok(())
    }

    /// Send each chunk as one complete frame under `id`.
    ///
    /// Every chunk is encoded before its connection is touched. Without
    /// `reuse_connection` each chunk gets a fresh connection that is closed
    /// once its terminator is out.
    ///
    /// `options.gap` separates consecutive chunks; there is no pause after
    /// the last one.
    pub fn send_chunks<I>(
        &mut self,
        connector: &mut dyn Connector,
        id: FrameId,
        chunks: I,
        options: ChunkOptions,
    ) -> Result<TransferSummary, SendError>
    where
        I: IntoIterator<Item = std::io::Result<Chunk>>,
    {
        let mut summary = TransferSummary::default();
        let mut link: Option<Box<dyn Link>> = None;

        for (position, chunk) in chunks.into_iter().enumerate() {
            let chunk = chunk.map_err(|source| SendError::Read { index: position, source })?;
            let frame = frame::encode_with_id(id, &chunk.data)?;

            if position > 0 {
                self.pause(options.gap);
            }

            let mut active = match link.take() {
                Some(existing) => existing,
                None => {
                    summary.connections += 1;
                    connector.connect()?
                }
            };
            self.send_encoded(active.as_mut(), &frame)?;
            if options.reuse_connection {
                link = Some(active);
            }

            summary.chunks += 1;
            summary.lines += chunk.lines;
            summary.payload_bytes += chunk.data.len();
            tracing::info!(
                chunk = chunk.index + 1,
                lines = chunk.lines,
                bytes = chunk.data.len(),
                endpoint = %connector.endpoint(),
                "sent chunk"
            );
        }

        Ok(summary)
    }

    fn write_segment(&mut self, link: &mut dyn Link, bytes: &[u8], segment: Segment) -> Result<(), TransportError> {
        link.write_all(bytes).map_err(TransportError::classify)?;
        tracing::trace!(?segment, len = bytes.len(), "segment written");
        let delay = self.pacer.delay_after(segment);
        self.pause(delay);
        Ok(())
    }

    fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            (self.sleep)(delay);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{partition, ChunkLayout};
    use crate::pacing::{FixedDelay, NoDelay};
    use crate::transport::{MockConnector, MockLink};
    use std::sync::{Arc, Mutex};

    fn recording_sender(delay_ms: u64) -> (FrameSender, Arc<Mutex<Vec<Duration>>>) {
        let sleeps = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&sleeps);
        let sender = FrameSender::with_sleep(
            Box::new(FixedDelay(Duration::from_millis(delay_ms))),
            move |d| log.lock().unwrap().push(d),
        );
        (sender, sleeps)
    }

    fn ok_chunks(lines: &[String], samples: usize, width: usize) -> Vec<std::io::Result<Chunk>> {
        let layout = ChunkLayout::new(samples, width).unwrap();
        partition(lines, layout).map(Ok).collect()
    }

    fn numbered_lines(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}.5\n", i)).collect()
    }

    #[test]
    fn test_send_frame_wire_bytes() {
        let mut expected_writes = b"WIN_____".to_vec();
        expected_writes.extend_from_slice(&[8, 0, 0, 0, 0, 0, 0, 0]);
        expected_writes.extend_from_slice(b"1.0\n2.0\n");
        expected_writes.extend_from_slice(b"<EOF>\n");

        let mut link = MockLink::new(vec![], expected_writes);
        let (mut sender, sleeps) = recording_sender(100);

        let written = sender.send_frame(&mut link, "WIN", b"1.0\n2.0\n").unwrap();
        assert_eq!(written, 30);
        assert_eq!(*sleeps.lock().unwrap(), vec![Duration::from_millis(100); 3]);
    }

    #[test]
    fn test_encoding_error_writes_nothing() {
        let mut link = MockLink::new(vec![], vec![]);
        let (mut sender, sleeps) = recording_sender(100);

        let err = sender.send_frame(&mut link, "DATAIN", b"1.0\n\xFF\n").unwrap_err();
        assert!(matches!(err, SendError::Encoding(EncodingError::NonAsciiPayload { offset: 4, .. })));

        let err = sender.send_frame(&mut link, "DATAIN___", b"1.0\n").unwrap_err();
        assert!(matches!(err, SendError::Encoding(EncodingError::IdentifierTooLong(_))));

        assert!(sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_write_failure_stops_frame() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut link = MockLink::recording(Arc::clone(&log)).failing_on_write(1);
        let (mut sender, sleeps) = recording_sender(50);

        let err = sender.send_frame(&mut link, "WX", b"0.1\n").unwrap_err();
        assert!(matches!(err, SendError::Transport(TransportError::Closed)));

        // Header went out, payload and terminator did not
        assert_eq!(log.lock().unwrap().len(), 16);
        assert_eq!(sleeps.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_send_command_raw_token() {
        let mut link = MockLink::new(vec![], b"RESET".to_vec());
        let (mut sender, sleeps) = recording_sender(100);

        sender.send_command(&mut link, "RESET").unwrap();
        assert_eq!(*sleeps.lock().unwrap(), vec![Duration::from_millis(100)]);
    }

    #[test]
    fn test_send_command_rejects_bad_tokens() {
        let mut link = MockLink::new(vec![], vec![]);
        let mut sender = FrameSender::new(Box::new(NoDelay));

        assert!(matches!(
            sender.send_command(&mut link, ""),
            Err(SendError::Encoding(EncodingError::EmptyToken))
        ));
        assert!(matches!(
            sender.send_command(&mut link, "TRN_ÖN"),
            Err(SendError::Encoding(EncodingError::NonAsciiPayload { .. }))
        ));
    }

    #[test]
    fn test_chunks_reconnect_per_chunk() {
        let lines = numbered_lines(25);
        let mut connector = MockConnector::default();
        let (mut sender, sleeps) = recording_sender(50);
        let options = ChunkOptions {
            reuse_connection: false,
            gap: Duration::from_millis(500),
        };

        let id = FrameId::new("DATAIN").unwrap();
        let summary = sender
            .send_chunks(&mut connector, id, ok_chunks(&lines, 2, 5), options)
            .unwrap();

        assert_eq!(
            summary,
            TransferSummary {
                chunks: 3,
                lines: 25,
                payload_bytes: lines.concat().len(),
                connections: 3,
            }
        );

        let sessions = connector.sessions();
        assert_eq!(sessions.len(), 3);
        for (session, range) in sessions.iter().zip([0..10, 10..20, 20..25]) {
            let expected = lines[range].concat();
            let decoded = frame::decode(session).unwrap();
            assert_eq!(decoded.id.as_str(), "DATAIN__");
            assert_eq!(decoded.payload, expected.as_bytes());
        }

        let fifty = Duration::from_millis(50);
        let gap = Duration::from_millis(500);
        assert_eq!(
            *sleeps.lock().unwrap(),
            vec![fifty, fifty, fifty, gap, fifty, fifty, fifty, gap, fifty, fifty, fifty]
        );
    }

    #[test]
    fn test_chunks_reuse_connection() {
        let lines = numbered_lines(25);
        let mut connector = MockConnector::default();
        let mut sender = FrameSender::new(Box::new(NoDelay));
        let options = ChunkOptions {
            reuse_connection: true,
            gap: Duration::ZERO,
        };

        let id = FrameId::new("DATAIN").unwrap();
        let summary = sender
            .send_chunks(&mut connector, id, ok_chunks(&lines, 2, 5), options)
            .unwrap();
        assert_eq!(summary.connections, 1);

        let mut expected = Vec::new();
        for range in [0..10, 10..20, 20..25] {
            let payload = lines[range].concat();
            expected.extend(frame::encode("DATAIN", payload.as_bytes()).unwrap().to_bytes());
        }
        assert_eq!(connector.sessions(), vec![expected]);
    }

    #[test]
    fn test_chunks_empty_source_is_noop() {
        let mut connector = MockConnector::default();
        let mut sender = FrameSender::new(Box::new(NoDelay));
        let options = ChunkOptions {
            reuse_connection: false,
            gap: Duration::ZERO,
        };

        let summary = sender
            .send_chunks(&mut connector, FrameId::new("DATAIN").unwrap(), Vec::new(), options)
            .unwrap();
        assert_eq!(summary, TransferSummary::default());
        assert!(connector.sessions().is_empty());
    }

    #[test]
    fn test_chunks_stop_on_bad_chunk_before_connecting() {
        let mut connector = MockConnector::default();
        let mut sender = FrameSender::new(Box::new(NoDelay));
        let options = ChunkOptions {
            reuse_connection: false,
            gap: Duration::ZERO,
        };
        let chunks = vec![
            Ok(Chunk { index: 0, lines: 1, data: b"1.0\n".to_vec() }),
            Ok(Chunk { index: 1, lines: 1, data: b"\xE2\n".to_vec() }),
        ];

        let err = sender
            .send_chunks(&mut connector, FrameId::new("DATAIN").unwrap(), chunks, options)
            .unwrap_err();
        assert!(matches!(err, SendError::Encoding(EncodingError::NonAsciiPayload { offset: 0, byte: 0xE2 })));
        assert_eq!(connector.sessions().len(), 1);
    }

    #[test]
    fn test_chunks_read_error() {
        let mut connector = MockConnector::default();
        let mut sender = FrameSender::new(Box::new(NoDelay));
        let options = ChunkOptions {
            reuse_connection: true,
            gap: Duration::ZERO,
        };
        let chunks = vec![
            Ok(Chunk { index: 0, lines: 1, data: b"1.0\n".to_vec() }),
            Err(std::io::Error::other("disk gone")),
        ];

        let err = sender
            .send_chunks(&mut connector, FrameId::new("DATAIN").unwrap(), chunks, options)
            .unwrap_err();
        assert!(matches!(err, SendError::Read { index: 1, .. }));
    }

    #[test]
    fn test_chunks_connect_failure() {
        let lines = numbered_lines(4);
        let mut connector = MockConnector {
            refuse_on: Some(1),
            ..MockConnector::default()
        };
        let mut sender = FrameSender::new(Box::new(NoDelay));
        let options = ChunkOptions {
            reuse_connection: false,
            gap: Duration::ZERO,
        };

        let err = sender
            .send_chunks(&mut connector, FrameId::new("DATAIN").unwrap(), ok_chunks(&lines, 1, 2), options)
            .unwrap_err();
        assert!(matches!(err, SendError::Transport(TransportError::Connect { .. })));
        assert_eq!(connector.sessions().len(), 1);
    }
}
