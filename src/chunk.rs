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

//! Splitting line-oriented sample files into sample-aligned chunks.

use std::io::BufRead;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    #[error("samples per chunk must be positive")]
    ZeroSamplesPerChunk,

    #[error("sample width must be positive")]
    ZeroSampleWidth,

    #[error("chunk of {samples_per_chunk} samples x {sample_width} values overflows")]
    TooLarge {
        samples_per_chunk: usize,
        sample_width: usize,
    },
}

// ============================================================================
// Layout
// ============================================================================

/// How many lines make up one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    samples_per_chunk: usize,
    sample_width: usize,
    lines_per_chunk: usize,
}

impl ChunkLayout {
    pub fn new(samples_per_chunk: usize, sample_width: usize) -> Result<Self, PartitionError> {
        if samples_per_chunk == 0 {
            return Err(PartitionError::ZeroSamplesPerChunk);
        }
        if sample_width == 0 {
            return Err(PartitionError::ZeroSampleWidth);
        }
        let lines_per_chunk = samples_per_chunk
            .checked_mul(sample_width)
            .ok_or(PartitionError::TooLarge {
                samples_per_chunk,
                sample_width,
            })?;

        Ok(ChunkLayout {
            samples_per_chunk,
            sample_width,
            lines_per_chunk,
        })
    }

    pub fn samples_per_chunk(&self) -> usize {
        self.samples_per_chunk
    }

    pub fn sample_width(&self) -> usize {
        self.sample_width
    }

    pub fn lines_per_chunk(&self) -> usize {
        self.lines_per_chunk
    }

    /// Number of chunks `total_lines` lines split into.
    pub fn chunk_count(&self, total_lines: usize) -> usize {
        total_lines.div_ceil(self.lines_per_chunk)
    }
}

/// A contiguous run of lines, terminators included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub lines: usize,
    pub data: Vec<u8>,
}

// ============================================================================
// In-memory partitioning
// ============================================================================

/// Lazily groups an in-memory line sequence into chunks.
pub struct Chunks<I> {
    lines: I,
    layout: ChunkLayout,
    next_index: usize,
}

/// Group `lines` into chunks of `layout.lines_per_chunk()` lines each.
///
/// Each line is copied as given, so callers that want the original
/// terminators on the wire must keep them on the lines (for example with
/// `str::split_inclusive('\n')`). The final chunk holds the remainder.
pub fn partition<I>(lines: I, layout: ChunkLayout) -> Chunks<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    Chunks {
        lines: lines.into_iter(),
        layout,
        next_index: 0,
    }
}

impl<I> Iterator for Chunks<I>
where
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let mut data = Vec::new();
        let mut lines = 0;

        for line in self.lines.by_ref().take(self.layout.lines_per_chunk()) {
            data.extend_from_slice(line.as_ref());
            lines += 1;
        }

        if lines == 0 {
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;
        Some(Chunk { index, lines, data })
    }
}

// ============================================================================
// Streaming partitioning
// ============================================================================

/// Single-pass chunking straight from a reader.
///
/// Lines are split on `\n` and kept byte-for-byte; a last line without a
/// terminator still counts.
pub struct ChunkReader<R> {
    reader: R,
    layout: ChunkLayout,
    next_index: usize,
    done: bool,
}

impl<R: BufRead> ChunkReader<R> {
    pub fn new(reader: R, layout: ChunkLayout) -> Self {
        ChunkReader {
            reader,
            layout,
            next_index: 0,
            done: false,
        }
    }

    fn read_chunk(&mut self) -> std::io::Result<Option<Chunk>> {
        let mut data = Vec::new();
        let mut lines = 0;

        while lines < self.layout.lines_per_chunk() {
            if self.reader.read_until(b'\n', &mut data)? == 0 {
                self.done = true;
                break;
            }
            lines += 1;
        }

        if lines == 0 {
            return Ok(None);
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some(Chunk { index, lines, data }))
    }
}

impl<R: BufRead> Iterator for ChunkReader<R> {
    type Item = std::io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn numbered_lines(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("{}.0\n", i)).collect()
    }

    #[test]
    fn test_layout_rejects_zero() {
        assert_eq!(ChunkLayout::new(0, 128), Err(PartitionError::ZeroSamplesPerChunk));
        assert_eq!(ChunkLayout::new(10, 0), Err(PartitionError::ZeroSampleWidth));
        assert!(matches!(
            ChunkLayout::new(usize::MAX, 2),
            Err(PartitionError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_partition_remainder() {
        let layout = ChunkLayout::new(2, 5).unwrap();
        let lines = numbered_lines(25);

        let chunks: Vec<Chunk> = partition(&lines, layout).collect();
        let sizes: Vec<usize> = chunks.iter().map(|c| c.lines).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
        assert_eq!(layout.chunk_count(25), 3);

        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        // Concatenation reproduces the input in order
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data.clone()).collect();
        assert_eq!(joined, lines.concat().into_bytes());
    }

    #[test]
    fn test_partition_exact_multiple() {
        let layout = ChunkLayout::new(3, 4).unwrap();
        let lines = numbered_lines(36);

        let chunks: Vec<Chunk> = partition(&lines, layout).collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.lines == 12 && !c.data.is_empty()));
    }

    #[test]
    fn test_partition_empty() {
        let layout = ChunkLayout::new(10, 128).unwrap();
        let lines: Vec<String> = Vec::new();
        assert_eq!(partition(&lines, layout).count(), 0);
        assert_eq!(layout.chunk_count(0), 0);
    }

    #[test]
    fn test_partition_counts() {
        for (total, samples, width) in [(1, 1, 1), (7, 1, 3), (128, 10, 128), (1281, 10, 128), (99, 4, 5)] {
            let layout = ChunkLayout::new(samples, width).unwrap();
            let lines = numbered_lines(total);
            let chunks: Vec<Chunk> = partition(&lines, layout).collect();

            assert_eq!(chunks.len(), total.div_ceil(samples * width));
            assert_eq!(chunks.iter().map(|c| c.lines).sum::<usize>(), total);
            assert!(chunks.iter().all(|c| c.lines <= layout.lines_per_chunk()));
        }
    }

    #[test]
    fn test_reader_matches_in_memory() {
        let layout = ChunkLayout::new(2, 5).unwrap();
        let lines = numbered_lines(25);
        let text = lines.concat();

        let streamed: Vec<Chunk> = ChunkReader::new(Cursor::new(text.as_bytes()), layout)
            .collect::<std::io::Result<_>>()
            .unwrap();
        let in_memory: Vec<Chunk> = partition(text.split_inclusive('\n'), layout).collect();

        assert_eq!(streamed, in_memory);
    }

    #[test]
    fn test_reader_preserves_terminators() {
        let layout = ChunkLayout::new(1, 2).unwrap();
        let text = "0.1\r\n0.2\r\n0.3";

        let chunks: Vec<Chunk> = ChunkReader::new(Cursor::new(text), layout)
            .collect::<std::io::Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].data, b"0.1\r\n0.2\r\n");
        assert_eq!(chunks[1].data, b"0.3");
        assert_eq!(chunks[1].lines, 1);
    }

    #[test]
    fn test_reader_empty_source() {
        let layout = ChunkLayout::new(10, 40).unwrap();
        let mut reader = ChunkReader::new(Cursor::new(""), layout);
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }
}
