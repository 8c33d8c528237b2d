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

//! Delays between wire segments.
//!
//! The board has no flow control on its receive path; it needs a quiet
//! period after each segment to drain its buffer and re-arm.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The segment that was just written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Header,
    Payload,
    Terminator,
    Command,
}

pub trait Pacer: Send {
    /// How long to stay quiet after `segment`.
    fn delay_after(&mut self, segment: Segment) -> Duration;

    /// Called before the first segment of every frame or command.
    fn reset(&mut self) {}
}

// ============================================================================
// Strategies
// ============================================================================

pub struct NoDelay;

impl Pacer for NoDelay {
    fn delay_after(&mut self, _segment: Segment) -> Duration {
        Duration::ZERO
    }
}

pub struct FixedDelay(pub Duration);

impl Pacer for FixedDelay {
    fn delay_after(&mut self, _segment: Segment) -> Duration {
        self.0
    }
}

/// Starts at `initial` and multiplies by `factor` after every segment of a
/// frame, never exceeding `max`.
pub struct Backoff {
    initial: Duration,
    factor: u32,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, factor: u32, max: Duration) -> Self {
        Backoff {
            initial,
            factor,
            max,
            current: initial.min(max),
        }
    }
}

impl Pacer for Backoff {
    fn delay_after(&mut self, _segment: Segment) -> Duration {
        let delay = self.current;
        self.current = delay
            .checked_mul(self.factor)
            .unwrap_or(self.max)
            .min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial.min(self.max);
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum PacingConfig {
    None,
    Fixed {
        delay_ms: u64,
    },
    Backoff {
        initial_ms: u64,
        factor: u32,
        max_ms: u64,
    },
}

impl PacingConfig {
    pub fn fixed_ms(delay_ms: u64) -> Self {
        PacingConfig::Fixed { delay_ms }
    }

    pub fn build(&self) -> Box<dyn Pacer> {
        match *self {
            PacingConfig::None => Box::new(NoDelay),
            PacingConfig::Fixed { delay_ms } => Box::new(FixedDelay(Duration::from_millis(delay_ms))),
            PacingConfig::Backoff {
                initial_ms,
                factor,
                max_ms,
            } => Box::new(Backoff::new(
                Duration::from_millis(initial_ms),
                factor,
                Duration::from_millis(max_ms),
            )),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
