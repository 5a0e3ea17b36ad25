//! Time sources consulted once per frame

use crate::units::{Time, Timestamp};
use std::cell::Cell;
use std::time::Instant;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_utc(chrono::Utc::now())
    }
}

/// Starts at a chosen instant and advances at a multiple of wall time
#[derive(Debug, Clone)]
pub struct WarpClock {
    start: Timestamp,
    wall_start: Instant,
    warp: f64,
}

impl WarpClock {
    pub fn new(start: Timestamp, warp: f64) -> Self {
        Self {
            start,
            wall_start: Instant::now(),
            warp,
        }
    }
}

impl Clock for WarpClock {
    fn now(&self) -> Timestamp {
        self.start + Time::from_std_duration(self.wall_start.elapsed()) * self.warp
    }
}

/// Only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, t: Timestamp) {
        self.now.set(t);
    }

    pub fn advance(&self, dt: Time) {
        self.now.set(self.now.get() + dt);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}
