//! Periodic frame ticks and the callbacks they drive

use crate::clock::Clock;
use crate::units::Timestamp;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_FRAME_RATE: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// Clock time sampled at the start of the frame
    pub timestamp: Timestamp,
    pub frame: u64,
    pub real_time_start: Instant,
    pub real_time: Duration,
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameInfo {
    pub fn new() -> Self {
        FrameInfo {
            timestamp: Timestamp::epoch(),
            frame: 0,
            real_time_start: Instant::now(),
            real_time: Duration::ZERO,
        }
    }

    pub fn frame_step(&mut self, timestamp: Timestamp) {
        self.frame += 1;
        self.timestamp = timestamp;
        self.real_time = Instant::now().duration_since(self.real_time_start);
    }
}

/// What a frame callback sees
pub struct FrameEnvironment<'a> {
    pub frame: &'a FrameInfo,
    pub clock: &'a dyn Clock,
}

/// Returning `ControlFlow::Break` deregisters the callback
pub type FrameCallback = Box<dyn FnMut(&FrameEnvironment<'_>) -> ControlFlow<()>>;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RegistrationId(u64);

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RunLimit {
    pub frames: Option<u64>,
    pub duration: Option<Duration>,
}

impl RunLimit {
    pub fn frames(frames: u64) -> Self {
        RunLimit {
            frames: Some(frames),
            duration: None,
        }
    }

    fn reached(&self, frames_run: u64, elapsed: Duration) -> bool {
        self.frames.map(|f| frames_run >= f).unwrap_or(false)
            || self.duration.map(|d| elapsed >= d).unwrap_or(false)
    }
}

pub struct FrameDriver {
    period: Duration,
    info: FrameInfo,
    callbacks: Vec<(RegistrationId, FrameCallback)>,
    next_id: u64,
}

impl FrameDriver {
    /// Non-positive or non-finite rates fall back to the default rate
    pub fn new(frame_rate: f64) -> Self {
        let rate = if frame_rate.is_finite() && frame_rate > 0.0 {
            frame_rate
        } else {
            DEFAULT_FRAME_RATE
        };
        Self {
            period: Duration::from_secs_f64(1.0 / rate),
            info: FrameInfo::new(),
            callbacks: Vec::new(),
            next_id: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn register(&mut self, callback: FrameCallback) -> RegistrationId {
        let id = RegistrationId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        debug!(id = id.0, "Frame callback registered");
        id
    }

    /// Returns false if the callback was already gone
    pub fn deregister(&mut self, id: RegistrationId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(cb_id, _)| *cb_id != id);
        let removed = self.callbacks.len() != before;
        if removed {
            debug!(id = id.0, "Frame callback deregistered");
        }
        removed
    }

    pub fn is_registered(&self, id: RegistrationId) -> bool {
        self.callbacks.iter().any(|(cb_id, _)| *cb_id == id)
    }

    pub fn registered(&self) -> usize {
        self.callbacks.len()
    }

    /// Run one frame: sample the clock once, then invoke every callback in registration order
    pub fn tick(&mut self, clock: &dyn Clock) -> &FrameInfo {
        self.info.frame_step(clock.now());
        let env = FrameEnvironment {
            frame: &self.info,
            clock,
        };
        self.callbacks.retain_mut(|(id, cb)| match cb(&env) {
            ControlFlow::Continue(()) => true,
            ControlFlow::Break(()) => {
                debug!(id = id.0, "Frame callback finished");
                false
            }
        });
        &self.info
    }

    /// Tick at the frame period until interrupted, the limit is reached or no callbacks remain.
    ///
    /// Ticks are scheduled on absolute deadlines; a late frame does not shift later ones
    /// unless it overran by more than a full period.
    pub fn run(&mut self, clock: &dyn Clock, intr: &Interruptor, limit: RunLimit) -> FrameInfo {
        let started = Instant::now();
        let mut frames_run = 0;
        let mut deadline = started;

        info!(
            period_ms = self.period.as_secs_f64() * 1000.0,
            callbacks = self.callbacks.len(),
            "Frame loop starting"
        );

        loop {
            if intr.is_set() {
                info!("Frame loop interrupted");
                break;
            }
            if self.callbacks.is_empty() {
                info!("No frame callbacks left");
                break;
            }
            if limit.reached(frames_run, started.elapsed()) {
                break;
            }

            self.tick(clock);
            frames_run += 1;

            deadline += self.period;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            } else if now - deadline > self.period {
                deadline = now;
            }
        }

        info!(frames = frames_run, "Frame loop stopped");
        self.info.clone()
    }
}

#[derive(Clone, Debug)]
#[repr(transparent)]
pub struct Interruptor(Arc<AtomicBool>);

impl Interruptor {
    pub fn new() -> Self {
        Interruptor(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(SeqCst)
    }
}

impl Default for Interruptor {
    fn default() -> Self {
        Self::new()
    }
}
