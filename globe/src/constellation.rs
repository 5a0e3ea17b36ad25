//! Per-frame position updates for the set of tracked objects

use crate::{
    driver::FrameEnvironment,
    frame,
    propagation::{Propagator, Sgp4Propagator},
    publish::{MarkerInfo, MarkerSink},
    tracking::{MarkerHandle, TrackedObject},
    units::Timestamp,
    FrameComponent,
};
use tletypes::prelude::OrbitalRecord;
use tracing::{debug, info, trace, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Re-propagate every object every frame
    #[default]
    All,
    /// Re-propagate a rotating slice of `per_frame` objects each frame
    RoundRobin { per_frame: usize },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConstellationConfig {
    pub radius: f64,
    pub policy: UpdatePolicy,
}

impl Default for ConstellationConfig {
    fn default() -> Self {
        Self {
            radius: frame::MARKER_RADIUS,
            policy: UpdatePolicy::All,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub updated: usize,
    pub failed: usize,
    pub published: usize,
}

pub struct Constellation<P: Propagator> {
    propagator: P,
    config: ConstellationConfig,
    objects: Vec<TrackedObject<P::Prepared>>,
    next_handle: u64,
    cursor: usize,
    last_report: FrameReport,
}

impl<P: Propagator> Constellation<P> {
    pub fn new(propagator: P, config: ConstellationConfig) -> Self {
        Self {
            propagator,
            config,
            objects: Vec::new(),
            next_handle: 0,
            cursor: 0,
            last_report: FrameReport::default(),
        }
    }

    pub fn config(&self) -> &ConstellationConfig {
        &self.config
    }

    pub fn propagator(&self) -> &P {
        &self.propagator
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn tracked(&self) -> &[TrackedObject<P::Prepared>] {
        &self.objects
    }

    pub fn get(&self, handle: MarkerHandle) -> Option<&TrackedObject<P::Prepared>> {
        self.objects.iter().find(|o| o.handle() == handle)
    }

    pub fn last_report(&self) -> FrameReport {
        self.last_report
    }

    /// Start tracking a record.
    ///
    /// Elements the propagator rejects are still tracked; the object fails every update.
    pub fn admit(&mut self, record: OrbitalRecord) -> MarkerHandle {
        let handle = MarkerHandle::new(self.next_handle);
        self.next_handle += 1;

        let prepared = self.propagator.prepare(&record);
        if let Err(e) = &prepared {
            warn!(handle = %handle, name = %record.name, error = %e, "Object admitted with unusable elements");
        }
        self.objects.push(TrackedObject::new(handle, record, prepared));
        handle
    }

    pub fn admit_all<I: IntoIterator<Item = OrbitalRecord>>(
        &mut self,
        records: I,
    ) -> Vec<MarkerHandle> {
        let records = records.into_iter();
        self.objects.reserve(records.size_hint().0);
        records.map(|r| self.admit(r)).collect()
    }

    /// Stop tracking one object and remove its marker
    pub fn remove(
        &mut self,
        handle: MarkerHandle,
        sink: &mut dyn MarkerSink,
    ) -> Option<OrbitalRecord> {
        let idx = self.objects.iter().position(|o| o.handle() == handle)?;
        let obj = self.objects.remove(idx);
        sink.remove_markers(&[handle]);
        if idx < self.cursor {
            self.cursor -= 1;
        }
        if self.cursor >= self.objects.len() {
            self.cursor = 0;
        }
        Some(obj.record().clone())
    }

    /// Drop every tracked object, returning the released handles
    pub fn clear(&mut self) -> Vec<MarkerHandle> {
        self.cursor = 0;
        self.objects.drain(..).map(|o| o.handle()).collect()
    }

    /// Replace the tracked set, announcing the change to the sink
    pub fn reload<I: IntoIterator<Item = OrbitalRecord>>(
        &mut self,
        records: I,
        sink: &mut dyn MarkerSink,
    ) -> Vec<MarkerHandle> {
        let removed = self.clear();
        if !removed.is_empty() {
            sink.remove_markers(&removed);
        }
        let handles = self.admit_all(records);
        self.announce(sink);
        info!(removed = removed.len(), admitted = handles.len(), "Constellation reloaded");
        handles
    }

    pub fn marker_infos(&self) -> Vec<MarkerInfo> {
        self.objects
            .iter()
            .map(|o| MarkerInfo {
                handle: o.handle(),
                name: o.record().name.clone(),
                catalog_number: o.record().catalog_number(),
            })
            .collect()
    }

    pub fn announce(&self, sink: &mut dyn MarkerSink) {
        if !self.objects.is_empty() {
            sink.add_markers(&self.marker_infos());
        }
    }

    /// Update the objects due this frame and publish every known position
    pub fn update_frame(
        &mut self,
        env: &FrameEnvironment<'_>,
        sink: &mut dyn MarkerSink,
    ) -> FrameReport {
        let n = self.objects.len();
        let (start, count) = match self.config.policy {
            UpdatePolicy::All => (0, n),
            UpdatePolicy::RoundRobin { per_frame } => (self.cursor, per_frame.max(1).min(n)),
        };

        let mut report = FrameReport::default();
        for (idx, obj) in self.objects.iter_mut().enumerate() {
            let due = (idx + n - start) % n.max(1) < count;
            if due {
                let now = env.clock.now();
                if update_object(&self.propagator, obj, &now, self.config.radius) {
                    report.updated += 1;
                } else {
                    report.failed += 1;
                }
            }

            if let Some(pos) = obj.last_position() {
                trace!(handle = %obj.handle(), %pos, "Publishing marker");
                sink.move_marker(obj.handle(), pos);
                report.published += 1;
            }
        }
        sink.end_frame(env.frame);

        if n > 0 {
            self.cursor = (start + count) % n;
        }
        self.last_report = report;
        report
    }
}

impl Constellation<Sgp4Propagator> {
    /// Most recent element epoch among the objects with usable elements
    pub fn latest_epoch(&self) -> Option<Timestamp> {
        self.objects
            .iter()
            .filter_map(|o| o.prepared().ok())
            .map(|e| e.epoch())
            .max()
    }
}

impl<P: Propagator> FrameComponent for Constellation<P> {
    type SharedState = dyn MarkerSink;

    fn step(&mut self, env: &FrameEnvironment<'_>, sink: &mut Self::SharedState) {
        self.update_frame(env, sink);
    }
}

/// Returns true when the object received a new position
fn update_object<P: Propagator>(
    propagator: &P,
    obj: &mut TrackedObject<P::Prepared>,
    now: &Timestamp,
    radius: f64,
) -> bool {
    let result = match obj.prepared() {
        Ok(prepared) => propagator.propagate(prepared, now).map(|inertial| {
            frame::to_globe_cartesian(&inertial, propagator.sidereal_time(now), radius)
        }),
        Err(_) => {
            obj.record_failure();
            return false;
        }
    };

    match result {
        Ok(pos) if pos.is_finite() => {
            obj.record_success(pos);
            true
        }
        Ok(_) => {
            if obj.record_failure() {
                debug!(handle = %obj.handle(), name = %obj.record().name, "Transform produced a non-finite position");
            }
            false
        }
        Err(e) => {
            if obj.record_failure() {
                debug!(handle = %obj.handle(), name = %obj.record().name, error = %e, "Propagation failed");
            }
            false
        }
    }
}
