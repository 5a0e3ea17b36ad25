use crate::propagation::PropagationError;
use serde::Serialize;
use tletypes::prelude::{Cartesian3, OrbitalRecord};

/// Session-unique marker identity, assigned in admission order
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MarkerHandle(u64);

impl MarkerHandle {
    pub(crate) fn new(id: u64) -> Self {
        MarkerHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MarkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TrackState {
    /// Admitted, not yet updated
    Fresh,
    Updated,
    /// Most recent update failed, retried next frame
    Failed,
}

pub struct TrackedObject<T> {
    handle: MarkerHandle,
    record: OrbitalRecord,
    prepared: Result<T, PropagationError>,
    last_position: Option<Cartesian3>,
    state: TrackState,
    consecutive_failures: u64,
}

impl<T> TrackedObject<T> {
    pub(crate) fn new(
        handle: MarkerHandle,
        record: OrbitalRecord,
        prepared: Result<T, PropagationError>,
    ) -> Self {
        Self {
            handle,
            record,
            prepared,
            last_position: None,
            state: TrackState::Fresh,
            consecutive_failures: 0,
        }
    }

    pub fn handle(&self) -> MarkerHandle {
        self.handle
    }

    pub fn record(&self) -> &OrbitalRecord {
        &self.record
    }

    pub fn prepared(&self) -> Result<&T, &PropagationError> {
        self.prepared.as_ref()
    }

    pub fn last_position(&self) -> Option<&Cartesian3> {
        self.last_position.as_ref()
    }

    pub fn last_update_failed(&self) -> bool {
        self.state == TrackState::Failed
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures
    }

    pub(crate) fn record_success(&mut self, position: Cartesian3) {
        self.last_position = Some(position);
        self.state = TrackState::Updated;
        self.consecutive_failures = 0;
    }

    /// Returns true when this failure ends a run of successful updates
    pub(crate) fn record_failure(&mut self) -> bool {
        let was_failing = self.state == TrackState::Failed;
        self.state = TrackState::Failed;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        !was_failing
    }
}

impl<T> std::fmt::Debug for TrackedObject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedObject")
            .field("handle", &self.handle)
            .field("name", &self.record.name)
            .field("last_position", &self.last_position)
            .field("state", &self.state)
            .field("consecutive_failures", &self.consecutive_failures)
            .finish()
    }
}
