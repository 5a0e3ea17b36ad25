//! Orbit propagation behind a narrow trait, backed by SGP4

use crate::units::Timestamp;
use sgp4::{Constants, Elements, MinutesSinceEpoch};
use std::f64::consts::TAU;
use tletypes::prelude::{InertialPosition, OrbitalRecord};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropagationError {
    /// The model produced no usable state at the requested time, e.g. a decayed orbit
    #[error("Degenerate propagation result: {0}")]
    Degenerate(String),
    #[error("Invalid orbital elements: {0}")]
    InvalidElements(String),
}

pub trait Propagator {
    /// Per-object state computed once when an object is admitted
    type Prepared;

    fn prepare(&self, record: &OrbitalRecord) -> Result<Self::Prepared, PropagationError>;

    fn propagate(
        &self,
        prepared: &Self::Prepared,
        at: &Timestamp,
    ) -> Result<InertialPosition, PropagationError>;

    /// Greenwich sidereal time [rad], in [0, 2π)
    fn sidereal_time(&self, at: &Timestamp) -> f64;

    fn propagate_record(
        &self,
        record: &OrbitalRecord,
        at: &Timestamp,
    ) -> Result<InertialPosition, PropagationError> {
        let prepared = self.prepare(record)?;
        self.propagate(&prepared, at)
    }
}

pub struct Sgp4Elements {
    elements: Elements,
    constants: Constants,
}

impl Sgp4Elements {
    pub fn elements(&self) -> &Elements {
        &self.elements
    }

    pub fn epoch(&self) -> Timestamp {
        Timestamp::from_utc(self.elements.datetime.and_utc())
    }

    pub fn minutes_since_epoch(&self, at: &Timestamp) -> f64 {
        (*at - self.epoch()).as_minutes()
    }
}

impl std::fmt::Debug for Sgp4Elements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sgp4Elements")
            .field("norad_id", &self.elements.norad_id)
            .field("epoch", &self.elements.datetime)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct Sgp4Propagator;

impl Propagator for Sgp4Propagator {
    type Prepared = Sgp4Elements;

    fn prepare(&self, record: &OrbitalRecord) -> Result<Self::Prepared, PropagationError> {
        let elements = Elements::from_tle(
            Some(record.name.clone()),
            record.line1.as_bytes(),
            record.line2.as_bytes(),
        )
        .map_err(|e| PropagationError::InvalidElements(e.to_string()))?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| PropagationError::InvalidElements(e.to_string()))?;
        Ok(Sgp4Elements {
            elements,
            constants,
        })
    }

    fn propagate(
        &self,
        prepared: &Self::Prepared,
        at: &Timestamp,
    ) -> Result<InertialPosition, PropagationError> {
        let t = MinutesSinceEpoch(prepared.minutes_since_epoch(at));
        let prediction = prepared
            .constants
            .propagate(t)
            .map_err(|e| PropagationError::Degenerate(e.to_string()))?;

        let pos = InertialPosition::new(prediction.position, prediction.velocity);
        if !pos.is_finite() {
            return Err(PropagationError::Degenerate(
                "non-finite state vector".to_owned(),
            ));
        }
        Ok(pos)
    }

    fn sidereal_time(&self, at: &Timestamp) -> f64 {
        greenwich_sidereal_time(at)
    }
}

/// IAU-82 Greenwich mean sidereal time [rad]
pub fn greenwich_sidereal_time(at: &Timestamp) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(at.as_j2000_years()).rem_euclid(TAU)
}
