pub extern crate nalgebra as na;

pub mod clock;
pub mod config;
pub mod constellation;
pub mod driver;
pub mod frame;
pub mod propagation;
pub mod publish;
pub mod session;
pub mod tracking;
pub mod units;

/// Catalog used when no catalog file is provided
pub const DEFAULT_CATALOG: &str = include_str!("../catalogs/stations.txt");

pub trait FrameComponent {
    /// The type for state that is shared between components during a frame; e.g. the marker sink.
    type SharedState: ?Sized;

    fn step(&mut self, env: &driver::FrameEnvironment<'_>, shared_state: &mut Self::SharedState);
}
