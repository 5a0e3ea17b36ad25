pub use crate::position::{Cartesian3, GeodeticPosition, InertialPosition};
pub use crate::record::{CatalogNumber, OrbitalRecord, ELEMENT_LINE_LEN};
pub use crate::time::UtcTimestamp;
