extern crate nalgebra as na;

pub mod position;
pub mod prelude;
pub mod record;
pub mod time;
