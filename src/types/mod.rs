pub mod gps;
pub mod record;

pub use gps::*;
pub use record::*;
