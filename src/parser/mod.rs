pub mod fuser;
pub mod helpers;
pub mod nmea;

pub use fuser::*;
pub use nmea::*;
