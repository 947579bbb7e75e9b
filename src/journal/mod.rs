//! Trip log persistence: record framing, reading and writing

pub mod reader;
pub mod schema;
pub mod writer;

pub use reader::{decode_trip_log, read_trip_log, RecordStream};
pub use schema::{decode_record_body, encode_record};
pub use writer::{trip_file_name, JournalWriter, TripFile, TripStorage};
