// src/gps/mod.rs
//! GPS sentence parsing and fix records

pub mod fix;
pub mod nmea;

pub use fix::Fix;
pub use nmea::{NmeaParser, ParserState};
