// src/lib.rs
//! Stake Logger Library
//!
//! Records a serial NMEA GPS stream into three logs: a position trace, a
//! full-field log, and a point log pairing the latest fix with stake labels
//! typed by the operator.

pub mod config;
pub mod display;
pub mod error;
pub mod gps;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod recorder;

// Re-export main types for convenience
pub use error::{GpsError, Result};
pub use gps::{Fix, NmeaParser, ParserState};
pub use pipeline::{AnnotationMerger, Fanout, PipelineContext, SentenceSink};
pub use recorder::StakeRecorder;
