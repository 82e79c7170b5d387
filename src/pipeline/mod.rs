// src/pipeline/mod.rs
//! Parse-and-fan-out pipeline
//!
//! ```text
//!                      ┌──► trace queue ──► SentenceSink(Trace) ──► trace log
//! serial line ─► Fanout├──► full queue  ──► SentenceSink(Full)  ──► full-data log
//!                      └──► point queue ──┐
//!                                         ├─► AnnotationMerger ──► point log
//! console line ─────────► command queue ──┘        └──► dump (stdout)
//! ```
//!
//! Every consumer parses with its own parser state. All consumers see the
//! same ordered stream, so each one carries identical course values into
//! its records no matter how their paces drift apart.

pub mod annotate;
pub mod fanout;
pub mod sink;

pub use annotate::{AnnotationMerger, CommandOutcome};
pub use fanout::Fanout;
pub use sink::SentenceSink;

use crate::{error::Result, gps::NmeaParser, record::RecordKind};
use std::io::Write;
use tokio::{io::AsyncWrite, sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Default depth of each sentence queue
pub const DEFAULT_SENTENCE_QUEUE_CAPACITY: usize = 64;
/// Default depth of the operator command queue
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 32;

/// Writers the pipeline appends to
pub struct PipelineOutputs<W, D> {
    pub trace_log: W,
    pub full_log: W,
    pub point_log: W,
    pub dump_output: D,
    /// Colour the diagnostic dump
    pub styled_dump: bool,
}

/// Explicitly constructed pipeline context: queue sizes, parser setup and
/// the shutdown token shared by every task.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    sentence_queue_capacity: usize,
    command_queue_capacity: usize,
    parser: NmeaParser,
    shutdown: CancellationToken,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            sentence_queue_capacity: DEFAULT_SENTENCE_QUEUE_CAPACITY,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
            parser: NmeaParser::new(),
            shutdown: CancellationToken::new(),
        }
    }
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sentence_queue_capacity(mut self, capacity: usize) -> Self {
        self.sentence_queue_capacity = capacity.max(1);
        self
    }

    pub fn with_command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = capacity.max(1);
        self
    }

    /// Parser every consumer starts from
    pub fn with_parser(mut self, parser: NmeaParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Create the queues and spawn the three consumers
    pub fn spawn<W, D>(&self, outputs: PipelineOutputs<W, D>) -> Pipeline<W, D>
    where
        W: AsyncWrite + Unpin + Send + 'static,
        D: Write + Send + 'static,
    {
        let (trace_tx, trace_rx) = mpsc::channel(self.sentence_queue_capacity);
        let (full_tx, full_rx) = mpsc::channel(self.sentence_queue_capacity);
        let (point_tx, point_rx) = mpsc::channel(self.sentence_queue_capacity);
        let (command_tx, command_rx) = mpsc::channel(self.command_queue_capacity);

        let mut fanout = Fanout::new();
        fanout.add_outlet(RecordKind::Trace.name(), trace_tx);
        fanout.add_outlet(RecordKind::Full.name(), full_tx);
        fanout.add_outlet("point", point_tx);

        let trace = SentenceSink::new(RecordKind::Trace, outputs.trace_log)
            .with_parser(self.parser.clone())
            .run(trace_rx, self.shutdown.clone());
        let full = SentenceSink::new(RecordKind::Full, outputs.full_log)
            .with_parser(self.parser.clone())
            .run(full_rx, self.shutdown.clone());
        let merger = AnnotationMerger::new(outputs.point_log, outputs.dump_output)
            .with_parser(self.parser.clone())
            .with_styled_dump(outputs.styled_dump)
            .run(point_rx, command_rx, self.shutdown.clone());

        info!(
            sentence_queue = self.sentence_queue_capacity,
            command_queue = self.command_queue_capacity,
            "pipeline started"
        );

        Pipeline {
            fanout,
            commands: command_tx,
            shutdown: self.shutdown.clone(),
            trace: tokio::spawn(trace),
            full: tokio::spawn(full),
            merger: tokio::spawn(merger),
        }
    }
}

/// Handles to a running pipeline
pub struct Pipeline<W, D> {
    pub fanout: Fanout,
    pub commands: mpsc::Sender<String>,
    pub shutdown: CancellationToken,
    pub trace: JoinHandle<Result<W>>,
    pub full: JoinHandle<Result<W>>,
    pub merger: JoinHandle<Result<AnnotationMerger<W, D>>>,
}
