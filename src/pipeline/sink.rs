// src/pipeline/sink.rs
//! Sentence-driven log writers (trace and full-data)

use crate::{
    error::Result,
    gps::NmeaParser,
    record::RecordKind,
};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Drains one sentence queue into one append-only log.
///
/// Each sink parses with its own [`NmeaParser`], so course values carried
/// into its records depend only on the order of its own queue.
pub struct SentenceSink<W> {
    kind: RecordKind,
    parser: NmeaParser,
    writer: W,
    records_written: u64,
}

impl<W> SentenceSink<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(kind: RecordKind, writer: W) -> Self {
        Self {
            kind,
            parser: NmeaParser::new(),
            writer,
            records_written: 0,
        }
    }

    /// Use a preconfigured parser
    pub fn with_parser(mut self, parser: NmeaParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Parse one line and append a record if it holds a fix.
    ///
    /// Returns whether a record was written.
    pub async fn handle_line(&mut self, line: &str) -> Result<bool> {
        let Some(fix) = self.parser.parse(line) else {
            return Ok(false);
        };

        let mut record = self.kind.format(&fix);
        record.push('\n');
        self.writer.write_all(record.as_bytes()).await?;
        self.writer.flush().await?;

        self.records_written += 1;
        debug!(sink = self.kind.name(), utc = %fix.utc_time, "record written");
        Ok(true)
    }

    /// Consume the queue until it closes or shutdown is requested.
    ///
    /// A write failure ends the sink with the error; the fan-out notices the
    /// closed queue and keeps feeding the other consumers.
    pub async fn run(
        mut self,
        mut lines: mpsc::Receiver<String>,
        shutdown: CancellationToken,
    ) -> Result<W> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.recv() => match line {
                    Some(line) => {
                        self.handle_line(&line).await?;
                    }
                    None => break,
                },
            }
        }

        info!(
            sink = self.kind.name(),
            records = self.records_written,
            "sink stopped"
        );
        Ok(self.writer)
    }
}
