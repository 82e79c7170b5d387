// src/pipeline/annotate.rs
//! Merging operator annotations with the most recent fix

use crate::{
    display::terminal::render_fix_dump,
    error::Result,
    gps::{Fix, NmeaParser},
    record::point_record,
};
use std::io::Write;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Commands up to this many characters request a dump instead of a record
pub const DUMP_COMMAND_MAX_CHARS: usize = 3;

/// What a command turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Current fix shown to the operator, nothing persisted
    Dumped,
    /// Point record appended to the log
    Recorded,
}

/// Single owner of the "current fix", fed by the point queue and the
/// operator command queue.
///
/// Both sources are polled by one task, so the fix is never touched
/// concurrently. When a line and a command are ready at the same time the
/// pick is random: a command may pair with the fix before or after that line.
pub struct AnnotationMerger<W, D> {
    parser: NmeaParser,
    current_fix: Fix,
    point_log: W,
    dump_output: D,
    styled_dump: bool,
    points_written: u64,
}

impl<W, D> AnnotationMerger<W, D>
where
    W: AsyncWrite + Unpin,
    D: Write,
{
    pub fn new(point_log: W, dump_output: D) -> Self {
        Self {
            parser: NmeaParser::new(),
            current_fix: Fix::default(),
            point_log,
            dump_output,
            styled_dump: false,
            points_written: 0,
        }
    }

    /// Colour the diagnostic dump (for a dump writer that is a terminal)
    pub fn with_styled_dump(mut self, styled: bool) -> Self {
        self.styled_dump = styled;
        self
    }

    /// Use a preconfigured parser
    pub fn with_parser(mut self, parser: NmeaParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn current_fix(&self) -> &Fix {
        &self.current_fix
    }

    pub fn points_written(&self) -> u64 {
        self.points_written
    }

    /// Give back the point log and dump writers
    pub fn into_writers(self) -> (W, D) {
        (self.point_log, self.dump_output)
    }

    /// Parse a sentence line, replacing the current fix if it holds one
    pub fn handle_line(&mut self, line: &str) -> bool {
        match self.parser.parse(line) {
            Some(fix) => {
                self.current_fix = fix;
                true
            }
            None => false,
        }
    }

    /// Apply one operator command to the current fix
    pub async fn handle_command(&mut self, command: &str) -> Result<CommandOutcome> {
        if command.chars().count() <= DUMP_COMMAND_MAX_CHARS {
            render_fix_dump(&mut self.dump_output, &self.current_fix, self.styled_dump)?;
            return Ok(CommandOutcome::Dumped);
        }

        let mut record = point_record(&self.current_fix, command);
        record.push('\n');
        self.point_log.write_all(record.as_bytes()).await?;
        self.point_log.flush().await?;

        self.points_written += 1;
        debug!(annotation = command, utc = %self.current_fix.utc_time, "point recorded");
        Ok(CommandOutcome::Recorded)
    }

    /// Serve both queues until both close or shutdown is requested
    pub async fn run(
        mut self,
        mut lines: mpsc::Receiver<String>,
        mut commands: mpsc::Receiver<String>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let mut lines_open = true;
        let mut commands_open = true;

        while lines_open || commands_open {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.recv(), if lines_open => match line {
                    Some(line) => {
                        self.handle_line(&line);
                    }
                    None => lines_open = false,
                },
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        self.handle_command(&command).await?;
                    }
                    None => commands_open = false,
                },
            }
        }

        info!(points = self.points_written, "annotation merger stopped");
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::full_record;

    const GGA: &str = "$GPGGA,123456.00,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
    const GGA_LATER: &str = "$GPGGA,123457.00,4807.040,N,01131.002,E,2,08,0.9,545.6,M,46.9,M,,";

    fn merger() -> AnnotationMerger<Vec<u8>, Vec<u8>> {
        AnnotationMerger::new(Vec::new(), Vec::new())
            .with_parser(NmeaParser::new().with_reference_year(2024))
    }

    #[tokio::test]
    async fn test_long_command_writes_point_record() {
        let mut merger = merger();
        assert!(merger.handle_line(GGA));
        let fix = merger.current_fix().clone();

        let outcome = merger.handle_command("wp12").await.unwrap();
        assert_eq!(outcome, CommandOutcome::Recorded);

        let (log, dump) = merger.into_writers();
        assert_eq!(
            String::from_utf8(log).unwrap(),
            format!("{},wp12\n", full_record(&fix))
        );
        assert!(dump.is_empty());
    }

    #[tokio::test]
    async fn test_short_command_dumps_without_record() {
        let mut merger = merger();
        merger.handle_line(GGA);

        let outcome = merger.handle_command("ok").await.unwrap();
        assert_eq!(outcome, CommandOutcome::Dumped);
        assert_eq!(merger.points_written(), 0);

        let (log, dump) = merger.into_writers();
        assert!(log.is_empty());
        let dump = String::from_utf8_lossy(&dump);
        assert!(dump.contains("123456.00"));
        assert!(dump.contains("48.1173"));
    }

    #[tokio::test]
    async fn test_empty_and_three_char_commands_are_dumps() {
        let mut merger = merger();
        assert_eq!(merger.handle_command("").await.unwrap(), CommandOutcome::Dumped);
        assert_eq!(merger.handle_command("abc").await.unwrap(), CommandOutcome::Dumped);
        assert_eq!(merger.handle_command("abcd").await.unwrap(), CommandOutcome::Recorded);
        // multi-byte text is measured in characters
        assert_eq!(merger.handle_command("ééé").await.unwrap(), CommandOutcome::Dumped);
    }

    #[tokio::test]
    async fn test_command_before_any_fix_uses_zero_fix() {
        let mut merger = merger();
        merger.handle_command("stake-1").await.unwrap();

        let (log, _) = merger.into_writers();
        assert_eq!(
            String::from_utf8(log).unwrap(),
            "0,,0,0,0.000000,0,0.000000,0.000000,0.000000,stake-1\n"
        );
    }

    #[tokio::test]
    async fn test_invalid_line_keeps_current_fix() {
        let mut merger = merger();
        merger.handle_line(GGA);
        assert!(!merger.handle_line("$GPGGA,truncated"));
        assert!(!merger.handle_line("$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K,A*25"));
        assert_eq!(merger.current_fix().utc_time, "123456.00");
    }

    #[tokio::test]
    async fn test_run_pairs_command_with_latest_fix() {
        let (line_tx, line_rx) = mpsc::channel(8);
        let (command_tx, command_rx) = mpsc::channel(8);
        let task = tokio::spawn(merger().run(line_rx, command_rx, CancellationToken::new()));

        line_tx.send(GGA.to_string()).await.unwrap();
        line_tx.send(GGA_LATER.to_string()).await.unwrap();
        // Wait until the merger has taken both lines off the queue
        while line_tx.capacity() < line_tx.max_capacity() {
            tokio::task::yield_now().await;
        }
        command_tx.send("stake-42".to_string()).await.unwrap();
        drop(line_tx);
        drop(command_tx);

        let merger = task.await.unwrap().unwrap();
        assert_eq!(merger.points_written(), 1);
        let (log, _) = merger.into_writers();
        let log = String::from_utf8(log).unwrap();
        assert!(log.starts_with(&format!("{},123457.00,", merger_timestamp("123457.00"))));
        assert!(log.ends_with(",stake-42\n"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (_line_tx, line_rx) = mpsc::channel::<String>(8);
        let (_command_tx, command_rx) = mpsc::channel::<String>(8);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(merger().run(line_rx, command_rx, shutdown.clone()));

        shutdown.cancel();
        let merger = task.await.unwrap().unwrap();
        assert!(merger.current_fix().is_empty());
    }

    fn merger_timestamp(utc: &str) -> i64 {
        crate::gps::nmea::capture_timestamp_ms(utc, 2024).unwrap()
    }
}
