// src/recorder.rs
//! Recorder coordination: log files, serial input and the operator console

use crate::{
    config::RecorderConfig,
    display::{render_entry_echo, render_prompt},
    error::{GpsError, Result},
    pipeline::{Fanout, Pipeline, PipelineContext, PipelineOutputs},
};
use chrono::{DateTime, Local};
use std::{
    io::{BufRead, IsTerminal, Write},
    path::{Path, PathBuf},
};
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tokio_serial::{DataBits, SerialPortBuilderExt, SerialStream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Timestamp pattern shared by the three log file names
pub const LOG_NAME_TIME_FORMAT: &str = "%Y-%m-%d-%H_%M_%S";

/// The three append-only logs of one session
pub struct LogFiles {
    pub trace: File,
    pub full: File,
    pub point: File,
    pub paths: [PathBuf; 3],
}

/// Paths of the trace, full-data and point logs for a session start time
pub fn log_file_paths(dir: &Path, started: &DateTime<Local>) -> [PathBuf; 3] {
    let stamp = started.format(LOG_NAME_TIME_FORMAT).to_string();
    [
        dir.join(format!("trace_{}.log", stamp)),
        dir.join(format!("allData_{}.log", stamp)),
        dir.join(format!("pointData_{}.log", stamp)),
    ]
}

/// Create the session logs. Any failure here is fatal for the recorder.
pub async fn create_log_files(dir: &Path, started: &DateTime<Local>) -> Result<LogFiles> {
    tokio::fs::create_dir_all(dir).await?;

    let paths = log_file_paths(dir, started);
    Ok(LogFiles {
        trace: create_log(&paths[0]).await?,
        full: create_log(&paths[1]).await?,
        point: create_log(&paths[2]).await?,
        paths,
    })
}

async fn create_log(path: &Path) -> Result<File> {
    File::create(path)
        .await
        .map_err(|e| GpsError::Other(format!("Failed to create {}: {}", path.display(), e)))
}

/// Open the GPS receiver's serial port (8 data bits)
pub fn open_serial(port: &str, baudrate: u32) -> Result<SerialStream> {
    tokio_serial::new(port, baudrate)
        .data_bits(DataBits::Eight)
        .open_native_async()
        .map_err(|e| GpsError::Connection(format!("Failed to open serial port {}: {}", port, e)))
}

/// Read sentence lines and broadcast each one until EOF or shutdown.
///
/// Input is split on bytes, so non-UTF-8 noise only spoils its own line.
/// Returns the number of lines broadcast.
pub async fn feed_lines<R>(
    mut reader: R,
    fanout: &mut Fanout,
    shutdown: &CancellationToken,
) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut count = 0;

    loop {
        buf.clear();
        let read = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = reader.read_until(b'\n', &mut buf) => read?,
        };
        if read == 0 {
            break; // EOF
        }

        // Line noise decodes to replacement chars and fails sentence checks
        let line = String::from_utf8_lossy(&buf);
        let sentence = line.trim();
        if !sentence.is_empty() {
            fanout.broadcast(sentence).await?;
            count += 1;
        }
    }

    Ok(count)
}

/// Prompt for stake annotations and queue each entry for the merger.
///
/// Blocking: runs on its own thread so a pending console read never holds
/// up the runtime. Stops at end of input, on shutdown, or when the merger
/// is gone.
pub fn read_commands<R, O>(
    mut reader: R,
    out: &mut O,
    commands: mpsc::Sender<String>,
    shutdown: &CancellationToken,
) -> Result<()>
where
    R: BufRead,
    O: Write,
{
    let mut line = String::new();

    while !shutdown.is_cancelled() {
        render_prompt(out)?;

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        let entry = line.trim_end_matches(|c| c == '\n' || c == '\r');
        render_entry_echo(out, entry)?;

        if commands.blocking_send(entry.to_string()).is_err() {
            return Err(GpsError::ChannelClosed("command".to_string()));
        }
    }

    Ok(())
}

/// Whole-session recorder: serial port in, three logs out
pub struct StakeRecorder {
    config: RecorderConfig,
    context: PipelineContext,
}

impl StakeRecorder {
    pub fn new(config: RecorderConfig) -> Self {
        let context = PipelineContext::new()
            .with_sentence_queue_capacity(config.sentence_queue_capacity)
            .with_command_queue_capacity(config.command_queue_capacity);
        Self { config, context }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.context.shutdown_token()
    }

    /// Run until the serial stream ends and the operator closes the console,
    /// or until shutdown is requested.
    pub async fn run(&self) -> Result<()> {
        let shutdown = self.context.shutdown_token();

        let started = Local::now();
        let logs = create_log_files(&self.config.output_dir, &started).await?;
        for path in &logs.paths {
            info!(path = %path.display(), "log created");
        }

        let Pipeline {
            mut fanout,
            commands,
            trace,
            full,
            merger,
            ..
        } = self.context.spawn(PipelineOutputs {
            trace_log: logs.trace,
            full_log: logs.full,
            point_log: logs.point,
            dump_output: std::io::stdout(),
            styled_dump: std::io::stdout().is_terminal(),
        });

        info!(
            port = %self.config.serial_port,
            baudrate = self.config.baudrate,
            "connecting to GPS receiver"
        );
        let serial = open_serial(&self.config.serial_port, self.config.baudrate)?;
        info!("connected");

        let console_shutdown = shutdown.clone();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            if let Err(e) = read_commands(stdin.lock(), &mut stdout, commands, &console_shutdown) {
                warn!("console input stopped: {}", e);
            }
        });

        match feed_lines(BufReader::new(serial), &mut fanout, &shutdown).await {
            Ok(count) => info!(lines = count, "serial input ended"),
            Err(e) => error!("Error reading from serial port: {}", e),
        }
        drop(fanout);

        for (name, handle) in [("trace", trace), ("full-data", full)] {
            match handle.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(sink = name, "sink failed: {}", e),
                Err(e) => warn!(sink = name, "sink task panicked: {}", e),
            }
        }

        // The operator can keep annotating against the last fix
        match merger.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("annotation merger failed: {}", e),
            Err(e) => warn!("annotation merger panicked: {}", e),
        }

        Ok(())
    }
}

/// List available serial ports
pub fn list_serial_ports() -> Result<()> {
    let ports = tokio_serial::available_ports()?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session_start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 9, 27, 8, 5, 9).unwrap()
    }

    #[test]
    fn test_log_file_names() {
        let paths = log_file_paths(Path::new("/tmp/run"), &session_start());
        assert_eq!(paths[0], PathBuf::from("/tmp/run/trace_2024-09-27-08_05_09.log"));
        assert_eq!(paths[1], PathBuf::from("/tmp/run/allData_2024-09-27-08_05_09.log"));
        assert_eq!(paths[2], PathBuf::from("/tmp/run/pointData_2024-09-27-08_05_09.log"));
    }

    #[tokio::test]
    async fn test_create_log_files() {
        let dir = tempfile::tempdir().unwrap();
        let logs = create_log_files(&dir.path().join("session"), &session_start())
            .await
            .unwrap();

        for path in &logs.paths {
            assert!(path.exists(), "{} missing", path.display());
        }
    }

    #[tokio::test]
    async fn test_create_log_files_fails_on_bad_dir() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        assert!(create_log_files(&blocker, &session_start()).await.is_err());
    }

    #[tokio::test]
    async fn test_feed_lines_broadcasts_trimmed_lines() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut fanout = Fanout::new();
        fanout.add_outlet("test", tx);

        let input: &[u8] = b"$GPGGA,1\r\n\r\n$GPVTG,2\n";
        let count = feed_lines(input, &mut fanout, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(rx.recv().await.as_deref(), Some("$GPGGA,1"));
        assert_eq!(rx.recv().await.as_deref(), Some("$GPVTG,2"));
    }

    #[tokio::test]
    async fn test_feed_lines_skips_non_utf8_noise() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut fanout = Fanout::new();
        fanout.add_outlet("test", tx);

        let input: &[u8] =
            b"\xff\xfe noise\n$GPGGA,123456.00,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,\n";
        let count = feed_lines(input, &mut fanout, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(count, 2);
        let noise = rx.recv().await.unwrap();
        assert!(crate::gps::nmea::classify(&noise).is_none());
        let sentence = rx.recv().await.unwrap();
        assert!(sentence.starts_with("$GPGGA,123456.00,"));
        assert!(crate::gps::NmeaParser::new().parse(&sentence).is_some());
    }

    #[test]
    fn test_read_commands_prompts_and_queues() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut out = Vec::new();

        let input: &[u8] = b"wp12\nok\r\n";
        read_commands(input, &mut out, tx, &CancellationToken::new()).unwrap();

        assert_eq!(rx.try_recv().as_deref(), Ok("wp12"));
        assert_eq!(rx.try_recv().as_deref(), Ok("ok"));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Enter Stake Num: Entered stake Num: wp12\n\
             Enter Stake Num: Entered stake Num: ok\n\
             Enter Stake Num: "
        );
    }

    #[test]
    fn test_read_commands_fails_without_merger() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let mut out = Vec::new();
        let input: &[u8] = b"stake-1\n";
        let result = read_commands(input, &mut out, tx, &CancellationToken::new());
        assert!(matches!(result, Err(GpsError::ChannelClosed(_))));
    }

    #[test]
    fn test_read_commands_stops_after_shutdown() {
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let mut out = Vec::new();
        let input: &[u8] = b"stake-1\n";
        read_commands(input, &mut out, tx, &shutdown).unwrap();

        assert!(out.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_end_to_end_session_logs() {
        let dir = tempfile::tempdir().unwrap();
        let logs = create_log_files(dir.path(), &session_start()).await.unwrap();
        let [trace_path, full_path, point_path] = logs.paths.clone();

        let context = PipelineContext::new();
        let Pipeline { mut fanout, commands, trace, full, merger, .. } =
            context.spawn(PipelineOutputs {
                trace_log: logs.trace,
                full_log: logs.full,
                point_log: logs.point,
                dump_output: Vec::new(),
                styled_dump: false,
            });

        let input: &[u8] = b"$GPGGA,123456.00,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,\n";
        feed_lines(input, &mut fanout, &context.shutdown_token())
            .await
            .unwrap();
        drop(fanout);
        drop(commands);

        trace.await.unwrap().unwrap();
        full.await.unwrap().unwrap();
        merger.await.unwrap().unwrap();

        let trace_log = std::fs::read_to_string(trace_path).unwrap();
        let full_log = std::fs::read_to_string(full_path).unwrap();
        let point_log = std::fs::read_to_string(point_path).unwrap();

        assert_eq!(trace_log, "48.1173,11.51666667,0.000000\n");
        assert_eq!(full_log.lines().count(), 1);
        assert!(point_log.is_empty());
    }
}
