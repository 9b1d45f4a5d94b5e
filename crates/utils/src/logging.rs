//! Process-wide logging setup.
//!
//! Records are emitted with `tracing` throughout the crate. Errors go to
//! standard error, informational records and above are optionally forwarded
//! to the system log through the `logger` command, one JSON line per record.

use std::{
    io::{self, Write},
    process::{Command, ExitStatus, Stdio},
};

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::LoggingConfig;

/// Program used to hand records over to the system log.
pub const SYSLOG_COMMAND: &str = "logger";

/// Errors that can occur while setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// A global subscriber was already installed in this process.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Installs the global subscriber described by the configuration.
///
/// Meant to be called once at startup, later calls leave the installed
/// sinks untouched and return [`LoggingError::AlreadyInitialized`].
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let stderr = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::ERROR);

    let syslog = config.syslog.then(|| {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(SyslogMakeWriter::new(&config.syslog_ident))
            .with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
    });

    tracing_subscriber::registry()
        .with(stderr)
        .with(syslog)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

/// Creates a [`SyslogWriter`] for every record.
#[derive(Debug, Clone)]
pub struct SyslogMakeWriter {
    ident: String,
    command: String,
}

impl SyslogMakeWriter {
    pub fn new(ident: &str) -> Self {
        Self::with_command(ident, SYSLOG_COMMAND)
    }

    /// Creates a writer factory invoking a custom program instead of
    /// [`SYSLOG_COMMAND`], the program receives `-t <ident> <record>`.
    pub fn with_command(ident: &str, command: &str) -> Self {
        Self {
            ident: ident.to_string(),
            command: command.to_string(),
        }
    }
}

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    type Writer = SyslogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SyslogWriter {
            ident: self.ident.clone(),
            command: self.command.clone(),
            buffer: Vec::new(),
        }
    }
}

/// Buffers one formatted record and forwards it to the system log when
/// dropped, waiting for the forwarding program to finish.
///
/// When the forwarding program can not be started the record is written to
/// standard error instead, so it is never silently lost.
#[derive(Debug)]
pub struct SyslogWriter {
    ident: String,
    command: String,
    buffer: Vec<u8>,
}

impl SyslogWriter {
    /// Returns the buffered record without its trailing newline, `None` when
    /// nothing was written.
    fn take_record(&mut self) -> Option<String> {
        let buffer = std::mem::take(&mut self.buffer);
        let record = String::from_utf8_lossy(&buffer).trim_end().to_string();
        (!record.is_empty()).then_some(record)
    }

    /// Runs the forwarding program for one record and waits for it to
    /// exit, so no child process outlives its record.
    fn deliver(&self, record: &str) -> io::Result<ExitStatus> {
        Command::new(&self.command)
            .arg("-t")
            .arg(&self.ident)
            .arg(record)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
    }

    fn forward(&mut self) {
        let Some(record) = self.take_record() else {
            return;
        };
        match self.deliver(&record) {
            Ok(status) if status.success() => {}
            Ok(status) => {
                eprintln!("{} exited with {status} for record\n{record}", self.command)
            }
            Err(e) => eprintln!("Failed to forward record to {}: {e}\n{record}", self.command),
        }
    }
}

impl Write for SyslogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SyslogWriter {
    fn drop(&mut self) {
        self.forward();
    }
}
