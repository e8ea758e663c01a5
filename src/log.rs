//! A size-rotated log file.
//!
//! [`LogSink`] appends to `{directory}/{prefix}{n}.{suffix}` and moves on to `n + 1` once more than
//! [`LogConfig::rotate_bytes`] went into the current file. Every file session is framed by a START
//! banner with the local time and an END banner. If the file cannot be opened the sink turns into a
//! no-op, logging must never take the program down.
//!
//! [`SharedLogSink`] plugs the same file into `tracing_subscriber::fmt` as a writer.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt::MakeWriter;

use crate::config::LogConfig;

const SEPARATOR: &str = "=============================================";

/// Severity of a [`LogSink::write_value`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Fatal,
    Error,
    Warning,
    Message,
    Value,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Message => "MESSAGE",
            Level::Value => "VALUE",
        };
        f.write_str(name)
    }
}

/// A value recorded by [`LogSink::write_value`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogValue<'a> {
    Int(i64),
    Float(f64),
    Char(char),
    Pointer(*const ()),
    Str(&'a str),
}

impl fmt::Display for LogValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogValue::Int(value) => write!(f, "{}", value),
            LogValue::Float(value) => write!(f, "{}", value),
            LogValue::Char(value) => write!(f, "'{}'", value),
            LogValue::Pointer(value) => write!(f, "{:p}", *value),
            LogValue::Str(value) => write!(f, "\"{}\"", value),
        }
    }
}

macro_rules! int_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LogValue<'_> {
                fn from(value: $ty) -> Self {
                    LogValue::Int(value as i64)
                }
            }
        )*
    };
}

int_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f32> for LogValue<'_> {
    fn from(value: f32) -> Self {
        LogValue::Float(value as f64)
    }
}

impl From<f64> for LogValue<'_> {
    fn from(value: f64) -> Self {
        LogValue::Float(value)
    }
}

impl From<char> for LogValue<'_> {
    fn from(value: char) -> Self {
        LogValue::Char(value)
    }
}

impl<T> From<*const T> for LogValue<'_> {
    fn from(value: *const T) -> Self {
        LogValue::Pointer(value as *const ())
    }
}

impl<'a> From<&'a str> for LogValue<'a> {
    fn from(value: &'a str) -> Self {
        LogValue::Str(value)
    }
}

/// The rotating log file. See the [module docs](self).
pub struct LogSink {
    config: LogConfig,
    file: Option<BufWriter<File>>,
    index: usize,
    written: u64,
}

impl LogSink {
    /// Opens the first file of `config` that still has room, creating the directory if needed.
    ///
    /// Failing to open it is logged as a warning and yields a [disabled](LogSink::disabled) sink.
    pub fn open(config: LogConfig) -> Self {
        let mut sink = Self {
            config,
            file: None,
            index: 0,
            written: 0,
        };
        if let Err(err) = sink.open_current() {
            tracing::warn!(
                path = %sink.path().display(),
                %err,
                "cannot open log file, logging disabled"
            );
            sink.file = None;
        }
        sink
    }

    /// A sink that swallows everything.
    pub fn disabled() -> Self {
        Self {
            config: LogConfig::default(),
            file: None,
            index: 0,
            written: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// The file currently written to.
    pub fn path(&self) -> PathBuf {
        self.config.file_path(self.index)
    }

    /// A handle for free-form diagnostics such as stack dumps.
    pub fn file(&mut self) -> &mut dyn Write {
        self
    }

    /// Records one named value together with where it was logged from.
    ///
    /// The [`log_value!`](crate::log_value) macro fills in the name and the location.
    pub fn write_value(
        &mut self,
        value: LogValue<'_>,
        name: &str,
        file: &str,
        function: &str,
        line: u32,
        level: Level,
    ) -> io::Result<()> {
        writeln!(
            self,
            "[{}] {}:{} in {}: {} = {}",
            level, file, line, function, name, value
        )
    }

    fn open_current(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.config.directory)?;
        loop {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.path())?;
            let existing = file.metadata()?.len();
            if existing > self.config.rotate_bytes {
                self.index += 1;
                continue;
            }

            self.written = existing;
            self.file = Some(BufWriter::new(file));
            let now = chrono::Local::now().format("%a %b %e %H:%M:%S %Y");
            let banner = format!(
                "{sep}{sep}\n{now}\n{sep}START{sep}\n{sep}{sep}\n",
                sep = SEPARATOR,
                now = now
            );
            return self.write_banner(&banner);
        }
    }

    fn close_current(&mut self) -> io::Result<()> {
        let banner = format!(
            "{sep}{sep}\n{sep} END {sep}\n{sep}{sep}\n",
            sep = SEPARATOR
        );
        self.write_banner(&banner)?;
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }

    fn write_banner(&mut self, banner: &str) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(banner.as_bytes())?;
            self.written += banner.len() as u64;
        }
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.close_current()?;
        self.index += 1;
        self.written = 0;
        self.open_current()
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => return Ok(buf.len()),
        };
        let written = file.write(buf)?;
        self.written += written as u64;
        // `buf` already reached the old file; a failed reopen only silences the sink.
        if self.written > self.config.rotate_bytes && self.rotate().is_err() {
            self.file = None;
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        if self.file.is_some() {
            let _ = self.close_current();
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("path", &self.path())
            .field("enabled", &self.is_enabled())
            .field("written", &self.written)
            .finish()
    }
}

/// A [`LogSink`] shared between threads, usable as a `tracing_subscriber::fmt` writer.
#[derive(Debug, Clone)]
pub struct SharedLogSink(Arc<Mutex<LogSink>>);

impl SharedLogSink {
    pub fn new(sink: LogSink) -> Self {
        Self(Arc::new(Mutex::new(sink)))
    }

    /// Locks the sink. A writer that panicked mid-line does not make the log unusable.
    pub fn lock(&self) -> MutexGuard<'_, LogSink> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the [`SharedLogSink`] lock while `tracing` writes one event.
pub struct SharedLogWriter<'a>(MutexGuard<'a, LogSink>);

impl Write for SharedLogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a> MakeWriter<'a> for SharedLogSink {
    type Writer = SharedLogWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SharedLogWriter(self.lock())
    }
}

/// Records an expression with [`LogSink::write_value`], named after its source text.
///
/// ```no_run
/// use canary_stack::log::{Level, LogSink};
/// use canary_stack::log_value;
///
/// let mut sink = LogSink::open(Default::default());
/// let capacity = 16usize;
/// log_value!(sink, capacity, Level::Value).unwrap();
/// ```
#[macro_export]
macro_rules! log_value {
    ($sink:expr, $value:expr, $level:expr) => {
        $sink.write_value(
            $crate::log::LogValue::from($value),
            stringify!($value),
            file!(),
            $crate::function_name!(),
            line!(),
            $level,
        )
    };
}
