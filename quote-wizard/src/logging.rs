use anyhow::Result;
use chrono::Local;
use std::{
    fs::File,
    io::{self, IsTerminal, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};
use tracing::{Event, Level, Subscriber, error};
use tracing_subscriber::{
    EnvFilter,
    Layer, // Layer is used by .with_filter() on the console layer below
    fmt::{
        FmtContext, MakeWriter,
        format::{FormatEvent, FormatFields, Writer},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
};

use crate::config::LoggingSection;

// --- Formatter ---

struct LocalFmt;

impl<S, N> FormatEvent<S, N> for LocalFmt
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        if ansi {
            write!(writer, "\x1b[2m")?
        }
        write!(writer, "{} ", Local::now().format("%H:%M:%S%.3f"))?;
        if ansi {
            write!(writer, "\x1b[0m")?
        }

        let (pre, post) = if ansi {
            match *meta.level() {
                Level::ERROR => ("\x1b[1;31m", "\x1b[0m"),
                Level::WARN => ("\x1b[1;33m", "\x1b[0m"),
                Level::INFO => ("\x1b[1;32m", "\x1b[0m"),
                Level::DEBUG => ("\x1b[1;34m", "\x1b[0m"),
                Level::TRACE => ("\x1b[1;35m", "\x1b[0m"),
            }
        } else {
            ("", "")
        };
        write!(writer, "{}{:>5}{} ", pre, meta.level(), post)?;

        // Module path reads better than file:line across four crates.
        if let Some(target) = meta.module_path() {
            if ansi {
                write!(writer, "\x1b[36m{target}\x1b[0m ")?;
            } else {
                write!(writer, "{target} ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// --- Late-bound file writer ---

type SharedFile = Arc<Mutex<Option<File>>>;

fn lock_slot(slot: &SharedFile) -> MutexGuard<'_, Option<File>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A MakeWriter that can be pointed at a file after initialization.
/// While no file is set, all writes are discarded.
#[derive(Clone)]
struct FileSlot(SharedFile);

struct SlotWriter<'a>(MutexGuard<'a, Option<File>>);

impl Write for SlotWriter<'_> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        match &mut *self.0 {
            Some(f) => f.write(buf),
            None => Ok(buf.len()),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.0 {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for FileSlot {
    type Writer = SlotWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SlotWriter(lock_slot(&self.0))
    }
}

// --- Statics ---

type SetBoolFn = Box<dyn Fn(bool) -> Result<()> + Send + Sync>;

static SET_CONSOLE_ENABLED: OnceLock<SetBoolFn> = OnceLock::new();
static FILE_SLOT: OnceLock<SharedFile> = OnceLock::new();

/// Expands a bare level into a directive that keeps sqlx statement logging
/// at `warn`. Anything that already looks like a directive is used as is.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        return "info,sqlx=warn".to_string();
    }
    if level.contains(['=', ',']) {
        level.to_string()
    } else {
        format!("{},sqlx=warn", level.to_ascii_lowercase())
    }
}

fn make_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(filter_directive(level))
            .unwrap_or_else(|_| EnvFilter::new(filter_directive("info")))
    })
}

fn store_console_handle<S>(handle: reload::Handle<EnvFilter, S>)
where
    S: Subscriber + Send + Sync + 'static,
{
    let _ = SET_CONSOLE_ENABLED.set(Box::new(move |enabled: bool| {
        // "trace" passes everything through; the global filter is still the ceiling.
        let filter = if enabled {
            EnvFilter::new("trace")
        } else {
            EnvFilter::new("off")
        };
        handle
            .reload(filter)
            .map_err(|e| anyhow::anyhow!("console reload failed: {e}"))
    }));
}

// --- Public API ---

/// Shows or hides stderr log output without affecting file logging.
pub fn set_console_enabled(enabled: bool) -> Result<()> {
    match SET_CONSOLE_ENABLED.get() {
        Some(f) => f(enabled),
        None => anyhow::bail!("logging not yet initialized"),
    }
}

/// Points the file layer at `path`, replacing any open log file.
/// The directory must already exist.
fn enable_file_logging(path: &Path) -> Result<()> {
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("cannot open log file '{}': {e}", path.display()))?;

    match FILE_SLOT.get() {
        Some(slot) => {
            *lock_slot(slot) = Some(file);
            Ok(())
        }
        None => anyhow::bail!("logging not yet initialized"),
    }
}

/// Initializes logging from the `[logging]` config section. Call once at
/// startup.
///
/// - Console: stderr, so stdout stays clean for command output. Colored
///   when attached to a terminal.
/// - File: opened when `settings.file` is set.
/// - Level: `settings.level`, or the RUST_LOG env var when set.
pub fn init_logging(settings: &LoggingSection) -> Result<()> {
    let file_inner: SharedFile = Arc::new(Mutex::new(None));
    let _ = FILE_SLOT.set(file_inner.clone());

    let (console_gate, console_handle) = reload::Layer::new(EnvFilter::new("trace"));
    let level_filter = make_filter(&settings.level);

    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(LocalFmt)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_filter(console_gate);

    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(LocalFmt)
        .with_ansi(false)
        .with_writer(FileSlot(file_inner));

    if tracing_subscriber::registry()
        .with(level_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        store_console_handle(console_handle);
    }

    if let Some(path) = &settings.file {
        enable_file_logging(path)?;
    }
    Ok(())
}

/// Logs a failed best-effort step without aborting the caller.
pub fn log_task_error(
    task_name: &'static str,
    result: Result<()>,
) {
    if let Err(error) = result {
        error!(task = task_name, error = %format!("{error:#}"), "background task failed");
    }
}
