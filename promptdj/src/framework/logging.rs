use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;
use termcolor::{Color, ColorSpec, WriteColor};

pub use log::{debug, error, info, trace, warn};

pub fn init_logger() {
    let mut builder = Builder::from_env(
        Env::default().default_filter_or("promptdj=info,performer=info"),
    );
    builder.filter_module("midir", LevelFilter::Warn);
    builder.filter_module("cpal", LevelFilter::Warn);

    builder.format(|_buf, record| {
        let writer =
            termcolor::BufferWriter::stderr(termcolor::ColorChoice::Auto);
        let mut buffer = writer.buffer();
        let mut spec = ColorSpec::new();

        spec.set_fg(Some(match record.level() {
            log::Level::Trace => Color::Cyan,
            log::Level::Debug => Color::Blue,
            log::Level::Info => Color::Green,
            log::Level::Warn => Color::Yellow,
            log::Level::Error => Color::Red,
        }));

        buffer.set_color(&spec)?;
        let module_path = record.module_path().unwrap_or("<unknown>");
        write!(buffer, "[{}][{}]", record.level(), module_path)?;
        buffer.reset()?;
        writeln!(buffer, " {}", record.args())?;
        writer.print(&buffer)?;
        Ok(())
    });

    let _ = builder.try_init();
}

/// Log at debug level at most once every `$interval_ms` per call site. Used
/// from the per-frame path.
#[macro_export]
macro_rules! debug_throttled {
    ($interval_ms:expr, $($arg:tt)+) => {{
        use std::sync::Mutex;
        use std::time::{Duration, Instant};
        static LAST: Mutex<Option<Instant>> = Mutex::new(None);
        let now = Instant::now();
        if let Ok(mut last) = LAST.lock() {
            let due = last.is_none_or(|at| {
                now.duration_since(at) >= Duration::from_millis($interval_ms)
            });
            if due {
                *last = Some(now);
                $crate::framework::logging::debug!($($arg)+);
            }
        }
    }};
}

/// Log at warn level only the first time this call site is reached.
#[macro_export]
macro_rules! warn_once {
    ($($arg:tt)+) => {{
        use std::sync::atomic::{AtomicBool, Ordering};
        static WARNED: AtomicBool = AtomicBool::new(false);
        if !WARNED.swap(true, Ordering::Relaxed) {
            $crate::framework::logging::warn!($($arg)+);
        }
    }};
}
