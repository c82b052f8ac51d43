use crate::config::{LoggingConfig, Section};
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const DEFAULT_KEY: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;

// Keeps the non-blocking console worker alive for the whole process.
static CONSOLE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// `None` means the sink is switched off for that target.
fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" | "none" => None,
        _ => Some(LevelFilter::INFO),
    }
}

/// Returns true if target == prefix or target starts with "prefix::"
fn matches_target_prefix(target: &str, prefix: &str) -> bool {
    target == prefix || (target.starts_with(prefix) && target[prefix.len()..].starts_with("::"))
}

// ================= rotating file sinks =================

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

fn poisoned() -> io::Error {
    io::Error::other("log file lock poisoned")
}

/// Writer handle that drops records when no file is routed for the target.
struct FileHandle(Option<SharedRotate>);

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.0 {
            Some(file) => file.lock().map_err(|_| poisoned())?.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.0 {
            Some(file) => file.lock().map_err(|_| poisoned())?.flush(),
            None => Ok(()),
        }
    }
}

/// Routes each record to the file of the longest matching target prefix,
/// falling back to the default file.
#[derive(Clone, Default)]
struct FileRouter {
    fallback: Option<SharedRotate>,
    // sorted by descending prefix length
    routes: Vec<(String, SharedRotate)>,
}

impl FileRouter {
    fn route(&self, target: &str) -> Option<SharedRotate> {
        self.routes
            .iter()
            .find(|(prefix, _)| matches_target_prefix(target, prefix))
            .map(|(_, file)| file.clone())
            .or_else(|| self.fallback.clone())
    }

    fn is_empty(&self) -> bool {
        self.fallback.is_none() && self.routes.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = FileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        FileHandle(self.fallback.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        FileHandle(self.route(meta.target()))
    }
}

fn open_rotating(section: &Section, base_dir: &Path) -> io::Result<Option<SharedRotate>> {
    let file = section.file.trim();
    if file.is_empty() {
        return Ok(None);
    }

    let path = if Path::new(file).is_absolute() {
        PathBuf::from(file)
    } else {
        base_dir.join(file)
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Prefer a file count limit; otherwise expire by age.
    let limit = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(
            i64::from(section.max_age_days.unwrap_or(1)),
        )),
    };
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) as usize * 1024 * 1024;

    let rotate = FileRotate::new(
        &path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    );
    Ok(Some(Arc::new(Mutex::new(rotate))))
}

fn build_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter::default();
    for (target, section) in cfg {
        let file = match open_rotating(section, base_dir) {
            Ok(Some(file)) => file,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Failed to open log file '{}' for '{target}': {e}", section.file);
                continue;
            }
        };
        if target == DEFAULT_KEY {
            router.fallback = Some(file);
        } else {
            router.routes.push((target.clone(), file));
        }
    }
    router
        .routes
        .sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    router
}

// ================= per-sink target filters =================

fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default = cfg
        .get(DEFAULT_KEY)
        .map(|s| parse_level(&s.console_level).unwrap_or(LevelFilter::OFF))
        .unwrap_or(LevelFilter::INFO);

    cfg.iter()
        .filter(|(target, _)| target.as_str() != DEFAULT_KEY)
        .fold(Targets::new().with_default(default), |targets, (target, section)| {
            let level = parse_level(&section.console_level).unwrap_or(LevelFilter::OFF);
            targets.with_target(target.clone(), level)
        })
}

fn file_targets(cfg: &LoggingConfig, has_fallback: bool) -> Targets {
    let default = match cfg.get(DEFAULT_KEY) {
        Some(s) if has_fallback => parse_level(&s.file_level).unwrap_or(LevelFilter::OFF),
        _ => LevelFilter::OFF,
    };

    cfg.iter()
        .filter(|(target, s)| target.as_str() != DEFAULT_KEY && !s.file.trim().is_empty())
        .fold(Targets::new().with_default(default), |targets, (target, section)| {
            let level = parse_level(&section.file_level).unwrap_or(LevelFilter::OFF);
            targets.with_target(target.clone(), level)
        })
}

// ================= public init =================

/// Install the global subscriber: human-readable console output filtered per
/// target, JSON files for sections that name one, and `RUST_LOG` as an upper
/// bound when set. Safe to call more than once; later calls are no-ops.
pub fn init_logging(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` records before the subscriber goes in.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    if cfg.is_empty() {
        init_minimal();
        return;
    }

    let router = build_router(cfg, base_dir);
    let console_filter = console_targets(cfg);
    let file_filter = file_targets(cfg, router.fallback.is_some());

    let env = EnvFilter::try_from_default_env().ok();

    let (stderr, guard) = tracing_appender::non_blocking(io::stderr());
    let _ = CONSOLE_GUARD.set(guard);

    let console_layer = fmt::layer()
        .with_writer(stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_filter);

    let file_layer = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file_filter)
    });

    let _ = Registry::default()
        .with(env)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

fn init_minimal() {
    let env = EnvFilter::try_from_default_env().ok();
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let _ = Registry::default().with(env).with(fmt_layer).try_init();
}
