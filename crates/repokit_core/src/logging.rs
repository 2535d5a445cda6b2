//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Start rolling file logs for repository diagnostics exactly once.
//! - Capture panics as sanitized log events.
//!
//! # Invariants
//! - Initialization is idempotent for an identical `LoggingConfig`.
//! - A conflicting level or directory is rejected, never applied.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "repokit";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct LoggingState {
    config: LoggingConfig,
    _logger: LoggerHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnsupportedLevel(String),
    EmptyLogDir,
    RelativeLogDir(String),
    CreateDir { dir: PathBuf, message: String },
    Backend(String),
    Conflict { active: String, requested: String },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyLogDir => write!(f, "log_dir cannot be empty"),
            Self::RelativeLogDir(dir) => {
                write!(f, "log_dir must be an absolute path, got `{dir}`")
            }
            Self::CreateDir { dir, message } => write!(
                f,
                "failed to create log directory `{}`: {message}",
                dir.display()
            ),
            Self::Backend(message) => write!(f, "failed to start logger: {message}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already initialized with {active}; refusing to switch to {requested}"
            ),
        }
    }
}

impl Error for LoggingError {}

/// Validated logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    level: &'static str,
    log_dir: PathBuf,
}

impl LoggingConfig {
    /// Normalizes `level` and checks that `log_dir` is absolute.
    pub fn new(level: &str, log_dir: impl AsRef<Path>) -> Result<Self, LoggingError> {
        Ok(Self {
            level: normalize_level(level)?,
            log_dir: normalize_log_dir(log_dir.as_ref())?,
        })
    }

    /// Uses `default_log_level()` for the current build.
    pub fn with_default_level(log_dir: impl AsRef<Path>) -> Result<Self, LoggingError> {
        Self::new(default_log_level(), log_dir)
    }

    pub fn level(&self) -> &'static str {
        self.level
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn describe(&self) -> String {
        format!("level `{}` at `{}`", self.level, self.log_dir.display())
    }
}

/// Starts file logging for `config`.
///
/// # Errors
/// - `LoggingError::Conflict` when logging is already active with a
///   different configuration.
/// - `LoggingError::CreateDir` / `LoggingError::Backend` when the backend
///   cannot be started.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let state = LOGGING_STATE.get_or_try_init(|| start_backend(config))?;
    if state.config != *config {
        return Err(LoggingError::Conflict {
            active: state.config.describe(),
            requested: config.describe(),
        });
    }
    Ok(())
}

/// Returns the active configuration, if logging was started.
pub fn logging_status() -> Option<LoggingConfig> {
    LOGGING_STATE.get().map(|state| state.config.clone())
}

/// `debug` in debug builds, `info` in release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_backend(config: &LoggingConfig) -> Result<LoggingState, LoggingError> {
    std::fs::create_dir_all(&config.log_dir).map_err(|err| LoggingError::CreateDir {
        dir: config.log_dir.clone(),
        message: err.to_string(),
    })?;

    let logger = Logger::try_with_str(config.level)
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(config.log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    install_panic_hook_once();

    info!(
        "event=logging_init module=logging status=ok level={} log_dir={} version={}",
        config.level,
        config.log_dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(LoggingState {
        config: config.clone(),
        _logger: logger,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, LoggingError> {
    let text = log_dir.to_string_lossy();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(LoggingError::EmptyLogDir);
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(LoggingError::RelativeLogDir(trimmed.to_string()));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=logging status=error location={} payload={}",
            location,
            panic_payload_summary(panic_info)
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, normalize_level, sanitize_message, LoggingConfig,
        LoggingError,
    };

    #[test]
    fn config_normalizes_level() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let config = LoggingConfig::new(" WARNING ", dir.path()).expect("level should normalize");
        assert_eq!(config.level(), "warn");
        assert_eq!(normalize_level("INFO").expect("INFO should normalize"), "info");
        assert_eq!(
            normalize_level("loud").expect_err("unknown level must fail"),
            LoggingError::UnsupportedLevel("loud".to_string())
        );
    }

    #[test]
    fn config_rejects_relative_and_empty_dirs() {
        assert_eq!(
            LoggingConfig::new("info", "logs/dev").expect_err("relative dir must fail"),
            LoggingError::RelativeLogDir("logs/dev".to_string())
        );
        assert_eq!(
            LoggingConfig::new("info", "  ").expect_err("empty dir must fail"),
            LoggingError::EmptyLogDir
        );
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let other_dir = tempfile::tempdir().expect("temp dir should be created");
        let config = LoggingConfig::new("info", dir.path()).expect("config should build");

        init_logging(&config).expect("first init should succeed");
        init_logging(&config).expect("same config should be idempotent");

        let louder = LoggingConfig::new("debug", dir.path()).expect("config should build");
        let level_error = init_logging(&louder).expect_err("level conflict should fail");
        assert!(level_error.to_string().contains("refusing to switch"));

        let moved = LoggingConfig::new("info", other_dir.path()).expect("config should build");
        let dir_error = init_logging(&moved).expect_err("directory conflict should fail");
        assert!(matches!(dir_error, LoggingError::Conflict { .. }));

        assert_eq!(logging_status(), Some(config));
    }
}
