use std::fs::{File, OpenOptions};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default name for `--log` without a value
pub const DEFAULT_LOG_FILE: &str = "memory-guard-rs.log";

/// Transport mode for MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// stdio transport (default) - for local MCP clients
    Stdio,
    /// Streamable HTTP transport - for remote/web access
    Stream,
}

impl TransportMode {
    pub fn from_stream_flag(stream: bool) -> Self {
        if stream {
            TransportMode::Stream
        } else {
            TransportMode::Stdio
        }
    }

    /// stdio carries the protocol itself, so stderr must stay quiet there.
    fn logs_to_stderr(self) -> bool {
        self == TransportMode::Stream
    }
}

fn open_log(path: &str) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize logging based on transport mode
///
/// - stdio: file only, and only when `log_file` is given
/// - stream: stderr, plus the file when `log_file` is given
///
/// Level comes from `RUST_LOG`, defaulting to `info`.
pub fn init_logging(mode: TransportMode, log_file: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let file_layer = match log_file {
        Some(path) => Some(fmt::layer().with_writer(open_log(&path)?).with_ansi(false)),
        None => None,
    };
    let console_layer = mode
        .logs_to_stderr()
        .then(|| fmt::layer().with_writer(std::io::stderr));

    if file_layer.is_none() && console_layer.is_none() {
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}
