//! Environment-driven configuration.
//!
//! `REDEF_MISUSE_REPORT` selects where must-call violations go:
//!
//! - `channel` or `stderr`: write to the `sys` stderr channel and log (default)
//! - `log` or `tracing`: log through `tracing` only
//! - `off`, `silent` or `none`: drop the report

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Environment variable selecting the [`ReportTarget`].
pub const MISUSE_REPORT_ENV: &str = "REDEF_MISUSE_REPORT";

static CONFIG: OnceLock<RedefConfig> = OnceLock::new();

/// Destination of misuse reports emitted when a binding is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportTarget {
    #[default]
    Channel,
    Log,
    Silent,
}

impl FromStr for ReportTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "channel" | "stderr" => Ok(Self::Channel),
            "log" | "tracing" => Ok(Self::Log),
            "off" | "silent" | "none" => Ok(Self::Silent),
            other => Err(format!("unknown misuse report target: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedefConfig {
    pub report: ReportTarget,
}

impl RedefConfig {
    /// Read configuration from the environment, ignoring the global cache.
    pub fn from_env() -> Self {
        let report = match env::var(MISUSE_REPORT_ENV) {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!(var = MISUSE_REPORT_ENV, value = %raw, "{err}; using default");
                ReportTarget::default()
            }),
            Err(_) => ReportTarget::default(),
        };
        Self { report }
    }

    /// Configuration read once per process.
    pub fn global() -> &'static Self {
        CONFIG.get_or_init(Self::from_env)
    }
}
