//! Must-call misuse diagnostics.
//!
//! A binding that breaks its must-call policy is never an error: the report
//! is written to the `sys` stderr channel (or only logged, see
//! [`crate::config`]) and restoration carries on.

use crate::config::ReportTarget;
use crate::sys;
use std::fmt;

/// Fixed guidance line included in every report.
pub const GUIDANCE: &str =
    "Mis-called redefs could be due to test crashes unless explicitly tested using the must_call option";

/// Which side of the must-call policy was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Misuse {
    /// `must_call` was set and the substitute never ran.
    NotCalled,
    /// `must_call` was cleared and the substitute ran anyway.
    CalledUnexpectedly,
}

impl Misuse {
    /// Evaluate the policy against the lifetime call status.
    pub fn check(must_call: bool, was_called: bool) -> Option<Self> {
        match (must_call, was_called) {
            (true, false) => Some(Self::NotCalled),
            (false, true) => Some(Self::CalledUnexpectedly),
            _ => None,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::NotCalled => "was not called and should have been called",
            Self::CalledUnexpectedly => "was called and should not have been called",
        }
    }
}

impl fmt::Display for Misuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One misuse diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MisuseReport {
    pub member: String,
    pub kind: Misuse,
    /// `file:line:column` where the binding was created.
    pub origin: String,
}

impl fmt::Display for MisuseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "redef'd function '{}' {}.", self.member, self.kind)?;
        writeln!(f, "\t{GUIDANCE}")?;
        writeln!(f, "\t{}", self.origin)
    }
}

impl MisuseReport {
    /// Log the report and, for [`ReportTarget::Channel`], write it to stderr.
    pub(crate) fn emit(&self, target: ReportTarget) {
        if target == ReportTarget::Silent {
            return;
        }
        tracing::warn!(
            member = %self.member,
            kind = ?self.kind,
            origin = %self.origin,
            "redef misuse: {}",
            self.kind
        );
        if target == ReportTarget::Channel {
            // A diagnostic must never interrupt restoration.
            if let Err(err) = sys::eprint(&self.to_string()) {
                tracing::debug!(error = %err, "could not write misuse report");
            }
        }
    }
}
