//! Capture what a function writes to the `sys` output channels.
//!
//! The channel's sink is redefined with an in-memory [`BufferSink`] for the
//! duration of one call, then restored, even if the call panics.
//!
//! # Examples
//!
//! ```
//! use redef::sys;
//! use redef_capture::stdout_of;
//!
//! let captured = stdout_of(|| {
//!     sys::println("arrr!").unwrap();
//!     "punch"
//! })
//! .unwrap();
//!
//! assert_eq!(captured.output, "arrr!\n");
//! assert_eq!(captured.returned, "punch");
//! ```

use redef::sys::{self, STDERR, STDOUT};
use redef::{Member, Redef, RedefOptions};

pub use redef::sys::BufferSink;

/// Text written to a channel during one call, plus the call's return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput<R> {
    pub output: String,
    pub returned: R,
}

/// Run `f` with `channel` redirected into a buffer.
///
/// Whatever `f` returns, including an `Err`, comes back unchanged in
/// [`CapturedOutput::returned`]. A panic in `f` propagates after the channel
/// has been restored.
///
/// Only writes made through [`redef::sys`] on the calling thread are
/// captured. The `sys` namespace is per-thread, so a thread spawned inside
/// `f` still writes to its own default sinks. Text sent straight to
/// `std::io::stdout`/`stderr` bypasses the channel as well; the default
/// [`sys::StderrSink`] is one such writer, so misuse reports outside a
/// capture are not intercepted by the test harness.
///
/// # Errors
///
/// [`redef::RedefError::MissingMember`] if `channel` is not a `sys` member.
#[track_caller]
pub fn capture_output<F, R>(channel: &str, f: F) -> redef::Result<CapturedOutput<R>>
where
    F: FnOnce() -> R,
{
    let sys = sys::namespace();
    let buffer = BufferSink::new();
    let mut binding =
        Redef::new(&sys, channel, Some(Member::stream(buffer.clone())), RedefOptions::default())?;

    let returned = f();
    binding.release();

    let output = buffer.contents();
    tracing::trace!(channel, bytes = output.len(), "captured channel output");
    Ok(CapturedOutput { output, returned })
}

/// [`capture_output`] on the stdout channel.
#[track_caller]
pub fn stdout_of<F, R>(f: F) -> redef::Result<CapturedOutput<R>>
where
    F: FnOnce() -> R,
{
    capture_output(STDOUT, f)
}

/// [`capture_output`] on the stderr channel.
#[track_caller]
pub fn stderr_of<F, R>(f: F) -> redef::Result<CapturedOutput<R>>
where
    F: FnOnce() -> R,
{
    capture_output(STDERR, f)
}
