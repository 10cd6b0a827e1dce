//! Redefine namespace members for the duration of a test.
//!
//! `redef` swaps one member of a [`Namespace`] for a replacement, records
//! every call made to the substitute, and restores the original when the
//! returned [`Redef`] is released or dropped, whether the test passed,
//! failed, or panicked.
//!
//! - [`redef`] replaces a member outright.
//! - [`wiretap`] keeps the member's behaviour and only records calls.
//! - [`sys`] routes process output through swappable `stdout`/`stderr`
//!   channels so output can be captured the same way.
//!
//! A binding whose must-call policy is violated is reported on the `sys`
//! stderr channel when it is released (see [`config`] to redirect that).

pub mod args;
pub mod binding;
pub mod config;
pub mod error;
pub mod namespace;
pub mod recorder;
pub mod report;
pub mod sys;

pub use args::CallArgs;
pub use binding::{Redef, RedefOptions, redef, redef_with, wiretap, wiretap_with};
pub use config::{RedefConfig, ReportTarget};
pub use error::{RedefError, Result};
pub use namespace::{Callable, Function, Member, Namespace, Receiver};
pub use recorder::CallRecord;
pub use report::{Misuse, MisuseReport};
pub use serde_json::{Map, Value};
pub use sys::{BufferSink, Sink};
