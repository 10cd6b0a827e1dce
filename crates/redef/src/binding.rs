//! Scoped member substitution.
//!
//! A [`Redef`] overwrites one member of a [`Namespace`] when it is created
//! and puts the original back when it is released, either explicitly through
//! [`Redef::release`] or when it goes out of scope (including unwinding from
//! a panic). Callable replacements are wrapped so every call is recorded in a
//! [`CallRecord`].
//!
//! # Calling shape
//!
//! The installed wrapper keeps the calling shape of the member it replaces:
//!
//! - a [`Receiver::Bound`] original is replaced by a `Bound` wrapper that
//!   records exactly the caller's arguments;
//! - anything else (owner functions, detached functions, data) is replaced
//!   by an owner-receiving wrapper, so the owner shows up first in the
//!   recorded arguments.
//!
//! The replacement only receives the owner when it declares
//! [`Receiver::Owner`] itself; otherwise the owner is stripped before
//! forwarding.
//!
//! ```
//! use redef::{Function, Namespace, args, redef};
//! use serde_json::json;
//!
//! let somewhere = Namespace::new("Somewhere");
//! somewhere.define("show", |a| Ok(json!(format!("Somewhere, {}", a.str(0).unwrap_or_default()))));
//!
//! {
//!     let rd_show = redef(&somewhere, "show", Function::new(|_| Ok(json!("hi")))).unwrap();
//!     assert_eq!(somewhere.call("show", args!["over the rainbow"]).unwrap(), json!("hi"));
//!     assert_eq!(rd_show.called(), 1);
//! }
//! assert_eq!(
//!     somewhere.call("show", args!["beyond the sea"]).unwrap(),
//!     json!("Somewhere, beyond the sea")
//! );
//! ```

use crate::config::{RedefConfig, ReportTarget};
use crate::report::{Misuse, MisuseReport};
use crate::{CallArgs, CallRecord, Function, Member, Namespace, Receiver, RedefError, Result};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::panic::Location;
use std::rc::Rc;

/// Policy flags for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedefOptions {
    must_exist: bool,
    must_call: bool,
    report: Option<ReportTarget>,
}

impl Default for RedefOptions {
    fn default() -> Self {
        Self { must_exist: true, must_call: true, report: None }
    }
}

impl RedefOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail construction when the member is absent (default `true`).
    pub fn must_exist(mut self, must_exist: bool) -> Self {
        self.must_exist = must_exist;
        self
    }

    /// Whether a callable replacement is expected to run before release
    /// (default `true`). When `false`, running it is the misuse.
    pub fn must_call(mut self, must_call: bool) -> Self {
        self.must_call = must_call;
        self
    }

    /// Override the process-wide [`RedefConfig`] report target.
    pub fn report(mut self, target: ReportTarget) -> Self {
        self.report = Some(target);
        self
    }
}

/// One active substitution of `member` on `target`.
#[must_use = "the original member is restored as soon as the binding is dropped"]
#[derive(Debug)]
pub struct Redef<'a> {
    target: &'a Namespace,
    member: String,
    /// Resolved through the parent chain at construction.
    original: Option<Member>,
    /// The target's own entry, put back verbatim on release.
    shadowed: Option<Member>,
    replacement: Member,
    must_call: bool,
    report: ReportTarget,
    origin: &'static Location<'static>,
    record: Rc<RefCell<CallRecord>>,
    released: bool,
}

impl<'a> Redef<'a> {
    /// Substitute `member` on `target`.
    ///
    /// `replacement` of `None` observes the original: its behaviour is kept
    /// and every call is recorded.
    ///
    /// # Errors
    ///
    /// [`RedefError::MissingMember`] when `must_exist` is set and the member
    /// is absent, or when observing a member that does not exist. The target
    /// is left untouched in both cases.
    #[track_caller]
    pub fn new(
        target: &'a Namespace,
        member: &str,
        replacement: Option<Member>,
        options: RedefOptions,
    ) -> Result<Self> {
        let origin = Location::caller();
        let original = target.get(member);
        if original.is_none() && options.must_exist {
            return Err(RedefError::missing(target.name(), member));
        }
        // observing needs something to observe
        let Some(replacement) = replacement.or_else(|| original.clone()) else {
            return Err(RedefError::missing(target.name(), member));
        };
        let shadowed = target.get_own(member);
        let record = Rc::new(RefCell::new(CallRecord::new()));

        let installed = match &replacement {
            Member::Function(forward) => {
                let shape = install_shape(original.as_ref());
                Member::Function(wrap(target, member, shape, forward.clone(), Rc::clone(&record)))
            }
            other => other.clone(),
        };
        target.set(member, installed);
        tracing::debug!(
            namespace = target.name(),
            member,
            callable = replacement.is_callable(),
            origin = %origin,
            "redef installed"
        );

        Ok(Self {
            target,
            member: member.to_string(),
            original,
            shadowed,
            replacement,
            must_call: options.must_call,
            report: options.report.unwrap_or_else(|| RedefConfig::global().report),
            origin,
            record,
            released: false,
        })
    }

    /// Put the original member back. Calling it again does nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.replacement.is_callable() {
            if let Some(kind) = Misuse::check(self.must_call, self.was_called()) {
                MisuseReport { member: self.member.clone(), kind, origin: self.origin.to_string() }
                    .emit(self.report);
            }
        }

        self.target.restore_own(&self.member, self.shadowed.take());
        tracing::debug!(
            namespace = self.target.name(),
            member = %self.member,
            calls = self.called(),
            "redef restored"
        );
    }

    /// Clear the call count and history without releasing.
    pub fn reset(&self) {
        self.record.borrow_mut().reset();
    }

    /// Calls since creation or the last [`Redef::reset`].
    pub fn called(&self) -> usize {
        self.record.borrow().count()
    }

    /// Whether the substitute ever ran; unaffected by [`Redef::reset`].
    pub fn was_called(&self) -> bool {
        self.record.borrow().was_called()
    }

    pub fn not_called(&self) -> bool {
        self.record.borrow().not_called()
    }

    /// Positional arguments of every recorded call, oldest first.
    pub fn method_args(&self) -> Vec<Vec<Value>> {
        self.record.borrow().method_args().to_vec()
    }

    pub fn named_method_args(&self) -> Vec<Map<String, Value>> {
        self.record.borrow().named_method_args().to_vec()
    }

    /// Positional arguments of the most recent call.
    pub fn last_method_args(&self) -> Option<Vec<Value>> {
        self.record.borrow().last_method_args().map(<[Value]>::to_vec)
    }

    pub fn last_named_method_args(&self) -> Option<Map<String, Value>> {
        self.record.borrow().last_named_method_args().cloned()
    }

    /// Snapshot of the call record.
    pub fn record(&self) -> CallRecord {
        self.record.borrow().clone()
    }

    pub fn target(&self) -> &'a Namespace {
        self.target
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    /// The member as resolved before substitution, if it existed.
    pub fn original(&self) -> Option<&Member> {
        self.original.as_ref()
    }

    /// The caller-supplied replacement, or the original when observing.
    pub fn replacement(&self) -> &Member {
        &self.replacement
    }

    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for Redef<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

fn install_shape(original: Option<&Member>) -> Receiver {
    match original.and_then(Member::as_function).map(Function::receiver) {
        Some(Receiver::Bound) => Receiver::Bound,
        _ => Receiver::Owner,
    }
}

/// Build the recording wrapper around `forward`, installed with `shape`.
fn wrap(
    target: &Namespace,
    member: &str,
    shape: Receiver,
    forward: Function,
    record: Rc<RefCell<CallRecord>>,
) -> Function {
    let owner = target.owner();
    let member = member.to_string();
    let call = move |args: CallArgs| {
        record.borrow_mut().capture(&args);
        tracing::trace!(member = %member, args = ?args.positional, "redef call recorded");
        let args = match (shape, forward.expects_owner()) {
            (Receiver::Owner, true) | (Receiver::Bound | Receiver::Detached, false) => args,
            (Receiver::Owner, false) => args.without_owner(),
            (Receiver::Bound | Receiver::Detached, true) => args.with_owner(owner.clone()),
        };
        forward.invoke(args)
    };
    Function::from_callable(Rc::new(call), shape)
}

/// Replace `member` on `target` with `value`.
///
/// The member must exist and a callable `value` must be called before the
/// binding is released; see [`redef_with`] to relax either.
#[track_caller]
pub fn redef<'a>(target: &'a Namespace, member: &str, value: impl Into<Member>) -> Result<Redef<'a>> {
    Redef::new(target, member, Some(value.into()), RedefOptions::default())
}

#[track_caller]
pub fn redef_with<'a>(
    target: &'a Namespace,
    member: &str,
    value: impl Into<Member>,
    options: RedefOptions,
) -> Result<Redef<'a>> {
    Redef::new(target, member, Some(value.into()), options)
}

/// Record calls to `member` without changing what it does.
#[track_caller]
pub fn wiretap<'a>(target: &'a Namespace, member: &str) -> Result<Redef<'a>> {
    Redef::new(target, member, None, RedefOptions::default())
}

#[track_caller]
pub fn wiretap_with<'a>(
    target: &'a Namespace,
    member: &str,
    options: RedefOptions,
) -> Result<Redef<'a>> {
    Redef::new(target, member, None, options)
}
