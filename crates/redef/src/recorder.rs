//! Call history for one substituted callable.

use crate::CallArgs;
use serde::Serialize;
use serde_json::{Map, Value};

/// How many times, and with what arguments, a substitute has been invoked.
///
/// `ever_invoked` survives [`CallRecord::reset`]: the count and history
/// describe calls since the last checkpoint, while [`CallRecord::was_called`]
/// describes the whole life of the binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallRecord {
    count: usize,
    positional: Vec<Vec<Value>>,
    named: Vec<Map<String, Value>>,
    ever_invoked: bool,
}

impl CallRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one invocation.
    pub fn capture(&mut self, args: &CallArgs) {
        self.count += 1;
        self.positional.push(args.positional.clone());
        self.named.push(args.named.clone());
        self.ever_invoked = true;
    }

    /// Forget counters and history; `was_called` is left untouched.
    pub fn reset(&mut self) {
        self.count = 0;
        self.positional.clear();
        self.named.clear();
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Positional arguments of every call since creation or the last reset.
    pub fn method_args(&self) -> &[Vec<Value>] {
        &self.positional
    }

    /// Named arguments of every call since creation or the last reset.
    pub fn named_method_args(&self) -> &[Map<String, Value>] {
        &self.named
    }

    pub fn last_method_args(&self) -> Option<&[Value]> {
        self.positional.last().map(Vec::as_slice)
    }

    pub fn last_named_method_args(&self) -> Option<&Map<String, Value>> {
        self.named.last()
    }

    pub fn was_called(&self) -> bool {
        self.ever_invoked
    }

    pub fn not_called(&self) -> bool {
        !self.ever_invoked
    }
}
