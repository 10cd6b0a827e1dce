//! Call payloads passed to namespace functions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Positional and named arguments of one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    pub named: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add (or overwrite) a named argument.
    pub fn named_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Positional argument `index` as a string slice.
    pub fn str(&self, index: usize) -> Option<&str> {
        self.positional.get(index).and_then(Value::as_str)
    }

    pub fn named(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Prepend the owner as the first positional argument.
    pub(crate) fn with_owner(mut self, owner: Value) -> Self {
        self.positional.insert(0, owner);
        self
    }

    /// Drop the first positional argument (the owner reinstated on dispatch).
    pub(crate) fn without_owner(mut self) -> Self {
        if !self.positional.is_empty() {
            self.positional.remove(0);
        }
        self
    }
}

impl From<Vec<Value>> for CallArgs {
    fn from(positional: Vec<Value>) -> Self {
        Self { positional, named: Map::new() }
    }
}

impl FromIterator<Value> for CallArgs {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

/// Build a [`CallArgs`] from positional values.
///
/// ```
/// use redef::args;
///
/// let call = args!["beyond the sea", 3];
/// assert_eq!(call.str(0), Some("beyond the sea"));
/// assert_eq!(call.len(), 2);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::CallArgs::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::CallArgs::from(vec![$($crate::Value::from($value)),+])
    };
}
