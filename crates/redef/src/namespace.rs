//! Swappable member tables.
//!
//! Code that wants to be redefinable in tests reaches its collaborators
//! through a [`Namespace`] instead of calling them directly. A namespace maps
//! member names to [`Member`] values which can be data, functions, or
//! writable streams, and every call goes through [`Namespace::call`] so a
//! binding installed with [`crate::redef`] is observed by all call sites.

use crate::sys::Sink;
use crate::{CallArgs, RedefError};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Shared callable stored in a namespace.
pub type Callable = Rc<dyn Fn(CallArgs) -> anyhow::Result<Value>>;

/// How a function member receives its owning namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// Already bound to its instance; called with exactly the caller's arguments.
    Bound,
    /// Unbound function hung off the namespace; the owner is passed first.
    Owner,
    /// Namespace-level callable that takes no owner.
    Detached,
}

/// A callable member together with its declared receiver.
#[derive(Clone)]
pub struct Function {
    call: Callable,
    receiver: Receiver,
}

impl Function {
    pub fn from_callable(call: Callable, receiver: Receiver) -> Self {
        Self { call, receiver }
    }

    /// A callable that takes exactly the arguments its caller passes.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(CallArgs) -> anyhow::Result<Value> + 'static,
    {
        Self::from_callable(Rc::new(f), Receiver::Bound)
    }

    /// A callable that expects the owner as its first positional argument.
    pub fn with_owner<F>(f: F) -> Self
    where
        F: Fn(CallArgs) -> anyhow::Result<Value> + 'static,
    {
        Self::from_callable(Rc::new(f), Receiver::Owner)
    }

    pub fn detached<F>(f: F) -> Self
    where
        F: Fn(CallArgs) -> anyhow::Result<Value> + 'static,
    {
        Self::from_callable(Rc::new(f), Receiver::Detached)
    }

    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    pub fn expects_owner(&self) -> bool {
        self.receiver == Receiver::Owner
    }

    /// Invoke with `args` as given; no owner handling.
    pub fn invoke(&self, args: CallArgs) -> anyhow::Result<Value> {
        (self.call)(args)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.receiver == other.receiver && Rc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("receiver", &self.receiver).finish_non_exhaustive()
    }
}

/// One named member of a namespace.
#[derive(Clone)]
pub enum Member {
    Data(Value),
    Function(Function),
    Stream(Rc<dyn Sink>),
}

impl Member {
    pub fn stream(sink: impl Sink + 'static) -> Self {
        Self::Stream(Rc::new(sink))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Rc<dyn Sink>> {
        match self {
            Self::Stream(sink) => Some(sink),
            _ => None,
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::Stream(a), Self::Stream(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Self::Function(function) => f.debug_tuple("Function").field(function).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<Function> for Member {
    fn from(function: Function) -> Self {
        Self::Function(function)
    }
}

/// A named, mutable table of members with optional inheritance.
///
/// Lookups walk the parent chain; writes always land in this namespace's own
/// table.
pub struct Namespace {
    name: String,
    parent: Option<Rc<Namespace>>,
    members: RefCell<BTreeMap<String, Member>>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self { name: name.into(), parent: None, members: RefCell::new(BTreeMap::new()) })
    }

    /// A namespace that inherits every member of `parent` it does not define itself.
    pub fn derive(name: impl Into<String>, parent: &Rc<Namespace>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            parent: Some(Rc::clone(parent)),
            members: RefCell::new(BTreeMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Rc<Namespace>> {
        self.parent.as_ref()
    }

    /// The value passed as first argument to [`Receiver::Owner`] functions.
    pub fn owner(&self) -> Value {
        Value::String(self.name.clone())
    }

    pub fn set(&self, name: impl Into<String>, member: impl Into<Member>) {
        self.members.borrow_mut().insert(name.into(), member.into());
    }

    /// Define an instance-bound method.
    pub fn define<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(CallArgs) -> anyhow::Result<Value> + 'static,
    {
        self.set(name, Function::new(f));
    }

    /// Define a function that receives this namespace's owner value first.
    pub fn define_with_owner<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(CallArgs) -> anyhow::Result<Value> + 'static,
    {
        self.set(name, Function::with_owner(f));
    }

    pub fn define_detached<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(CallArgs) -> anyhow::Result<Value> + 'static,
    {
        self.set(name, Function::detached(f));
    }

    /// Resolve `name`, falling back to the parent chain.
    pub fn get(&self, name: &str) -> Option<Member> {
        match self.get_own(name) {
            Some(member) => Some(member),
            None => self.parent.as_ref().and_then(|parent| parent.get(name)),
        }
    }

    /// Resolve `name` in this namespace's own table only.
    pub fn get_own(&self, name: &str) -> Option<Member> {
        self.members.borrow().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn data(&self, name: &str) -> Option<Value> {
        self.get(name).and_then(|member| member.as_data().cloned())
    }

    pub fn remove(&self, name: &str) -> Option<Member> {
        self.members.borrow_mut().remove(name)
    }

    /// Put back an own-table entry captured by [`Namespace::get_own`].
    pub(crate) fn restore_own(&self, name: &str, member: Option<Member>) {
        let mut members = self.members.borrow_mut();
        match member {
            Some(member) => {
                members.insert(name.to_string(), member);
            }
            None => {
                members.remove(name);
            }
        }
    }

    /// Names visible through this namespace, including inherited ones.
    pub fn member_names(&self) -> Vec<String> {
        let mut names = self.parent.as_ref().map(|parent| parent.member_names()).unwrap_or_default();
        for name in self.members.borrow().keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names.sort();
        names
    }

    /// Call the function member `name`.
    ///
    /// The member is cloned out of the table before it runs, so the callable
    /// may call back into this namespace or replace its members.
    pub fn call(&self, name: &str, args: CallArgs) -> anyhow::Result<Value> {
        let member = self.get(name).ok_or_else(|| RedefError::missing(&self.name, name))?;
        let Member::Function(function) = member else {
            return Err(RedefError::not_callable(&self.name, name).into());
        };
        let args = match function.receiver() {
            Receiver::Owner => args.with_owner(self.owner()),
            Receiver::Bound | Receiver::Detached => args,
        };
        function.invoke(args)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("members", &self.members.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}
