//! Process output channels routed through a swappable namespace.
//!
//! The `sys` namespace holds one [`Member::Stream`] per channel. Code that
//! writes through [`print`], [`eprintln`] and friends always resolves the
//! sink currently installed, so a binding on `stdout` or `stderr` redirects
//! every writer for as long as it is held.
//!
//! The namespace is per-thread: the test harness runs each test on its own
//! thread, and bindings are not `Send`.

use crate::{Member, Namespace, RedefError};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Name of the standard output channel.
pub const STDOUT: &str = "stdout";
/// Name of the standard error channel.
pub const STDERR: &str = "stderr";

/// A writable text stream.
pub trait Sink {
    fn write(&self, text: &str) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for Rc<S> {
    fn write(&self, text: &str) -> io::Result<()> {
        (**self).write(text)
    }
}

/// Shared in-memory text sink.
///
/// Clones share one buffer, so a clone installed on a channel can be read
/// through the original handle.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    buf: Rc<RefCell<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, in write order.
    pub fn contents(&self) -> String {
        self.buf.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.borrow().is_empty()
    }
}

impl Sink for BufferSink {
    fn write(&self, text: &str) -> io::Result<()> {
        self.buf.borrow_mut().push_str(text);
        Ok(())
    }
}

/// Writes to the real process standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write(&self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

/// Writes to the real process standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl Sink for StderrSink {
    fn write(&self, text: &str) -> io::Result<()> {
        io::stderr().lock().write_all(text.as_bytes())
    }
}

thread_local! {
    static SYSTEM: Rc<Namespace> = {
        let ns = Namespace::new("sys");
        install_into(&ns);
        ns
    };
}

fn install_into(ns: &Namespace) {
    ns.set(STDOUT, Member::stream(StdoutSink));
    ns.set(STDERR, Member::stream(StderrSink));
}

/// The `sys` namespace of the current thread.
pub fn namespace() -> Rc<Namespace> {
    SYSTEM.with(Rc::clone)
}

/// Reinstall the real process sinks on both channels.
///
/// Only needed after a channel was overwritten outside of a binding.
pub fn install_defaults() {
    install_into(&namespace());
}

/// The sink currently installed on `channel`.
pub fn stream(channel: &str) -> crate::Result<Rc<dyn Sink>> {
    let member =
        namespace().get(channel).ok_or_else(|| RedefError::UnknownChannel(channel.to_string()))?;
    match member {
        Member::Stream(sink) => Ok(sink),
        _ => Err(RedefError::NotAStream(channel.to_string())),
    }
}

/// Write `text` to whatever sink is installed on `channel`.
pub fn write(channel: &str, text: &str) -> io::Result<()> {
    let sink = stream(channel).map_err(io::Error::other)?;
    sink.write(text)
}

pub fn print(text: &str) -> io::Result<()> {
    write(STDOUT, text)
}

pub fn println(text: &str) -> io::Result<()> {
    write(STDOUT, &format!("{text}\n"))
}

pub fn eprint(text: &str) -> io::Result<()> {
    write(STDERR, text)
}

pub fn eprintln(text: &str) -> io::Result<()> {
    write(STDERR, &format!("{text}\n"))
}
