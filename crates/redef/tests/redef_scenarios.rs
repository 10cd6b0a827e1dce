//! Scenario tests for redef bindings.
//!
//! Each test builds its own namespaces; the `sys` namespace is per-thread so
//! tests touching stderr do not interfere with each other.

use redef::sys::{self, BufferSink, STDERR};
use redef::{
    CallArgs, Function, Member, Namespace, RedefError, RedefOptions, ReportTarget, Value, args,
    redef, redef_with, wiretap,
};
use serde_json::json;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

fn setup_test_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// An instance whose `show` method is already bound to it.
fn somewhere_instance() -> Rc<Namespace> {
    let ns = Namespace::new("Somewhere");
    let me = Rc::downgrade(&ns);
    ns.define("show", move |a| {
        let this = me.upgrade().ok_or_else(|| anyhow::anyhow!("instance dropped"))?;
        Ok(json!(format!("{}, {}", this.name(), a.str(0).unwrap_or_default())))
    });
    ns
}

/// A class-level `show` that receives its owner first.
fn somewhere_class() -> Rc<Namespace> {
    let ns = Namespace::new("Somewhere");
    ns.define_with_owner("show", |a| {
        Ok(json!(format!("{}, {}", a.str(0).unwrap_or_default(), a.str(1).unwrap_or_default())))
    });
    ns
}

fn show(ns: &Namespace, message: &str) -> Value {
    ns.call("show", args![message]).unwrap()
}

#[test]
fn instance_method_is_replaced_then_restored() {
    setup_test_tracing();
    let somewhere = somewhere_instance();
    assert_eq!(show(&somewhere, "beyond the sea"), json!("Somewhere, beyond the sea"));

    let mut rd_show = redef(&somewhere, "show", Function::new(|_| Ok(json!("hi")))).unwrap();
    assert_eq!(show(&somewhere, "over the rainbow"), json!("hi"));
    assert_eq!(rd_show.called(), 1);
    assert_eq!(rd_show.method_args(), vec![vec![json!("over the rainbow")]]);
    assert_eq!(rd_show.named_method_args(), vec![serde_json::Map::new()]);

    rd_show.reset();
    assert_eq!(rd_show.called(), 0);
    assert!(rd_show.method_args().is_empty());
    assert!(rd_show.last_method_args().is_none());
    assert_eq!(show(&somewhere, "beyond the stars"), json!("hi"));

    rd_show.release();
    assert_eq!(show(&somewhere, "beyond the stars"), json!("Somewhere, beyond the stars"));
}

#[test]
fn class_function_records_owner_but_replacement_does_not_see_it() {
    let somewhere = somewhere_class();
    let rd_show = redef(
        &somewhere,
        "show",
        Function::new(|a| Ok(json!(format!("hi {}", a.str(0).unwrap_or_default())))),
    )
    .unwrap();

    assert_eq!(show(&somewhere, "over the rainbow"), json!("hi over the rainbow"));
    assert_eq!(rd_show.last_method_args(), Some(vec![json!("Somewhere"), json!("over the rainbow")]));
    drop(rd_show);
    assert_eq!(show(&somewhere, "beyond the stars"), json!("Somewhere, beyond the stars"));
}

#[test]
fn redefinition_does_not_leak_between_scopes() {
    let somewhere = somewhere_instance();
    {
        let _rd_show = redef(&somewhere, "show", Function::new(|_| Ok(json!("bye")))).unwrap();
        assert_eq!(show(&somewhere, "over the rainbow"), json!("bye"));
    }
    assert_eq!(show(&somewhere, "beyond the stars"), json!("Somewhere, beyond the stars"));
}

#[test]
fn data_member_is_replaced_without_recording() {
    let math = Namespace::new("Math");
    math.set("pi", json!(3.5));

    let rd_p = redef(&math, "pi", json!(3)).unwrap();
    assert_eq!(math.data("pi"), Some(json!(3)));
    assert_eq!(rd_p.called(), 0);
    assert!(rd_p.method_args().is_empty());
    assert!(rd_p.not_called());
    drop(rd_p);

    assert_eq!(math.data("pi"), Some(json!(3.5)));
}

#[test]
fn static_function_records_owner() {
    let hello = Namespace::new("Hello");
    hello.define_detached("world", |a| Ok(json!(format!("Hello {}!", a.str(0).unwrap_or_default()))));
    assert_eq!(hello.call("world", args!["joe"]).unwrap(), json!("Hello joe!"));

    let rd_w = redef(
        &hello,
        "world",
        Function::new(|a| Ok(json!(format!("Goodbye {}", a.str(0).unwrap_or_default())))),
    )
    .unwrap();
    assert_eq!(hello.call("world", args!["joe"]).unwrap(), json!("Goodbye joe"));
    assert_eq!(rd_w.method_args(), vec![vec![json!("Hello"), json!("joe")]]);
    drop(rd_w);

    assert_eq!(hello.call("world", args!["joe"]).unwrap(), json!("Hello joe!"));
}

#[test]
fn inherited_members_can_be_redefined_at_either_level() {
    let a = Namespace::new("A");
    a.define_with_owner("a", |args| {
        let x = args.str(1).unwrap_or_default();
        Ok(json!(format!("{x}{x}")))
    });
    let b = Namespace::derive("B", &a);
    let base = Rc::clone(&a);
    b.define_with_owner("a", move |args| {
        // B.a calls A.a explicitly, like a super call
        let ret = base.call("a", CallArgs::from(args.positional[1..].to_vec()))?;
        Ok(json!(format!("b{}", ret.as_str().unwrap_or_default())))
    });
    assert_eq!(b.call("a", args!["z"]).unwrap(), json!("bzz"));

    let want = "baa baa";
    let rd_b = redef(&b, "a", Function::new(move |_| Ok(json!(want)))).unwrap();
    assert_eq!(b.call("a", args!["z"]).unwrap(), json!("baa baa"));
    assert_eq!(rd_b.called(), 1);
    drop(rd_b);

    let rd_a = redef(&a, "a", Function::new(|_| Ok(json!("atter batter")))).unwrap();
    assert_eq!(b.call("a", args!["z"]).unwrap(), json!("batter batter"));
    assert_eq!(rd_a.called(), 1);
}

#[test]
fn redefining_an_inherited_member_does_not_pin_it_on_release() {
    let a = Namespace::new("A");
    a.set("greeting", json!("hello"));
    let b = Namespace::derive("B", &a);

    {
        let _rd = redef(&b, "greeting", json!("howdy")).unwrap();
        assert_eq!(b.data("greeting"), Some(json!("howdy")));
        assert_eq!(a.data("greeting"), Some(json!("hello")));
    }
    assert!(b.get_own("greeting").is_none());

    a.set("greeting", json!("hi"));
    assert_eq!(b.data("greeting"), Some(json!("hi")));
}

#[test]
fn missing_member_is_rejected_before_any_mutation() {
    let ns = somewhere_instance();
    let err = redef(&ns, "hide", json!(1)).unwrap_err();
    assert_eq!(err, RedefError::MissingMember { namespace: "Somewhere".into(), member: "hide".into() });
    assert_eq!(err.to_string(), "object: Somewhere does not have any attribute: hide");
    assert!(!ns.has("hide"));
}

#[test]
fn replacement_errors_propagate_and_binding_still_restores() {
    let ns = somewhere_instance();
    {
        let rd = redef(&ns, "show", Function::new(|_| anyhow::bail!("replacement failed"))).unwrap();
        let err = ns.call("show", args!["x"]).unwrap_err();
        assert_eq!(err.to_string(), "replacement failed");
        assert_eq!(rd.called(), 1);
    }
    assert_eq!(show(&ns, "x"), json!("Somewhere, x"));
}

#[test]
fn panic_inside_scope_restores_original() {
    let ns = somewhere_instance();
    let original = ns.get("show");

    let result = catch_unwind(AssertUnwindSafe(|| {
        let _rd = redef_with(
            &ns,
            "show",
            Function::new(|_| Ok(json!("temporary"))),
            RedefOptions::new().report(ReportTarget::Silent),
        )
        .unwrap();
        assert_eq!(show(&ns, "x"), json!("temporary"));
        panic!("intentional panic");
    }));

    assert!(result.is_err(), "should have panicked");
    assert_eq!(ns.get("show"), original);
}

#[test]
fn nested_bindings_unwind_in_reverse_order() {
    let ns = somewhere_instance();
    let original = ns.get("show");
    {
        let outer = redef(&ns, "show", Function::new(|_| Ok(json!("outer")))).unwrap();
        assert_eq!(show(&ns, "x"), json!("outer"));
        {
            let inner = redef(&ns, "show", Function::new(|_| Ok(json!("inner")))).unwrap();
            assert_eq!(show(&ns, "x"), json!("inner"));
            assert_eq!(inner.called(), 1);
        }
        assert_eq!(show(&ns, "x"), json!("outer"));
        assert_eq!(outer.called(), 2);
    }
    assert_eq!(ns.get("show"), original);
}

#[test]
fn wiretap_keeps_results_and_side_effects() {
    let counter = Namespace::new("Counter");
    counter.set("n", json!(0));
    let me = Rc::downgrade(&counter);
    counter.define("bump", move |a| {
        let this = me.upgrade().ok_or_else(|| anyhow::anyhow!("counter dropped"))?;
        let step = a.named("by").and_then(Value::as_i64).unwrap_or(1);
        let n = this.data("n").and_then(|v| v.as_i64()).unwrap_or_default() + step;
        this.set("n", json!(n));
        Ok(json!(n))
    });

    let rd = wiretap(&counter, "bump").unwrap();
    assert_eq!(counter.call("bump", CallArgs::new()).unwrap(), json!(1));
    assert_eq!(counter.call("bump", CallArgs::new().named_arg("by", 5)).unwrap(), json!(6));
    assert_eq!(counter.data("n"), Some(json!(6)));
    assert_eq!(rd.called(), 2);
    assert_eq!(rd.last_named_method_args().and_then(|m| m.get("by").cloned()), Some(json!(5)));
}

#[test]
fn never_called_binding_reports_on_stderr_channel() {
    let transcript = BufferSink::new();
    let sys = sys::namespace();
    let _stderr = redef(&sys, STDERR, Member::stream(transcript.clone())).unwrap();

    let ns = somewhere_instance();
    let rd = redef_with(
        &ns,
        "show",
        Function::new(|_| Ok(Value::Null)),
        RedefOptions::new().report(ReportTarget::Channel),
    )
    .unwrap();
    let origin = rd.origin().to_string();
    drop(rd);

    let text = transcript.contents();
    assert!(text.contains("redef'd function 'show' was not called and should have been"));
    assert!(text.contains(&origin));
    assert!(origin.contains("redef_scenarios.rs"));
}

#[test]
fn silent_target_suppresses_report_but_restores() {
    let transcript = BufferSink::new();
    let sys = sys::namespace();
    let _stderr = redef(&sys, STDERR, Member::stream(transcript.clone())).unwrap();

    let ns = somewhere_instance();
    drop(
        redef_with(
            &ns,
            "show",
            Function::new(|_| Ok(Value::Null)),
            RedefOptions::new().report(ReportTarget::Silent),
        )
        .unwrap(),
    );
    assert!(transcript.is_empty());
    assert_eq!(show(&ns, "sea"), json!("Somewhere, sea"));
}

#[test]
fn optional_binding_on_existing_member_restores_it() {
    let math = Namespace::new("Math");
    math.set("pi", json!(3.5));
    {
        let _rd_p = redef_with(&math, "pi", json!(3), RedefOptions::new().must_exist(false)).unwrap();
        assert_eq!(math.data("pi"), Some(json!(3)));
    }
    assert_eq!(math.data("pi"), Some(json!(3.5)));
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn log_target_warns_without_touching_stderr_channel() {
    let transcript = BufferSink::new();
    let sys = sys::namespace();
    let _stderr = redef(&sys, STDERR, Member::stream(transcript.clone())).unwrap();

    let log = LogBuffer::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let ns = somewhere_instance();
    tracing::subscriber::with_default(subscriber, || {
        drop(
            redef_with(
                &ns,
                "show",
                Function::new(|_| Ok(Value::Null)),
                RedefOptions::new().report(ReportTarget::Log),
            )
            .unwrap(),
        );
    });

    assert!(transcript.is_empty());
    let logged = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
    assert!(logged.contains("WARN"));
    assert!(logged.contains("redef misuse: was not called and should have been called"));
    assert!(logged.contains("member=show"));
    assert_eq!(show(&ns, "sea"), json!("Somewhere, sea"));
}
