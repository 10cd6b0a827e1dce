//! Demonstration of redef bindings and output capture.
//!
//! Run with `RUST_LOG=debug` to see bindings being installed and restored.

use redef::sys;
use redef::{CallArgs, Function, Namespace, Value, args, redef, wiretap};
use redef_capture::{stderr_of, stdout_of};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let parrot = Namespace::new("Parrot");
    parrot.define("speak", |a| {
        sys::println(&format!("squawk, {}!", a.str(0).unwrap_or("pieces of eight")))?;
        Ok(Value::Null)
    });

    println!("=== Wiretap ===");
    let rd_speak = wiretap(&parrot, "speak")?;
    let captured = stdout_of(|| {
        for word in ["hello", "cracker"] {
            parrot.call("speak", args![word])?;
        }
        parrot.call("speak", CallArgs::new())
    })?;
    captured.returned?;
    print!("{}", captured.output);
    println!("speak was called {} times with {:?}", rd_speak.called(), rd_speak.method_args());
    drop(rd_speak);

    println!("\n=== Redef ===");
    {
        let rd_speak = redef(&parrot, "speak", Function::new(|_| Ok(json!("..."))))?;
        println!("muted parrot says {}", parrot.call("speak", CallArgs::new())?);
        println!("called {} time(s)", rd_speak.called());
    }

    println!("\n=== Misuse report ===");
    let report = stderr_of(|| {
        let _unused = redef(&parrot, "speak", Function::new(|_| Ok(Value::Null)));
    })?;
    print!("{}", report.output);

    Ok(())
}
