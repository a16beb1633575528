//! A small test class run on the plain host.
//!
//! ```sh
//! RUST_LOG=casebook=debug cargo run --example greeter
//! ```

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use casebook::prelude::*;
use casebook::run_plain;

#[derive(Default)]
struct GreeterSuite {
    greeted: AtomicUsize,
}

fn main() -> miette::Result<ExitCode> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let class = ClassBuilder::<GreeterSuite>::new("GreeterSuite")
        .provide("greeting", |_| "hi")
        .method(
            "greet",
            [Param::named("greeting"), Param::example()],
            |this, args| async move {
                let line = format!("{}, {}!", args.str(0)?, args.str(1)?);
                println!("{line}");
                this.greeted.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Failure>(())
            },
        )
        .inject("greet", 0, "greeting")
        .example("greet", ["NYC"])
        .example("greet", ["LA"])
        .method("add", [Param::example(), Param::example()], |_, args| async move {
            let (a, b) = (args.int(0)?, args.int(1)?);
            println!("{a} + {b} = {}", a + b);
            Ok::<_, Failure>(a + b)
        })
        .examples("add", [[1, 2], [3, 4]])
        .method("skipped", [], |_, _| async { Err::<(), _>("never runs".into()) })
        .ignore("skipped")
        .before_each("_prepare", |_, ctx| async move {
            tracing::info!(method = %ctx.method, example = ?ctx.example.as_ref().map(|s| s.label(&ctx.method)), "prepare");
            Ok(())
        })
        .after_each("_clean_up", |this, ctx| async move {
            tracing::info!(
                method = %ctx.method,
                outcome = ?ctx.outcome,
                greeted = this.greeted.load(Ordering::SeqCst),
                "clean up"
            );
            Ok(())
        })
        .build();

    let summary = run_plain(&class, GreeterSuite::default())?;
    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
