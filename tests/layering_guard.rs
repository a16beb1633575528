//! Layering guardrails to keep the shared core crate free of runtime dependencies.
//!
//! `casebook_core` holds values, naming conventions and the annotation vocabulary. It must stay IO-free and
//! runtime-free, so its manifest may not declare any `[dependencies]` at all.

#[test]
fn core_crate_declares_no_dependencies() {
    let manifest = include_str!("../crates/casebook_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let entry = line.split('#').next().unwrap_or("").trim();
        panic!("`casebook_core` must not declare dependencies, found `{entry}`");
    }
}

#[test]
fn async_runtime_stays_out_of_the_core_crate() {
    let manifest = include_str!("../crates/casebook_core/Cargo.toml");
    for forbidden in ["tokio", "futures", "tracing"] {
        assert!(
            !manifest.contains(forbidden),
            "`casebook_core` must not mention `{forbidden}` in its manifest"
        );
    }
}
