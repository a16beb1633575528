//! Sequential in-process host.

use std::any::Any;
use std::io::{self, Write};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use super::Host;
use super::reporter::{ConsoleReporter, TestReporter, TestResult, TestSummary};
use crate::config::RunConfig;
use crate::errors::{HostError, render_chain};
use crate::registry::ClassDef;
use crate::runner::UnitBody;

const STOPPED: &str = "stopped after first failure";

/// Collects units and runs them one at a time, in registration order.
///
/// A failing or panicking unit never stops the others unless `stop_on_fail` is set.
pub struct PlainHost {
    config: RunConfig,
    units: Vec<(String, UnitBody)>,
}

impl PlainHost {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            units: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Names of the collected units, in run order.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Run every collected unit.
    pub async fn run(&self, reporter: &mut dyn TestReporter) -> TestSummary {
        let start = Instant::now();
        reporter.on_collection_complete(self.units.len());

        let mut summary = TestSummary::default();
        let mut stopped = false;
        for (name, body) in &self.units {
            let result = if stopped {
                TestResult::Skipped(STOPPED.to_string())
            } else {
                reporter.on_test_start(name);
                run_unit(body).await
            };
            tracing::debug!(unit = %name, ?result, "unit finished");

            summary.record(&result);
            reporter.on_test_complete(name, &result);
            if self.config.stop_on_fail && result.is_failure() {
                stopped = true;
            }
        }

        summary.duration = start.elapsed();
        reporter.on_run_complete(&summary);
        summary
    }

    /// Run every collected unit on a fresh current-thread runtime.
    pub fn run_blocking(&self, reporter: &mut dyn TestReporter) -> Result<TestSummary, HostError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(runtime.block_on(self.run(reporter)))
    }

    /// A console reporter writing to `out`, verbose when the run config asks for it.
    pub fn console<W: Write>(&self, out: W) -> ConsoleReporter<W> {
        ConsoleReporter::new(out, self.config.verbose)
    }

    /// Run every collected unit on a fresh runtime, reporting to stderr.
    pub fn run_console(&self) -> Result<TestSummary, HostError> {
        self.run_blocking(&mut self.console(io::stderr()))
    }
}

impl Default for PlainHost {
    fn default() -> Self {
        Self::new(RunConfig::default())
    }
}

impl Host for PlainHost {
    fn register_unit(&mut self, name: &str, body: UnitBody) {
        if !self.config.selects(name) {
            tracing::debug!(unit = name, "deselected by filter");
            return;
        }
        self.units.push((name.to_string(), body));
    }
}

async fn run_unit(body: &UnitBody) -> TestResult {
    let start = Instant::now();
    let outcome = AssertUnwindSafe(body()).catch_unwind().await;
    let elapsed = start.elapsed();
    match outcome {
        Ok(Ok(())) => TestResult::Passed(elapsed),
        Ok(Err(err)) => TestResult::Failed(elapsed, render_chain(&err)),
        Err(payload) => TestResult::Failed(elapsed, format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

/// Build, register and run every unit of a fresh instance of `class`, reporting to stderr.
pub fn run_plain<T: Send + Sync + 'static>(class: &Arc<ClassDef<T>>, target: T) -> Result<TestSummary, HostError> {
    let mut host = PlainHost::default();
    super::register(&mut host, class.instantiate(target).runnables());
    host.run_console()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::register;
    use crate::registry::ClassBuilder;
    use crate::runner::build_runners;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Events {
        seen: Vec<String>,
    }

    impl TestReporter for Events {
        fn on_collection_complete(&mut self, unit_count: usize) {
            self.seen.push(format!("collected {unit_count}"));
        }

        fn on_test_start(&mut self, name: &str) {
            self.seen.push(format!("start {name}"));
        }

        fn on_test_complete(&mut self, name: &str, result: &TestResult) {
            let status = match result {
                TestResult::Passed(_) => "passed".to_string(),
                TestResult::Failed(_, msg) => format!("failed: {msg}"),
                TestResult::Skipped(reason) => format!("skipped: {reason}"),
            };
            self.seen.push(format!("{name} {status}"));
        }

        fn on_run_complete(&mut self, summary: &TestSummary) {
            self.seen.push(format!("done {}/{}", summary.passed, summary.total));
        }
    }

    #[derive(Default)]
    struct Suite {
        calls: Mutex<Vec<&'static str>>,
    }

    fn class() -> Arc<ClassDef<Suite>> {
        ClassBuilder::<Suite>::new("S")
            .method("first", [], |this: Arc<Suite>, _| async move {
                this.calls.lock().unwrap().push("first");
                Ok(())
            })
            .method("second", [], |_, _| async { Err::<(), _>("broken".into()) })
            .method("third", [], |this: Arc<Suite>, _| async move {
                this.calls.lock().unwrap().push("third");
                Ok(())
            })
            .build()
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let mut host = PlainHost::default();
        register(&mut host, build_runners(&class(), Suite::default()));
        let mut events = Events::default();
        let summary = host.run(&mut events).await;

        assert_eq!((summary.passed, summary.failed), (2, 1));
        assert_eq!(
            events.seen,
            vec![
                "collected 3",
                "start first",
                "first passed",
                "start second",
                "second failed: `second` failed\n  caused by: broken",
                "start third",
                "third passed",
                "done 2/3",
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_on_fail_skips_the_rest() {
        let mut host = PlainHost::new(RunConfig::new().with_stop_on_fail(true));
        register(&mut host, build_runners(&class(), Suite::default()));
        let mut events = Events::default();
        let summary = host.run(&mut events).await;

        assert_eq!((summary.passed, summary.failed, summary.skipped), (1, 1, 1));
        assert!(events.seen.contains(&"third skipped: stopped after first failure".to_string()));
    }

    #[tokio::test]
    async fn test_console_follows_verbose_setting() {
        let mut host = PlainHost::new(RunConfig::new().with_verbose(true));
        register(&mut host, build_runners(&class(), Suite::default()));
        let mut reporter = host.console(Vec::new()).with_color(false);
        host.run(&mut reporter).await;
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.starts_with("first ... PASSED ("), "{out}");
        assert!(out.contains("second ... FAILED ("), "{out}");

        let mut host = PlainHost::default();
        register(&mut host, build_runners(&class(), Suite::default()));
        let mut reporter = host.console(Vec::new()).with_color(false);
        host.run(&mut reporter).await;
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(out.starts_with(".F\nsecond\n"), "{out}");
        assert!(!out.contains("PASSED"), "{out}");
    }

    #[test]
    fn test_filter_deselects_at_registration() {
        let mut host = PlainHost::new(RunConfig::new().with_filter("ir"));
        register(&mut host, build_runners(&class(), Suite::default()));
        assert_eq!(host.unit_names().collect::<Vec<_>>(), vec!["first", "third"]);
    }

    #[test]
    fn test_panicking_unit_is_reported() {
        let class = ClassBuilder::<Suite>::new("S")
            .method("explodes", [], |_, args: crate::resolve::Args| async move {
                if args.is_empty() {
                    panic!("kaboom");
                }
                Ok(())
            })
            .build();
        let mut host = PlainHost::default();
        register(&mut host, build_runners(&class, Suite::default()));
        let mut events = Events::default();
        let summary = host.run_blocking(&mut events).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(events.seen[2], "explodes failed: panicked: kaboom");
    }
}
