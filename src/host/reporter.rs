//! Run reporting for the plain host (pytest-style).
//!
//! The host drives a [`TestReporter`]; implement it to customize output (JSON, TAP, an IDE protocol). The bundled
//! [`ConsoleReporter`] prints one status per unit and a summary bar.

use std::io::Write;
use std::time::Duration;

/// Outcome of running a single unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TestResult {
    Passed(Duration),
    /// Elapsed time and the rendered error chain
    Failed(Duration, String),
    Skipped(String),
}

impl TestResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, TestResult::Failed(..))
    }
}

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl TestSummary {
    pub fn record(&mut self, result: &TestResult) {
        self.total += 1;
        match result {
            TestResult::Passed(_) => self.passed += 1,
            TestResult::Failed(..) => self.failed += 1,
            TestResult::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Receives run events from a host.
pub trait TestReporter {
    /// Called once all units are registered and filtered
    fn on_collection_complete(&mut self, unit_count: usize);

    /// Called when a unit starts
    fn on_test_start(&mut self, name: &str);

    /// Called when a unit completes (or is skipped)
    fn on_test_complete(&mut self, name: &str, result: &TestResult);

    /// Called when every unit has completed
    fn on_run_complete(&mut self, summary: &TestSummary);
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Default console reporter.
pub struct ConsoleReporter<W: Write> {
    out: W,
    pub verbose: bool,
    pub color: bool,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.color {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> TestReporter for ConsoleReporter<W> {
    fn on_collection_complete(&mut self, unit_count: usize) {
        if unit_count == 0 {
            let _ = writeln!(self.out, "No tests collected");
        }
    }

    fn on_test_start(&mut self, name: &str) {
        if self.verbose {
            let _ = write!(self.out, "{name} ... ");
        }
    }

    fn on_test_complete(&mut self, name: &str, result: &TestResult) {
        let status = match result {
            TestResult::Passed(d) => {
                if self.verbose {
                    format!("{} ({}ms)", self.paint(GREEN, "PASSED"), d.as_millis())
                } else {
                    self.paint(GREEN, ".")
                }
            }
            TestResult::Failed(d, _) => {
                if self.verbose {
                    format!("{} ({}ms)", self.paint(RED, "FAILED"), d.as_millis())
                } else {
                    self.paint(RED, "F")
                }
            }
            TestResult::Skipped(reason) => {
                if !self.verbose {
                    self.paint(YELLOW, "s")
                } else if reason.is_empty() {
                    self.paint(YELLOW, "SKIPPED")
                } else {
                    format!("{} ({reason})", self.paint(YELLOW, "SKIPPED"))
                }
            }
        };

        if self.verbose {
            let _ = writeln!(self.out, "{status}");
        } else {
            let _ = write!(self.out, "{status}");
        }

        if let TestResult::Failed(_, error) = result {
            let header = self.paint(RED, name);
            let _ = writeln!(self.out, "\n{header}");
            let _ = writeln!(self.out, "{error}");
        }
    }

    fn on_run_complete(&mut self, summary: &TestSummary) {
        if !self.verbose {
            let _ = writeln!(self.out);
        }
        let _ = writeln!(self.out);

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(self.paint(GREEN, &format!("{} passed", summary.passed)));
        }
        if summary.failed > 0 {
            parts.push(self.paint(RED, &format!("{} failed", summary.failed)));
        }
        if summary.skipped > 0 {
            parts.push(self.paint(YELLOW, &format!("{} skipped", summary.skipped)));
        }
        if parts.is_empty() {
            parts.push("no tests ran".to_string());
        }

        let _ = writeln!(
            self.out,
            "====== {} in {:.2}s ======",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
        let _ = self.out.flush();
    }
}
