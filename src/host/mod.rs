//! Host adapter.
//!
//! A host is whatever ultimately executes the units: it accepts a name and an async body and decides pass/fail from
//! the body's result. [`register`] forwards every runnable unmodified; [`PlainHost`] is a small sequential host for
//! running a class without an external harness.

pub mod plain;
pub mod reporter;

pub use plain::{PlainHost, run_plain};
pub use reporter::{ConsoleReporter, TestReporter, TestResult, TestSummary};

use crate::runner::{Runnable, UnitBody};

/// The registration surface of a test-execution host.
///
/// Units of an example-bearing method must run sequentially, in registration order, when the class uses the inferred
/// cursor mode.
pub trait Host {
    fn register_unit(&mut self, name: &str, body: UnitBody);
}

/// Register every runnable with `host`, in order; returns how many were registered.
pub fn register(host: &mut dyn Host, runnables: impl IntoIterator<Item = Runnable>) -> usize {
    let mut count = 0;
    for runnable in runnables {
        let (name, body) = runnable.into_parts();
        host.register_unit(&name, body);
        count += 1;
    }
    tracing::debug!(count, "units registered");
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ClassBuilder;
    use crate::runner::build_runners;

    #[derive(Default)]
    struct Recording {
        units: Vec<(String, UnitBody)>,
    }

    impl Host for Recording {
        fn register_unit(&mut self, name: &str, body: UnitBody) {
            self.units.push((name.to_string(), body));
        }
    }

    struct Suite;

    #[tokio::test]
    async fn test_register_forwards_names_and_bodies() {
        let class = ClassBuilder::<Suite>::new("S")
            .method("ok", [], |_, _| async { Ok(()) })
            .method("bad", [], |_, _| async { Err::<(), _>("nope".into()) })
            .build();
        let mut host = Recording::default();
        assert_eq!(register(&mut host, build_runners(&class, Suite)), 2);

        let names: Vec<&str> = host.units.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["ok", "bad"]);
        assert!((host.units[0].1)().await.is_ok());
        assert!((host.units[1].1)().await.is_err());
    }

    #[test]
    fn test_register_hands_over_the_runnable_body_itself() {
        let class = ClassBuilder::<Suite>::new("S")
            .method("ok", [], |_, _| async { Ok(()) })
            .build();
        let runnables = build_runners(&class, Suite);
        let bodies: Vec<UnitBody> = runnables.iter().map(|r| UnitBody::clone(r.body())).collect();

        let mut host = Recording::default();
        register(&mut host, runnables);
        assert!(std::sync::Arc::ptr_eq(&host.units[0].1, &bodies[0]));
    }
}
