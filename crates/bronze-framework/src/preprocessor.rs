//! Preprocessor pipeline.
//!
//! Preprocessors are guards that run before a command binds its parameters.
//! Each one receives a one-shot [`Next`] and must call
//! [`Next::proceed`] for the chain to continue; returning without proceeding
//! stops the chain and the command never runs. This is how a preprocessor
//! denies an invocation.
//!
//! ```rust,ignore
//! let cooldown = Preprocessor::new("cooldown", |inv, next| {
//!     if limiter.check(inv.event().author_id()) {
//!         next.proceed();
//!     } else {
//!         inv.reply("slow down")?;
//!     }
//!     Ok(())
//! });
//! ```
//!
//! A preprocessor that returns an error or panics is logged and treated as
//! having stopped the chain.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::error::{BoxError, CommandError, panic_message};
use crate::invocation::Invocation;

/// Identifier of the built-in guild-only preprocessor.
pub const GUILD_ONLY: &str = "guild-only";

type StepFn = dyn Fn(&Invocation<'_>, Next<'_>) -> Result<(), BoxError> + Send + Sync;

/// A named pre-invocation step.
#[derive(Clone)]
pub struct Preprocessor {
    id: Arc<str>,
    step: Arc<StepFn>,
}

impl Preprocessor {
    pub fn new<F>(id: impl Into<String>, step: F) -> Self
    where
        F: Fn(&Invocation<'_>, Next<'_>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            id: Arc::from(id.into()),
            step: Arc::new(step),
        }
    }

    /// The identifier used for priority ordering and in logs.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Preprocessor").field(&self.id).finish()
    }
}

/// Denies invocations outside a guild, replying with a short notice.
pub fn guild_only() -> Preprocessor {
    Preprocessor::new(GUILD_ONLY, |inv, next| {
        if inv.event().guild_id().is_some() {
            next.proceed();
        } else {
            inv.reply("This command can only be used in a server.")?;
        }
        Ok(())
    })
}

/// The continuation handed to a preprocessor. Consumed by
/// [`proceed`](Next::proceed), so the rest of the chain runs at most once per
/// step.
pub struct Next<'n> {
    cont: &'n mut (dyn FnMut() + 'n),
}

impl Next<'_> {
    /// Runs the remaining preprocessors and then the command.
    pub fn proceed(self) {
        (self.cont)();
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Priority ordering of preprocessor identifiers.
///
/// An identifier's priority is its position in the list. Identifiers not
/// listed take the position of the `*` entry, or go last when there is none.
/// Sorting is stable, so equal priorities keep attachment order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityOrder {
    ids: Vec<String>,
}

impl PriorityOrder {
    /// The entry marking where unlisted identifiers go.
    pub const DEFAULT_SLOT: &'static str = "*";

    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn priority(&self, id: &str) -> usize {
        self.ids
            .iter()
            .position(|entry| entry == id)
            .or_else(|| self.ids.iter().position(|entry| entry == Self::DEFAULT_SLOT))
            .unwrap_or(self.ids.len())
    }

    pub fn sort(&self, preprocessors: &mut [Preprocessor]) {
        preprocessors.sort_by_key(|p| self.priority(p.id()));
    }
}

/// Runs an ordered list of preprocessors in front of a terminal action.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'p> {
    steps: &'p [Preprocessor],
}

impl<'p> Pipeline<'p> {
    /// `steps` must already be in priority order.
    pub fn new(steps: &'p [Preprocessor]) -> Self {
        Self { steps }
    }

    /// Runs the chain. `terminal` runs at most once, and only if every step
    /// proceeded. Returns whether it ran.
    pub fn run<F: FnOnce()>(&self, inv: &Invocation<'_>, terminal: F) -> bool {
        let mut terminal = Some(terminal);
        let mut reached = false;
        let mut finish = || {
            if let Some(terminal) = terminal.take() {
                reached = true;
                terminal();
            }
        };
        self.step(0, inv, &mut finish);
        reached
    }

    fn step(&self, index: usize, inv: &Invocation<'_>, finish: &mut dyn FnMut()) {
        let Some(preprocessor) = self.steps.get(index) else {
            finish();
            return;
        };

        trace!(preprocessor = preprocessor.id(), "running preprocessor");
        let mut proceeded = false;
        let mut cont = || {
            proceeded = true;
            self.step(index + 1, inv, finish);
        };
        let next = Next { cont: &mut cont };
        let result = catch_unwind(AssertUnwindSafe(|| (preprocessor.step)(inv, next)));

        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        match failure {
            Some(message) => {
                let err = CommandError::Preprocessor {
                    id: preprocessor.id().to_string(),
                    message,
                };
                error!(command = %inv.path(), error = %err, "preprocessor failed");
            }
            None if !proceeded => {
                debug!(
                    command = %inv.path(),
                    preprocessor = preprocessor.id(),
                    "preprocessor stopped the chain"
                );
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::testing::{Fixture, TestEvent};

    fn recorder(id: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Preprocessor {
        Preprocessor::new(id, move |_, next| {
            log.lock().unwrap().push(id);
            next.proceed();
            Ok(())
        })
    }

    #[test]
    fn test_priority_order_beats_attachment_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut steps = vec![recorder("beta", log.clone()), recorder("alpha", log.clone())];
        PriorityOrder::new(["alpha", "beta"]).sort(&mut steps);

        let fixture = Fixture::new();
        let event = TestEvent::guild("ping");
        fixture.with_invocation(&event, |inv| {
            assert!(Pipeline::new(&steps).run(inv, || log.lock().unwrap().push("terminal")));
        });
        assert_eq!(*log.lock().unwrap(), vec!["alpha", "beta", "terminal"]);
    }

    #[test]
    fn test_default_slot() {
        let order = PriorityOrder::new(["first", "*", "last"]);
        assert_eq!(order.priority("first"), 0);
        assert_eq!(order.priority("other"), 1);
        assert_eq!(order.priority("last"), 2);

        let order = PriorityOrder::new(["first"]);
        assert_eq!(order.priority("other"), 1);
    }

    #[test]
    fn test_ties_keep_attachment_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut steps = vec![
            recorder("x", log.clone()),
            recorder("y", log.clone()),
            recorder("first", log.clone()),
        ];
        PriorityOrder::new(["first"]).sort(&mut steps);
        let ids: Vec<&str> = steps.iter().map(Preprocessor::id).collect();
        assert_eq!(ids, vec!["first", "x", "y"]);
    }

    #[test]
    fn test_not_proceeding_denies() {
        let steps = vec![Preprocessor::new("deny", |_, _next| Ok(()))];
        let fixture = Fixture::new();
        let event = TestEvent::guild("ping");
        let mut ran = false;
        fixture.with_invocation(&event, |inv| {
            assert!(!Pipeline::new(&steps).run(inv, || ran = true));
        });
        assert!(!ran);
    }

    #[test]
    fn test_errors_and_panics_stop_the_chain() {
        let failing = vec![Preprocessor::new("fails", |_, _| Err("nope".into()))];
        let panicking = vec![Preprocessor::new("panics", |_, _| panic!("boom"))];
        let fixture = Fixture::new();
        let event = TestEvent::guild("ping");
        fixture.with_invocation(&event, |inv| {
            assert!(!Pipeline::new(&failing).run(inv, || {}));
            assert!(!Pipeline::new(&panicking).run(inv, || {}));
        });
    }

    #[test]
    fn test_empty_pipeline_runs_terminal_once() {
        let fixture = Fixture::new();
        let event = TestEvent::guild("ping");
        let mut count = 0;
        fixture.with_invocation(&event, |inv| {
            assert!(Pipeline::new(&[]).run(inv, || count += 1));
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn test_guild_only() {
        let steps = vec![guild_only()];
        let fixture = Fixture::new();

        let event = TestEvent::guild("ping");
        fixture.with_invocation(&event, |inv| {
            assert!(Pipeline::new(&steps).run(inv, || {}));
        });

        let event = TestEvent::direct("ping");
        fixture.with_invocation(&event, |inv| {
            assert!(!Pipeline::new(&steps).run(inv, || {}));
        });
        assert_eq!(event.replies().len(), 1);
    }
}
