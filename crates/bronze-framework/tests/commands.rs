//! End-to-end dispatch through a realistic command tree.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

use bronze_core::{Directory, IntRange, Member, MemoryDirectory, Role, User};
use bronze_framework::prelude::*;

const GUILD: u64 = 1;

struct ChatEvent {
    content: String,
    guild_id: Option<u64>,
    help: bool,
    directory: Arc<MemoryDirectory>,
    replies: Mutex<Vec<String>>,
}

impl ChatEvent {
    fn new(directory: &Arc<MemoryDirectory>, content: &str) -> Self {
        Self {
            content: content.to_string(),
            guild_id: Some(GUILD),
            help: false,
            directory: Arc::clone(directory),
            replies: Mutex::new(Vec::new()),
        }
    }

    fn replies(&self) -> Vec<String> {
        self.replies.lock().clone()
    }
}

impl Event for ChatEvent {
    fn content(&self) -> &str {
        &self.content
    }

    fn help_mode(&self) -> bool {
        self.help
    }

    fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    fn channel_id(&self) -> u64 {
        7
    }

    fn author_id(&self) -> u64 {
        100
    }

    fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    fn reply(&self, reply: Reply) -> Result<(), ReplyError> {
        self.replies.lock().push(reply.to_string());
        Ok(())
    }
}

fn directory() -> Arc<MemoryDirectory> {
    let mut alice = Member::new(GUILD, User::new(11, "alice"));
    alice.nickname = Some("Al".into());
    Arc::new(
        MemoryDirectory::new()
            .with_member(alice)
            .with_member(Member::new(GUILD, User::new(12, "bob")))
            .with_role(Role::new(21, GUILD, "moderators")),
    )
}

// ============================================================================
// Handlers
// ============================================================================

fn pick(
    _inv: &Invocation<'_>,
    third: Arg<String>,
    second: Arg<String>,
    first: Arg<String>,
) -> String {
    format!("{} {} {}", *third, *second, *first)
}

fn parent(_inv: &Invocation<'_>) -> &'static str {
    "parent ran"
}

fn child(_inv: &Invocation<'_>) -> &'static str {
    "child ran"
}

fn remind(_inv: &Invocation<'_>, after: Arg<Duration>) -> String {
    format!("in {}s", after.as_secs())
}

fn at(_inv: &Invocation<'_>, when: Arg<DateTime<Utc>>) -> String {
    when.to_rfc3339()
}

fn sum(_inv: &Invocation<'_>, ranges: Args<IntRange>) -> String {
    ranges
        .iter()
        .flat_map(|range| range.iter())
        .sum::<i64>()
        .to_string()
}

fn ban(_inv: &Invocation<'_>, target: Arg<Member>, days: Option<Arg<i32>>) -> String {
    format!("banned {} for {}", target.display_name(), days.map_or(1, |d| *d))
}

fn color(_inv: &Invocation<'_>, value: Arg<i64>) -> String {
    value.to_string()
}

struct Fragile;

impl Fragile {
    fn run(&self, _inv: &Invocation<'_>) -> &'static str {
        "constructed"
    }
}

struct Counter(AtomicUsize);

impl Counter {
    fn bump(&self, _inv: &Invocation<'_>) -> String {
        (self.0.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self(AtomicUsize::new(0))
    }
}

fn dispatcher(order: Arc<Mutex<Vec<&'static str>>>, attempts: Arc<AtomicUsize>) -> Dispatcher {
    let record = |id: &'static str| {
        let order = Arc::clone(&order);
        Preprocessor::new(id, move |_, next| {
            order.lock().push(id);
            next.proceed();
            Ok(())
        })
    };

    let tree = CommandTree::builder()
        .order(PriorityOrder::new(["alpha", "beta"]))
        .command(
            CommandBuilder::new(["cmd"])
                .function(pick)
                .param(0, ParameterConfig::new().index(3))
                .param(1, ParameterConfig::new().index(2))
                .param(2, ParameterConfig::new().index(1)),
        )
        .command(
            CommandBuilder::new(["parent"])
                .function(parent)
                .child(CommandBuilder::new(["child"]).function(child)),
        )
        .command(
            CommandBuilder::new(["remind"])
                .function(remind)
                .param(0, ParameterConfig::new().index(1).width(0)),
        )
        .command(
            CommandBuilder::new(["at"])
                .function(at)
                .param(0, ParameterConfig::new().index(1).width(0)),
        )
        .command(CommandBuilder::new(["sum"]).function(sum))
        .command(CommandBuilder::new(["ban"]).function(ban).property(GuildOnly))
        .command(CommandBuilder::new(["color"]).function(color).property(Hex))
        .command(
            CommandBuilder::new(["ordered"])
                .function(parent)
                .preprocessor(record("beta"))
                .preprocessor(record("alpha")),
        )
        .command(
            CommandBuilder::new(["fragile"])
                .method(Fragile::run)
                .supplier(move || {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("database not ready")
                    } else {
                        Ok(Fragile)
                    }
                })
                .persistent(),
        )
        .command(
            CommandBuilder::new(["count"])
                .method(Counter::bump)
                .class::<Counter>()
                .property(Persistent),
        )
        .command(CommandBuilder::new(["fresh"]).method(Counter::bump).class::<Counter>())
        .build()
        .expect("tree builds");
    Dispatcher::new(tree)
}

struct Harness {
    dispatcher: Dispatcher,
    directory: Arc<MemoryDirectory>,
    order: Arc<Mutex<Vec<&'static str>>>,
    attempts: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        let order = Arc::new(Mutex::new(Vec::new()));
        let attempts = Arc::new(AtomicUsize::new(0));
        Self {
            dispatcher: dispatcher(Arc::clone(&order), Arc::clone(&attempts)),
            directory: directory(),
            order,
            attempts,
        }
    }

    fn send(&self, content: &str) -> (Outcome, Vec<String>) {
        let event = ChatEvent::new(&self.directory, content);
        let outcome = self.dispatcher.dispatch(&event);
        (outcome, event.replies())
    }
}

// ============================================================================
// Log capture
// ============================================================================

/// Records the message of every error event.
#[derive(Clone, Default)]
struct ErrorLog(Arc<Mutex<Vec<String>>>);

impl ErrorLog {
    fn messages(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for ErrorLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        self.0.lock().push(visitor.0.unwrap_or_default());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_explicit_indices_pick_positions() {
    let harness = Harness::new();
    let (outcome, replies) = harness.send("cmd a b 1");
    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(replies, vec!["1 b a"]);
}

#[test]
fn test_unknown_subcommand_runs_parent() {
    let harness = Harness::new();
    assert_eq!(harness.send("parent unknownchild").1, vec!["parent ran"]);
    assert_eq!(harness.send("Parent CHILD").1, vec!["child ran"]);
}

#[test]
fn test_durations_with_zero_width() {
    let harness = Harness::new();
    assert_eq!(harness.send("remind 1:30").1, vec!["in 90s"]);
    assert_eq!(harness.send("remind 2 min 30 sec").1, vec!["in 150s"]);
}

#[test]
fn test_relative_datetime() {
    let harness = Harness::new();
    let event = ChatEvent::new(&harness.directory, "at tomorrow 9am");
    let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
    assert_eq!(harness.dispatcher.dispatch_at(&event, now), Outcome::Completed);
    assert_eq!(event.replies(), vec!["2026-10-18T09:00:00+00:00"]);
}

#[test]
fn test_ranges_are_collected() {
    let harness = Harness::new();
    // 2..=6 plus 8 down to 5 plus 4
    assert_eq!(harness.send("sum 2-6 and 8-5 4").1, vec!["50"]);
}

#[test]
fn test_member_by_mention_name_and_id() {
    let harness = Harness::new();
    assert_eq!(harness.send("ban <@11> 3").1, vec!["banned Al for 3"]);
    assert_eq!(harness.send("ban bo").1, vec!["banned bob for 1"]);
    assert_eq!(harness.send("ban 12 7").1, vec!["banned bob for 7"]);
}

#[test]
fn test_unresolvable_mention_is_missing() {
    let harness = Harness::new();
    let (outcome, replies) = harness.send("ban <@999>");
    assert_eq!(outcome, Outcome::MissingParameters(vec!["member".into()]));
    assert_eq!(replies, vec!["Missing required parameters: member"]);
}

#[test]
fn test_guild_only_denies_direct_messages() {
    let harness = Harness::new();
    let mut event = ChatEvent::new(&harness.directory, "ban <@11>");
    event.guild_id = None;
    assert_eq!(harness.dispatcher.dispatch(&event), Outcome::Denied);
    assert_eq!(
        event.replies(),
        vec!["This command can only be used in a server."]
    );
}

#[test]
fn test_hex_property_reaches_parameters() {
    let harness = Harness::new();
    assert_eq!(harness.send("color #ff").1, vec!["255"]);
    assert_eq!(harness.send("color 0x10").1, vec!["16"]);
}

#[test]
fn test_preprocessor_priority() {
    let harness = Harness::new();
    assert_eq!(harness.send("ordered").0, Outcome::Completed);
    assert_eq!(*harness.order.lock(), vec!["alpha", "beta"]);
}

#[test]
fn test_construction_failure_does_not_stick() {
    let harness = Harness::new();
    let log = ErrorLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());

    tracing::subscriber::with_default(subscriber, || {
        let (outcome, replies) = harness.send("fragile");
        assert_eq!(
            outcome,
            Outcome::Failed(CommandError::Construction("database not ready".into()))
        );
        assert!(replies.is_empty());
        assert_eq!(log.messages(), vec!["command failed"]);

        // Unrelated commands are unaffected, and the next attempt constructs.
        assert_eq!(harness.send("parent").0, Outcome::Completed);
        assert_eq!(harness.send("fragile").1, vec!["constructed"]);
        assert_eq!(harness.send("fragile").1, vec!["constructed"]);
    });

    assert_eq!(log.messages(), vec!["command failed"]);
    assert_eq!(harness.attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_persistent_and_fresh_instances() {
    let harness = Harness::new();
    assert_eq!(harness.send("count").1, vec!["1"]);
    assert_eq!(harness.send("count").1, vec!["2"]);
    assert_eq!(harness.send("fresh").1, vec!["1"]);
    assert_eq!(harness.send("fresh").1, vec!["1"]);
}

#[test]
fn test_concurrent_dispatch() {
    let harness = Arc::new(Harness::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let harness = Arc::clone(&harness);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    harness.send("count");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(harness.send("count").1, vec!["101"]);
}
