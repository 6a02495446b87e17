//! Console Bot
//!
//! Each line typed on stdin is treated as a chat message in a small
//! pretend guild; replies are printed to stdout.
//!
//! ```text
//! > !add 2 40
//! bot> 42
//! > !whois <@11>
//! bot> alice (nickname Al), roles: moderators
//! > ?kick
//! bot> **kick** - Removes a member from the server
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package console-bot -- --config demos/console_bot/bronze.toml
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bronze::prelude::*;
use bronze::framework::Parameter;
use clap::Parser;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

const GUILD: u64 = 1;
const CHANNEL: u64 = 2;

#[derive(Debug, Parser)]
#[command(about = "Chat with a Bronze bot from the terminal")]
struct Cli {
    /// Configuration file; `bronze.toml` is searched for when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long)]
    profile: Option<String>,

    /// Send messages as direct messages instead of in the guild.
    #[arg(long)]
    direct: bool,

    /// User id the messages come from.
    #[arg(long, default_value_t = 11)]
    author: u64,
}

// ============================================================================
// Console platform
// ============================================================================

struct ConsoleEvent {
    content: String,
    guild_id: Option<u64>,
    author_id: u64,
    directory: Arc<MemoryDirectory>,
}

impl Event for ConsoleEvent {
    fn content(&self) -> &str {
        &self.content
    }

    fn guild_id(&self) -> Option<u64> {
        self.guild_id
    }

    fn channel_id(&self) -> u64 {
        CHANNEL
    }

    fn author_id(&self) -> u64 {
        self.author_id
    }

    fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    fn reply(&self, reply: Reply) -> Result<(), ReplyError> {
        println!("bot> {reply}");
        Ok(())
    }
}

fn directory() -> MemoryDirectory {
    let mut alice = Member::new(GUILD, User::new(11, "alice"));
    alice.nickname = Some("Al".into());
    alice.roles.push(21);
    let mut bob = Member::new(GUILD, User::new(12, "bob"));
    bob.roles.push(22);

    MemoryDirectory::new()
        .with_member(alice)
        .with_member(bob)
        .with_user(User::new(13, "carol"))
        .with_role(Role::new(21, GUILD, "moderators"))
        .with_role(Role::new(22, GUILD, "members"))
        .with_channel(Channel::new(CHANNEL, Some(GUILD), "general"))
}

// ============================================================================
// Handlers
// ============================================================================

fn ping(_inv: &Invocation<'_>) -> &'static str {
    "pong"
}

fn echo(_inv: &Invocation<'_>, words: Args<String>) -> String {
    words.join(" ")
}

fn add(_inv: &Invocation<'_>, a: Arg<i64>, b: Arg<i64>) -> Result<String, String> {
    a.checked_add(*b)
        .map(|sum| sum.to_string())
        .ok_or_else(|| "that number is too large".to_string())
}

fn sum(_inv: &Invocation<'_>, ranges: Args<IntRange>) -> String {
    let total: i64 = ranges.iter().flat_map(IntRange::iter).sum();
    total.to_string()
}

fn remind(_inv: &Invocation<'_>, after: Arg<Duration>, what: Args<String>) -> String {
    format!("I'll remind you to {} in {}s", what.join(" "), after.as_secs())
}

fn whois(inv: &Invocation<'_>, member: Arg<Member>) -> String {
    let directory = inv.event().directory();
    let roles: Vec<String> = member
        .roles
        .iter()
        .filter_map(|&id| directory.role(GUILD, id))
        .map(|role| role.name)
        .collect();
    let mut text = member.user.name.clone();
    if let Some(nickname) = &member.nickname {
        text.push_str(&format!(" (nickname {nickname})"));
    }
    if !roles.is_empty() {
        text.push_str(&format!(", roles: {}", roles.join(", ")));
    }
    text
}

fn kick(_inv: &Invocation<'_>, target: Arg<Member>, reason: Option<Arg<String>>) -> String {
    match reason {
        Some(reason) => format!("Kicked {} ({})", target.display_name(), *reason),
        None => format!("Kicked {}", target.display_name()),
    }
}

fn temperature(_inv: &Invocation<'_>, value: Arg<Celsius>) -> String {
    let Celsius(celsius) = *value;
    format!("{celsius:.1}°C is {:.1}°F", value.fahrenheit())
}

fn admin(_inv: &Invocation<'_>) -> &'static str {
    "Admin tools. Try `!admin help`."
}

fn say(inv: &Invocation<'_>, channel: Arg<Channel>, words: Args<String>) -> Option<String> {
    let text = words.join(" ");
    info!(channel = %channel.name, author = inv.author_id(), "Announcement");
    (!text.is_empty()).then(|| format!("#{}: {text}", channel.name))
}

fn no_member(inv: &Invocation<'_>, param: &Parameter) {
    let _ = inv.reply(format!("Who should I {}? Mention a {}.", inv.node().name(), param.name()));
}

/// A temperature such as `21.5c`.
#[derive(Clone, Copy)]
struct Celsius(f64);

impl Celsius {
    fn parse(text: &str) -> Option<Self> {
        let number = text.strip_suffix(['c', 'C']).unwrap_or(text);
        number.parse().ok().map(Self)
    }

    fn fahrenheit(self) -> f64 {
        self.0 * 9.0 / 5.0 + 32.0
    }
}

/// Counts invocations; one instance lives as long as the bot.
#[derive(Default)]
struct Counter {
    total: AtomicU64,
}

impl Counter {
    fn bump(&self, _inv: &Invocation<'_>) -> String {
        let count = self.total.fetch_add(1, Ordering::Relaxed) + 1;
        format!("Counted {count} time(s)")
    }
}

/// Rejects a second command from the same user within `window`.
fn cooldown(window: Duration) -> Preprocessor {
    let last_seen: Mutex<HashMap<u64, Instant>> = Mutex::new(HashMap::new());
    Preprocessor::new("cooldown", move |inv, next| {
        let now = Instant::now();
        let previous = last_seen.lock().insert(inv.author_id(), now);
        if let Some(previous) = previous
            && now.duration_since(previous) < window
        {
            inv.reply("Slow down!")?;
            return Ok(());
        }
        next.proceed();
        Ok(())
    })
}

fn commands() -> CommandTreeBuilder {
    let mut builder = CommandTree::builder();
    builder
        .registry_mut()
        .register::<Celsius, _>(|arg, _| Celsius::parse(arg.raw()));

    builder
        .property(Category("General".into()))
        .command(
            CommandBuilder::new(["ping"])
                .function(ping)
                .property(Description("Checks the bot is alive".into())),
        )
        .command(
            CommandBuilder::new(["echo", "say"])
                .function(echo)
                .property(Description("Repeats what you say".into())),
        )
        .command(CommandBuilder::new(["add"]).function(add))
        .command(
            CommandBuilder::new(["sum"])
                .function(sum)
                .property(Description("Adds up numbers and ranges like 1-10".into())),
        )
        .command(
            CommandBuilder::new(["remind"])
                .function(remind)
                .property(Usage("<duration> <what...>".into()))
                .preprocessor(cooldown(Duration::from_secs(2))),
        )
        .command(CommandBuilder::new(["temp"]).function(temperature))
        .command(
            CommandBuilder::new(["count"])
                .method(Counter::bump)
                .class::<Counter>()
                .property(Persistent),
        )
        .command(
            CommandBuilder::new(["whois"])
                .function(whois)
                .property(Category("Moderation".into()))
                .property(GuildOnly),
        )
        .command(
            CommandBuilder::new(["kick"])
                .function(kick)
                .property(Category("Moderation".into()))
                .property(Description("Removes a member from the server".into()))
                .property(GuildOnly)
                .param(0, ParameterConfig::new().name("member").fallback(no_member))
                .param(1, ParameterConfig::new().name("reason").width(0)),
        )
        .command(
            CommandBuilder::new(["admin"])
                .function(admin)
                .property(Category("Moderation".into()))
                .child(
                    CommandBuilder::new(["announce"])
                        .function(say)
                        .property(Description("Posts in a channel".into())),
                )
                .child(CommandBuilder::help_command(["help"]).property(Hidden)),
        )
        .command(CommandBuilder::help_command(["help"]))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut runtime = CommandRuntime::builder();
    if let Some(path) = &cli.config {
        runtime = runtime.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        runtime = runtime.profile(profile);
    }
    let runtime = Arc::new(
        runtime
            .commands(commands())
            .build()
            .context("failed to start the command runtime")?,
    );
    let directory = Arc::new(directory());
    let guild_id = (!cli.direct).then_some(GUILD);

    info!(
        commands = runtime.tree().len(),
        prefix = %runtime.config().commands.prefix,
        "Console bot ready, type a message"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        };
        let Some(content) = line else { break };

        let event = ConsoleEvent {
            content,
            guild_id,
            author_id: cli.author,
            directory: Arc::clone(&directory),
        };
        // Handlers are synchronous; keep them off the reactor threads.
        let runtime = Arc::clone(&runtime);
        let outcome = tokio::task::spawn_blocking(move || runtime.handle(&event)).await;
        match outcome {
            Ok(Some(Outcome::NotFound)) => println!("bot> Unknown command"),
            Ok(_) => {}
            Err(e) => error!(error = %e, "Dispatch task failed"),
        }
    }

    Ok(())
}
