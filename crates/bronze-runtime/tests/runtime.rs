//! Building a runtime from configuration files and environment.

use figment::Jail;
use parking_lot::Mutex;

use bronze_core::{Directory, MemoryDirectory};
use bronze_framework::CommandTreeBuilder;
use bronze_framework::prelude::*;
use bronze_runtime::{CommandRuntime, RuntimeError};

struct Message {
    content: String,
    directory: MemoryDirectory,
    replies: Mutex<Vec<String>>,
}

impl Message {
    fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            directory: MemoryDirectory::new(),
            replies: Mutex::new(Vec::new()),
        }
    }

    fn replies(&self) -> Vec<String> {
        self.replies.lock().clone()
    }
}

impl Event for Message {
    fn content(&self) -> &str {
        &self.content
    }

    fn guild_id(&self) -> Option<u64> {
        Some(5)
    }

    fn channel_id(&self) -> u64 {
        6
    }

    fn author_id(&self) -> u64 {
        7
    }

    fn directory(&self) -> &dyn Directory {
        &self.directory
    }

    fn reply(&self, reply: Reply) -> Result<(), ReplyError> {
        self.replies.lock().push(reply.to_string());
        Ok(())
    }
}

fn repeat(_inv: &Invocation<'_>, word: Arg<String>, times: Arg<i32>) -> String {
    vec![word.as_str(); usize::try_from(*times).unwrap_or(0)].join(" ")
}

fn commands(trace: &'static Mutex<Vec<&'static str>>) -> CommandTreeBuilder {
    let step = move |id: &'static str| {
        Preprocessor::new(id, move |_, next| {
            trace.lock().push(id);
            next.proceed();
            Ok(())
        })
    };
    CommandTree::builder()
        .order(PriorityOrder::new(["first", "second"]))
        .command(
            CommandBuilder::new(["repeat", "echo"])
                .function(repeat)
                .property(Description("Repeats a word".into()))
                .preprocessor(step("first"))
                .preprocessor(step("second")),
        )
        .command(CommandBuilder::help_command(["help"]))
}

#[test]
fn test_runtime_from_files_and_env() {
    static TRACE: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    Jail::expect_with(|jail| {
        jail.create_file(
            "bronze.toml",
            r#"
            [commands]
            prefix = "!"
            preprocessor_order = ["second", "*"]
            missing_parameter_reply = "What about {parameters}?"
            "#,
        )?;
        jail.set_env("BRONZE_COMMANDS__PREFIX", "~");

        let runtime = CommandRuntime::builder()
            .search_path(jail.directory())
            .without_logging()
            .commands(commands(&TRACE))
            .build()
            .unwrap();
        assert_eq!(runtime.config().commands.prefix, "~");

        let message = Message::new("~echo hi 3");
        assert_eq!(runtime.handle(&message), Some(Outcome::Completed));
        assert_eq!(message.replies(), vec!["hi hi hi"]);
        // The configured order replaces the one set in code.
        assert_eq!(*TRACE.lock(), vec!["second", "first"]);

        let message = Message::new("~repeat");
        assert_eq!(
            runtime.handle(&message),
            Some(Outcome::MissingParameters(vec!["string".into(), "i32".into()]))
        );
        assert_eq!(message.replies(), vec!["What about string, i32?"]);

        assert_eq!(runtime.handle(&Message::new("!repeat hi 1")), None);
        Ok(())
    });
}

#[test]
fn test_help_prefix_renders_help() {
    static TRACE: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    let runtime = CommandRuntime::builder()
        .without_env()
        .search_path(env!("CARGO_MANIFEST_DIR"))
        .without_logging()
        .commands(commands(&TRACE))
        .build()
        .unwrap();

    let message = Message::new("?echo");
    assert_eq!(runtime.handle(&message), Some(Outcome::Completed));
    assert_eq!(
        message.replies(),
        vec!["**repeat** - Repeats a word\nUsage: repeat <string> <i32>\nAliases: echo"]
    );
    assert!(TRACE.lock().is_empty());
}

#[test]
fn test_invalid_order_fails_startup() {
    static TRACE: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    Jail::expect_with(|jail| {
        jail.set_env("BRONZE_COMMANDS__PREPROCESSOR_ORDER", "[auth, auth]");
        let result = CommandRuntime::builder()
            .search_path(jail.directory())
            .without_logging()
            .commands(commands(&TRACE))
            .build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
        Ok(())
    });
}
