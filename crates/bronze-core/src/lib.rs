//! # Bronze Core
//!
//! Text-level building blocks of the Bronze command framework.
//!
//! This crate knows nothing about commands. It turns raw message text into
//! classified arguments and converts those arguments into typed values:
//!
//! - **Tokenizer**: lazy whitespace / quote / code-block splitting ([`tokenize`])
//! - **Entities**: the platform objects a mention can refer to ([`User`], [`Member`], ...)
//! - **Directory**: the lookup collaborator supplied by the platform binding ([`Directory`])
//! - **Arguments**: classified tokens and the lazy, cached [`ArgumentList`]
//! - **Parsers**: per-type converters held in a [`TypeRegistry`]
//!
//! ```text
//! "ban <@42> 7 days"
//!        │
//!        ▼
//! ┌───────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Tokenizer │──▶│ ArgumentList │──▶│ TypeRegistry │──▶ Member, Duration
//! └───────────┘   └──────────────┘   └──────────────┘
//!                        │
//!                        ▼
//!                   Directory
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bronze_core::{ArgumentList, Lookup, MemoryDirectory, ParseContext, TypeRegistry, User};
//!
//! let directory = MemoryDirectory::new().with_user(User::new(42, "ferris"));
//! let lookup = Lookup::new(&directory, None);
//! let args = ArgumentList::new("greet <@42> 3", lookup);
//!
//! let registry = TypeRegistry::with_builtins();
//! let cx = ParseContext::new(lookup);
//! let user = registry.get::<User>().unwrap().parse(&args.get(1).unwrap(), &cx);
//! assert_eq!(user.map(|u| u.name), Some("ferris".to_string()));
//! ```

pub mod argument;
pub mod directory;
pub mod emoji;
pub mod entity;
pub mod error;
pub mod parse;
pub mod token;

pub use argument::{Argument, ArgumentKind, ArgumentList, classify};
pub use directory::{Directory, EmptyDirectory, Lookup, MemoryDirectory};
pub use entity::{Channel, Emoji, Emote, Member, MentionKind, Role, User};
pub use error::{ParseError, ParseResult};
pub use parse::{
    BoxedValue, IntRange, ParseContext, ParseOptions, TypeParser, TypeRegistry, ValueParser,
    ValueStream,
};
pub use token::{RawToken, Tokenizer, tokenize};
