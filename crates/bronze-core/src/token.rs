//! Lazy message tokenizer.
//!
//! Splits message text on whitespace while honouring `"` and `` ` `` quoting.
//! A message that is entirely one triple-backtick code block becomes a single
//! token holding the block body.
//!
//! ```
//! use bronze_core::token::tokenize;
//!
//! let tokens: Vec<_> = tokenize(r#"say "hello world" now"#).map(|t| t.text()).collect();
//! assert_eq!(tokens, vec!["say", "hello world", "now"]);
//! ```

use std::iter::FusedIterator;

/// One token of the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawToken<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> RawToken<'a> {
    pub fn new(text: &'a str, offset: usize) -> Self {
        Self { text, offset }
    }

    /// The token text, without surrounding quotes.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Byte offset of [`text`](Self::text) in the source string.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

const FENCE: &str = "```";

enum Mode<'a> {
    Split { pos: usize },
    Block(Option<RawToken<'a>>),
}

/// Forward-only lazy token iterator returned by [`tokenize`].
pub struct Tokenizer<'a> {
    source: &'a str,
    mode: Mode<'a>,
}

/// Tokenizes `text` lazily.
///
/// Empty or whitespace-only input yields no tokens. Unterminated quotes are
/// not an error; the quote character simply stays part of a plain token.
pub fn tokenize(text: &str) -> Tokenizer<'_> {
    Tokenizer::new(text)
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mode = match code_block(source) {
            Some(token) => Mode::Block(token),
            None => Mode::Split { pos: 0 },
        };
        Self { source, mode }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    fn next_split(&self, pos: usize) -> Option<(RawToken<'a>, usize)> {
        let rest = &self.source[pos..];
        let trimmed = rest.trim_start();
        let start = pos + (rest.len() - trimmed.len());
        let first = trimmed.chars().next()?;

        if (first == '"' || first == '`')
            && let Some(close) = trimmed[1..].find(first)
        {
            let token = RawToken::new(&trimmed[1..1 + close], start + 1);
            return Some((token, start + close + 2));
        }

        let end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        Some((RawToken::new(&trimmed[..end], start), start + end))
    }
}

/// Detects a message that is a single fenced code block. Several fenced
/// spans in one message are not a block.
///
/// Returns `Some(None)` for a fence with an empty body, `None` when the
/// message is not a code block at all.
fn code_block(source: &str) -> Option<Option<RawToken<'_>>> {
    let trimmed = source.trim();
    if trimmed.len() < FENCE.len() * 2 || !trimmed.starts_with(FENCE) || !trimmed.ends_with(FENCE)
    {
        return None;
    }

    let mut body = &trimmed[FENCE.len()..trimmed.len() - FENCE.len()];
    if body.contains(FENCE) {
        return None;
    }
    if let Some(newline) = body.find('\n') {
        body = &body[newline + 1..];
    }
    let body = body.trim();
    if body.is_empty() {
        return Some(None);
    }

    let offset = body.as_ptr() as usize - source.as_ptr() as usize;
    Some(Some(RawToken::new(body, offset)))
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = RawToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = match &mut self.mode {
            Mode::Block(token) => return token.take(),
            Mode::Split { pos } => *pos,
        };
        let (token, next) = self.next_split(pos)?;
        self.mode = Mode::Split { pos: next };
        Some(token)
    }
}

impl FusedIterator for Tokenizer<'_> {}

impl std::fmt::Debug for Tokenizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        tokenize(input).map(|t| t.text()).collect()
    }

    #[test]
    fn test_split_whitespace() {
        assert_eq!(texts("echo  hello\tworld\n"), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(texts("").is_empty());
        assert!(texts("   \n\t ").is_empty());
    }

    #[test]
    fn test_double_quotes_preserve_whitespace() {
        assert_eq!(
            texts(r#"say "hello   world" now"#),
            vec!["say", "hello   world", "now"]
        );
    }

    #[test]
    fn test_backtick_quotes() {
        assert_eq!(texts("run `ls -la` fast"), vec!["run", "ls -la", "fast"]);
    }

    #[test]
    fn test_unterminated_quote_is_plain() {
        assert_eq!(texts(r#"say "hello world"#), vec!["say", "\"hello", "world"]);
    }

    #[test]
    fn test_offsets_point_into_source() {
        let source = r#"a "b c" d"#;
        for token in tokenize(source) {
            assert_eq!(&source[token.offset()..token.offset() + token.len()], token.text());
        }
    }

    #[test]
    fn test_code_block_is_one_token() {
        let source = "```rust\nfn main() {\n    println!(\"hi\");\n}\n```";
        let tokens: Vec<_> = tokenize(source).collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text(), "fn main() {\n    println!(\"hi\");\n}");
        assert_eq!(
            &source[tokens[0].offset()..tokens[0].offset() + tokens[0].len()],
            tokens[0].text()
        );
    }

    #[test]
    fn test_code_block_without_language_line() {
        assert_eq!(texts("```a b c```"), vec!["a b c"]);
        assert!(texts("``````").is_empty());
    }

    #[test]
    fn test_separate_code_spans_split_normally() {
        let tokens = texts("```a``` b ```c```");
        assert!(tokens.iter().all(|token| !token.contains(FENCE)));
        let words: Vec<_> = tokens.into_iter().filter(|token| !token.is_empty()).collect();
        assert_eq!(words, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rejoined_tokens_keep_count() {
        let inputs = ["ping", "a  b   c", "roll 2-6 \t now", " x y z ", "<@1> :) 12"];
        for input in inputs {
            let first = texts(input);
            let joined = first.join(" ");
            assert_eq!(texts(&joined).len(), first.len(), "input: {input:?}");
        }
    }

    #[test]
    fn test_lazy_iteration_stops_early() {
        let mut tokens = tokenize("one two three");
        assert_eq!(tokens.next().map(|t| t.text()), Some("one"));
        assert_eq!(tokens.next().map(|t| t.text()), Some("two"));
    }
}
