//! Placeholder scanning
//!
//! Splits a string into literal text and `%...%` tokens:
//! - `%name%` - reference to another key in the same tree
//! - `%env.NAME%` - environment variable
//! - `%%` - escaped percent sign, kept as `%%` until unescaping
//!
//! A token body never contains `%` or whitespace, so `100% sure` or
//! `a % b % c` contain no placeholders.

use regex::Regex;
use std::sync::LazyLock;

/// Prefix marking an environment variable placeholder
pub const ENV_PREFIX: &str = "env.";

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%([^%\s]*)%").expect("placeholder pattern is valid"));

/// One piece of a scanned string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Text outside any token
    Literal(&'a str),
    /// `%%`
    Escaped,
    /// `%env.NAME%`, holding `NAME`
    Env(&'a str),
    /// `%name%`, holding `name`
    Param(&'a str),
}

/// A string split into segments, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    segments: Vec<Segment<'a>>,
}

impl<'a> Template<'a> {
    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    /// The parameter name when the whole input is exactly one `%name%` token.
    ///
    /// Escapes and environment tokens never qualify: they always produce text.
    pub fn single_param(&self) -> Option<&'a str> {
        match self.segments.as_slice() {
            [Segment::Param(name)] => Some(*name),
            _ => None,
        }
    }

    /// True when no token was found
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)))
    }
}

/// Quick check used to skip strings that cannot hold a token
pub fn contains_placeholders(input: &str) -> bool {
    input.contains('%') && TOKEN.is_match(input)
}

/// Scan `input` for tokens, left to right, without overlap
pub fn parse(input: &str) -> Template<'_> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in TOKEN.captures_iter(input) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        if whole.start() > last {
            segments.push(Segment::Literal(&input[last..whole.start()]));
        }

        let body = body.as_str();
        segments.push(if body.is_empty() {
            Segment::Escaped
        } else if let Some(name) = body.strip_prefix(ENV_PREFIX) {
            Segment::Env(name)
        } else {
            Segment::Param(body)
        });

        last = whole.end();
    }

    if last < input.len() {
        segments.push(Segment::Literal(&input[last..]));
    }

    Template { segments }
}

/// Collapse every `%%` into a single `%`
pub fn unescape(input: &str) -> String {
    input.replace("%%", "%")
}
