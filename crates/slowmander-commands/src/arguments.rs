//! Argument declarations, tokenization and typed coercion.

use crate::directory::{
    DirectoryLookup, ResolvedChannel, ResolvedEmoji, ResolvedMember, ResolvedRole, ResolvedUser,
};
use once_cell::sync::Lazy;
use regex::Regex;
use slowmander_common::GuildId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A double-quoted run, a single-quoted run, or a run of non-whitespace.
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"]*)"|'([^']*)'|(\S+)"#).expect("token pattern is valid")
});

/// Splits raw text into tokens. Quotes around a token are stripped and the
/// quoted content is taken verbatim.
pub fn tokenize(raw: &str) -> Vec<String> {
    TOKEN_PATTERN
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Declared type of an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    /// Verbatim text.
    String,
    /// Base-10 signed integer.
    Int,
    /// Finite floating point number.
    Number,
    /// `true` or `false`, case-insensitive.
    Bool,
    /// A platform user.
    User,
    /// A member of the invoking guild.
    Member,
    /// A channel.
    Channel,
    /// A guild role.
    Role,
    /// A custom emoji.
    Emoji,
}

impl ArgumentKind {
    /// Whether `min`/`max` bounds apply to this kind.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Number)
    }

    /// Lowercase type name used in help text.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::User => "user",
            Self::Member => "member",
            Self::Channel => "channel",
            Self::Role => "role",
            Self::Emoji => "emoji",
        }
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One allowed value of a restricted argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentChoice {
    /// Name shown to users.
    pub label: String,
    /// Value handed to the coercion step.
    pub value: String,
}

/// Declarative description of one positional argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    /// Argument name, unique within its command.
    pub name: String,
    /// Declared type.
    pub kind: ArgumentKind,
    /// Short description for help text and slash-command options.
    pub description: String,
    /// Whether the argument may be absent.
    pub optional: bool,
    /// Allowed values. Empty means unrestricted.
    pub choices: Vec<ArgumentChoice>,
    /// Inclusive lower bound for numeric kinds.
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric kinds.
    pub max: Option<f64>,
    /// Whether the argument takes every remaining token, joined by spaces.
    pub rest: bool,
}

impl ArgumentSpec {
    /// Creates a required argument.
    pub fn new(name: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            optional: false,
            choices: Vec::new(),
            min: None,
            max: None,
            rest: false,
        }
    }

    /// Shorthand for a string argument.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::String)
    }

    /// Shorthand for an int argument.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Int)
    }

    /// Shorthand for a number argument.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Number)
    }

    /// Shorthand for a bool argument.
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Bool)
    }

    /// Shorthand for a user argument.
    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::User)
    }

    /// Shorthand for a member argument.
    pub fn member(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Member)
    }

    /// Shorthand for a channel argument.
    pub fn channel(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Channel)
    }

    /// Shorthand for a role argument.
    pub fn role(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Role)
    }

    /// Shorthand for an emoji argument.
    pub fn emoji(name: impl Into<String>) -> Self {
        Self::new(name, ArgumentKind::Emoji)
    }

    /// Sets the description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the argument optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Makes the argument take the rest of the line. Only a trailing string
    /// argument may do so.
    #[must_use]
    pub const fn rest(mut self) -> Self {
        self.rest = true;
        self
    }

    /// Adds an allowed value.
    #[must_use]
    pub fn choice(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.choices.push(ArgumentChoice {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    /// Sets the inclusive lower bound.
    #[must_use]
    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the inclusive upper bound.
    #[must_use]
    pub const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Maps a token onto a declared choice by value, or by label ignoring case.
    fn choice_value<'a>(&'a self, token: &'a str) -> Option<&'a str> {
        if self.choices.is_empty() {
            return Some(token);
        }
        self.choices
            .iter()
            .find(|c| c.value == token || c.label.eq_ignore_ascii_case(token))
            .map(|c| c.value.as_str())
    }

    fn within_bounds(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// A coerced argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Verbatim text.
    String(String),
    /// Integer.
    Int(i64),
    /// Finite number.
    Number(f64),
    /// Boolean.
    Bool(bool),
    /// User.
    User(ResolvedUser),
    /// Guild member.
    Member(ResolvedMember),
    /// Channel.
    Channel(ResolvedChannel),
    /// Role.
    Role(ResolvedRole),
    /// Custom emoji.
    Emoji(ResolvedEmoji),
}

impl ArgValue {
    /// Renders the value back to token form. Entities render as markup.
    pub fn render(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Int(n) => n.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::User(user) => user.mention(),
            Self::Member(member) => member.user.mention(),
            Self::Channel(channel) => channel.mention(),
            Self::Role(role) => role.mention(),
            Self::Emoji(emoji) => emoji.markup(),
        }
    }
}

/// Parsed arguments of one invocation, in declaration order. Optional
/// arguments that were not supplied are present with no value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<(String, Option<ArgValue>)>,
}

impl Arguments {
    /// Number of declared arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the command declares no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the named argument, if supplied.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Value at `index` in declaration order, if supplied.
    pub fn at(&self, index: usize) -> Option<&ArgValue> {
        self.values.get(index).and_then(|(_, v)| v.as_ref())
    }

    /// Iterates over `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&ArgValue>)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_ref()))
    }

    /// String argument.
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Int argument.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ArgValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Number argument.
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Bool argument.
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// User argument.
    pub fn user(&self, name: &str) -> Option<&ResolvedUser> {
        match self.get(name)? {
            ArgValue::User(user) => Some(user),
            _ => None,
        }
    }

    /// Member argument.
    pub fn member(&self, name: &str) -> Option<&ResolvedMember> {
        match self.get(name)? {
            ArgValue::Member(member) => Some(member),
            _ => None,
        }
    }

    /// Channel argument.
    pub fn channel(&self, name: &str) -> Option<&ResolvedChannel> {
        match self.get(name)? {
            ArgValue::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    /// Role argument.
    pub fn role(&self, name: &str) -> Option<&ResolvedRole> {
        match self.get(name)? {
            ArgValue::Role(role) => Some(role),
            _ => None,
        }
    }

    /// Emoji argument.
    pub fn emoji(&self, name: &str) -> Option<&ResolvedEmoji> {
        match self.get(name)? {
            ArgValue::Emoji(emoji) => Some(emoji),
            _ => None,
        }
    }
}

/// Why an argument list could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A required argument had no token.
    #[error("Missing required argument `{name}`")]
    Missing {
        /// Argument name.
        name: String,
    },
    /// A token could not be coerced to the declared type.
    #[error("Invalid value `{token}` for `{name}` (expected {kind})")]
    Invalid {
        /// Argument name.
        name: String,
        /// Offending token.
        token: String,
        /// Declared type.
        kind: ArgumentKind,
    },
}

/// Raw argument input from an event source.
#[derive(Debug, Clone)]
pub enum ArgumentInput {
    /// Tokens in declaration order, from message text.
    Positional(Vec<String>),
    /// Values keyed by argument name, from structured interactions.
    Named(HashMap<String, String>),
}

/// Turns raw tokens into typed [`Arguments`].
#[derive(Clone)]
pub struct ArgumentParser {
    directory: Arc<dyn DirectoryLookup>,
}

impl ArgumentParser {
    /// Creates a parser resolving entities through `directory`.
    pub fn new(directory: Arc<dyn DirectoryLookup>) -> Self {
        Self { directory }
    }

    /// Tokenizes `raw` and parses the tokens against `specs`.
    pub async fn parse(
        &self,
        raw: &str,
        specs: &[ArgumentSpec],
        scope: Option<GuildId>,
    ) -> Result<Arguments, ArgumentError> {
        self.parse_tokens(&tokenize(raw), specs, scope).await
    }

    /// Parses `input` of either shape against `specs`.
    pub async fn parse_input(
        &self,
        input: &ArgumentInput,
        specs: &[ArgumentSpec],
        scope: Option<GuildId>,
    ) -> Result<Arguments, ArgumentError> {
        match input {
            ArgumentInput::Positional(tokens) => self.parse_tokens(tokens, specs, scope).await,
            ArgumentInput::Named(values) => self.parse_named(values, specs, scope).await,
        }
    }

    /// Consumes one token per spec in declaration order, or every remaining
    /// token for a rest argument. All-or-nothing: a missing or invalid
    /// required argument fails the whole list. Extra tokens are ignored.
    pub async fn parse_tokens(
        &self,
        tokens: &[String],
        specs: &[ArgumentSpec],
        scope: Option<GuildId>,
    ) -> Result<Arguments, ArgumentError> {
        let mut tokens = tokens.iter();
        let mut values = Vec::with_capacity(specs.len());
        for spec in specs {
            let token = if spec.rest {
                let rest: Vec<&str> = tokens.by_ref().map(String::as_str).collect();
                (!rest.is_empty()).then(|| rest.join(" "))
            } else {
                tokens.next().cloned()
            };
            let value = self.coerce_slot(spec, token.as_deref(), scope).await?;
            values.push((spec.name.clone(), value));
        }
        Ok(Arguments { values })
    }

    /// Like [`parse_tokens`](Self::parse_tokens) with values looked up by
    /// argument name.
    pub async fn parse_named(
        &self,
        named: &HashMap<String, String>,
        specs: &[ArgumentSpec],
        scope: Option<GuildId>,
    ) -> Result<Arguments, ArgumentError> {
        let mut values = Vec::with_capacity(specs.len());
        for spec in specs {
            let value = self
                .coerce_slot(spec, named.get(&spec.name).map(String::as_str), scope)
                .await?;
            values.push((spec.name.clone(), value));
        }
        Ok(Arguments { values })
    }

    async fn coerce_slot(
        &self,
        spec: &ArgumentSpec,
        token: Option<&str>,
        scope: Option<GuildId>,
    ) -> Result<Option<ArgValue>, ArgumentError> {
        let Some(token) = token else {
            return if spec.optional {
                Ok(None)
            } else {
                Err(ArgumentError::Missing {
                    name: spec.name.clone(),
                })
            };
        };

        match self.coerce(spec, token, scope).await {
            Some(value) => Ok(Some(value)),
            None if spec.optional => Ok(None),
            None => Err(ArgumentError::Invalid {
                name: spec.name.clone(),
                token: token.to_string(),
                kind: spec.kind,
            }),
        }
    }

    /// Coerces a single token. Returns `None` when the token does not
    /// satisfy the argument's type, choices or bounds.
    pub async fn coerce(
        &self,
        spec: &ArgumentSpec,
        token: &str,
        scope: Option<GuildId>,
    ) -> Option<ArgValue> {
        let token = spec.choice_value(token)?;
        let value = match spec.kind {
            ArgumentKind::String => ArgValue::String(token.to_string()),
            ArgumentKind::Int => {
                let n = token.parse::<i64>().ok()?;
                #[allow(clippy::cast_precision_loss)]
                let in_range = spec.within_bounds(n as f64);
                if !in_range {
                    return None;
                }
                ArgValue::Int(n)
            }
            ArgumentKind::Number => {
                let n = token.parse::<f64>().ok().filter(|n| n.is_finite())?;
                if !spec.within_bounds(n) {
                    return None;
                }
                ArgValue::Number(n)
            }
            ArgumentKind::Bool => {
                if token.eq_ignore_ascii_case("true") {
                    ArgValue::Bool(true)
                } else if token.eq_ignore_ascii_case("false") {
                    ArgValue::Bool(false)
                } else {
                    return None;
                }
            }
            ArgumentKind::User => ArgValue::User(self.directory.resolve_user(token, scope).await?),
            ArgumentKind::Member => {
                ArgValue::Member(self.directory.resolve_member(token, scope).await?)
            }
            ArgumentKind::Channel => {
                ArgValue::Channel(self.directory.resolve_channel(token, scope).await?)
            }
            ArgumentKind::Role => ArgValue::Role(self.directory.resolve_role(token, scope).await?),
            ArgumentKind::Emoji => {
                ArgValue::Emoji(self.directory.resolve_emoji(token, scope).await?)
            }
        };
        Some(value)
    }
}

impl fmt::Debug for ArgumentParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentParser").finish_non_exhaustive()
    }
}
