//! Argument descriptors and registration-time validation.

use crate::parser::ParseError;
use crate::value::{Value, ValueType};
use thiserror::Error;

/// Flag names reserved for the built-in help and version handling.
pub const RESERVED_SHORT: char = 'h';
pub const RESERVED_LONGS: [&str; 2] = ["help", "version"];

/// Errors in the definition of a command line.
///
/// These are programming errors in the application and are reported at the
/// registration call site, before any token is parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("argument name must not be empty")]
    InvalidName,

    #[error("duplicate argument name: {0}")]
    DuplicateName(String),

    #[error("flag {flag} of argument '{arg}' is already registered")]
    DuplicateFlag { arg: String, flag: String },

    #[error("flag {0} is reserved for built-in help/version handling")]
    ReservedFlag(String),

    #[error("invalid short option '{0}': must be a single ASCII letter or digit")]
    InvalidShortOption(char),

    #[error("invalid long option '{0}': must be non-empty without leading '-', '=' or whitespace")]
    InvalidLongOption(String),

    #[error("argument '{arg}' has invalid arity {arity}")]
    InvalidArity { arg: String, arity: usize },

    #[error("invalid default for argument '{arg}': {reason}")]
    InvalidDefault { arg: String, reason: String },

    #[error("argument '{0}' is required and cannot have a default value")]
    RequiredWithDefault(String),

    #[error("positional argument '{0}' cannot have short or long flags")]
    PositionalWithFlags(String),

    #[error("positional argument '{arg}' {reason}")]
    PositionalOrder { arg: String, reason: String },

    #[error("constraint group needs at least two members, got {0}")]
    GroupTooSmall(usize),

    #[error("argument '{0}' appears twice in the same constraint group")]
    DuplicateGroupMember(String),

    #[error("constraint group refers to unknown argument #{0}")]
    UnknownArgument(usize),

    #[error("argument '{0}' is required and cannot be part of a constraint group")]
    RequiredGroupMember(String),

    #[error("argument '{0}' is already part of another exactly-one-of group")]
    ConflictingGroups(String),
}

/// Handle to an argument registered with a [`CmdLine`](crate::CmdLine).
///
/// Handles are plain indices into the registry; they are only meaningful for
/// the command line that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgId(pub(crate) usize);

impl ArgId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The kind of argument, together with its value type and arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// A boolean presence flag (e.g., --verbose)
    Switch,
    /// An option taking exactly one value (e.g., --std 3.5)
    Single(ValueType),
    /// An option taking a fixed number of values (e.g., --radius 5 5 3)
    Multi(ValueType, usize),
    /// An unlabeled argument matched by position
    Positional(ValueType, usize),
}

/// Help metadata for one argument, as consumed by the help renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpDescriptor {
    pub name: String,
    pub short: Option<char>,
    pub long: Option<String>,
    pub positional: bool,
    /// One entry per value token.
    pub value_names: Vec<String>,
    pub help: String,
    pub required: bool,
    pub repeatable: bool,
    pub defaults: Vec<String>,
}

/// Definition of a single command-line argument.
#[derive(Debug, Clone)]
pub struct Arg {
    pub(crate) name: String,
    pub(crate) short: Option<char>,
    pub(crate) long: Option<String>,
    pub(crate) kind: ArgKind,
    pub(crate) help: Option<String>,
    pub(crate) required: bool,
    pub(crate) repeatable: Option<bool>,
    pub(crate) value_names: Vec<String>,
    pub(crate) defaults: Vec<String>,
}

impl Arg {
    fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            short: None,
            long: None,
            kind,
            help: None,
            required: false,
            repeatable: None,
            value_names: Vec::new(),
            defaults: Vec::new(),
        }
    }

    /// A zero-arity boolean switch.
    pub fn switch(name: impl Into<String>) -> Self {
        Self::new(name, ArgKind::Switch)
    }

    /// An option taking one value of the given type.
    pub fn value(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, ArgKind::Single(value_type))
    }

    /// An option taking exactly `arity` values of the given type per occurrence.
    pub fn multi(name: impl Into<String>, value_type: ValueType, arity: usize) -> Self {
        Self::new(name, ArgKind::Multi(value_type, arity))
    }

    /// A positional argument consuming one token.
    pub fn positional(name: impl Into<String>, value_type: ValueType) -> Self {
        Self::new(name, ArgKind::Positional(value_type, 1))
    }

    /// A positional argument consuming `arity` tokens.
    pub fn positional_multi(name: impl Into<String>, value_type: ValueType, arity: usize) -> Self {
        Self::new(name, ArgKind::Positional(value_type, arity))
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::value(name, ValueType::Bool)
    }

    pub fn uint(name: impl Into<String>) -> Self {
        Self::value(name, ValueType::UInt)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::value(name, ValueType::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::value(name, ValueType::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::value(name, ValueType::String)
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn long(mut self, long: impl Into<String>) -> Self {
        self.long = Some(long.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Name shown for every value token in help, e.g. `float`.
    pub fn value_name(mut self, name: impl Into<String>) -> Self {
        self.value_names = vec![name.into()];
        self
    }

    /// Per-token value names, e.g. `["r_x", "r_y", "r_z"]`.
    pub fn value_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Default literal, converted and checked when the argument is registered.
    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.defaults = vec![literal.into()];
        self
    }

    pub fn default_values<I, S>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.defaults = literals.into_iter().map(Into::into).collect();
        self
    }

    /// Reject a second occurrence instead of keeping the last one.
    pub fn once(mut self) -> Self {
        self.repeatable = Some(false);
        self
    }

    /// Allow the argument to occur more than once.
    pub fn repeatable(mut self) -> Self {
        self.repeatable = Some(true);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ArgKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.kind, ArgKind::Positional(..))
    }

    /// Number of value tokens consumed per occurrence.
    pub fn arity(&self) -> usize {
        match self.kind {
            ArgKind::Switch => 0,
            ArgKind::Single(_) => 1,
            ArgKind::Multi(_, n) | ArgKind::Positional(_, n) => n,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self.kind {
            ArgKind::Switch => None,
            ArgKind::Single(t) | ArgKind::Multi(t, _) | ArgKind::Positional(t, _) => Some(t),
        }
    }

    /// Whether a second occurrence is accepted.
    ///
    /// Switches occur at most once unless declared repeatable; value options
    /// keep the last occurrence unless declared `once`.
    pub fn allows_repeat(&self) -> bool {
        match self.kind {
            ArgKind::Switch => self.repeatable.unwrap_or(false),
            ArgKind::Positional(..) => false,
            _ => self.repeatable.unwrap_or(true),
        }
    }

    /// Get the effective long option for this argument.
    /// Returns the specified long option, or falls back to the argument name
    /// for non-positional arguments that have no short option.
    pub fn effective_long(&self) -> Option<&str> {
        if self.long.is_some() {
            return self.long.as_deref();
        }
        if !self.is_positional() && self.short.is_none() {
            return Some(&self.name);
        }
        None
    }

    /// The name used in diagnostics: the long flag, the short flag, or the
    /// positional name.
    pub fn display_name(&self) -> String {
        if let Some(long) = self.effective_long() {
            format!("--{}", long)
        } else if let Some(short) = self.short {
            format!("-{}", short)
        } else {
            self.name.clone()
        }
    }

    /// Flag strings this argument answers to, e.g. `["-g", "--gaussian"]`.
    pub fn flag_strings(&self) -> Vec<String> {
        let mut flags = Vec::with_capacity(2);
        if self.is_positional() {
            return flags;
        }
        if let Some(short) = self.short {
            flags.push(format!("-{}", short));
        }
        if let Some(long) = self.effective_long() {
            flags.push(format!("--{}", long));
        }
        flags
    }

    /// Whether `token` addresses this argument.
    ///
    /// Accepts `--long`, `--long=value`, `-s`, and `-s<value>` for arguments
    /// that take values. Positional arguments never match a token.
    pub fn matches_token(&self, token: &str) -> bool {
        if self.is_positional() {
            return false;
        }
        if let Some(rest) = token.strip_prefix("--") {
            let name = rest.split_once('=').map_or(rest, |(n, _)| n);
            return self.effective_long() == Some(name);
        }
        if let Some(rest) = token.strip_prefix('-') {
            let mut chars = rest.chars();
            return match (self.short, chars.next()) {
                (Some(short), Some(c)) if short == c => {
                    chars.as_str().is_empty() || self.arity() > 0
                }
                _ => false,
            };
        }
        false
    }

    /// Take this argument's values from `inline` and the front of `tokens`.
    ///
    /// `inline` is a value attached to the flag itself (`--std=3.5`, `-s3.5`)
    /// and is always taken as the first value. The rest come from `tokens`,
    /// where a token for which `is_flag` holds ends the value window early.
    /// Either every value is returned or an error is, never a partial set.
    /// The count returned is the number of `tokens` used. Switches consume
    /// nothing and yield `true`.
    pub fn consume<'t, I, F>(
        &self,
        inline: Option<&'t str>,
        tokens: I,
        is_flag: F,
    ) -> Result<(usize, Vec<Value>), ParseError>
    where
        I: IntoIterator<Item = &'t str>,
        F: Fn(&str) -> bool,
    {
        let value_type = match self.value_type() {
            Some(t) => t,
            None => return Ok((0, vec![Value::Bool(true)])),
        };
        let arity = self.arity();

        let window: Vec<&str> = inline
            .into_iter()
            .chain(tokens.into_iter().take_while(|t| !is_flag(*t)))
            .take(arity)
            .collect();
        if window.len() < arity {
            return Err(ParseError::MissingValue {
                arg: self.display_name(),
                expected: arity,
                found: window.len(),
            });
        }

        let values = window
            .iter()
            .map(|literal| {
                value_type
                    .convert(literal)
                    .map_err(|reason| ParseError::InvalidValue {
                        arg: self.display_name(),
                        value: literal.to_string(),
                        reason,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((arity - usize::from(inline.is_some()), values))
    }

    /// Default values converted to the declared type.
    pub fn default_typed(&self) -> Result<Vec<Value>, SpecError> {
        let value_type = match self.value_type() {
            Some(t) => t,
            None if self.defaults.is_empty() => return Ok(Vec::new()),
            None => {
                return Err(SpecError::InvalidDefault {
                    arg: self.name.clone(),
                    reason: "switches cannot have a default value".to_string(),
                })
            }
        };
        if self.defaults.is_empty() {
            return Ok(Vec::new());
        }
        if self.defaults.len() != self.arity() {
            return Err(SpecError::InvalidDefault {
                arg: self.name.clone(),
                reason: format!(
                    "expected {} value(s), got {}",
                    self.arity(),
                    self.defaults.len()
                ),
            });
        }
        self.defaults
            .iter()
            .map(|literal| {
                value_type
                    .convert(literal)
                    .map_err(|reason| SpecError::InvalidDefault {
                        arg: self.name.clone(),
                        reason: format!("'{}': {}", literal, reason),
                    })
            })
            .collect()
    }

    /// Help metadata for this argument.
    pub fn help_descriptor(&self) -> HelpDescriptor {
        let arity = self.arity();
        let value_names = match self.value_names.len() {
            0 => {
                let placeholder = if self.is_positional() {
                    self.name.clone()
                } else {
                    self.value_type()
                        .map(|t| t.placeholder().to_string())
                        .unwrap_or_default()
                };
                vec![placeholder; arity]
            }
            n if n == arity => self.value_names.clone(),
            _ => vec![self.value_names[0].clone(); arity],
        };

        HelpDescriptor {
            name: self.name.clone(),
            short: if self.is_positional() { None } else { self.short },
            long: self.effective_long().map(str::to_string),
            positional: self.is_positional(),
            value_names,
            help: self.help.clone().unwrap_or_default(),
            required: self.required,
            repeatable: self.allows_repeat() && !self.is_positional(),
            defaults: self.defaults.clone(),
        }
    }

    /// Validate the definition of this argument in isolation.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.name.is_empty() {
            return Err(SpecError::InvalidName);
        }

        if self.is_positional() {
            if self.short.is_some() || self.long.is_some() {
                return Err(SpecError::PositionalWithFlags(self.name.clone()));
            }
        } else {
            if let Some(short) = self.short {
                if !short.is_ascii_alphanumeric() {
                    return Err(SpecError::InvalidShortOption(short));
                }
                if short == RESERVED_SHORT {
                    return Err(SpecError::ReservedFlag(format!("-{}", short)));
                }
            }
            if let Some(long) = self.effective_long() {
                if long.is_empty()
                    || long.starts_with('-')
                    || long.contains('=')
                    || long.chars().any(char::is_whitespace)
                {
                    return Err(SpecError::InvalidLongOption(long.to_string()));
                }
                if RESERVED_LONGS.contains(&long) {
                    return Err(SpecError::ReservedFlag(format!("--{}", long)));
                }
            }
        }

        match self.kind {
            ArgKind::Multi(_, n) if n < 2 => {
                return Err(SpecError::InvalidArity {
                    arg: self.name.clone(),
                    arity: n,
                })
            }
            ArgKind::Positional(_, 0) => {
                return Err(SpecError::InvalidArity {
                    arg: self.name.clone(),
                    arity: 0,
                })
            }
            _ => {}
        }

        if self.required && !self.defaults.is_empty() {
            return Err(SpecError::RequiredWithDefault(self.name.clone()));
        }
        self.default_typed()?;

        Ok(())
    }
}
