//! The command-line registry: program identity, arguments and groups.

use crate::arg::{Arg, ArgId, SpecError};
use crate::group::{Group, GroupPolicy};
use crate::help::{generate_help, generate_usage, generate_version};
use crate::parser::{parse_args, Matches, Outcome, ParseError};
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A command line under construction, and the parser for it.
///
/// Arguments and constraint groups are registered through `&mut self`;
/// parsing only needs `&self` and hands back [`Matches`] that borrow the
/// command line, so the registry is frozen while parsed values are in use.
#[derive(Debug, Clone, Default)]
pub struct CmdLine {
    name: String,
    version: Option<String>,
    description: Option<String>,
    examples: Vec<String>,
    copyright: Option<String>,
    args: Vec<Arg>,
    /// Typed defaults, parallel to `args`.
    defaults: Vec<Vec<Value>>,
    /// Flag string (`-s`, `--long`) to argument.
    flags: HashMap<String, ArgId>,
    groups: Vec<Group>,
}

impl CmdLine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add an example usage, rendered verbatim in the help text.
    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    pub fn copyright(mut self, copyright: impl Into<String>) -> Self {
        self.copyright = Some(copyright.into());
        self
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn get_examples(&self) -> &[String] {
        &self.examples
    }

    pub fn get_copyright(&self) -> Option<&str> {
        self.copyright.as_deref()
    }

    /// Registered arguments in registration order.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn arg(&self, id: ArgId) -> Option<&Arg> {
        self.args.get(id.0)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Look an argument up by name.
    pub fn find(&self, name: &str) -> Option<ArgId> {
        self.args.iter().position(|a| a.name() == name).map(ArgId)
    }

    pub(crate) fn defaults(&self, id: ArgId) -> &[Value] {
        self.defaults.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `token` is a built-in or registered flag, including the
    /// `--long=value` form.
    pub fn is_flag(&self, token: &str) -> bool {
        match token {
            "--" | "-h" | "--help" | "--version" => true,
            _ if token.starts_with("--") => {
                let name = token.split_once('=').map_or(token, |(n, _)| n);
                self.flags.contains_key(name)
            }
            _ => self.flags.contains_key(token),
        }
    }

    /// Register an argument.
    ///
    /// Fails if the definition is invalid or clashes with an argument
    /// registered earlier.
    pub fn add(&mut self, arg: Arg) -> Result<ArgId, SpecError> {
        arg.validate()?;

        if self.find(arg.name()).is_some() {
            return Err(SpecError::DuplicateName(arg.name().to_string()));
        }

        let flags = arg.flag_strings();
        for flag in &flags {
            if self.flags.contains_key(flag) {
                return Err(SpecError::DuplicateFlag {
                    arg: arg.name().to_string(),
                    flag: flag.clone(),
                });
            }
        }

        if arg.is_positional() {
            self.validate_positional_order(&arg)?;
        }

        let defaults = arg.default_typed()?;
        let id = ArgId(self.args.len());
        for flag in flags {
            self.flags.insert(flag, id);
        }
        debug!(name = %arg.name(), kind = ?arg.kind(), "registered argument");
        self.args.push(arg);
        self.defaults.push(defaults);

        Ok(id)
    }

    /// Register two arguments of which exactly one must be given.
    ///
    /// On error nothing is registered.
    pub fn xor_add(&mut self, a: Arg, b: Arg) -> Result<(ArgId, ArgId), SpecError> {
        let ids = self.add_exclusive(vec![a, b])?;
        Ok((ids[0], ids[1]))
    }

    /// Register a set of arguments of which exactly one must be given.
    ///
    /// On error nothing is registered.
    pub fn xor_add_all<I>(&mut self, args: I) -> Result<Vec<ArgId>, SpecError>
    where
        I: IntoIterator<Item = Arg>,
    {
        self.add_exclusive(args.into_iter().collect())
    }

    /// Add `args` and an exactly-one-of group over them, rolling back the
    /// added arguments if any step fails.
    fn add_exclusive(&mut self, args: Vec<Arg>) -> Result<Vec<ArgId>, SpecError> {
        let mark = self.args.len();
        let result = self.try_add_exclusive(args);
        if result.is_err() {
            self.truncate_args(mark);
        }
        result
    }

    fn try_add_exclusive(&mut self, args: Vec<Arg>) -> Result<Vec<ArgId>, SpecError> {
        let mut ids = Vec::with_capacity(args.len());
        for arg in args {
            ids.push(self.add(arg)?);
        }
        self.add_group(GroupPolicy::ExactlyOne, &ids)?;
        Ok(ids)
    }

    /// Drop every argument registered at or after index `len`.
    fn truncate_args(&mut self, len: usize) {
        self.args.truncate(len);
        self.defaults.truncate(len);
        self.flags.retain(|_, id| id.0 < len);
    }

    /// Add a constraint group over already registered arguments.
    pub fn add_group(&mut self, policy: GroupPolicy, members: &[ArgId]) -> Result<(), SpecError> {
        if members.len() < 2 {
            return Err(SpecError::GroupTooSmall(members.len()));
        }

        let mut seen = HashSet::new();
        for &id in members {
            let arg = self
                .arg(id)
                .ok_or(SpecError::UnknownArgument(id.index()))?;
            if !seen.insert(id) {
                return Err(SpecError::DuplicateGroupMember(arg.name().to_string()));
            }
            if arg.is_required() {
                return Err(SpecError::RequiredGroupMember(arg.name().to_string()));
            }
            if policy == GroupPolicy::ExactlyOne
                && self
                    .groups
                    .iter()
                    .any(|g| g.policy() == GroupPolicy::ExactlyOne && g.contains(id))
            {
                return Err(SpecError::ConflictingGroups(arg.name().to_string()));
            }
        }

        debug!(%policy, members = members.len(), "registered constraint group");
        self.groups.push(Group {
            policy,
            members: members.to_vec(),
        });
        Ok(())
    }

    /// A required positional may not follow an optional one, and only the
    /// last positional may take more than one token.
    fn validate_positional_order(&self, arg: &Arg) -> Result<(), SpecError> {
        for earlier in self.args.iter().filter(|a| a.is_positional()) {
            if earlier.arity() > 1 {
                return Err(SpecError::PositionalOrder {
                    arg: arg.name().to_string(),
                    reason: format!("cannot follow multi-token positional '{}'", earlier.name()),
                });
            }
            if arg.is_required() && !earlier.is_required() {
                return Err(SpecError::PositionalOrder {
                    arg: arg.name().to_string(),
                    reason: format!("is required but follows optional positional '{}'", earlier.name()),
                });
            }
        }
        Ok(())
    }

    /// Parse `tokens` (without the program name).
    ///
    /// Help and version requests are returned as [`Outcome::Help`] and
    /// [`Outcome::Version`]; nothing is printed.
    pub fn try_parse<I, S>(&self, tokens: I) -> Result<Outcome<'_>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        parse_args(self, &tokens)
    }

    /// Parse `tokens` (without the program name), printing help or version
    /// text and exiting the process with status 0 when requested.
    pub fn parse<I, S>(&self, tokens: I) -> Result<Matches<'_>, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.try_parse(tokens)? {
            Outcome::Parsed(matches) => Ok(matches),
            Outcome::Help => {
                print!("{}", self.render_help());
                std::process::exit(0);
            }
            Outcome::Version => {
                print!("{}", self.render_version());
                std::process::exit(0);
            }
        }
    }

    /// [`parse`](Self::parse) the arguments of the current process.
    pub fn parse_env(&self) -> Result<Matches<'_>, ParseError> {
        self.parse(std::env::args().skip(1))
    }

    pub fn render_help(&self) -> String {
        generate_help(self)
    }

    pub fn render_usage(&self) -> String {
        generate_usage(self)
    }

    pub fn render_version(&self) -> String {
        generate_version(self)
    }
}
