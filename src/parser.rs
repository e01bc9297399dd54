//! Tokenizing and validating command-line arguments against a [`CmdLine`].

use crate::arg::{Arg, ArgId, ArgKind};
use crate::cmdline::CmdLine;
use crate::group::GroupPolicy;
use crate::value::{FromValue, Value};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur during argument parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("missing value for option {arg}: expected {expected} value(s), found {found}")]
    MissingValue {
        arg: String,
        expected: usize,
        found: usize,
    },

    #[error("option {arg} does not take a value (got '{value}')")]
    UnexpectedValue { arg: String, value: String },

    #[error("invalid value '{value}' for {arg}: {reason}")]
    InvalidValue {
        arg: String,
        value: String,
        reason: String,
    },

    #[error("option {0} may only be given once")]
    Repeated(String),

    #[error("unexpected positional argument: {0}")]
    UnexpectedPositional(String),

    #[error("missing required argument: {0}")]
    MissingRequired(String),

    #[error("{} {} must be given (found {})", .policy, .members.join(", "), .present)]
    Group {
        policy: GroupPolicy,
        members: Vec<String>,
        present: usize,
    },
}

/// Outcome of parsing arguments.
#[derive(Debug)]
pub enum Outcome<'a> {
    /// Successfully parsed arguments.
    Parsed(Matches<'a>),
    /// User requested help (-h or --help).
    Help,
    /// User requested version (--version).
    Version,
}

/// Per-argument value store.
#[derive(Debug, Clone, Default, PartialEq)]
struct Store {
    occurrences: usize,
    values: Vec<Value>,
}

/// Parsed values of a command line, read-only.
///
/// Holds a shared borrow of the [`CmdLine`], so arguments cannot be
/// registered while the values are alive.
#[derive(Debug)]
pub struct Matches<'a> {
    cmd: &'a CmdLine,
    stores: Vec<Store>,
}

impl<'a> Matches<'a> {
    /// How often the argument was given on the command line.
    ///
    /// Default values never count as occurrences.
    pub fn occurrences(&self, id: ArgId) -> usize {
        self.stores.get(id.0).map_or(0, |s| s.occurrences)
    }

    pub fn is_present(&self, id: ArgId) -> bool {
        self.occurrences(id) > 0
    }

    /// State of a switch; `false` when absent.
    pub fn get_flag(&self, id: ArgId) -> bool {
        self.is_present(id)
    }

    /// All values of the argument: the given ones, else its defaults.
    pub fn values(&self, id: ArgId) -> &[Value] {
        self.stores
            .get(id.0)
            .map(|s| s.values.as_slice())
            .unwrap_or(&[])
    }

    /// The first value of the argument converted to `T`.
    pub fn get_one<T: FromValue>(&self, id: ArgId) -> Option<T> {
        self.values(id).first().and_then(T::from_value)
    }

    /// Every value of the argument converted to `T`, or `None` when there
    /// are none or any of them does not convert.
    pub fn get_many<T: FromValue>(&self, id: ArgId) -> Option<Vec<T>> {
        let values = self.values(id);
        if values.is_empty() {
            return None;
        }
        values.iter().map(T::from_value).collect()
    }

    pub fn id_of(&self, name: &str) -> Option<ArgId> {
        self.cmd.find(name)
    }

    /// [`get_one`](Self::get_one) by argument name.
    pub fn value_of<T: FromValue>(&self, name: &str) -> Option<T> {
        self.id_of(name).and_then(|id| self.get_one(id))
    }

    /// Snapshot of every argument keyed by name.
    ///
    /// Switches map to booleans, single-value arguments to scalars,
    /// multi-value arguments to arrays, and absent arguments without a
    /// default to `null`.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (index, arg) in self.cmd.args().iter().enumerate() {
            let id = ArgId(index);
            let values = self.values(id);
            let json = match arg.kind() {
                ArgKind::Switch => serde_json::Value::Bool(self.get_flag(id)),
                _ if values.is_empty() => serde_json::Value::Null,
                _ if arg.arity() == 1 => serde_json::to_value(&values[0])?,
                _ => serde_json::to_value(values)?,
            };
            map.insert(arg.name().to_string(), json);
        }
        Ok(serde_json::Value::Object(map))
    }
}

/// Parse `tokens` (without the program name) against `cmd`.
///
/// Returns `Outcome::Help` or `Outcome::Version` as soon as the built-in
/// flag is reached, without validating anything else.
pub fn parse_args<'a>(cmd: &'a CmdLine, tokens: &[String]) -> Result<Outcome<'a>, ParseError> {
    Parser::new(cmd).parse(tokens)
}

/// Internal parser state.
struct Parser<'a> {
    cmd: &'a CmdLine,
    stores: Vec<Store>,
    pending: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(cmd: &'a CmdLine) -> Self {
        Self {
            cmd,
            stores: vec![Store::default(); cmd.args().len()],
            pending: Vec::new(),
        }
    }

    fn parse(mut self, tokens: &[String]) -> Result<Outcome<'a>, ParseError> {
        let mut pos = 0;
        let mut parsing_options = true;

        while pos < tokens.len() {
            let token = tokens[pos].as_str();
            pos += 1;

            if !parsing_options {
                self.pending.push(token.to_string());
                continue;
            }

            match token {
                "--" => {
                    // Stop parsing options, everything after is positional
                    parsing_options = false;
                    continue;
                }
                "-h" | "--help" => return Ok(Outcome::Help),
                "--version" => return Ok(Outcome::Version),
                _ => {}
            }

            if token.starts_with("--") {
                pos += self.parse_long_option(token, &tokens[pos..])?;
            } else if token.starts_with('-') && token.len() > 1 {
                pos += self.parse_short_options(token, &tokens[pos..])?;
            } else {
                self.pending.push(token.to_string());
            }
        }

        self.assign_positionals()?;
        self.validate_groups()?;
        self.validate_required()?;
        self.apply_defaults();

        Ok(Outcome::Parsed(Matches {
            cmd: self.cmd,
            stores: self.stores,
        }))
    }

    /// Handle `--name` or `--name=value`; returns how many of `rest` were used.
    fn parse_long_option(&mut self, token: &str, rest: &[String]) -> Result<usize, ParseError> {
        let body = &token[2..];
        let (name, inline_value) = match body.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (body, None),
        };

        let id = self
            .find_matching(token)
            .ok_or_else(|| ParseError::UnknownOption(format!("--{}", name)))?;

        self.take_values(id, inline_value, rest)
    }

    /// Handle `-s`, `-s<value>` and clusters of switches like `-ga`.
    fn parse_short_options(&mut self, token: &str, rest: &[String]) -> Result<usize, ParseError> {
        let body = &token[1..];

        for (i, c) in body.char_indices() {
            let id = self
                .find_matching(&format!("-{}", c))
                .ok_or_else(|| ParseError::UnknownOption(format!("-{}", c)))?;

            if self.cmd.args()[id.0].arity() == 0 {
                self.take_values(id, None, rest)?;
                continue;
            }

            // The rest of this token, if any, is the first value
            let attached = &body[i + c.len_utf8()..];
            let inline_value = if attached.is_empty() {
                None
            } else {
                Some(attached)
            };
            return self.take_values(id, inline_value, rest);
        }

        Ok(0)
    }

    fn find_matching(&self, token: &str) -> Option<ArgId> {
        self.cmd
            .args()
            .iter()
            .position(|a| a.matches_token(token))
            .map(ArgId)
    }

    /// Let the argument consume its values and record the occurrence.
    fn take_values(
        &mut self,
        id: ArgId,
        inline_value: Option<&str>,
        rest: &[String],
    ) -> Result<usize, ParseError> {
        let cmd = self.cmd;
        let arg = &cmd.args()[id.0];

        if arg.arity() == 0 {
            if let Some(value) = inline_value {
                return Err(ParseError::UnexpectedValue {
                    arg: arg.display_name(),
                    value: value.to_string(),
                });
            }
        }

        let tokens = rest.iter().map(String::as_str);
        let (consumed, values) = arg.consume(inline_value, tokens, |t| cmd.is_flag(t))?;
        debug!(arg = %arg.display_name(), ?values, "matched option");
        self.record(id, values)?;

        Ok(consumed)
    }

    /// Store the values of one occurrence, enforcing the repeat policy.
    fn record(&mut self, id: ArgId, values: Vec<Value>) -> Result<(), ParseError> {
        let arg: &Arg = &self.cmd.args()[id.0];
        let store = &mut self.stores[id.0];

        if store.occurrences > 0 && !arg.allows_repeat() {
            return Err(ParseError::Repeated(arg.display_name()));
        }
        store.occurrences += 1;
        store.values = values;
        Ok(())
    }

    /// Hand the queued non-flag tokens to the positionals in registration order.
    fn assign_positionals(&mut self) -> Result<(), ParseError> {
        let cmd = self.cmd;
        let pending = std::mem::take(&mut self.pending);
        let mut rest: &[String] = &pending;

        for (index, arg) in cmd.args().iter().enumerate() {
            if !arg.is_positional() {
                continue;
            }
            if rest.is_empty() {
                break;
            }
            let (consumed, values) =
                arg.consume(None, rest.iter().map(String::as_str), |_| false)?;
            trace!(arg = %arg.name(), ?values, "assigned positional");
            self.record(ArgId(index), values)?;
            rest = &rest[consumed..];
        }

        if let Some(extra) = rest.first() {
            return Err(ParseError::UnexpectedPositional(extra.clone()));
        }
        Ok(())
    }

    fn validate_groups(&self) -> Result<(), ParseError> {
        let cmd = self.cmd;
        for group in cmd.groups() {
            group.check(
                |id| self.stores.get(id.0).map_or(0, |s| s.occurrences),
                |id| cmd.args().get(id.0).map(Arg::display_name).unwrap_or_default(),
            )?;
        }
        Ok(())
    }

    fn validate_required(&self) -> Result<(), ParseError> {
        for (arg, store) in self.cmd.args().iter().zip(&self.stores) {
            if arg.is_required() && store.occurrences == 0 {
                return Err(ParseError::MissingRequired(arg.display_name()));
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self) {
        for (index, store) in self.stores.iter_mut().enumerate() {
            if store.occurrences == 0 {
                store.values = self.cmd.defaults(ArgId(index)).to_vec();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arg::Arg;
    use crate::value::ValueType;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    fn unwrap_parsed(outcome: Outcome<'_>) -> Matches<'_> {
        match outcome {
            Outcome::Parsed(matches) => matches,
            other => panic!("Expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_switch_long() {
        let mut cmd = CmdLine::new("test");
        let verbose = cmd.add(Arg::switch("verbose")).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--verbose"])).unwrap());
        assert!(m.get_flag(verbose));
        assert_eq!(m.occurrences(verbose), 1);
    }

    #[test]
    fn test_parse_switch_short() {
        let mut cmd = CmdLine::new("test");
        let verbose = cmd.add(Arg::switch("verbose").short('v')).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["-v"])).unwrap());
        assert!(m.get_flag(verbose));
    }

    #[test]
    fn test_parse_switch_default_false() {
        let mut cmd = CmdLine::new("test");
        let verbose = cmd.add(Arg::switch("verbose")).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&[])).unwrap());
        assert!(!m.get_flag(verbose));
        assert_eq!(m.occurrences(verbose), 0);
    }

    #[test]
    fn test_parse_combined_short_switches() {
        let mut cmd = CmdLine::new("test");
        let a = cmd.add(Arg::switch("a").short('a')).unwrap();
        let b = cmd.add(Arg::switch("b").short('b')).unwrap();
        let c = cmd.add(Arg::switch("c").short('c')).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["-abc"])).unwrap());
        assert!(m.get_flag(a) && m.get_flag(b) && m.get_flag(c));
    }

    #[test]
    fn test_switch_repeated_is_error() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::switch("verbose").short('v').long("verbose"))
            .unwrap();
        let result = parse_args(&cmd, &args(&["-v", "--verbose"]));
        assert_eq!(result.unwrap_err(), ParseError::Repeated("--verbose".to_string()));
    }

    #[test]
    fn test_switch_repeatable_counts() {
        let mut cmd = CmdLine::new("test");
        let verbose = cmd.add(Arg::switch("verbose").short('v').repeatable()).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["-vv", "-v"])).unwrap());
        assert_eq!(m.occurrences(verbose), 3);
        assert!(m.get_flag(verbose));
    }

    #[test]
    fn test_switch_rejects_inline_value() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::switch("verbose")).unwrap();
        let result = parse_args(&cmd, &args(&["--verbose=yes"]));
        assert!(matches!(result, Err(ParseError::UnexpectedValue { .. })));
    }

    #[test]
    fn test_parse_float_long_space() {
        let mut cmd = CmdLine::new("test");
        let std = cmd.add(Arg::float("std")).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--std", "3.5"])).unwrap());
        assert_eq!(m.get_one::<f64>(std), Some(3.5));
    }

    #[test]
    fn test_parse_option_long_equals() {
        let mut cmd = CmdLine::new("test");
        let output = cmd.add(Arg::string("output")).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--output=file.txt"])).unwrap());
        assert_eq!(m.get_one::<String>(output), Some("file.txt".to_string()));
    }

    #[test]
    fn test_option_equals_empty() {
        let mut cmd = CmdLine::new("test");
        let value = cmd.add(Arg::string("value")).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--value="])).unwrap());
        assert_eq!(m.get_one::<String>(value), Some(String::new()));
    }

    #[test]
    fn test_parse_option_short_attached() {
        let mut cmd = CmdLine::new("test");
        let std = cmd.add(Arg::float("std").short('s')).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["-s3.5"])).unwrap());
        assert_eq!(m.get_one::<f64>(std), Some(3.5));
    }

    #[test]
    fn test_inline_value_may_look_like_flag() {
        let mut cmd = CmdLine::new("test");
        let name = cmd.add(Arg::string("name").short('n').long("name")).unwrap();
        let gaussian = cmd.add(Arg::switch("gaussian").short('g')).unwrap();

        let m = unwrap_parsed(parse_args(&cmd, &args(&["--name=--gaussian"])).unwrap());
        assert_eq!(m.get_one::<String>(name), Some("--gaussian".to_string()));
        assert!(!m.get_flag(gaussian));

        let m = unwrap_parsed(parse_args(&cmd, &args(&["-n-g"])).unwrap());
        assert_eq!(m.get_one::<String>(name), Some("-g".to_string()));
        assert!(!m.get_flag(gaussian));
    }

    #[test]
    fn test_inline_first_value_then_window() {
        let mut cmd = CmdLine::new("test");
        let radius = cmd.add(Arg::multi("radius", ValueType::UInt, 3)).unwrap();
        cmd.add(Arg::switch("gaussian")).unwrap();

        let m = unwrap_parsed(parse_args(&cmd, &args(&["--radius=5", "5", "3"])).unwrap());
        assert_eq!(m.get_many::<u32>(radius), Some(vec![5, 5, 3]));

        let result = parse_args(&cmd, &args(&["--radius=5", "5", "--gaussian"]));
        assert!(matches!(
            result,
            Err(ParseError::MissingValue { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_short_switch_then_option() {
        let mut cmd = CmdLine::new("test");
        let verbose = cmd.add(Arg::switch("verbose").short('v')).unwrap();
        let output = cmd.add(Arg::string("output").short('o')).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["-vo", "file.txt"])).unwrap());
        assert!(m.get_flag(verbose));
        assert_eq!(m.get_one::<String>(output), Some("file.txt".to_string()));
    }

    #[test]
    fn test_single_value_last_write_wins() {
        let mut cmd = CmdLine::new("test");
        let std = cmd.add(Arg::float("std")).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--std", "1", "--std", "2.5"])).unwrap());
        assert_eq!(m.get_one::<f64>(std), Some(2.5));
        assert_eq!(m.occurrences(std), 2);
        assert_eq!(m.values(std).len(), 1);
    }

    #[test]
    fn test_single_value_once_rejects_repeat() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::float("std").once()).unwrap();
        let result = parse_args(&cmd, &args(&["--std", "1", "--std", "2"]));
        assert!(matches!(result, Err(ParseError::Repeated(_))));
    }

    #[test]
    fn test_invalid_value_names_arg_and_literal() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::float("std")).unwrap();
        let err = parse_args(&cmd, &args(&["--std", "wide"])).unwrap_err();
        match &err {
            ParseError::InvalidValue { arg, value, .. } => {
                assert_eq!(arg, "--std");
                assert_eq!(value, "wide");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
        assert!(err.to_string().starts_with("invalid value 'wide' for --std"));
    }

    #[test]
    fn test_error_missing_value() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::string("output")).unwrap();
        let result = parse_args(&cmd, &args(&["--output"]));
        assert!(matches!(
            result,
            Err(ParseError::MissingValue {
                expected: 1,
                found: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_multi_value_parses_all() {
        let mut cmd = CmdLine::new("test");
        let radius = cmd.add(Arg::multi("radius", ValueType::UInt, 3)).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--radius", "5", "5", "3"])).unwrap());
        assert_eq!(m.get_many::<u32>(radius), Some(vec![5, 5, 3]));
    }

    #[test]
    fn test_multi_value_too_few_is_atomic() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::multi("radius", ValueType::UInt, 3)).unwrap();
        cmd.add(Arg::switch("gaussian")).unwrap();
        let result = parse_args(&cmd, &args(&["--radius", "5", "5", "--gaussian"]));
        assert_eq!(
            result.unwrap_err(),
            ParseError::MissingValue {
                arg: "--radius".to_string(),
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_multi_value_bad_literal_fails_whole_occurrence() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::multi("radius", ValueType::UInt, 3)).unwrap();
        let result = parse_args(&cmd, &args(&["--radius", "5", "-1", "3"]));
        assert!(matches!(result, Err(ParseError::InvalidValue { .. })));
    }

    #[test]
    fn test_multi_value_repeat_replaces_tuple() {
        let mut cmd = CmdLine::new("test");
        let radius = cmd.add(Arg::multi("radius", ValueType::UInt, 2)).unwrap();
        let m = unwrap_parsed(
            parse_args(&cmd, &args(&["--radius", "1", "2", "--radius", "3", "4"])).unwrap(),
        );
        assert_eq!(m.get_many::<u64>(radius), Some(vec![3, 4]));
    }

    #[test]
    fn test_multi_value_accepts_negative_numbers() {
        let mut cmd = CmdLine::new("test");
        let offset = cmd.add(Arg::multi("offset", ValueType::Int, 2)).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--offset", "-1", "-2"])).unwrap());
        assert_eq!(m.get_many::<i64>(offset), Some(vec![-1, -2]));
    }

    #[test]
    fn test_parse_positional() {
        let mut cmd = CmdLine::new("test");
        let input = cmd.add(Arg::positional("input", ValueType::String)).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["input.txt"])).unwrap());
        assert_eq!(m.get_one::<String>(input), Some("input.txt".to_string()));
    }

    #[test]
    fn test_parse_multiple_positionals_in_order() {
        let mut cmd = CmdLine::new("test");
        let input = cmd.add(Arg::positional("input", ValueType::String)).unwrap();
        let count = cmd.add(Arg::positional("count", ValueType::UInt)).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["in.txt", "4"])).unwrap());
        assert_eq!(m.get_one::<String>(input), Some("in.txt".to_string()));
        assert_eq!(m.get_one::<u64>(count), Some(4));
    }

    #[test]
    fn test_positional_before_options() {
        let mut cmd = CmdLine::new("test");
        let output = cmd.add(Arg::string("output").short('o')).unwrap();
        let input = cmd.add(Arg::positional("input", ValueType::String)).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["input.txt", "-o", "out.txt"])).unwrap());
        assert_eq!(m.get_one::<String>(input), Some("input.txt".to_string()));
        assert_eq!(m.get_one::<String>(output), Some("out.txt".to_string()));
    }

    #[test]
    fn test_multi_token_positional() {
        let mut cmd = CmdLine::new("test");
        let size = cmd
            .add(Arg::positional_multi("size", ValueType::UInt, 2))
            .unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["64", "32"])).unwrap());
        assert_eq!(m.get_many::<u64>(size), Some(vec![64, 32]));

        let result = parse_args(&cmd, &args(&["64"]));
        assert!(matches!(result, Err(ParseError::MissingValue { .. })));
    }

    #[test]
    fn test_parse_double_dash_separator() {
        let mut cmd = CmdLine::new("test");
        let verbose = cmd.add(Arg::switch("verbose").short('v')).unwrap();
        let input = cmd.add(Arg::positional("input", ValueType::String)).unwrap();
        // After --, -v should be treated as positional
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--", "-v"])).unwrap());
        assert!(!m.get_flag(verbose));
        assert_eq!(m.get_one::<String>(input), Some("-v".to_string()));
    }

    #[test]
    fn test_single_dash_is_positional() {
        let mut cmd = CmdLine::new("test");
        let input = cmd.add(Arg::positional("input", ValueType::String)).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["-"])).unwrap());
        assert_eq!(m.get_one::<String>(input), Some("-".to_string()));
    }

    #[test]
    fn test_error_unknown_option() {
        let cmd = CmdLine::new("test");
        let result = parse_args(&cmd, &args(&["--unknown"]));
        assert_eq!(
            result.unwrap_err(),
            ParseError::UnknownOption("--unknown".to_string())
        );
        let result = parse_args(&cmd, &args(&["-x"]));
        assert_eq!(result.unwrap_err(), ParseError::UnknownOption("-x".to_string()));
    }

    #[test]
    fn test_error_unexpected_positional() {
        let cmd = CmdLine::new("test");
        let result = parse_args(&cmd, &args(&["unexpected"]));
        assert!(matches!(result, Err(ParseError::UnexpectedPositional(_))));
    }

    #[test]
    fn test_error_missing_required_positional() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::switch("verbose")).unwrap();
        cmd.add(Arg::positional("image", ValueType::String).required(true))
            .unwrap();
        let result = parse_args(&cmd, &args(&["--verbose"]));
        assert_eq!(
            result.unwrap_err(),
            ParseError::MissingRequired("image".to_string())
        );
    }

    #[test]
    fn test_error_missing_required_option() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::string("output").required(true)).unwrap();
        let result = parse_args(&cmd, &args(&[]));
        assert_eq!(
            result.unwrap_err(),
            ParseError::MissingRequired("--output".to_string())
        );
    }

    #[test]
    fn test_group_checked_before_required() {
        let mut cmd = CmdLine::new("test");
        cmd.xor_add(Arg::switch("a"), Arg::switch("b")).unwrap();
        cmd.add(Arg::positional("image", ValueType::String).required(true))
            .unwrap();
        let result = parse_args(&cmd, &args(&[]));
        assert!(matches!(result, Err(ParseError::Group { .. })));
    }

    #[test]
    fn test_first_violated_group_is_reported() {
        let mut cmd = CmdLine::new("test");
        cmd.xor_add(Arg::switch("a"), Arg::switch("b")).unwrap();
        cmd.xor_add(Arg::switch("c"), Arg::switch("d")).unwrap();
        let err = parse_args(&cmd, &args(&[])).unwrap_err();
        match err {
            ParseError::Group { members, .. } => assert_eq!(members, vec!["--a", "--b"]),
            other => panic!("Expected Group, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_default_value() {
        let mut cmd = CmdLine::new("test");
        let std = cmd.add(Arg::float("std").default_value("2.0")).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&[])).unwrap());
        assert_eq!(m.get_one::<f64>(std), Some(2.0));
        assert_eq!(m.occurrences(std), 0);
    }

    #[test]
    fn test_parse_default_overridden() {
        let mut cmd = CmdLine::new("test");
        let std = cmd.add(Arg::float("std").default_value("2.0")).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--std", "0.5"])).unwrap());
        assert_eq!(m.get_one::<f64>(std), Some(0.5));
    }

    #[test]
    fn test_value_of_by_name() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::uint("level").short('l')).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["-l", "7"])).unwrap());
        assert_eq!(m.value_of::<u32>("level"), Some(7));
        assert_eq!(m.value_of::<u32>("missing"), None);
    }

    #[test]
    fn test_to_json_snapshot() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::switch("gaussian")).unwrap();
        cmd.add(Arg::float("std")).unwrap();
        cmd.add(Arg::multi("radius", ValueType::UInt, 3)).unwrap();
        cmd.add(Arg::positional("image", ValueType::String)).unwrap();
        let m = unwrap_parsed(
            parse_args(&cmd, &args(&["--gaussian", "--radius", "5", "5", "3", "a.nii"])).unwrap(),
        );
        let json = m.to_json().unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "gaussian": true,
                "std": null,
                "radius": [5, 5, 3],
                "image": "a.nii"
            })
        );
    }

    #[test]
    fn test_help_flag_short_circuits() {
        let mut cmd = CmdLine::new("test");
        cmd.add(Arg::positional("image", ValueType::String).required(true))
            .unwrap();
        let result = parse_args(&cmd, &args(&["--help"])).unwrap();
        assert!(matches!(result, Outcome::Help));
        let result = parse_args(&cmd, &args(&["-h"])).unwrap();
        assert!(matches!(result, Outcome::Help));
    }

    #[test]
    fn test_version_flag_short_circuits() {
        let cmd = CmdLine::new("test");
        let result = parse_args(&cmd, &args(&["--version", "stray"])).unwrap();
        assert!(matches!(result, Outcome::Version));
    }

    #[test]
    fn test_error_before_help_is_reported() {
        let cmd = CmdLine::new("test");
        let result = parse_args(&cmd, &args(&["--unknown", "--help"]));
        assert!(matches!(result, Err(ParseError::UnknownOption(_))));
    }

    #[test]
    fn test_help_after_double_dash_is_positional() {
        let mut cmd = CmdLine::new("test");
        let input = cmd.add(Arg::positional("input", ValueType::String)).unwrap();
        let m = unwrap_parsed(parse_args(&cmd, &args(&["--", "--help"])).unwrap());
        assert_eq!(m.get_one::<String>(input), Some("--help".to_string()));
    }
}
