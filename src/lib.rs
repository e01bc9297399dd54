//! cmdline - Typed, declarative command-line argument parsing.
//!
//! Applications register switches, typed single- and multi-value options,
//! and positional arguments with a [`CmdLine`], optionally tied together by
//! constraint groups such as "exactly one of". Parsing validates the tokens
//! against the registry and hands back typed values or a structured
//! [`ParseError`]; mistakes in the definition itself surface as
//! [`SpecError`] at registration time.

pub mod arg;
pub mod cmdline;
pub mod group;
pub mod help;
pub mod parser;
pub mod value;

pub use arg::{Arg, ArgId, ArgKind, HelpDescriptor, SpecError};
pub use cmdline::CmdLine;
pub use group::{Group, GroupPolicy};
pub use help::{generate_help, generate_usage, generate_version};
pub use parser::{parse_args, Matches, Outcome, ParseError};
pub use value::{FromValue, Value, ValueType};
