//! Help, usage and version text generation using Clap.

use crate::arg::HelpDescriptor;
use crate::cmdline::CmdLine;
use clap::{Arg, ArgAction, Command};

/// Build a Clap Command from a CmdLine (for help/usage generation only).
fn build_command(cmdline: &CmdLine) -> Command {
    let mut cmd = Command::new(cmdline.get_name().to_string())
        .disable_help_subcommand(true)
        .disable_version_flag(true);

    if let Some(description) = cmdline.get_description() {
        cmd = cmd.about(description.to_string());
    }

    // Track positional index for ordering
    let mut positional_index = 1usize;

    for (index, arg) in cmdline.args().iter().enumerate() {
        let desc = arg.help_descriptor();
        cmd = cmd.arg(build_arg(index, &desc, &mut positional_index));
    }

    // Only `--version` is built in, there is no `-V`. Added after the
    // registered arguments so they keep their order at the top.
    if let Some(version) = cmdline.get_version() {
        cmd = cmd.version(version.to_string()).arg(
            Arg::new("version")
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        );
    }

    if let Some(after) = after_help(cmdline) {
        cmd = cmd.after_help(after);
    }

    cmd
}

/// Build a Clap Arg from a HelpDescriptor.
///
/// Ids are derived from the registry index, since a positional may share
/// its name with another argument's long flag.
fn build_arg(index: usize, desc: &HelpDescriptor, positional_index: &mut usize) -> Arg {
    let mut arg = Arg::new(format!("arg{}", index));
    let arity = desc.value_names.len();

    if desc.positional {
        arg = arg.index(*positional_index);
        *positional_index += 1;
        arg = arg.value_names(desc.value_names.clone());
        if arity > 1 {
            arg = arg.num_args(arity);
        }
    } else {
        if arity == 0 {
            // For switches, use Count if repeatable, SetTrue otherwise
            if desc.repeatable {
                arg = arg.action(ArgAction::Count);
            } else {
                arg = arg.action(ArgAction::SetTrue);
            }
        } else {
            if desc.repeatable {
                arg = arg.action(ArgAction::Append);
            } else {
                arg = arg.action(ArgAction::Set);
            }
            arg = arg.num_args(arity).value_names(desc.value_names.clone());
        }

        if let Some(short) = desc.short {
            arg = arg.short(short);
        }
        if let Some(ref long) = desc.long {
            arg = arg.long(long.clone());
        }
    }

    if desc.required {
        arg = arg.required(true);
    }

    if !desc.defaults.is_empty() {
        arg = arg.default_values(desc.defaults.clone());
    }

    if !desc.help.is_empty() {
        arg = arg.help(desc.help.clone());
    }

    arg
}

/// Examples (verbatim, separated by blank lines) followed by the copyright.
fn after_help(cmdline: &CmdLine) -> Option<String> {
    let mut sections = Vec::new();

    if !cmdline.get_examples().is_empty() {
        sections.push(format!("Examples:\n{}", cmdline.get_examples().join("\n\n")));
    }
    if let Some(copyright) = cmdline.get_copyright() {
        sections.push(copyright.to_string());
    }

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

/// Generate the full help text for a command line.
pub fn generate_help(cmdline: &CmdLine) -> String {
    let mut cmd = build_command(cmdline);
    cmd.render_help().to_string()
}

/// Generate the one-line usage string, e.g. `Usage: prog [OPTIONS] <image>`.
pub fn generate_usage(cmdline: &CmdLine) -> String {
    let mut cmd = build_command(cmdline);
    cmd.render_usage().to_string()
}

/// Generate version string.
pub fn generate_version(cmdline: &CmdLine) -> String {
    let mut version = cmdline.get_name().to_string();
    if let Some(v) = cmdline.get_version() {
        version.push(' ');
        version.push_str(v);
    }
    version.push('\n');
    if let Some(copyright) = cmdline.get_copyright() {
        version.push_str(copyright);
        version.push('\n');
    }
    version
}
