use std::str::FromStr;

use clap::ValueEnum;
use snafu::prelude::*;

use crate::preferences::Theme;

/// One line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    List,
    Enter(String),
    Up,
    Top,
    Pwd,
    New { name: String, text: String },
    Sub { name: String, child: String, text: String },
    Promote(String),
    Rename { old_name: String, new_name: String },
    Remove(String),
    Show(String),
    Set { name: String, text: String },
    Slot { name: String, text: String },
    Theme(Option<Theme>),
    ToggleTheme,
    Status,
    Save,
    Help,
    Quit,
}

pub const HELP: &[&str] = &[
    "ls                      list the current notebook",
    "cd NAME | cd .. | cd /  move between notebooks",
    "up                      go to the enclosing notebook",
    "pwd                     show where you are",
    "new NAME [TEXT]         create a note",
    "sub NAME CHILD [TEXT]   create a sub-note, turning NAME into a notebook",
    "promote NAME            turn a note into a notebook",
    "mv OLD NEW              rename",
    "rm NAME                 delete, after confirmation",
    "cat NAME                print a note's text",
    "set NAME TEXT           replace a note's text",
    "slot NAME TEXT          replace a notebook's own text",
    "theme [light|dark]      show or change the theme",
    "theme toggle            switch between light and dark",
    "status                  show autosave status",
    "save                    save now",
    "quit                    save and leave",
    "names containing spaces can be written in double quotes",
];

/// Splits off the first whitespace-delimited word.
fn split_word(input: &str) -> (&str, &str) {
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

/// Splits off a name that is followed by more arguments. Names with spaces are
/// written in double quotes.
fn next_name<'a>(
    input: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<(&'a str, &'a str), CommandParseError> {
    let (name, rest) = match input.strip_prefix('"') {
        Some(quoted) => {
            let (name, rest) = quoted
                .split_once('"')
                .context(UnterminatedQuoteSnafu { command })?;
            (name, rest.trim_start())
        }
        None => split_word(input),
    };
    Ok((required(name, command, argument)?, rest))
}

/// The final name of a command: a quoted name, or everything left on the line.
fn last_name<'a>(
    input: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandParseError> {
    if !input.starts_with('"') {
        return required(input, command, argument);
    }
    let (name, rest) = next_name(input, command, argument)?;
    ensure!(
        rest.is_empty(),
        InvalidArgumentSnafu {
            command,
            value: rest
        }
    );
    Ok(name)
}

fn required<'a>(
    value: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandParseError> {
    ensure!(!value.is_empty(), MissingArgumentSnafu { command, argument });
    Ok(value)
}

impl FromStr for SessionCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (verb, rest) = split_word(line.trim());
        ensure!(!verb.is_empty(), EmptySnafu);

        let command = match verb {
            "ls" | "list" => SessionCommand::List,
            "cd" => match last_name(rest, "cd", "NAME")? {
                ".." => SessionCommand::Up,
                "/" => SessionCommand::Top,
                name => SessionCommand::Enter(name.to_string()),
            },
            "up" => SessionCommand::Up,
            "pwd" => SessionCommand::Pwd,
            "new" => {
                let (name, text) = next_name(rest, "new", "NAME")?;
                SessionCommand::New {
                    name: name.to_string(),
                    text: text.to_string(),
                }
            }
            "sub" => {
                let (name, rest) = next_name(rest, "sub", "NAME")?;
                let (child, text) = next_name(rest, "sub", "CHILD")?;
                SessionCommand::Sub {
                    name: name.to_string(),
                    child: child.to_string(),
                    text: text.to_string(),
                }
            }
            "promote" => SessionCommand::Promote(last_name(rest, "promote", "NAME")?.to_string()),
            "mv" | "rename" => {
                let (old_name, rest) = next_name(rest, "mv", "OLD")?;
                SessionCommand::Rename {
                    old_name: old_name.to_string(),
                    new_name: last_name(rest, "mv", "NEW")?.to_string(),
                }
            }
            "rm" | "delete" => SessionCommand::Remove(last_name(rest, "rm", "NAME")?.to_string()),
            "cat" | "show" => SessionCommand::Show(last_name(rest, "cat", "NAME")?.to_string()),
            "set" | "slot" => {
                let command = if verb == "set" { "set" } else { "slot" };
                let (name, text) = next_name(rest, command, "NAME")?;
                let name = name.to_string();
                let text = text.to_string();
                if verb == "set" {
                    SessionCommand::Set { name, text }
                } else {
                    SessionCommand::Slot { name, text }
                }
            }
            "theme" => match rest {
                "" => SessionCommand::Theme(None),
                "toggle" => SessionCommand::ToggleTheme,
                value => SessionCommand::Theme(Some(Theme::from_str(value, true).map_err(
                    |_| CommandParseError::InvalidArgument {
                        command: "theme",
                        value: value.to_string(),
                    },
                )?)),
            },
            "status" => SessionCommand::Status,
            "save" => SessionCommand::Save,
            "help" | "?" => SessionCommand::Help,
            "quit" | "exit" | "q" => SessionCommand::Quit,
            other => {
                return UnknownCommandSnafu { verb: other }.fail();
            }
        };
        Ok(command)
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum CommandParseError {
    #[snafu(display("Nothing to do"))]
    Empty,
    #[snafu(display("Unknown command '{}', try 'help'", verb))]
    UnknownCommand { verb: String },
    #[snafu(display("'{}' needs {}", command, argument))]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[snafu(display("'{}' is not a valid value for '{}'", value, command))]
    InvalidArgument { command: &'static str, value: String },
    #[snafu(display("A quoted name in '{}' is missing its closing quote", command))]
    UnterminatedQuote { command: &'static str },
}
