//! Interactive commands.
//!
//! Each input line is one command. Values are parsed with the session's
//! scalar type, so a malformed value is rejected before anything touches the
//! target.

pub mod repl;

use meemo_core::{ScalarType, ScalarValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Narrow the candidates to those holding the value
    Search(ScalarValue),
    /// List the current candidates
    Print,
    /// Store a value at one candidate
    Write { position: usize, value: ScalarValue },
    /// Show the memory mapping that contains one candidate
    Info { position: usize },
    /// Dump the session as JSON
    Json,
    /// Start over from the target's current memory map
    Reset,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  s, search <value>       narrow candidates to those holding <value>
  p, print                list current candidates
  w, write <pos> <value>  store <value> at candidate <pos>
  i, info <pos>           show the mapping containing candidate <pos>
  j, json                 dump the session as JSON
  r, reset                start over from the current memory map
  h, help                 show this help
  q, quit                 end the session";

/// Parse one input line into a command.
pub fn parse_command(line: &str, scalar_type: ScalarType) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Err("Empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let command = match name.to_ascii_lowercase().as_str() {
        "s" | "search" => {
            let [value] = expect_args::<1>(name, &args, "<value>")?;
            Command::Search(parse_value(value, scalar_type)?)
        }
        "p" | "print" => {
            expect_args::<0>(name, &args, "")?;
            Command::Print
        }
        "w" | "write" => {
            let [position, value] = expect_args::<2>(name, &args, "<pos> <value>")?;
            Command::Write {
                position: parse_position(position)?,
                value: parse_value(value, scalar_type)?,
            }
        }
        "i" | "info" => {
            let [position] = expect_args::<1>(name, &args, "<pos>")?;
            Command::Info {
                position: parse_position(position)?,
            }
        }
        "j" | "json" => {
            expect_args::<0>(name, &args, "")?;
            Command::Json
        }
        "r" | "reset" => {
            expect_args::<0>(name, &args, "")?;
            Command::Reset
        }
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command '{}', type h for help", other)),
    };
    Ok(command)
}

fn expect_args<'a, const N: usize>(
    name: &str,
    args: &[&'a str],
    usage: &str,
) -> Result<[&'a str; N], String> {
    <[&str; N]>::try_from(args).map_err(|_| {
        if usage.is_empty() {
            format!("'{}' takes no arguments", name)
        } else {
            format!("Usage: {} {}", name, usage)
        }
    })
}

fn parse_value(text: &str, scalar_type: ScalarType) -> Result<ScalarValue, String> {
    scalar_type.parse_value(text).map_err(|e| e.to_string())
}

fn parse_position(text: &str) -> Result<usize, String> {
    text.parse()
        .map_err(|_| format!("'{}' is not a valid position", text))
}
