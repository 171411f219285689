//! Interactive search loop.

use std::io::{BufRead, Write};

use anyhow::Result;
use crossterm::style::Stylize;
use meemo_core::config::display::{DEFAULT_MAX_ENTRIES, RESERVED_ROWS};
use meemo_core::{Session, StepOutcome, VectoredMemory};
use tracing::{debug, warn};

use super::{Command, HELP, parse_command};

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Number of candidates that fit the terminal below the prompt area.
pub fn terminal_entries() -> usize {
    match crossterm::terminal::size() {
        Ok((_, rows)) => (rows as usize).saturating_sub(RESERVED_ROWS).max(1),
        Err(e) => {
            debug!("Terminal size unavailable ({}), listing {} entries", e, DEFAULT_MAX_ENTRIES);
            DEFAULT_MAX_ENTRIES
        }
    }
}

/// Read commands from `input` until `q` or end of input.
pub fn run<M, R, W>(session: &mut Session<M>, input: R, out: &mut W, max_entries: usize) -> Result<()>
where
    M: VectoredMemory,
    R: BufRead,
    W: Write,
{
    writeln!(
        out,
        "{} PID {}, scanning {} ({} regions)",
        format!("meemo v{}", env!("CARGO_PKG_VERSION")).bold(),
        session.pid(),
        session.scalar_type(),
        session.candidate_count()
    )?;
    writeln!(out, "Type h for help.")?;

    let mut lines = input.lines();
    loop {
        write!(out, "{}", prompt(session))?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out)?;
            break;
        };
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line, session.scalar_type()) {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{}", message.yellow())?;
                continue;
            }
        };

        if execute(session, command, out, max_entries)? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

fn prompt<M: VectoredMemory>(session: &Session<M>) -> String {
    format!(
        "{} ",
        format!("[gen {} | {}]>", session.generation(), session.candidate_count()).cyan()
    )
}

fn execute<M, W>(
    session: &mut Session<M>,
    command: Command,
    out: &mut W,
    max_entries: usize,
) -> Result<Flow>
where
    M: VectoredMemory,
    W: Write,
{
    let outcome = match command {
        Command::Search(value) => session.step(value).map(|step| match step {
            StepOutcome::Advanced { found, .. } => {
                format!("Found {} candidates.\n{}", found, session.describe(max_entries))
            }
            StepOutcome::RolledBack { .. } => format!(
                "{}\n{}",
                "Not found. Search state has not advanced.".yellow(),
                session.describe(max_entries)
            ),
        }),
        Command::Print => Ok(session.describe(max_entries)),
        Command::Write { position, value } => session
            .write(position, value)
            .map(|()| format!("Wrote {} to [{}].", value, position)),
        Command::Info { position } => session.locate(position).map(|entry| match entry {
            Some(entry) => format!(
                "[{}] is in {:#x}-{:#x} {} {}",
                position,
                entry.start,
                entry.end,
                entry.permissions,
                entry.label()
            ),
            None => format!("[{}] is outside the cataloged regions", position),
        }),
        Command::Json => session.snapshot(max_entries).to_json(),
        Command::Reset => session
            .reset()
            .map(|count| format!("Reset to {} regions.\n{}", count, session.describe(max_entries))),
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => return Ok(Flow::Quit),
    };

    match outcome {
        Ok(text) => writeln!(out, "{}", text)?,
        Err(e) => {
            warn!("Command failed: {}", e);
            writeln!(out, "{} {}", "Error:".red().bold(), e)?;
            if !session.is_target_alive() {
                writeln!(out, "Target process {} has exited.", session.pid())?;
                return Ok(Flow::Quit);
            }
        }
    }
    Ok(Flow::Continue)
}
