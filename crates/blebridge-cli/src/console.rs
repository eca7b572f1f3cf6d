//! Console input parsing and snapshot rendering
//!
//! Everything here is pure so it can be tested without a radio.

use blebridge_core::{ConnectionState, Severity, StatusSnapshot};
use crossterm::style::{Color, Stylize};

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Console Commands
// ----------------------------------------------------------------------------

/// One line of console input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Scan,
    Read,
    /// Write the given text
    Write(String),
    /// Replace the pending input text
    Input(String),
    /// Write the pending input text
    Send,
    Disconnect,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  scan              scan for the ESP32 and connect
  read              read the value
  write <value>     write a decimal or 0x-prefixed hex value
  input <text>      set the pending input text
  send              write the pending input text
  disconnect        stop scanning and drop the connection
  status            show the current status
  help              show this help
  quit              disconnect and exit";

/// Parse a console line; blank lines yield `None`
///
/// The argument of `write` and `input` is passed through untouched so the
/// bridge applies its own input grammar.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "scan" | "s" => ConsoleCommand::Scan,
        "read" | "r" => ConsoleCommand::Read,
        "write" | "w" => {
            if rest.is_empty() {
                return Err(CliError::MissingArgument("write"));
            }
            ConsoleCommand::Write(rest.to_string())
        }
        "input" | "i" => ConsoleCommand::Input(rest.to_string()),
        "send" => ConsoleCommand::Send,
        "disconnect" | "d" => ConsoleCommand::Disconnect,
        "status" => ConsoleCommand::Status,
        "help" | "h" | "?" => ConsoleCommand::Help,
        "quit" | "q" | "exit" => ConsoleCommand::Quit,
        _ => return Err(CliError::UnknownCommand(word.to_string())),
    };
    Ok(Some(command))
}

// ----------------------------------------------------------------------------
// Rendering
// ----------------------------------------------------------------------------

/// Plain one-line rendering of a snapshot
pub fn render(snapshot: &StatusSnapshot) -> String {
    let mut line = format!(
        "[{}] {} | {}",
        snapshot.state,
        snapshot.status,
        snapshot.value_label()
    );
    if !snapshot.input.is_empty() {
        line.push_str(&format!(" | input: {}", snapshot.input));
    }
    line
}

/// [`render`] colored by severity
pub fn paint(snapshot: &StatusSnapshot) -> String {
    let color = match snapshot.severity {
        Severity::Neutral => Color::Grey,
        Severity::Ok => Color::Green,
        Severity::Warn => Color::Yellow,
        Severity::Error => Color::Red,
    };
    render(snapshot).with(color).to_string()
}

// ----------------------------------------------------------------------------
// One-shot Progress
// ----------------------------------------------------------------------------

/// Where a one-shot command stands while waiting for the characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

/// Classify a snapshot observed after `scan` was requested
///
/// `scanned` is whether the scan has been seen running, since Idle before and
/// after a scan look the same otherwise.
pub fn readiness(snapshot: &StatusSnapshot, scanned: bool) -> Readiness {
    match snapshot.state {
        ConnectionState::Connected if snapshot.ready => Readiness::Ready,
        // Resolution finished without the characteristic
        ConnectionState::Connected => Readiness::Failed(snapshot.status.clone()),
        ConnectionState::Failed | ConnectionState::Disconnected => {
            Readiness::Failed(snapshot.status.clone())
        }
        ConnectionState::Idle if scanned || snapshot.severity == Severity::Error => {
            Readiness::Failed(snapshot.status.clone())
        }
        _ => Readiness::Pending,
    }
}

/// Result of a one-shot read, once the status line settles
pub fn read_outcome(snapshot: &StatusSnapshot) -> Option<std::result::Result<String, String>> {
    let status = &snapshot.status;
    if status.starts_with("Value: ") {
        Some(Ok(status.clone()))
    } else if status.starts_with("Read failed")
        || status.starts_with("Received ")
        || status == "Not connected"
        || !snapshot.state.is_active()
    {
        Some(Err(status.clone()))
    } else {
        None
    }
}

/// Result of a one-shot write, once the status line settles
pub fn write_outcome(snapshot: &StatusSnapshot) -> Option<std::result::Result<String, String>> {
    let status = &snapshot.status;
    if status.starts_with("Write succeeded") {
        Some(Ok(status.clone()))
    } else if status.starts_with("Write failed")
        || status == "Invalid number"
        || status == "Not connected"
        || !snapshot.state.is_active()
    {
        Some(Err(status.clone()))
    } else {
        None
    }
}
