//! # Command Script Parser
//!
//! Provides a line-based command format for deterministic runs and demos.
//!
//! ## Format
//!
//! - `open` / `close`: open or close the device file
//! - `write "text"`: write the quoted text
//! - `write-hex 0a0b0c`: write raw bytes
//! - `read N`: read up to N bytes
//! - `seek OFFSET start|current|end`: move the cursor
//! - Comments: `# This is a comment`
//!
//! ## Example
//!
//! ```text
//! open
//! write "0123456789"   # 10 bytes at offset 0
//! seek 0 start
//! read 20              # the 10 bytes, then 10 zeros
//! close
//! ```

use services_scull::Whence;
use std::collections::VecDeque;
use thiserror::Error;

/// Script error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Empty script")]
    EmptyScript,
}

/// A single scripted command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Open,
    Close,
    Write(Vec<u8>),
    Read(usize),
    Seek { offset: i64, whence: Whence },
}

impl std::fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::Write(bytes) => write!(f, "write {} bytes", bytes.len()),
            Self::Read(count) => write!(f, "read {}", count),
            Self::Seek { offset, whence } => write!(f, "seek {} {}", offset, whence),
        }
    }
}

/// Parsed command script
#[derive(Debug, Clone)]
pub struct Script {
    commands: VecDeque<ScriptCommand>,
}

impl Script {
    /// Parses a script from text
    pub fn from_text(text: &str) -> Result<Self, ScriptError> {
        let mut commands = VecDeque::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = strip_comment(line).trim();
            if line.is_empty() {
                continue;
            }

            let command = parse_line(line).map_err(|message| ScriptError::ParseError {
                line: line_num + 1,
                message,
            })?;
            commands.push_back(command);
        }

        if commands.is_empty() {
            return Err(ScriptError::EmptyScript);
        }

        Ok(Self { commands })
    }

    pub fn next_command(&mut self) -> Option<ScriptCommand> {
        self.commands.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.commands.len()
    }
}

/// Drops a trailing `# comment`, leaving `#` inside quotes alone
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..idx],
            _ => {}
        }
    }
    line
}

fn parse_line(line: &str) -> Result<ScriptCommand, String> {
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb {
        "open" => no_args(verb, rest).map(|_| ScriptCommand::Open),
        "close" => no_args(verb, rest).map(|_| ScriptCommand::Close),
        "write" => {
            let text = rest
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .ok_or_else(|| format!("write expects a quoted string, got: {}", rest))?;
            Ok(ScriptCommand::Write(text.as_bytes().to_vec()))
        }
        "write-hex" => parse_hex(rest).map(ScriptCommand::Write),
        "read" => rest
            .parse()
            .map(ScriptCommand::Read)
            .map_err(|_| format!("invalid read count: {}", rest)),
        "seek" => {
            let mut parts = rest.split_whitespace();
            let offset = parts
                .next()
                .ok_or_else(|| "seek expects an offset".to_string())?;
            let offset = offset
                .parse()
                .map_err(|_| format!("invalid seek offset: {}", offset))?;
            let whence = match parts.next() {
                Some(whence) => whence.parse()?,
                None => Whence::Start,
            };
            if let Some(extra) = parts.next() {
                return Err(format!("unexpected argument: {}", extra));
            }
            Ok(ScriptCommand::Seek { offset, whence })
        }
        other => Err(format!("unknown command: {}", other)),
    }
}

fn no_args(verb: &str, rest: &str) -> Result<(), String> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(format!("{} takes no arguments", verb))
    }
}

fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(format!("hex needs an even number of digits: {}", text));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).map_err(|_| format!("invalid hex byte: {}", byte))
        })
        .collect()
}
