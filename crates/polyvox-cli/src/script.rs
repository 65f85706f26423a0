//! Replay script parser.
//!
//! One command per line. `#` starts a comment, blank lines are skipped.
//!
//! ```text
//! mode lowest-velocity
//! on 60 100      # note velocity
//! off 60
//! finished 0
//! status
//! ```

use clap::ValueEnum;
use std::str::{FromStr, SplitWhitespace};

use crate::commands::common::{CliAllocationMode, CliStealMode};
use crate::error::ScriptError;

const COMMANDS: [&str; 13] = [
    "on", "off", "finished", "mode", "steal", "voices", "unison", "detune", "bend", "tuning",
    "alloff", "reset", "status",
];

/// A single parsed script command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    Finished { voice: usize },
    Mode(CliAllocationMode),
    Steal(CliStealMode),
    Voices(usize),
    Unison(usize),
    Detune(f32),
    Bend(f32),
    Tuning(f32),
    AllOff,
    Reset,
    Status,
}

/// A command together with the line it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub command: Command,
}

/// Parse a whole script, stopping at the first bad line.
pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>, ScriptError> {
    let mut lines = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        if let Some(command) = parse_line(i + 1, raw)? {
            lines.push(ScriptLine {
                line: i + 1,
                command,
            });
        }
    }
    Ok(lines)
}

/// Parse one line; `Ok(None)` for blank and comment-only lines.
pub fn parse_line(line: usize, raw: &str) -> Result<Option<Command>, ScriptError> {
    let text = raw.split_once('#').map_or(raw, |(before, _)| before);
    let mut words = Args {
        line,
        command: "",
        words: text.split_whitespace(),
    };
    let Some(word) = words.words.next() else {
        return Ok(None);
    };

    let Some(&name) = COMMANDS.iter().find(|c| c.eq_ignore_ascii_case(word)) else {
        return Err(ScriptError::UnknownCommand {
            line,
            command: word.to_string(),
        });
    };
    words.command = name;

    let command = match name {
        "on" => Command::NoteOn {
            note: words.number("note")?,
            velocity: words.number("velocity")?,
        },
        "off" => Command::NoteOff {
            note: words.number("note")?,
        },
        "finished" => Command::Finished {
            voice: words.number("voice")?,
        },
        "mode" => Command::Mode(words.choice("mode")?),
        "steal" => Command::Steal(words.choice("steal mode")?),
        "voices" => Command::Voices(words.number("count")?),
        "unison" => Command::Unison(words.number("count")?),
        "detune" => Command::Detune(words.number("amount")?),
        "bend" => Command::Bend(words.number("semitones")?),
        "tuning" => Command::Tuning(words.number("reference")?),
        "alloff" => Command::AllOff,
        "reset" => Command::Reset,
        _ => Command::Status,
    };

    words.finish()?;
    Ok(Some(command))
}

/// Remaining words of a line, consumed argument by argument.
struct Args<'a> {
    line: usize,
    command: &'static str,
    words: SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn next(&mut self, argument: &'static str) -> Result<&'a str, ScriptError> {
        self.words.next().ok_or(ScriptError::MissingArgument {
            line: self.line,
            command: self.command,
            argument,
        })
    }

    fn number<T: FromStr>(&mut self, argument: &'static str) -> Result<T, ScriptError> {
        let line = self.line;
        let word = self.next(argument)?;
        word.parse().map_err(|_| ScriptError::InvalidArgument {
            line,
            argument,
            value: word.to_string(),
        })
    }

    fn choice<T: ValueEnum>(&mut self, argument: &'static str) -> Result<T, ScriptError> {
        let line = self.line;
        let word = self.next(argument)?;
        T::from_str(word, true).map_err(|_| ScriptError::InvalidArgument {
            line,
            argument,
            value: word.to_string(),
        })
    }

    fn finish(mut self) -> Result<(), ScriptError> {
        match self.words.next() {
            Some(extra) => Err(ScriptError::UnexpectedArgument {
                line: self.line,
                command: self.command,
                value: extra.to_string(),
            }),
            None => Ok(()),
        }
    }
}
