use std::fs;
use std::path::Path;

use log::{debug, warn};
use memsim::Instruction;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("no instructions: the program needs a mode line, mi, mf and at least one instruction")]
    NoInstructions,

    #[error("line {line}: unexpected `{text}`")]
    InvalidLine { line: usize, text: String },

    #[error("unknown mode {0}, expected 1 (listed instructions) or 2 (random instructions)")]
    InvalidMode(usize),

    #[error("cannot read instruction file: {0}")]
    Io(#[from] std::io::Error),
}

/// How the instructions of a run are obtained.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Run the instructions listed in the file.
    Listed,
    /// Generate random instructions within the file's bounds.
    Random,
}

impl TryFrom<usize> for Mode {
    type Error = ProgramError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Mode::Listed),
            2 => Ok(Mode::Random),
            other => Err(ProgramError::InvalidMode(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub mode: Mode,
    pub mi: usize,
    pub mf: usize,
    pub instructions: Vec<Instruction>,
}

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Number(usize),
    Instruction(Instruction),
}

impl Program {
    pub fn load(path: &Path) -> Result<Program, ProgramError> {
        let text = fs::read_to_string(path)?;
        debug!("loaded {} ({} bytes)", path.display(), text.len());
        Program::parse(&text)
    }

    /// Reads the mode, `mi` and `mf` lines, then one instruction per line.
    /// Text after `//` is a comment; lines that match nothing are skipped.
    pub fn parse(text: &str) -> Result<Program, ProgramError> {
        let mut mode = None;
        let mut mi = None;
        let mut mf = None;
        let mut instructions = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let number = index + 1;
            let Some(line) = parse_line(raw, number)? else {
                continue;
            };

            match (mode, mi, mf, line) {
                (None, _, _, Line::Number(value)) => mode = Some(Mode::try_from(value)?),
                (Some(_), None, _, Line::Number(value)) => mi = Some(value),
                (Some(_), Some(_), None, Line::Number(value)) => mf = Some(value),
                (Some(_), Some(_), Some(_), Line::Instruction(instruction)) => {
                    instructions.push(instruction)
                }
                _ => {
                    return Err(ProgramError::InvalidLine {
                        line: number,
                        text: raw.trim().to_string(),
                    });
                }
            }
        }

        let (Some(mode), Some(mi), Some(mf)) = (mode, mi, mf) else {
            return Err(ProgramError::NoInstructions);
        };
        if mode == Mode::Listed && instructions.is_empty() {
            return Err(ProgramError::NoInstructions);
        }

        Ok(Program {
            mode,
            mi,
            mf,
            instructions,
        })
    }
}

fn parse_line(raw: &str, number: usize) -> Result<Option<Line>, ProgramError> {
    let content = match raw.find("//") {
        Some(comment) => &raw[..comment],
        None => raw,
    };
    let mut words = content.split_whitespace();

    let parsed = match (words.next(), words.next(), words.next()) {
        (None, _, _) => return Ok(None),
        (Some(value), None, _) if is_digits(value) => Line::Number(to_number(value, raw, number)?),
        (Some(op), Some(value), None) if is_digits(value) => {
            let value = to_number(value, raw, number)?;
            match op.to_ascii_uppercase().as_str() {
                "S" => Line::Instruction(Instruction::Allocate(value)),
                "L" => Line::Instruction(Instruction::Release(value)),
                _ => {
                    warn!("line {number}: skipping `{}`", raw.trim());
                    return Ok(None);
                }
            }
        }
        _ => {
            warn!("line {number}: skipping `{}`", raw.trim());
            return Ok(None);
        }
    };

    Ok(Some(parsed))
}

fn is_digits(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit())
}

fn to_number(word: &str, raw: &str, number: usize) -> Result<usize, ProgramError> {
    word.parse().map_err(|_| ProgramError::InvalidLine {
        line: number,
        text: raw.trim().to_string(),
    })
}
