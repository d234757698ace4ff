//! Program metadata loading.
//!
//! A metadata file lists op commands between fixed descriptor lines:
//!
//! ```text
//! Start Program Meta-Data Code:
//! S(start)0; A(start)0; P(run)11; M(allocate)2048;
//! I(hard drive)18; A(end)0;
//! S(end)0.
//! End Program Meta-Data Code.
//! ```
//!
//! Commands end in `;`, except the final `S(end)` which ends in `.`.

use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use crate::error::{SimError, SimResult};
use crate::op::{OpKind, OpLetter, OpName, Operation};

const HEADER: &str = "Start Program Meta-Data Code:";
const FOOTER: &str = "End Program Meta-Data Code.";

/// Longest accepted op value, in digits.
const MAX_VALUE_DIGITS: usize = 8;

/// Parsed, immutable program: every op command in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    operations: Vec<Operation>,
}

impl Program {
    /// Build a program from an already-parsed operation list.
    pub fn new(operations: Vec<Operation>) -> SimResult<Self> {
        check_balanced(&operations)?;
        Ok(Self { operations })
    }

    /// Load a metadata file.
    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SimError::MetaDataAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse metadata text.
    pub fn parse(text: &str) -> SimResult<Self> {
        let text = text.trim_start();
        let body = text
            .strip_prefix(HEADER)
            .ok_or(SimError::CorruptMetaDataDescriptor)?;

        let mut cursor = Cursor::new(body);
        let mut operations = Vec::new();
        loop {
            let (op, last) = cursor.next_command()?;
            operations.push(op);
            if last {
                break;
            }
        }

        if cursor.rest().trim() != FOOTER {
            return Err(SimError::CorruptMetaDataDescriptor);
        }

        Self::new(operations)
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Index ranges of each `A(start)..=A(end)` block, in file order.
    pub fn process_spans(&self) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut open = None;
        for (index, op) in self.operations.iter().enumerate() {
            match op.kind {
                OpKind::Begin => open = Some(index),
                OpKind::End => {
                    if let Some(start) = open.take() {
                        spans.push(start..index + 1);
                    }
                }
                _ => {}
            }
        }
        spans
    }
}

impl FromStr for Program {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The program is bracketed by `S(start)` and `S(end)`, and every other op
/// sits inside a process block. Process blocks open and close in strict
/// alternation.
fn check_balanced(operations: &[Operation]) -> SimResult<()> {
    let (Some(first), Some(last)) = (operations.first(), operations.last()) else {
        return Err(SimError::CorruptMetaDataDescriptor);
    };
    if first.kind != OpKind::SystemStart || last.kind != OpKind::SystemEnd {
        return Err(SimError::CorruptMetaDataDescriptor);
    }

    let inner = &operations[1..operations.len() - 1];
    let mut open = false;
    for op in inner {
        match op.kind {
            OpKind::SystemStart | OpKind::SystemEnd => {
                return Err(SimError::CorruptMetaDataDescriptor)
            }
            OpKind::Begin if open => return Err(SimError::UnbalancedStartEnd),
            OpKind::Begin => open = true,
            OpKind::End if !open => return Err(SimError::UnbalancedStartEnd),
            OpKind::End => open = false,
            _ if !open => return Err(SimError::UnbalancedStartEnd),
            _ => {}
        }
    }
    if open {
        return Err(SimError::UnbalancedStartEnd);
    }
    Ok(())
}

/// Character cursor over the command section of a metadata file.
struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Read one command. The flag is set when the command was terminated by
    /// a period, i.e. it is the last one.
    fn next_command(&mut self) -> SimResult<(Operation, bool)> {
        self.skip_whitespace();

        let letter_char = self.bump().ok_or(SimError::OpCommandAccess)?;
        let letter = OpLetter::try_from(letter_char).map_err(SimError::CorruptOpLetter)?;

        if self.bump() != Some('(') {
            return Err(SimError::CorruptOpName(String::new()));
        }
        let close = self
            .rest()
            .find(')')
            .ok_or_else(|| SimError::CorruptOpName(self.rest().to_string()))?;
        let raw_name = &self.rest()[..close];
        self.pos += close + 1;

        let name = raw_name
            .parse::<OpName>()
            .map_err(|_| SimError::CorruptOpName(raw_name.to_string()))?;
        let kind = OpKind::classify(letter, name)
            .ok_or_else(|| SimError::CorruptOpName(format!("{}({})", letter_char, raw_name)))?;

        let digits: &str = {
            let rest = self.rest();
            let end = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            &rest[..end]
        };
        if digits.is_empty() || digits.len() > MAX_VALUE_DIGITS {
            return Err(SimError::CorruptOpValue(digits.to_string()));
        }
        self.pos += digits.len();
        let value = digits
            .parse::<u32>()
            .map_err(|_| SimError::CorruptOpValue(digits.to_string()))?;

        self.skip_whitespace();
        let last = match self.bump() {
            Some(';') => false,
            Some('.') => true,
            Some(other) => return Err(SimError::CorruptOpValue(format!("{}{}", digits, other))),
            None => return Err(SimError::IncompleteFile),
        };

        if last && kind != OpKind::SystemEnd {
            return Err(SimError::CorruptMetaDataDescriptor);
        }

        Ok((Operation::new(kind, name, value), last))
    }
}
