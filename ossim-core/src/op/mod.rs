//! Scripted operations.
//!
//! A program is a flat list of op commands such as `P(run)11;` or
//! `I(hard drive)18;`. Each command carries a letter, a resource name and a
//! decimal value.

pub mod segment;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use segment::SegmentAddress;

/// Op command letters as they appear in a metadata file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpLetter {
    /// S: simulator start/end marker
    System,
    /// A: application (process) start/end marker
    Application,
    /// P: processor run
    Process,
    /// M: memory allocate/access
    Memory,
    /// I: input device
    Input,
    /// O: output device
    Output,
}

impl TryFrom<char> for OpLetter {
    type Error = char;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            'S' => Ok(Self::System),
            'A' => Ok(Self::Application),
            'P' => Ok(Self::Process),
            'M' => Ok(Self::Memory),
            'I' => Ok(Self::Input),
            'O' => Ok(Self::Output),
            _ => Err(value),
        }
    }
}

impl From<OpLetter> for char {
    fn from(letter: OpLetter) -> char {
        match letter {
            OpLetter::System => 'S',
            OpLetter::Application => 'A',
            OpLetter::Process => 'P',
            OpLetter::Memory => 'M',
            OpLetter::Input => 'I',
            OpLetter::Output => 'O',
        }
    }
}

/// Resource names accepted inside the parentheses of an op command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpName {
    Start,
    End,
    Run,
    Allocate,
    Access,
    HardDrive,
    Keyboard,
    Printer,
    Monitor,
}

impl OpName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Run => "run",
            Self::Allocate => "allocate",
            Self::Access => "access",
            Self::HardDrive => "hard drive",
            Self::Keyboard => "keyboard",
            Self::Printer => "printer",
            Self::Monitor => "monitor",
        }
    }
}

impl FromStr for OpName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            "run" => Ok(Self::Run),
            "allocate" => Ok(Self::Allocate),
            "access" => Ok(Self::Access),
            "hard drive" => Ok(Self::HardDrive),
            "keyboard" => Ok(Self::Keyboard),
            "printer" => Ok(Self::Printer),
            "monitor" => Ok(Self::Monitor),
            _ => Err(()),
        }
    }
}

impl fmt::Display for OpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the engine does with an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    SystemStart,
    SystemEnd,
    Begin,
    End,
    CpuRun,
    MemAllocate,
    MemAccess,
    Input,
    Output,
}

impl OpKind {
    /// Resolve a letter/name pair. Returns `None` for combinations that make
    /// no sense, e.g. `P(printer)` or `I(monitor)`.
    pub fn classify(letter: OpLetter, name: OpName) -> Option<Self> {
        use OpName::*;
        match (letter, name) {
            (OpLetter::System, Start) => Some(Self::SystemStart),
            (OpLetter::System, End) => Some(Self::SystemEnd),
            (OpLetter::Application, Start) => Some(Self::Begin),
            (OpLetter::Application, End) => Some(Self::End),
            (OpLetter::Process, Run) => Some(Self::CpuRun),
            (OpLetter::Memory, Allocate) => Some(Self::MemAllocate),
            (OpLetter::Memory, Access) => Some(Self::MemAccess),
            (OpLetter::Input, HardDrive | Keyboard) => Some(Self::Input),
            (OpLetter::Output, HardDrive | Printer | Monitor) => Some(Self::Output),
            _ => None,
        }
    }

    /// I/O operations complete asynchronously and block the issuing process.
    pub fn is_io(self) -> bool {
        matches!(self, Self::Input | Self::Output)
    }
}

/// One scripted instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    pub name: OpName,
    /// Cycle count for CPU/I/O, `SSBBBAAA` for memory.
    pub value: u32,
}

impl Operation {
    pub fn new(kind: OpKind, name: OpName, value: u32) -> Self {
        Self { kind, name, value }
    }

    pub fn letter(&self) -> OpLetter {
        match self.kind {
            OpKind::SystemStart | OpKind::SystemEnd => OpLetter::System,
            OpKind::Begin | OpKind::End => OpLetter::Application,
            OpKind::CpuRun => OpLetter::Process,
            OpKind::MemAllocate | OpKind::MemAccess => OpLetter::Memory,
            OpKind::Input => OpLetter::Input,
            OpKind::Output => OpLetter::Output,
        }
    }

    /// Human-readable label used in start/end log lines.
    pub fn describe(&self) -> String {
        match self.kind {
            OpKind::CpuRun => "run operation".to_string(),
            OpKind::Input => format!("{} input", self.name),
            OpKind::Output => format!("{} output", self.name),
            _ => format!("{}({})", char::from(self.letter()), self.name),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}){}", char::from(self.letter()), self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_round_trip() {
        for c in ['S', 'A', 'P', 'M', 'I', 'O'] {
            let letter = OpLetter::try_from(c).unwrap();
            assert_eq!(char::from(letter), c);
        }
        assert_eq!(OpLetter::try_from('X'), Err('X'));
    }

    #[test]
    fn test_classify_rejects_mismatched_names() {
        assert_eq!(
            OpKind::classify(OpLetter::Input, OpName::Keyboard),
            Some(OpKind::Input)
        );
        assert_eq!(OpKind::classify(OpLetter::Input, OpName::Monitor), None);
        assert_eq!(OpKind::classify(OpLetter::Process, OpName::Printer), None);
        assert_eq!(OpKind::classify(OpLetter::Application, OpName::Run), None);
    }

    #[test]
    fn test_describe() {
        let op = Operation::new(OpKind::Input, OpName::HardDrive, 18);
        assert_eq!(op.describe(), "hard drive input");
        let op = Operation::new(OpKind::CpuRun, OpName::Run, 5);
        assert_eq!(op.describe(), "run operation");
        assert_eq!(op.to_string(), "P(run)5");
    }
}
