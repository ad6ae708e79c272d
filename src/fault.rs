use std::error;
use std::fmt;

use crate::memory::Word;

/// Why an image could not be loaded into memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageDefect {
    /// Words are two bytes wide, so an image must have an even length
    OddLength { bytes: usize },
    /// The image holds more words than memory has cells
    TooLarge { words: usize, capacity: usize },
}

impl fmt::Display for ImageDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageDefect::OddLength { bytes } => {
                write!(f, "image has an odd length of {} bytes", bytes)
            }
            ImageDefect::TooLarge { words, capacity } => write!(
                f,
                "image has {} words but memory holds only {}",
                words, capacity
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    InvalidOperand(Word),
    MemoryOutOfBounds { address: usize },
    StackOverflow,
    StackUnderflow,
    UnknownOpcode(Word),
    DivisionByZero,
    ProgramCounterOutOfBounds(Word),
    MalformedImage(ImageDefect),
    InputExhausted,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::InvalidOperand(raw) => write!(f, "invalid operand `{}`", raw),
            FaultKind::MemoryOutOfBounds { address } => {
                write!(f, "memory has no address `0x{:04x}`", address)
            }
            FaultKind::StackOverflow => f.write_str("stack overflow"),
            FaultKind::StackUnderflow => f.write_str("pop from an empty stack"),
            FaultKind::UnknownOpcode(opcode) => write!(f, "unknown opcode `{}`", opcode),
            FaultKind::DivisionByZero => f.write_str("division by zero"),
            FaultKind::ProgramCounterOutOfBounds(pc) => {
                write!(f, "program counter `0x{:04x}` out of bounds", pc)
            }
            FaultKind::MalformedImage(defect) => write!(f, "malformed image: {}", defect),
            FaultKind::InputExhausted => f.write_str("input exhausted"),
        }
    }
}

impl error::Error for FaultKind {}

/// A fault together with where it happened.
///
/// `opcode` is `None` when the fault was raised before an opcode could be
/// fetched (e.g. the program counter left the program).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fault {
    pub kind: FaultKind,
    pub opcode: Option<Word>,
    pub pc: Word,
}

impl Fault {
    pub fn new<O>(kind: FaultKind, opcode: O, pc: Word) -> Self
    where
        O: Into<Option<Word>>,
    {
        Self {
            kind,
            opcode: opcode.into(),
            pc,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(opcode) = self.opcode {
            write!(f, "fault [pc: {}] [opcode: {}]: {}", self.pc, opcode, self.kind)
        } else {
            write!(f, "fault [pc: {}]: {}", self.pc, self.kind)
        }
    }
}

impl error::Error for Fault {}

pub type Result<T, E = FaultKind> = std::result::Result<T, E>;
