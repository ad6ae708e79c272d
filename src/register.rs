use std::fmt;

use crate::memory::Word;

pub const REGISTER_COUNT: usize = 8;

/// Index of one of the eight general purpose registers.
///
/// Can only be built from a valid index, so reads and writes never go out
/// of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u8);

impl Register {
    pub fn new(index: usize) -> Option<Self> {
        if index < REGISTER_COUNT {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// The register bank, zeroed on start
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registers {
    contents: [Word; REGISTER_COUNT],
}

impl Registers {
    pub fn read(&self, register: Register) -> Word {
        self.contents[register.index()]
    }

    pub fn write(&mut self, register: Register, value: Word) {
        self.contents[register.index()] = value;
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.contents
    }
}
