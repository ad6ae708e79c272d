//! Storage operands as they appear in the instruction stream:
//!
//! - `0..=32767` is a literal value
//! - `32768..=32775` names registers 0 to 7
//! - `32776..=65535` is invalid

use crate::fault::{FaultKind, Result};
use crate::memory::{Word, MAX_VALUE};
use crate::register::{Register, Registers};

/// First raw value that refers to a register
pub const REGISTER_BASE: Word = 0x8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Literal(Word),
    Register(Register),
}

impl Operand {
    pub fn decode(raw: Word) -> Result<Self> {
        if raw <= MAX_VALUE {
            return Ok(Operand::Literal(raw));
        }

        Register::new((raw - REGISTER_BASE) as usize)
            .map(Operand::Register)
            .ok_or(FaultKind::InvalidOperand(raw))
    }
}

/// Decodes an operand that must name a register, as in write destinations
pub fn destination(raw: Word) -> Result<Register> {
    match Operand::decode(raw)? {
        Operand::Register(register) => Ok(register),
        Operand::Literal(_) => Err(FaultKind::InvalidOperand(raw)),
    }
}

/// Effective value of a raw operand
pub fn resolve(registers: &Registers, raw: Word) -> Result<Word> {
    match Operand::decode(raw)? {
        Operand::Literal(value) => Ok(value),
        Operand::Register(register) => Ok(registers.read(register)),
    }
}

/// Encodes register `index` as a raw operand
pub const fn reg(index: u8) -> Word {
    REGISTER_BASE + index as Word
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_literal_passes_through() -> Result<()> {
        let registers = Registers::default();
        assert_eq!(resolve(&registers, 0)?, 0);
        assert_eq!(resolve(&registers, 1234)?, 1234);
        assert_eq!(resolve(&registers, 32767)?, 32767);

        Ok(())
    }

    #[test]
    fn test_register_dereference() -> Result<()> {
        let mut registers = Registers::default();
        for index in 0..8u8 {
            let register = Register::new(index as usize).unwrap();
            registers.write(register, 100 + index as Word);
        }

        for index in 0..8u8 {
            assert_eq!(resolve(&registers, reg(index))?, 100 + index as Word);
        }
        assert_eq!(reg(0), 32768);
        assert_eq!(reg(7), 32775);

        Ok(())
    }

    #[test]
    fn test_invalid_range() {
        let registers = Registers::default();
        for raw in [32776, 40000, 65535] {
            assert_eq!(
                resolve(&registers, raw),
                Err(FaultKind::InvalidOperand(raw))
            );
        }
    }

    #[test]
    fn test_destination() {
        assert_eq!(destination(32770), Ok(Register::new(2).unwrap()));
        assert_eq!(destination(5), Err(FaultKind::InvalidOperand(5)));
        assert_eq!(destination(32776), Err(FaultKind::InvalidOperand(32776)));
    }
}
