use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use log::*;

use crate::fault::{FaultKind, ImageDefect, Result};

pub type Byte = u8; // 1 byte
pub type Word = u16; // 2 bytes, only 15 bits used for plain values

/// Arithmetic results are reduced modulo this value
pub const MODULUS: u32 = 32768;
/// Largest plain value a word may hold
pub const MAX_VALUE: Word = 0x7FFF;

/// Memory covering the full 15-bit address space
pub type StdMem = Memory<0x8000>;

/// Word addressable memory holding the program and its data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: [Word; S],
    /// Number of words occupied by the loaded program
    extent: usize,
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes the memory
    fn default() -> Self {
        Memory {
            data: [0; S],
            extent: 0,
        }
    }
}

impl<const S: usize> Memory<S> {
    /// Builds a memory from a raw little endian image
    pub fn from_image(bytes: &[Byte]) -> Result<Self> {
        let mut memory = Self::default();
        memory.load_image(bytes)?;
        Ok(memory)
    }

    /// Reads a binary image from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> EyreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .wrap_err_with(|| format!("Cannot open binary file: {}", path.display()))?;

        info!("Binary path: {}", path.display());
        info!("Binary size: {} B", bytes.len());

        Self::from_image(&bytes)
            .wrap_err_with(|| format!("Cannot load binary file: {}", path.display()))
    }

    /// Replaces the memory contents with `bytes`, decoded pairwise as little
    /// endian words starting at address 0.
    pub fn load_image(&mut self, bytes: &[Byte]) -> Result<()> {
        if bytes.len() % 2 != 0 {
            return Err(FaultKind::MalformedImage(ImageDefect::OddLength {
                bytes: bytes.len(),
            }));
        }

        let words = bytes.len() / 2;
        if words > S {
            return Err(FaultKind::MalformedImage(ImageDefect::TooLarge {
                words,
                capacity: S,
            }));
        }

        self.data = [0; S];
        for (cell, pair) in self.data.iter_mut().zip(bytes.chunks_exact(2)) {
            *cell = Word::from_le_bytes([pair[0], pair[1]]);
        }
        self.extent = words;

        debug!("Loaded {} words", words);
        Ok(())
    }

    /// Reads a word from the memory
    pub fn read(&self, address: Word) -> Result<Word> {
        self.data
            .get(address as usize)
            .copied()
            .ok_or(FaultKind::MemoryOutOfBounds {
                address: address as usize,
            })
    }

    /// Writes a word to the memory
    pub fn write(&mut self, address: Word, value: Word) -> Result<()> {
        let cell = self
            .data
            .get_mut(address as usize)
            .ok_or(FaultKind::MemoryOutOfBounds {
                address: address as usize,
            })?;
        *cell = value;
        Ok(())
    }

    /// Writes an array of words to the memory, growing the program extent
    /// to cover them
    pub fn write_array(&mut self, position: Word, data: &[Word]) -> Result<()> {
        let start = position as usize;
        let end = start + data.len();
        if end > S {
            return Err(FaultKind::MemoryOutOfBounds { address: end - 1 });
        }

        self.data[start..end].copy_from_slice(data);
        self.extent = self.extent.max(end);
        Ok(())
    }

    /// Number of words occupied by the program
    pub fn extent(&self) -> usize {
        self.extent
    }

    pub fn capacity(&self) -> usize {
        S
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $word:expr ),+ $(,)? ) => {
        $mem.write_array($pos, &[
            $(
                $word as $crate::memory::Word,
            )+
        ])
    };
}

#[cfg(test)]
mod tests {
    use crate::processor::Instruction;

    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_read_write() -> Result<()> {
        let mut mem = StdMem::default();
        mem.write(0x44, 12)?;
        assert_eq!(mem.read(0x44)?, 12);
        assert_eq!(mem.data[0x44], 12);

        Ok(())
    }

    #[test]
    fn test_out_of_bounds() -> Result<()> {
        let mut mem = Memory::<16>::default();
        assert_eq!(
            mem.read(16),
            Err(FaultKind::MemoryOutOfBounds { address: 16 })
        );
        assert_eq!(
            mem.write(0x7FFF, 1),
            Err(FaultKind::MemoryOutOfBounds { address: 0x7FFF })
        );

        let full = StdMem::default();
        assert_eq!(full.capacity(), 0x8000);
        assert_eq!(full.read(0x7FFF)?, 0);
        assert!(full.read(0x8000).is_err());

        Ok(())
    }

    #[test]
    fn test_load_image_little_endian() -> Result<()> {
        let mem = StdMem::from_image(&[0x12, 0x34, 0x09, 0x80, 0x00, 0x00])?;
        assert_eq!(mem.read(0)?, 0x3412);
        assert_eq!(mem.read(1)?, 0x8009);
        assert_eq!(mem.read(2)?, 0);
        assert_eq!(mem.extent(), 3);

        Ok(())
    }

    #[test]
    fn test_load_image_replaces_contents() -> Result<()> {
        let mut mem = StdMem::default();
        mem.write(100, 5)?;
        mem.load_image(&[1, 0])?;
        assert_eq!(mem.read(100)?, 0);
        assert_eq!(mem.extent(), 1);

        Ok(())
    }

    #[test]
    fn test_load_image_rejects_odd_length() {
        let result = StdMem::from_image(&[0x00, 0x00, 0x15]);
        assert_eq!(
            result.err(),
            Some(FaultKind::MalformedImage(ImageDefect::OddLength { bytes: 3 }))
        );
    }

    #[test]
    fn test_load_image_rejects_oversized() {
        let result = Memory::<2>::from_image(&[0; 6]);
        assert_eq!(
            result.err(),
            Some(FaultKind::MalformedImage(ImageDefect::TooLarge {
                words: 3,
                capacity: 2
            }))
        );
    }

    #[test]
    fn test_from_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("synvm-image-{}.bin", std::process::id()));
        fs::write(&path, [0x13u8, 0x00, 0x41, 0x00, 0x00, 0x00])?;

        let mem = StdMem::from_file(&path);
        fs::remove_file(&path)?;

        let mem = mem?;
        assert_eq!(mem.extent(), 3);
        assert_eq!(mem.read(1)?, 0x41);

        Ok(())
    }

    #[test]
    fn test_from_missing_file() {
        assert!(StdMem::from_file("/nonexistent/synvm.bin").is_err());
    }

    #[test]
    fn test_write_array() -> Result<()> {
        let mut mem = StdMem::default();
        mem.write_array(0x44, &[0x12, 0x34, 0x56])?;
        assert_eq!(mem.data[0x44], 0x12);
        assert_eq!(mem.data[0x45], 0x34);
        assert_eq!(mem.data[0x46], 0x56);
        assert_eq!(mem.extent(), 0x47);

        let mut small = Memory::<4>::default();
        assert!(small.write_array(2, &[1, 2, 3]).is_err());

        Ok(())
    }

    #[test]
    fn test_write_instructions() -> Result<()> {
        let mut mem = StdMem::default();

        mem.write_array(
            0,
            &[
                Instruction::Noop as Word,
                Instruction::Out as Word,
                65,
                Instruction::Halt as Word,
            ],
        )?;

        let mut mem2 = StdMem::default();
        use crate::processor::Instruction::*;
        write_instructions!(mem2 : 0 => Noop, Out, 65, Halt)?;

        assert_eq!(mem, mem2);

        Ok(())
    }
}
