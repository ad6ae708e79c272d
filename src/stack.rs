use crate::fault::{FaultKind, Result};
use crate::memory::Word;

/// Number of words the stack can hold
pub const STACK_CAPACITY: usize = 0x8000;

/// LIFO store for return addresses and pushed values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stack {
    data: Vec<Word>,
    capacity: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::with_capacity(STACK_CAPACITY)
    }
}

impl Stack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
        }
    }

    pub fn push(&mut self, value: Word) -> Result<()> {
        if self.is_full() {
            return Err(FaultKind::StackOverflow);
        }

        self.data.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Word> {
        self.data.pop().ok_or(FaultKind::StackUnderflow)
    }

    /// Top of the stack without removing it
    pub fn peek(&self) -> Option<Word> {
        self.data.last().copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values from bottom to top
    pub fn as_slice(&self) -> &[Word] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_lifo_order() -> Result<()> {
        let mut stack = Stack::default();
        stack.push(5)?;
        stack.push(7)?;
        assert_eq!(stack.peek(), Some(7));
        assert_eq!(stack.pop()?, 7);
        assert_eq!(stack.pop()?, 5);
        assert!(stack.is_empty());

        Ok(())
    }

    #[test]
    fn test_underflow() {
        let mut stack = Stack::default();
        assert_eq!(stack.pop(), Err(FaultKind::StackUnderflow));
    }

    #[test]
    fn test_overflow() -> Result<()> {
        let mut stack = Stack::with_capacity(2);
        stack.push(1)?;
        stack.push(2)?;
        assert_eq!(stack.push(3), Err(FaultKind::StackOverflow));
        assert_eq!(stack.as_slice(), &[1, 2]);

        Ok(())
    }

    #[test]
    fn test_default_capacity() -> Result<()> {
        let mut stack = Stack::default();
        for value in 0..STACK_CAPACITY {
            stack.push(value as Word)?;
        }
        assert!(stack.is_full());
        assert_eq!(stack.push(0), Err(FaultKind::StackOverflow));

        Ok(())
    }
}
