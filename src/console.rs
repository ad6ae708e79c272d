use std::collections::VecDeque;
use std::io::{self, Read, Write};

use log::*;

/// Character I/O used by the `In` and `Out` instructions
pub trait Console {
    /// Next input character, blocking until one is available.
    /// `None` means the input has ended.
    fn read_byte(&mut self) -> Option<u8>;

    fn write_byte(&mut self, byte: u8);
}

/// Console backed by the process' stdin and stdout
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    fn flush(&self) {
        if let Err(err) = io::stdout().flush() {
            warn!("Cannot flush stdout: {}", err);
        }
    }
}

impl Console for StdConsole {
    fn read_byte(&mut self) -> Option<u8> {
        // prompts must be visible before blocking
        self.flush();

        let mut byte = [0];
        match io::stdin().lock().read_exact(&mut byte) {
            Ok(()) => Some(byte[0]),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => None,
            Err(err) => {
                warn!("Cannot read stdin: {}", err);
                None
            }
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if let Err(err) = io::stdout().write_all(&[byte]) {
            warn!("Cannot write stdout: {}", err);
        }
        if byte == b'\n' {
            self.flush();
        }
    }
}

/// In-memory console, fed up front and inspected afterwards
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferedConsole {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl BufferedConsole {
    pub fn new<I: AsRef<[u8]>>(input: I) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Output produced so far, lossily decoded
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for BufferedConsole {
    fn read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_console() {
        let mut console = BufferedConsole::new("ab");
        assert_eq!(console.read_byte(), Some(b'a'));
        assert_eq!(console.read_byte(), Some(b'b'));
        assert_eq!(console.read_byte(), None);

        console.write_byte(b'h');
        console.write_byte(b'i');
        assert_eq!(console.output_string(), "hi");
    }
}
