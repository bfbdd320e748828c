//! Byte-oriented console streams.
//!
//! The machine sees exactly two streams: one byte in, one byte out. The
//! `Console` trait is the seam between the dispatcher and the host;
//! `Stdio` wires it to the real terminal and `Buffered` replaces it with
//! in-memory buffers for tests.

use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read, Write};

/// The two byte streams of the machine.
pub trait Console {
    /// Read one byte. `Ok(None)` signals end of input. On an interactive
    /// terminal this blocks until a byte arrives.
    fn get(&mut self) -> io::Result<Option<u8>>;

    /// Write one byte.
    fn put(&mut self, byte: u8) -> io::Result<()>;
}

/// The process's standard streams. Output is flushed after every byte
/// when it goes to a terminal, so interactive Forth sessions echo
/// promptly.
pub struct Stdio {
    stdin: io::Stdin,
    stdout: io::Stdout,
    out_tty: bool,
}

impl Stdio {
    pub fn new() -> Self {
        let stdout = io::stdout();
        let out_tty = stdout.is_terminal();
        Self {
            stdin: io::stdin(),
            stdout,
            out_tty,
        }
    }
}

impl Default for Stdio {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for Stdio {
    fn get(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.stdin.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn put(&mut self, byte: u8) -> io::Result<()> {
        self.stdout.write_all(&[byte])?;
        if self.out_tty {
            self.stdout.flush()?;
        }
        Ok(())
    }
}

/// In-memory console for tests: a queue of input bytes and a captured
/// output buffer.
#[derive(Debug, Default)]
pub struct Buffered {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl Buffered {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Everything the machine has written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }
}

impl Console for Buffered {
    fn get(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn put(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }
}
