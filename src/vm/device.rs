//! I/O capabilities for the Intcode machine.
//!
//! The machine never touches the console or a channel directly; it asks an
//! injected [`Device`] for input words and hands it output words. The same
//! processor therefore serves standalone console use, linear pipelines and
//! feedback rings without any branching inside the VM.

use crate::vm::Word;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Word-level I/O capability injected into a processor.
///
/// `read_word` and `write_word` are the VM's only suspension points: either
/// may block until a peer produces a value or frees capacity.
pub trait Device {
    /// Produce the next input word. May block until one is available.
    fn read_word(&mut self) -> Result<Word, DeviceFault>;

    /// Consume one output word. May block until the destination has capacity.
    fn write_word(&mut self, word: Word) -> Result<(), DeviceFault>;

    /// Invoked exactly once, after the halt instruction executes.
    fn notify_halt(&mut self) {}
}

/// Errors surfaced by a device.
#[derive(Debug, Clone, Error)]
pub enum DeviceFault {
    #[error("input is exhausted")]
    InputExhausted,

    #[error("peer endpoint disconnected")]
    Disconnected,

    #[error("console I/O failed: {0}")]
    Io(String),

    #[error("console input is not an integer: {0:?}")]
    NotAnInteger(String),
}

/// Console device: one base-10 integer per line on stdin/stdout.
#[derive(Debug, Default)]
pub struct ConsoleDevice;

impl Device for ConsoleDevice {
    fn read_word(&mut self) -> Result<Word, DeviceFault> {
        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| DeviceFault::Io(e.to_string()))?;
        if read == 0 {
            return Err(DeviceFault::InputExhausted);
        }

        let token = line.trim();
        token
            .parse()
            .map_err(|_| DeviceFault::NotAnInteger(token.to_string()))
    }

    fn write_word(&mut self, word: Word) -> Result<(), DeviceFault> {
        writeln!(io::stdout(), "{word}").map_err(|e| DeviceFault::Io(e.to_string()))
    }
}

/// Scripted device: reads from a fixed input queue and records every output.
///
/// The in-memory harness for driving a single machine without a console or
/// channels.
#[derive(Debug, Clone, Default)]
pub struct QueueDevice {
    inputs: VecDeque<Word>,
    outputs: Vec<Word>,
    halted: bool,
}

impl QueueDevice {
    /// Create a device with the given input script.
    pub fn new(inputs: impl IntoIterator<Item = Word>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: Vec::new(),
            halted: false,
        }
    }

    /// Everything the machine has output so far, in order.
    pub fn outputs(&self) -> &[Word] {
        &self.outputs
    }

    /// Whether the machine reported halting on this device.
    pub fn halted(&self) -> bool {
        self.halted
    }
}

impl Device for QueueDevice {
    fn read_word(&mut self) -> Result<Word, DeviceFault> {
        self.inputs.pop_front().ok_or(DeviceFault::InputExhausted)
    }

    fn write_word(&mut self, word: Word) -> Result<(), DeviceFault> {
        self.outputs.push(word);
        Ok(())
    }

    fn notify_halt(&mut self) {
        self.halted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_device_fifo() {
        let mut dev = QueueDevice::new([1, 2, 3]);
        assert_eq!(dev.read_word().unwrap(), 1);
        assert_eq!(dev.read_word().unwrap(), 2);
        assert_eq!(dev.read_word().unwrap(), 3);
        assert!(matches!(dev.read_word(), Err(DeviceFault::InputExhausted)));
    }

    #[test]
    fn test_queue_device_records_outputs_and_halt() {
        let mut dev = QueueDevice::default();
        dev.write_word(7).unwrap();
        dev.write_word(-9).unwrap();
        assert_eq!(dev.outputs(), &[7, -9]);

        assert!(!dev.halted());
        dev.notify_halt();
        assert!(dev.halted());
    }
}
