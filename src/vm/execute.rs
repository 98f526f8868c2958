//! The fetch-decode-execute loop.
//!
//! [`Processor`] repeatedly decodes the instruction word at the program
//! counter and dispatches it until the halt opcode executes. Input and
//! output are the only operations that may suspend the machine; every fault
//! (bad opcode, bad mode, negative resolved address, device failure) is
//! unrecoverable for that instance and carries the program counter at the
//! time of the fault.

use crate::vm::decode::{self, DecodeError, Instruction, Mode, Opcode};
use crate::vm::device::{Device, DeviceFault};
use crate::vm::{Address, Memory, Word};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Execution state of one processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmState {
    /// Executing normally.
    Running,
    /// The halt opcode has executed.
    Halted,
    /// A fault stopped execution.
    Faulted,
}

/// One Intcode machine: sparse memory, program counter, relative base and an
/// injected I/O device.
///
/// A processor exclusively owns all of its state; move it into a thread to
/// run it concurrently with other instances.
pub struct Processor<D> {
    mem: Memory,
    pc: Address,
    relative_base: Word,
    device: D,
    state: VmState,
    cycles: u64,
}

impl<D: Device> Processor<D> {
    /// Create a processor with empty memory, program counter and relative
    /// base at zero.
    pub fn new(device: D) -> Self {
        Self {
            mem: Memory::new(),
            pc: 0,
            relative_base: 0,
            device,
            state: VmState::Running,
            cycles: 0,
        }
    }

    /// Create a processor and load `image` at ascending addresses from zero.
    pub fn with_program(image: &[Word], device: D) -> Self {
        let mut processor = Self::new(device);
        processor.mem.load_image(image);
        processor
    }

    /// Write `value` at `addr`, overwriting any prior value.
    pub fn store(&mut self, addr: Address, value: Word) {
        self.mem.write(addr, value);
    }

    /// Read the word at `addr`. Unwritten addresses read as zero.
    pub fn fetch(&self, addr: Address) -> Word {
        self.mem.read(addr)
    }

    /// The machine's memory.
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// The injected device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Consume the processor, returning its device.
    pub fn into_device(self) -> D {
        self.device
    }

    /// Current program counter.
    pub fn pc(&self) -> Address {
        self.pc
    }

    /// Current relative base register.
    pub fn relative_base(&self) -> Word {
        self.relative_base
    }

    /// Instructions executed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Current execution state.
    pub fn state(&self) -> VmState {
        self.state
    }

    /// Whether the halt opcode has executed.
    pub fn is_halted(&self) -> bool {
        self.state == VmState::Halted
    }

    /// Whether the machine can still execute instructions.
    pub fn is_running(&self) -> bool {
        self.state == VmState::Running
    }

    /// Execute a single instruction.
    ///
    /// Returns the opcode that was executed. Any error leaves the machine in
    /// the [`VmState::Faulted`] state.
    pub fn step(&mut self) -> Result<Opcode, VmError> {
        if self.state != VmState::Running {
            return Err(VmError::NotRunning(self.state));
        }

        match self.dispatch() {
            Ok(opcode) => {
                self.cycles += 1;
                Ok(opcode)
            }
            Err(e) => {
                self.state = VmState::Faulted;
                Err(e)
            }
        }
    }

    /// Run until the halt opcode executes.
    ///
    /// Returns the number of instructions executed. Blocks whenever the
    /// device blocks on input or output; those are the only suspension
    /// points.
    pub fn run(&mut self) -> Result<u64, VmError> {
        let start = self.cycles;
        while self.state == VmState::Running {
            self.step()?;
        }
        Ok(self.cycles - start)
    }

    fn dispatch(&mut self) -> Result<Opcode, VmError> {
        let instr = decode::decode(self.fetch(self.pc)).map_err(|source| VmError::Decode {
            source,
            pc: self.pc,
        })?;

        match instr.opcode {
            Opcode::Add => {
                let value = self.val_arg(&instr, 1)? + self.val_arg(&instr, 2)?;
                let dst = self.ref_arg(&instr, 3)?;
                self.store(dst, value);
                self.pc += 4;
            }

            Opcode::Mul => {
                let value = self.val_arg(&instr, 1)? * self.val_arg(&instr, 2)?;
                let dst = self.ref_arg(&instr, 3)?;
                self.store(dst, value);
                self.pc += 4;
            }

            Opcode::Input => {
                let dst = self.ref_arg(&instr, 1)?;
                let word = self.read_device()?;
                self.store(dst, word);
                self.pc += 2;
            }

            Opcode::Output => {
                let value = self.val_arg(&instr, 1)?;
                self.write_device(value)?;
                self.pc += 2;
            }

            Opcode::JumpIfTrue => {
                if self.val_arg(&instr, 1)? != 0 {
                    let target = self.val_arg(&instr, 2)?;
                    self.pc = self.to_addr(target)?;
                } else {
                    self.pc += 3;
                }
            }

            Opcode::JumpIfFalse => {
                if self.val_arg(&instr, 1)? == 0 {
                    let target = self.val_arg(&instr, 2)?;
                    self.pc = self.to_addr(target)?;
                } else {
                    self.pc += 3;
                }
            }

            Opcode::LessThan => {
                let flag = self.val_arg(&instr, 1)? < self.val_arg(&instr, 2)?;
                let dst = self.ref_arg(&instr, 3)?;
                self.store(dst, flag as Word);
                self.pc += 4;
            }

            Opcode::Equals => {
                let flag = self.val_arg(&instr, 1)? == self.val_arg(&instr, 2)?;
                let dst = self.ref_arg(&instr, 3)?;
                self.store(dst, flag as Word);
                self.pc += 4;
            }

            Opcode::AdjustBase => {
                self.relative_base += self.val_arg(&instr, 1)?;
                self.pc += 2;
            }

            Opcode::Halt => {
                self.state = VmState::Halted;
                self.device.notify_halt();
            }
        }

        Ok(instr.opcode)
    }

    /// Resolve parameter `position` for reading.
    fn val_arg(&self, instr: &Instruction, position: u64) -> Result<Word, VmError> {
        let raw = self.fetch(self.pc + position);
        match instr.mode(position) {
            Mode::Position => Ok(self.fetch(self.to_addr(raw)?)),
            Mode::Immediate => Ok(raw),
            Mode::Relative => Ok(self.fetch(self.to_addr(raw + self.relative_base)?)),
        }
    }

    /// Resolve parameter `position` as a destination address.
    ///
    /// Only position and relative modes are legal here; writing to an
    /// immediate is meaningless.
    fn ref_arg(&self, instr: &Instruction, position: u64) -> Result<Address, VmError> {
        let raw = self.fetch(self.pc + position);
        match instr.mode(position) {
            Mode::Position => self.to_addr(raw),
            Mode::Relative => self.to_addr(raw + self.relative_base),
            Mode::Immediate => Err(VmError::ImmediateDestination {
                position,
                pc: self.pc,
            }),
        }
    }

    fn to_addr(&self, value: Word) -> Result<Address, VmError> {
        Address::try_from(value).map_err(|_| VmError::NegativeAddress {
            value,
            pc: self.pc,
        })
    }

    fn read_device(&mut self) -> Result<Word, VmError> {
        self.device.read_word().map_err(|source| VmError::Device {
            source,
            pc: self.pc,
        })
    }

    fn write_device(&mut self, word: Word) -> Result<(), VmError> {
        self.device
            .write_word(word)
            .map_err(|source| VmError::Device {
                source,
                pc: self.pc,
            })
    }
}

impl<D> std::fmt::Debug for Processor<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("relative_base", &self.relative_base)
            .field("cycles", &self.cycles)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Faults that stop a processor.
///
/// Every variant except [`VmError::NotRunning`] carries the program counter
/// at the time of the fault.
#[derive(Debug, Clone, Error)]
pub enum VmError {
    #[error("processor is not running: {0:?}")]
    NotRunning(VmState),

    #[error("decode fault at address {pc}: {source}")]
    Decode { source: DecodeError, pc: Address },

    #[error("immediate mode is not a valid destination (parameter {position} at address {pc})")]
    ImmediateDestination { position: u64, pc: Address },

    #[error("negative address {value} resolved at address {pc}")]
    NegativeAddress { value: Word, pc: Address },

    #[error("device fault at address {pc}: {source}")]
    Device { source: DeviceFault, pc: Address },
}
