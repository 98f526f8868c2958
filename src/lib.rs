//! # Intcode Emulator
//!
//! A virtual machine for the Intcode instruction set, plus the wiring to run
//! several machines in parallel as an amplifier chain or a feedback ring.
//!
//! The machine executes a linear instruction stream held in sparse,
//! effectively unbounded memory, with three addressing modes (position,
//! immediate, relative) and I/O through injected [`Device`] capabilities.
//! Pipelines connect independent machines, one thread each, through blocking
//! FIFO channels.

pub mod pipeline;
pub mod program;
pub mod vm;

// Re-export commonly used types
pub use pipeline::{
    best_chain_signal, best_ring_signal, run_chain, run_ring, PipelineError, CHAIN_PHASES,
    RING_PHASES,
};
pub use program::{load_program, parse_program, ProgramError};
pub use vm::{
    Address, ConsoleDevice, Device, DeviceFault, Instruction, Memory, Mode, Opcode, Processor,
    QueueDevice, VmError, VmState, Word,
};
