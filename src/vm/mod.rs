//! The Intcode virtual machine.
//!
//! One [`Processor`] is a complete machine:
//! - sparse, grow-on-demand memory addressed by `u64`
//! - a program counter and a relative base register
//! - three addressing modes: position, immediate, relative
//! - I/O through an injected [`Device`] capability
//!
//! Every processor owns its state outright; nothing is shared between
//! instances, so any number of them can run on their own threads.

pub mod decode;
pub mod device;
pub mod execute;
pub mod memory;

pub use decode::{decode, DecodeError, Instruction, Mode, Opcode};
pub use device::{ConsoleDevice, Device, DeviceFault, QueueDevice};
pub use execute::{Processor, VmError, VmState};
pub use memory::Memory;

/// A single Intcode machine word.
pub type Word = i64;

/// A resolved memory address.
///
/// Always derived from a [`Word`] via the current addressing mode and never
/// negative once resolved.
pub type Address = u64;
