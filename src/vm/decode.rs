//! Instruction decoder.
//!
//! An instruction is a single word. The low two decimal digits select the
//! opcode; each higher digit selects the addressing mode of one parameter,
//! least significant first (hundreds digit = parameter 1, thousands digit =
//! parameter 2, ten-thousands digit = parameter 3).
//!
//! Instructions are decoded fresh on every fetch and never cached.

use crate::vm::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// The raw word is an address to dereference (digit 0).
    Position,
    /// The raw word is the operand itself (digit 1). Never valid as a
    /// destination.
    Immediate,
    /// The raw word plus the relative base forms an address (digit 2).
    Relative,
}

impl Mode {
    fn from_digit(digit: Word, position: u32) -> Result<Self, DecodeError> {
        match digit {
            0 => Ok(Mode::Position),
            1 => Ok(Mode::Immediate),
            2 => Ok(Mode::Relative),
            mode => Err(DecodeError::InvalidMode { mode, position }),
        }
    }
}

/// Decoded operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// `mem[dst] = arg1 + arg2`
    Add,
    /// `mem[dst] = arg1 * arg2`
    Mul,
    /// `mem[dst] = input()`
    Input,
    /// `output(arg1)`
    Output,
    /// `if arg1 != 0 { pc = arg2 }`
    JumpIfTrue,
    /// `if arg1 == 0 { pc = arg2 }`
    JumpIfFalse,
    /// `mem[dst] = if arg1 < arg2 { 1 } else { 0 }`
    LessThan,
    /// `mem[dst] = if arg1 == arg2 { 1 } else { 0 }`
    Equals,
    /// `relative_base += arg1`
    AdjustBase,
    /// Stop the fetch-execute loop.
    Halt,
}

/// A decoded instruction: the opcode plus one addressing mode per
/// parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    modes: [Mode; 3],
}

impl Instruction {
    /// Addressing mode of parameter `position` (1-based, 1..=3).
    pub fn mode(&self, position: u64) -> Mode {
        self.modes[position as usize - 1]
    }
}

/// Decode one instruction word.
pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    let opcode = match word % 100 {
        1 => Opcode::Add,
        2 => Opcode::Mul,
        3 => Opcode::Input,
        4 => Opcode::Output,
        5 => Opcode::JumpIfTrue,
        6 => Opcode::JumpIfFalse,
        7 => Opcode::LessThan,
        8 => Opcode::Equals,
        9 => Opcode::AdjustBase,
        99 => Opcode::Halt,
        _ => return Err(DecodeError::InvalidOpcode(word)),
    };

    let mut modes = [Mode::Position; 3];
    for (i, slot) in modes.iter_mut().enumerate() {
        let position = i as u32 + 1;
        let digit = word / 10_i64.pow(position + 1) % 10;
        *slot = Mode::from_digit(digit, position)?;
    }

    Ok(Instruction { opcode, modes })
}

/// Errors raised while decoding an instruction word.
///
/// Both are fatal to the processor that hit them; there is no
/// resynchronization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode in instruction word {0}")]
    InvalidOpcode(Word),

    #[error("invalid addressing mode {mode} for parameter {position}")]
    InvalidMode { mode: Word, position: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_plain_opcodes() {
        assert_eq!(decode(1).unwrap().opcode, Opcode::Add);
        assert_eq!(decode(2).unwrap().opcode, Opcode::Mul);
        assert_eq!(decode(99).unwrap().opcode, Opcode::Halt);
    }

    #[test]
    fn test_decode_defaults_to_position_mode() {
        let instr = decode(1).unwrap();
        assert_eq!(instr.mode(1), Mode::Position);
        assert_eq!(instr.mode(2), Mode::Position);
        assert_eq!(instr.mode(3), Mode::Position);
    }

    #[test]
    fn test_decode_mixed_modes() {
        // 1002 = multiply, param 1 position, param 2 immediate
        let instr = decode(1002).unwrap();
        assert_eq!(instr.opcode, Opcode::Mul);
        assert_eq!(instr.mode(1), Mode::Position);
        assert_eq!(instr.mode(2), Mode::Immediate);
        assert_eq!(instr.mode(3), Mode::Position);

        // 204 = output, param 1 relative
        let instr = decode(204).unwrap();
        assert_eq!(instr.opcode, Opcode::Output);
        assert_eq!(instr.mode(1), Mode::Relative);
    }

    #[test]
    fn test_decode_invalid_opcode() {
        assert_eq!(decode(98), Err(DecodeError::InvalidOpcode(98)));
        assert_eq!(decode(0), Err(DecodeError::InvalidOpcode(0)));
        assert!(decode(-1).is_err());
    }

    #[test]
    fn test_decode_invalid_mode_digit() {
        // 301 = add with mode digit 3 on parameter 1
        assert_eq!(
            decode(301),
            Err(DecodeError::InvalidMode {
                mode: 3,
                position: 1
            })
        );
    }

    proptest! {
        #[test]
        fn mode_digits_decode_to_their_parameter(
            op in prop::sample::select(vec![1_i64, 2, 3, 4, 5, 6, 7, 8, 9, 99]),
            m1 in 0_i64..3,
            m2 in 0_i64..3,
            m3 in 0_i64..3,
        ) {
            let modes = [Mode::Position, Mode::Immediate, Mode::Relative];
            let word = m3 * 10_000 + m2 * 1_000 + m1 * 100 + op;
            let instr = decode(word).unwrap();

            prop_assert_eq!(instr.mode(1), modes[m1 as usize]);
            prop_assert_eq!(instr.mode(2), modes[m2 as usize]);
            prop_assert_eq!(instr.mode(3), modes[m3 as usize]);
        }
    }
}
