//! Sparse Intcode memory.
//!
//! Programs may read and write scratch space far beyond the loaded image, so
//! the store grows on demand instead of preallocating. Addresses that were
//! never written read as zero; that policy holds for the whole address space,
//! with no distinction between cells below and above the image length.

use crate::vm::{Address, Word};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sparse address → word store, exclusively owned by one processor.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Memory {
    cells: HashMap<Address, Word>,
}

impl Memory {
    /// Create an empty memory.
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    /// Read the word at `addr`. Unwritten addresses read as zero.
    #[inline]
    pub fn read(&self, addr: Address) -> Word {
        self.cells.get(&addr).copied().unwrap_or(0)
    }

    /// Write `value` at `addr`, overwriting any prior value.
    /// There is no error condition.
    #[inline]
    pub fn write(&mut self, addr: Address, value: Word) {
        self.cells.insert(addr, value);
    }

    /// Copy a program image into memory at ascending addresses from zero.
    pub fn load_image(&mut self, image: &[Word]) {
        for (i, &word) in image.iter().enumerate() {
            self.cells.insert(i as Address, word);
        }
    }

    /// Number of explicitly written cells.
    pub fn written_len(&self) -> usize {
        self.cells.len()
    }

    /// Clear all cells back to the unwritten state.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("written_cells", &self.cells.len())
            .finish()
    }
}
