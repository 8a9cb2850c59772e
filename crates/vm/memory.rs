use crate::{
    constants::{MEMORY_EXPANSION_QUOTIENT, WORD_SIZE_IN_BYTES_USIZE},
    errors::{ExceptionalHalt, InternalError, VMError},
};
use ethereum_types::U256;

/// Byte-addressed, lazily extended program memory.
///
/// The buffer length is kept word-aligned and doubles as the active size
/// reported by MSIZE; expansion is charged through
/// [`expansion_cost`] before any resize happens.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    buffer: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current active size in bytes, always a multiple of 32.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Grows the buffer to the given word-aligned size. Never shrinks.
    pub fn resize(&mut self, new_memory_size: usize) -> Result<(), VMError> {
        if new_memory_size <= self.buffer.len() {
            return Ok(());
        }
        debug_assert!(new_memory_size % WORD_SIZE_IN_BYTES_USIZE == 0);
        self.buffer.resize(new_memory_size, 0);
        Ok(())
    }

    pub fn load_range(&mut self, offset: usize, size: usize) -> Result<Vec<u8>, VMError> {
        if size == 0 {
            return Ok(Vec::new());
        }
        self.resize(calculate_memory_size(offset, size)?)?;
        self.buffer
            .get(offset..offset + size)
            .map(|slice| slice.to_vec())
            .ok_or(ExceptionalHalt::OutOfBounds.into())
    }

    pub fn load_word(&mut self, offset: usize) -> Result<U256, VMError> {
        let bytes = self.load_range(offset, WORD_SIZE_IN_BYTES_USIZE)?;
        Ok(U256::from_big_endian(&bytes))
    }

    pub fn store_data(&mut self, offset: usize, data: &[u8]) -> Result<(), VMError> {
        if data.is_empty() {
            return Ok(());
        }
        self.resize(calculate_memory_size(offset, data.len())?)?;
        self.buffer
            .get_mut(offset..offset + data.len())
            .ok_or(ExceptionalHalt::OutOfBounds)?
            .copy_from_slice(data);
        Ok(())
    }

    pub fn store_word(&mut self, offset: usize, word: U256) -> Result<(), VMError> {
        self.store_data(offset, &word.to_big_endian())
    }

    pub fn store_byte(&mut self, offset: usize, value: u8) -> Result<(), VMError> {
        self.store_data(offset, &[value])
    }
}

/// The word-aligned size needed to touch the byte range `[offset, offset+size)`.
pub fn calculate_memory_size(offset: usize, size: usize) -> Result<usize, VMError> {
    if size == 0 {
        return Ok(0);
    }
    offset
        .checked_add(size)
        .and_then(|end| end.checked_next_multiple_of(WORD_SIZE_IN_BYTES_USIZE))
        .ok_or(ExceptionalHalt::OutOfBounds.into())
}

/// Gas charged for growing the active memory: only the delta of the total
/// cost function `3*w + w^2/512` is paid.
pub fn expansion_cost(new_memory_size: usize, current_memory_size: usize) -> Result<u64, VMError> {
    let cost = if new_memory_size <= current_memory_size {
        0
    } else {
        cost(new_memory_size)?
            .checked_sub(cost(current_memory_size)?)
            .ok_or(InternalError::Underflow)?
    };
    Ok(cost)
}

/// Total cost of a memory of the given size.
fn cost(memory_size: usize) -> Result<u64, VMError> {
    let words = memory_size
        .checked_add(WORD_SIZE_IN_BYTES_USIZE - 1)
        .ok_or(ExceptionalHalt::OutOfGas)?
        / WORD_SIZE_IN_BYTES_USIZE;
    let gas_cost = words
        .checked_pow(2)
        .ok_or(ExceptionalHalt::OutOfGas)?
        / MEMORY_EXPANSION_QUOTIENT;
    let gas_cost = gas_cost
        .checked_add(3usize.checked_mul(words).ok_or(ExceptionalHalt::OutOfGas)?)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    gas_cost
        .try_into()
        .map_err(|_| ExceptionalHalt::VeryLargeNumber.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_grows_word_aligned() {
        let mut memory = Memory::new();
        memory.store_data(0, &[1, 2, 3]).unwrap();
        assert_eq!(memory.len(), 32);
        memory.store_data(32, &[4]).unwrap();
        assert_eq!(memory.len(), 64);
    }

    #[test]
    fn load_and_store_words() {
        let mut memory = Memory::new();
        let word = U256::from(0xdeadbeefu64);
        memory.store_word(64, word).unwrap();
        assert_eq!(memory.load_word(64).unwrap(), word);
        assert_eq!(memory.len(), 96);
    }

    #[test]
    fn expansion_cost_is_quadratic_delta() {
        // One word: 3*1 + 1/512 = 3.
        assert_eq!(expansion_cost(32, 0).unwrap(), 3);
        // Two words from scratch: 3*2 + 4/512 = 6; delta from one word: 3.
        assert_eq!(expansion_cost(64, 32).unwrap(), 3);
        // 1024 words (32 KiB): 3*1024 + 1024^2/512 = 5120.
        assert_eq!(expansion_cost(32 * 1024, 0).unwrap(), 5120);
        // No growth, no cost.
        assert_eq!(expansion_cost(32, 64).unwrap(), 0);
    }

    #[test]
    fn memory_size_rounds_up_to_words() {
        assert_eq!(calculate_memory_size(0, 1).unwrap(), 32);
        assert_eq!(calculate_memory_size(0, 32).unwrap(), 32);
        assert_eq!(calculate_memory_size(31, 2).unwrap(), 64);
        assert_eq!(calculate_memory_size(0, 0).unwrap(), 0);
    }
}
