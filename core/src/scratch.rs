//! Caller-owned scratch buffers.
//!
//! MCUs have no heap to spare for activations, so the caller hands the engine
//! two `f32` regions once per session:
//!
//! - buffer #1 holds the current input plane when it has to be materialized
//!   (stream input, or `u8`/`i8` memory input). Sessions whose inputs are all
//!   `f32` slices can leave it out.
//! - buffer #2 is the output accumulator: one conv map before pooling, or the
//!   staged outputs of a softmax layer written to a stream.
//!
//! Both regions are zeroed before use by the engine call that borrows them.

use crate::error::{TrickleError, TrickleResult};

pub struct ScratchPool<'a> {
    input: Option<&'a mut [f32]>,
    accum: &'a mut [f32],
}

impl<'a> ScratchPool<'a> {
    pub fn new(input: &'a mut [f32], accum: &'a mut [f32]) -> Self {
        Self {
            input: Some(input),
            accum,
        }
    }

    /// Pool without buffer #1, for pure-memory `f32` sessions.
    pub fn accumulator_only(accum: &'a mut [f32]) -> Self {
        Self { input: None, accum }
    }

    /// Carve both regions out of one buffer: the first `input_len` values
    /// become buffer #1, the rest the accumulator.
    pub fn split(buf: &'a mut [f32], input_len: usize) -> TrickleResult<Self> {
        if input_len > buf.len() {
            return Err(TrickleError::BufferTooSmall {
                required: input_len,
                available: buf.len(),
            });
        }
        let (input, accum) = buf.split_at_mut(input_len);
        Ok(Self::new(input, accum))
    }

    /// Capacity of buffer #1, 0 when absent.
    #[inline]
    pub fn input_capacity(&self) -> usize {
        self.input.as_deref().map_or(0, <[f32]>::len)
    }

    #[inline]
    pub fn accum_capacity(&self) -> usize {
        self.accum.len()
    }

    /// Borrow `input_len` values of buffer #1 and `accum_len` values of the
    /// accumulator, both zeroed. An `input_len` of 0 does not require buffer
    /// #1 at all.
    pub(crate) fn borrow(
        &mut self,
        input_len: usize,
        accum_len: usize,
    ) -> TrickleResult<(&mut [f32], &mut [f32])> {
        if accum_len > self.accum.len() {
            return Err(TrickleError::BufferTooSmall {
                required: accum_len,
                available: self.accum.len(),
            });
        }
        let input: &mut [f32] = if input_len == 0 {
            &mut []
        } else {
            let buf = self.input.as_deref_mut().ok_or(TrickleError::MissingScratch)?;
            if input_len > buf.len() {
                return Err(TrickleError::BufferTooSmall {
                    required: input_len,
                    available: buf.len(),
                });
            }
            &mut buf[..input_len]
        };
        let accum = &mut self.accum[..accum_len];
        input.fill(0.0);
        accum.fill(0.0);
        Ok((input, accum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_carves_regions() {
        let mut buf = [1.0f32; 10];
        let pool = ScratchPool::split(&mut buf, 4).unwrap();
        assert_eq!(pool.input_capacity(), 4);
        assert_eq!(pool.accum_capacity(), 6);
    }

    #[test]
    fn test_split_rejects_oversized_input() {
        let mut buf = [0.0f32; 3];
        assert_eq!(
            ScratchPool::split(&mut buf, 4).err(),
            Some(TrickleError::BufferTooSmall { required: 4, available: 3 })
        );
    }

    #[test]
    fn test_borrow_zeroes_prefixes() {
        let mut input = [7.0f32; 4];
        let mut accum = [9.0f32; 6];
        let mut pool = ScratchPool::new(&mut input, &mut accum);
        let (i, a) = pool.borrow(3, 5).unwrap();
        assert_eq!(i, &[0.0; 3]);
        assert_eq!(a, &[0.0; 5]);
    }

    #[test]
    fn test_missing_input_buffer() {
        let mut accum = [0.0f32; 4];
        let mut pool = ScratchPool::accumulator_only(&mut accum);
        assert_eq!(pool.input_capacity(), 0);
        assert!(pool.borrow(0, 4).is_ok());
        assert_eq!(pool.borrow(1, 4).err(), Some(TrickleError::MissingScratch));
    }

    #[test]
    fn test_accumulator_too_small() {
        let mut input = [0.0f32; 4];
        let mut accum = [0.0f32; 4];
        let mut pool = ScratchPool::new(&mut input, &mut accum);
        assert_eq!(
            pool.borrow(0, 9).err(),
            Some(TrickleError::BufferTooSmall { required: 9, available: 4 })
        );
    }
}
