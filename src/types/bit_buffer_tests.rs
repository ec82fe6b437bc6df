//==================================================================================
// Randomized differential tests: BitBuffer vs. a reference bit vector
//==================================================================================

#[cfg(test)]
mod tests {
    use crate::types::bit_buffer::{low_mask, BitBuffer};
    use bitvec::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const ITERATIONS: usize = 100_000;
    const SOFT_MAX_BITS: usize = 1024;

    /// Writes `bit_count` bits of `value` into the model at `index`, growing it if needed.
    fn model_write(model: &mut BitVec<u32, Lsb0>, index: usize, bit_count: u32, value: u32) {
        if model.len() < index + bit_count as usize {
            model.resize(index + bit_count as usize, false);
        }
        for i in 0..bit_count as usize {
            model.set(index + i, (value >> i) & 1 == 1);
        }
    }

    fn model_read(model: &BitVec<u32, Lsb0>, index: usize, bit_count: u32) -> u32 {
        let mut value = 0u32;
        for i in 0..bit_count as usize {
            if model[index + i] {
                value |= 1 << i;
            }
        }
        value
    }

    /// Compares the whole logical content 32 bits at a time.
    fn assert_agrees(buffer: &BitBuffer, model: &BitVec<u32, Lsb0>, step: usize) {
        assert_eq!(buffer.total_bits(), model.len(), "length mismatch at step {}", step);
        let mut index = 0;
        while index < model.len() {
            let width = (model.len() - index).min(32) as u32;
            assert_eq!(
                buffer.get(index, width).unwrap(),
                model_read(model, index, width),
                "bit mismatch at index {} (step {})",
                index,
                step
            );
            index += width as usize;
        }
    }

    fn run_differential(seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut buffer = BitBuffer::new();
        let mut model: BitVec<u32, Lsb0> = BitVec::new();

        for step in 0..ITERATIONS {
            let bit_count: u32 = rng.random_range(1..=32);
            let value: u32 = rng.random();

            match rng.random_range(0..100u32) {
                // append
                0..=39 => {
                    buffer.append(value, bit_count).unwrap();
                    let at = model.len();
                    model_write(&mut model, at, bit_count, value);
                }
                // append_reversed
                40..=44 => {
                    buffer.append_reversed(value, bit_count).unwrap();
                    let at = model.len();
                    for i in 0..bit_count {
                        model.push((value >> (bit_count - 1 - i)) & 1 == 1);
                    }
                    assert_eq!(model.len(), at + bit_count as usize);
                }
                // get
                45..=64 => {
                    if model.len() >= bit_count as usize {
                        let index = rng.random_range(0..=model.len() - bit_count as usize);
                        assert_eq!(
                            buffer.get(index, bit_count).unwrap(),
                            model_read(&model, index, bit_count),
                            "get mismatch at step {}",
                            step
                        );
                    } else {
                        assert!(buffer.get(0, bit_count).is_err());
                    }
                }
                // set inside the logical length
                65..=84 => {
                    if model.len() >= bit_count as usize {
                        let index = rng.random_range(0..=model.len() - bit_count as usize);
                        buffer.set(index, bit_count, value).unwrap();
                        model_write(&mut model, index, bit_count, value & low_mask(bit_count));
                    }
                }
                // remove
                85..=94 => {
                    let upper = if model.len() > SOFT_MAX_BITS {
                        model.len()
                    } else {
                        model.len().min(64)
                    };
                    let count = rng.random_range(0..=upper);
                    buffer.remove(count).unwrap();
                    let new_len = model.len() - count;
                    model.truncate(new_len);
                }
                // resize
                _ => {
                    let target = rng.random_range(0..=SOFT_MAX_BITS);
                    buffer.resize(target).unwrap();
                    model.resize(target, false);
                }
            }

            assert_agrees(&buffer, &model, step);
        }
    }

    #[test]
    fn test_differential_against_reference_seed_1() {
        run_differential(1);
    }

    #[test]
    fn test_differential_against_reference_seed_2024() {
        run_differential(2024);
    }

    #[test]
    fn test_random_set_get_roundtrip() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut buffer = BitBuffer::new();
        buffer.resize(4096).unwrap();
        for _ in 0..10_000 {
            let bit_count: u32 = rng.random_range(1..=32);
            let index = rng.random_range(0..=4096 - bit_count as usize);
            let value: u32 = rng.random();
            buffer.set(index, bit_count, value).unwrap();
            assert_eq!(buffer.get(index, bit_count).unwrap(), value & low_mask(bit_count));
        }
    }

    #[test]
    fn test_bitslice_view_matches_model() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut buffer = BitBuffer::new();
        let mut model: BitVec<u32, Lsb0> = BitVec::new();
        for _ in 0..500 {
            let bit_count: u32 = rng.random_range(1..=32);
            let value: u32 = rng.random();
            buffer.append(value, bit_count).unwrap();
            let at = model.len();
            model_write(&mut model, at, bit_count, value);
        }
        assert_eq!(buffer.as_bitslice(), model.as_bitslice());
    }
}
