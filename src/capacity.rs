//! Capacity oracle: how many child slots a growing branch should get.
//!
//! Shallow branches fill rapidly and pre-allocate generously; deep branches
//! usually hold one or two children. Growth follows a Fibonacci-like
//! sequence tuned per level and per generation, where
//! `generation = ceil(log2(expected_entries))`.

/// Deepest level with its own row; anything deeper is clamped here.
const MAX_LEVEL: usize = 4;

/// Largest generation column.
const MAX_GENERATION: u32 = 22;

// [level][generation]; generation columns correspond to expected sizes
// 1, 2, 4, 8, .., 2^22.
#[rustfmt::skip]
const SIZES_BY_LEVEL: [[u32; 23]; 5] = [
    [2, 3, 5, 8, 13, 21, 29, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32],
    [1, 1, 1, 1,  1,  2,  3,  5,  8, 13, 21, 29, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32, 32],
    [1, 1, 1, 1,  1,  1,  1,  1,  1,  1,  2,  3,  5,  8, 13, 21, 29, 32, 32, 32, 32, 32, 32],
    [1, 1, 1, 1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  2,  3,  5,  8, 13, 21, 29, 32],
    [1, 1, 1, 1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1],
];

// Fallback indexed by the required child count alone: the smallest value of
// the growth sequence that fits it.
#[rustfmt::skip]
const SIZES_BY_REQUIRED: [u32; 33] = [
    1, 1, 2, 3, 5, 5, 8, 8, 8, 13, 13, 13, 13, 13, 21, 21, 21, 21, 21, 21, 21,
    21, 29, 29, 29, 29, 29, 29, 29, 29, 32, 32, 32,
];

/// Picks the slot capacity for a branch that must hold `required` children,
/// in a map expected to reach `expected_entries` entries, at trie `level`.
///
/// Always returns a value in `[required, 32]`. Consulted only on grow;
/// branches never shrink.
#[must_use]
pub fn allocation_size(required: u32, expected_entries: usize, level: u32) -> u32 {
    debug_assert!(required >= 1 && required <= 32);
    debug_assert!(expected_entries > 0);

    let (level, generation) = if level as usize > MAX_LEVEL {
        (MAX_LEVEL, 0)
    } else {
        (level as usize, generation_of(expected_entries))
    };

    let guess = SIZES_BY_LEVEL[level][generation as usize];
    if required > guess {
        SIZES_BY_REQUIRED[required as usize]
    } else {
        guess
    }
}

/// `ceil(log2(expected))`, clamped to the last generation column.
fn generation_of(expected: usize) -> u32 {
    if expected <= 1 {
        0
    } else {
        let generation = usize::BITS - (expected - 1).leading_zeros();
        generation.min(MAX_GENERATION)
    }
}
