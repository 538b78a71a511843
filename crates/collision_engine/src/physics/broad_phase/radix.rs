//! Radix sort over `f32` keys
//!
//! Least-significant-byte radix sort producing an index permutation instead of
//! moving the values. The permutation from the previous call seeds the next
//! one: for nearly unchanged input the early sortedness check usually returns
//! it untouched, and otherwise every pass is a stable counting sort over it.

const RADIX: usize = 256;
const PASSES: usize = 4;

/// Map a float to a `u32` whose unsigned order matches the float order
///
/// Negative values have every bit flipped, non-negative values get their sign
/// bit set.
pub fn float_key(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

/// Reusable radix sorter keeping the last permutation for coherence
#[derive(Debug, Default, Clone)]
pub struct RadixSorter {
    ranks: Vec<u32>,
    scratch: Vec<u32>,
    keys: Vec<u32>,
    coherent_hits: u64,
    total_sorts: u64,
}

impl RadixSorter {
    /// Create an empty sorter
    pub fn new() -> Self {
        Self::default()
    }

    /// Indices of `values` in ascending order
    ///
    /// Equal values keep the relative order they had in the previous result.
    pub fn sort(&mut self, values: &[f32]) -> &[u32] {
        self.total_sorts += 1;
        self.keys.clear();
        self.keys.extend(values.iter().map(|v| float_key(*v)));

        if self.ranks.len() != values.len() {
            self.ranks.clear();
            self.ranks.extend(0..values.len() as u32);
        } else if self.is_sorted() {
            self.coherent_hits += 1;
            return &self.ranks;
        }

        self.scratch.resize(values.len(), 0);
        for pass in 0..PASSES {
            let shift = pass * 8;
            let mut counts = [0usize; RADIX];
            for key in &self.keys {
                counts[((key >> shift) & 0xFF) as usize] += 1;
            }

            // Every key shares this byte; the pass would not change the order
            if counts.iter().any(|count| *count == values.len()) {
                continue;
            }

            let mut offsets = [0usize; RADIX];
            let mut running = 0;
            for (offset, count) in offsets.iter_mut().zip(counts.iter()) {
                *offset = running;
                running += count;
            }

            for rank in &self.ranks {
                let byte = ((self.keys[*rank as usize] >> shift) & 0xFF) as usize;
                self.scratch[offsets[byte]] = *rank;
                offsets[byte] += 1;
            }
            std::mem::swap(&mut self.ranks, &mut self.scratch);
        }

        &self.ranks
    }

    /// Permutation produced by the last sort
    pub fn ranks(&self) -> &[u32] {
        &self.ranks
    }

    /// Fraction of sorts answered by the previous permutation
    pub fn coherence_ratio(&self) -> f32 {
        if self.total_sorts == 0 {
            0.0
        } else {
            self.coherent_hits as f32 / self.total_sorts as f32
        }
    }

    /// Forget the previous permutation
    pub fn reset(&mut self) {
        self.ranks.clear();
        self.scratch.clear();
        self.keys.clear();
        self.coherent_hits = 0;
        self.total_sorts = 0;
    }

    fn is_sorted(&self) -> bool {
        self.ranks
            .windows(2)
            .all(|pair| self.keys[pair[0] as usize] <= self.keys[pair[1] as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn reference_order(values: &[f32]) -> Vec<f32> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f32::total_cmp);
        sorted
    }

    fn apply(values: &[f32], ranks: &[u32]) -> Vec<f32> {
        ranks.iter().map(|rank| values[*rank as usize]).collect()
    }

    #[test]
    fn keys_preserve_float_order() {
        let values = [-f32::INFINITY, -10.5, -1.0, -0.0, 0.0, 1.0e-8, 3.25, f32::INFINITY];
        for pair in values.windows(2) {
            assert!(float_key(pair[0]) <= float_key(pair[1]), "{pair:?}");
        }
    }

    #[test]
    fn sorts_like_total_cmp() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut sorter = RadixSorter::new();

        for size in [0usize, 1, 2, 17, 500] {
            let values: Vec<f32> = (0..size).map(|_| rng.gen_range(-1000.0..1000.0)).collect();
            let ranks = sorter.sort(&values).to_vec();
            assert_eq!(apply(&values, &ranks), reference_order(&values));
        }
    }

    #[test]
    fn coherent_input_reuses_previous_permutation() {
        let mut sorter = RadixSorter::new();
        let values = vec![5.0, -1.0, 3.0, f32::INFINITY];
        let first = sorter.sort(&values).to_vec();

        // Small motion that keeps the order
        let moved: Vec<f32> = values.iter().map(|v| v + 0.01).collect();
        let second = sorter.sort(&moved).to_vec();

        assert_eq!(first, vec![1, 2, 0, 3]);
        assert_eq!(second, first);
        assert!(sorter.coherence_ratio() > 0.0);
    }

    #[test]
    fn reorders_after_swap() {
        let mut sorter = RadixSorter::new();
        sorter.sort(&[0.0, 1.0, 2.0]);

        let ranks = sorter.sort(&[0.0, 3.0, 2.0]).to_vec();

        assert_eq!(ranks, vec![0, 2, 1]);
    }

    #[test]
    fn equal_keys_keep_previous_order() {
        let mut sorter = RadixSorter::new();
        sorter.sort(&[2.0, 1.0, 0.0]);
        let ranks = sorter.sort(&[1.0, 1.0, 0.0]).to_vec();

        // 1 came before 0 last time and both now tie
        assert_eq!(ranks, vec![2, 1, 0]);
    }
}
