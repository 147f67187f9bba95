//! Binary encoding of variable representations.
//!
//! Binary-coded operators work on a fixed-width unsigned integer per
//! variable. For a variable with representation range `r` and decimal
//! precision `p`, the number of grid steps is `round(r * 10^p)` and the
//! variable takes `ceil(log2(steps + 1))` bits (at most 63). A
//! representation maps to `round((rep - min) * 10^p)`.
//!
//! Decoding a word that lies past the last grid step yields a
//! representation above the variable's upper bound. Operators that flip
//! arbitrary bits can therefore produce invalid values and must report so.
//!
//! Bit widths are cached together with the target's metadata revision.
//! [`BitManipulator::refresh`] recomputes them whenever bounds or precision
//! changed since they were computed.

use super::types::Design;
use crate::space::DesignTarget;
use std::sync::Arc;

/// Largest number of bits one variable may use.
pub const MAX_BITS_PER_VARIABLE: u32 = 63;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Layout {
    min_rep: f64,
    /// Grid steps per unit of representation (0 for a fixed variable).
    scale: f64,
    bits: u32,
}

/// Converts designs to and from per-variable bit words.
#[derive(Debug, Clone)]
pub struct BitManipulator {
    target: Arc<DesignTarget>,
    revision: u64,
    layout: Vec<Layout>,
}

impl BitManipulator {
    pub fn new(target: &Arc<DesignTarget>) -> Self {
        let mut manip = Self {
            target: Arc::clone(target),
            revision: target.revision(),
            layout: Vec::new(),
        };
        manip.recompute();
        manip
    }

    /// Whether the target's metadata changed since the widths were cached.
    pub fn is_stale(&self) -> bool {
        self.revision != self.target.revision()
    }

    /// Recomputes the bit widths if they are stale. Returns whether it did.
    pub fn refresh(&mut self) -> bool {
        if !self.is_stale() {
            return false;
        }
        log::debug!(
            "bit layout stale (revision {} -> {}), recomputing",
            self.revision,
            self.target.revision()
        );
        self.recompute();
        true
    }

    fn recompute(&mut self) {
        self.revision = self.target.revision();
        let vars = self.target.variables();
        self.layout = vars
            .iter()
            .map(|v| {
                let range = v.rep_range();
                let resolution = 10f64.powi(v.rep_precision());
                let steps = (range * resolution).round();
                let max_steps = ((1u64 << MAX_BITS_PER_VARIABLE) - 1) as f64;
                if steps.is_nan() || steps <= 0.0 {
                    return Layout {
                        min_rep: v.min_rep(),
                        scale: 0.0,
                        bits: 0,
                    };
                }
                // Too fine a grid: coarsen it to the widest word.
                let (steps, scale) = if steps > max_steps {
                    (max_steps, max_steps / range)
                } else {
                    (steps, resolution)
                };
                let steps = steps as u64;
                Layout {
                    min_rep: v.min_rep(),
                    scale,
                    bits: (u64::BITS - steps.leading_zeros()).min(MAX_BITS_PER_VARIABLE),
                }
            })
            .collect();
    }

    /// Number of variables covered.
    pub fn variable_count(&self) -> usize {
        self.layout.len()
    }

    /// Bits used by variable `index`.
    pub fn bits_for(&self, index: usize) -> u32 {
        self.layout[index].bits
    }

    /// Total bits of a whole design.
    pub fn total_bits(&self) -> u64 {
        self.layout.iter().map(|l| u64::from(l.bits)).sum()
    }

    /// Mask covering the bits of variable `index`.
    pub fn mask_for(&self, index: usize) -> u64 {
        match self.layout[index].bits {
            0 => 0,
            b => u64::MAX >> (64 - b),
        }
    }

    /// Encodes one representation.
    pub fn to_word(&self, index: usize, rep: f64) -> u64 {
        let l = &self.layout[index];
        if l.bits == 0 || !rep.is_finite() {
            return 0;
        }
        let steps = ((rep - l.min_rep) * l.scale).round().max(0.0);
        (steps as u64).min(self.mask_for(index))
    }

    /// Decodes one word back into a representation.
    pub fn to_rep(&self, index: usize, word: u64) -> f64 {
        let l = &self.layout[index];
        if l.scale == 0.0 {
            return l.min_rep;
        }
        l.min_rep + (word & self.mask_for(index)) as f64 / l.scale
    }

    /// Encodes every variable of a design.
    pub fn encode(&self, design: &Design) -> Vec<u64> {
        design
            .variables()
            .iter()
            .enumerate()
            .map(|(i, &rep)| self.to_word(i, rep))
            .collect()
    }

    /// Writes decoded words into a design's variables.
    ///
    /// # Panics
    /// Panics if `words.len()` differs from the variable count.
    pub fn decode_into(&self, words: &[u64], design: &mut Design) {
        assert_eq!(words.len(), self.layout.len(), "word count mismatch");
        for (i, &w) in words.iter().enumerate() {
            design.set_variable_rep(i, self.to_rep(i, w));
        }
    }

    /// Maps a design-wide bit position to `(variable, bit within variable)`.
    pub fn locate(&self, position: u64) -> Option<(usize, u32)> {
        let mut remaining = position;
        for (i, l) in self.layout.iter().enumerate() {
            let bits = u64::from(l.bits);
            if remaining < bits {
                return Some((i, remaining as u32));
            }
            remaining -= bits;
        }
        None
    }

    /// Flips the bit at a design-wide position. Returns `false` if out of range.
    pub fn flip_bit(&self, words: &mut [u64], position: u64) -> bool {
        match self.locate(position) {
            Some((var, bit)) => {
                words[var] ^= 1u64 << bit;
                true
            }
            None => false,
        }
    }

    /// Reads the bit at a design-wide position.
    pub fn bit(&self, words: &[u64], position: u64) -> Option<bool> {
        self.locate(position)
            .map(|(var, bit)| words[var] >> bit & 1 == 1)
    }

    /// N-point crossover of two encoded designs at the given sorted,
    /// design-wide cut positions. Bits before the first cut come from the
    /// first parent in `child_a` and from the second parent in `child_b`;
    /// each cut swaps the sources.
    pub fn cross(&self, a: &[u64], b: &[u64], cuts: &[u64]) -> (Vec<u64>, Vec<u64>) {
        let mut child_a = a.to_vec();
        let mut child_b = b.to_vec();
        let mut swapped = false;
        let mut cut_iter = cuts.iter().peekable();
        let mut position = 0u64;
        for (var, l) in self.layout.iter().enumerate() {
            for bit in 0..l.bits {
                while cut_iter.peek().is_some_and(|&&c| c <= position) {
                    swapped = !swapped;
                    cut_iter.next();
                }
                if swapped {
                    let mask = 1u64 << bit;
                    child_a[var] = (child_a[var] & !mask) | (b[var] & mask);
                    child_b[var] = (child_b[var] & !mask) | (a[var] & mask);
                }
                position += 1;
            }
        }
        (child_a, child_b)
    }
}
