// src/dedup/similarity.rs
//! Headline similarity: matching-block ratio in [0.0, 1.0].
//!
//! Both inputs are lowercased and trimmed, then aligned by repeatedly taking the
//! longest common block and recursing on the unmatched left and right remainders
//! (Ratcliff/Obershelp). The score is `2 * M / (len(a) + len(b))` where `M` counts the
//! characters covered by matching blocks.
//!
//! Sequences of 200+ characters drop "popular" characters (more than 1% + 1 occurrences)
//! from the block index before matching. Headlines are almost always below that size.
//!
//! The 0.85 / 0.70 dedup thresholds are calibrated against this exact ratio.

use std::collections::HashMap;

/// Length of `b` from which popular characters are ignored by the block index.
const POPULAR_MIN_LEN: usize = 200;

/// Case-insensitive similarity of two headlines.
///
/// Returns 1.0 for identical strings and 0.0 when either side is empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().trim().chars().collect();
    let b: Vec<char> = b.to_lowercase().trim().chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let matched = BlockMatcher::new(&a, &b).matched_chars();
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// char -> ascending positions in `b`
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }
        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }
        Self { a, b, b2j }
    }

    /// Total size of all matching blocks.
    fn matched_chars(&self) -> usize {
        let mut total = 0usize;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_block(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }
        total
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given ranges; earliest in `a`
    /// (then in `b`) wins ties.
    fn longest_block(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0usize);

        // j -> length of the block ending at (i - 1, j)
        let mut run_len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_run: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run.insert(j, k);
                    if k > best_k {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_k = k;
                    }
                }
            }
            run_len = next_run;
        }

        // Popular characters are missing from the index; grow the block over them.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_k += 1;
        }
        while best_i + best_k < ahi
            && best_j + best_k < bhi
            && self.a[best_i + best_k] == self.b[best_j + best_k]
        {
            best_k += 1;
        }

        (best_i, best_j, best_k)
    }
}
