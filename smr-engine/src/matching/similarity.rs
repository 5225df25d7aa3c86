//! Ratcliff/Obershelp sequence similarity
//!
//! The ratio is `2 * M / T` where `M` counts characters in matching blocks
//! and `T` is the combined length. Blocks are found by taking the longest
//! common run (earliest in the first string, then earliest in the second)
//! and recursing on the unmatched text to either side of it.

/// Case-insensitive similarity ratio in `[0, 1]`
///
/// Two empty strings compare as identical (1.0).
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // Block discovery depends on argument order; canonical order keeps the
    // ratio symmetric.
    let (first, second) = if a <= b { (&a, &b) } else { (&b, &a) };
    let matched = matched_chars(first, second);

    2.0 * matched as f64 / total as f64
}

/// Ratio rounded to three decimals
///
/// Federated lookups compare rounded ratios against their thresholds.
pub fn rounded_ratio(a: &str, b: &str) -> f64 {
    (sequence_ratio(a, b) * 1000.0).round() / 1000.0
}

/// Total size of all matching blocks between `a` and `b`
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, alo, ahi, b, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;

        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common run inside `a[alo..ahi]` and `b[blo..bhi]`
///
/// Returns `(start_in_a, start_in_b, length)`. Ties go to the run starting
/// earliest in `a`, then earliest in `b`.
fn longest_match(
    a: &[char],
    alo: usize,
    ahi: usize,
    b: &[char],
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);

    // run_len[k + 1] = length of the common run ending at a[i - 1], b[blo + k]
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in alo..ahi {
        for k in 0..width {
            let j = blo + k;
            if a[i] == b[j] {
                let run = previous[k] + 1;
                current[k + 1] = run;
                if run > best.2 {
                    best = (i + 1 - run, j + 1 - run, run);
                }
            } else {
                current[k + 1] = 0;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}
