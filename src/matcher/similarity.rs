//! Content similarity between two node bodies
//!
//! The score is the Ratcliff/Obershelp ratio `2 * M / T`, where `M` is the
//! number of characters in matching blocks found by repeatedly taking the
//! longest common substring and recursing on both sides of it, and `T` is
//! the total number of characters in both strings.

/// Similarity of two texts in `[0.0, 1.0]`
///
/// Returns 0.0 when either text is empty, or when the shorter text is less
/// than `length_ratio_cutoff` times the length of the longer one, without
/// running the alignment.
///
/// # Example
///
/// ```ignore
/// assert_eq!(similarity("abcd", "abcd", 0.3), 1.0);
/// assert_eq!(similarity("a", "a very long sentence", 0.3), 0.0);
/// ```
pub fn similarity(text1: &str, text2: &str, length_ratio_cutoff: f64) -> f64 {
    if text1.is_empty() || text2.is_empty() {
        return 0.0;
    }

    let a: Vec<char> = text1.chars().collect();
    let b: Vec<char> = text2.chars().collect();

    let shorter = a.len().min(b.len()) as f64;
    let longer = a.len().max(b.len()) as f64;
    if shorter / longer < length_ratio_cutoff {
        return 0.0;
    }

    let matched = matching_characters(&a, &b);
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

/// Total size of the matching blocks between `a` and `b`
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = find_longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest block `a[i..i+size] == b[j..j+size]` inside the given window
///
/// Ties go to the block starting earliest in `a`, then earliest in `b`.
fn find_longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo;

    // run[k + 1] = length of the common run ending at a[i], b[blo + k]
    let mut previous = vec![0usize; width + 1];
    let mut current = vec![0usize; width + 1];

    for i in alo..ahi {
        for k in 0..width {
            let j = blo + k;
            current[k + 1] = if a[i] == b[j] { previous[k] + 1 } else { 0 };
            let run = current[k + 1];
            if run > best_size {
                best_i = i + 1 - run;
                best_j = j + 1 - run;
                best_size = run;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUTOFF: f64 = 0.3;

    #[test]
    fn test_identical_texts() {
        assert_eq!(similarity("## Overview", "## Overview", CUTOFF), 1.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(similarity("", "abc", CUTOFF), 0.0);
        assert_eq!(similarity("abc", "", CUTOFF), 0.0);
        assert_eq!(similarity("", "", CUTOFF), 0.0);
    }

    #[test]
    fn test_length_ratio_early_exit() {
        // 2 vs 10 characters: ratio 0.2 < 0.3
        assert_eq!(similarity("ab", "abcdefghij", CUTOFF), 0.0);
    }

    #[test]
    fn test_known_ratios() {
        // common block "bcd" => 2 * 3 / 8
        assert!((similarity("abcd", "bcde", CUTOFF) - 0.75).abs() < 1e-9);
        // common block "## " => 2 * 3 / 16
        assert!((similarity("## Overview", "## 概要", CUTOFF) - 0.375).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_texts() {
        assert_eq!(similarity("abc", "xyz", CUTOFF), 0.0);
    }

    #[test]
    fn test_recursion_finds_blocks_on_both_sides() {
        // blocks "ab", "cd" and "ef"
        let score = similarity("ab-cd-ef", "abXcdYef", CUTOFF);
        assert!((score - 2.0 * 6.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_longest_match_prefers_earliest() {
        let a: Vec<char> = "xyab".chars().collect();
        let b: Vec<char> = "abxy".chars().collect();
        assert_eq!(find_longest_match(&a, &b, 0, 4, 0, 4), (0, 2, 2));
    }

    #[test]
    fn test_small_edit_scores_high() {
        let s1 = similarity("Installation guide", "Installation guides", CUTOFF);
        let s2 = similarity("Installation guides", "Installation guide", CUTOFF);
        assert!((s1 - s2).abs() < 1e-9);
        assert!(s1 > 0.95);
    }

    #[test]
    fn test_long_texts() {
        let source = "The quick brown fox jumps over the lazy dog. ".repeat(6);
        let mut edited = source.clone();
        edited.push_str("One more sentence.");
        let score = similarity(&source, &edited, CUTOFF);
        assert!(score > 0.9 && score < 1.0);
    }

    #[test]
    fn test_deterministic() {
        let a = "Configure the server before the first start.";
        let b = "Configurez le serveur avant le premier démarrage.";
        let first = similarity(a, b, CUTOFF);
        for _ in 0..5 {
            assert_eq!(similarity(a, b, CUTOFF), first);
        }
    }
}
