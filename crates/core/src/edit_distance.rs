//! Levenshtein edit distance over Unicode scalar values.

/// Returns the minimum number of single-character insertions, deletions and
/// substitutions needed to turn `a` into `b`.
///
/// Runs in `O(len(a) * len(b))` time and keeps a single row of the DP table
/// sized to the shorter input.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let substitution = prev[j] + usize::from(lc != sc);
            let insertion = prev[j + 1] + 1;
            let deletion = curr[j] + 1;
            curr[j + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_yield_other_length() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("", "sitz"), 4);
        assert_eq!(levenshtein("bark", ""), 4);
    }

    #[test]
    fn test_known_distances() {
        assert_eq!(levenshtein("sitz", "sitz"), 0);
        assert_eq!(levenshtein("sitzz", "sitz"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
    }

    #[test]
    fn test_transposition_counts_as_two() {
        assert_eq!(levenshtein("ab", "ba"), 2);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        assert_eq!(levenshtein("zurück", "zuruck"), 1);
        assert_eq!(levenshtein("rückwärts", "rueckwaerts"), 4);
    }

    #[test]
    fn test_symmetric() {
        let words = ["", "sit", "sitz", "steh auf", "platz", "liegestütz", "howl"];
        for a in words {
            for b in words {
                assert_eq!(levenshtein(a, b), levenshtein(b, a), "{a:?} vs {b:?}");
            }
        }
    }
}
