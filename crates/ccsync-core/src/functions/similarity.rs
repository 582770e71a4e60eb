//! Content similarity between declaration bodies

/// Minimum similarity for a vanished declaration to count as renamed.
pub const RENAME_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Character-level edit distance (insertions, deletions, substitutions).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single row, updated in place
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, a_char) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            let next = (row[j + 1] + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = row[j + 1];
            row[j + 1] = next;
        }
    }

    row[b.len()]
}

/// `1 - distance / longest`, in `[0, 1]`.
///
/// Two empty bodies have no content to compare and score `0.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "", 0)]
    #[case("abc", "", 3)]
    #[case("", "abc", 3)]
    #[case("kitten", "sitting", 3)]
    #[case("flaw", "lawn", 2)]
    #[case("héllo", "hello", 1)]
    fn known_distances(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
    }

    #[test]
    fn identical_bodies_are_fully_similar() {
        assert_eq!(similarity("print('a');", "print('a');"), 1.0);
    }

    #[test]
    fn empty_bodies_never_match() {
        assert_eq!(similarity("", ""), 0.0);
        assert!(similarity("", "") < RENAME_SIMILARITY_THRESHOLD);
    }

    #[test]
    fn small_edit_stays_above_threshold() {
        let before = "print('testFunctionA');";
        let after = "print('testFunctionANew');";
        assert!(similarity(before, after) >= RENAME_SIMILARITY_THRESHOLD);
    }

    proptest! {
        #[test]
        fn distance_is_symmetric(a in "[a-z ]{0,12}", b in "[a-z ]{0,12}") {
            prop_assert_eq!(levenshtein(&a, &b), levenshtein(&b, &a));
        }

        #[test]
        fn similarity_is_bounded(a in ".{0,16}", b in ".{0,16}") {
            let score = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
