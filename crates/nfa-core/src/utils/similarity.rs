//! Fuzzy matching of model handles against marketplace model names.
//!
//! Scores are case-insensitive, computed over Unicode scalar values, and
//! rounded to one decimal so that near-identical spellings ("gpt4" vs
//! "gpt-4") compare equal to a fixed threshold.

/// Similarity of two strings in `[0.0, 1.0]`, rounded to the nearest 0.1.
///
/// Both empty scores 1.0, exactly one empty scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    if a.is_empty() || b.is_empty() {
        return if a.is_empty() && b.is_empty() { 1.0 } else { 0.0 };
    }
    if a == b {
        return 1.0;
    }

    let distance = levenshtein(&a, &b);
    let max_len = a.chars().count().max(b.chars().count());

    #[allow(clippy::cast_precision_loss)] // model names are short
    let score = 1.0 - distance as f64 / max_len as f64;
    (score * 10.0 + 0.5).floor() / 10.0
}

/// Case-insensitive Levenshtein distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two-row dynamic programming table.
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            let deletion = previous[j + 1] + 1;
            let insertion = current[j] + 1;
            current[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
