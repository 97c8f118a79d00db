//! Label to search-query normalization.

/// Characters the training set uses in place of spaces.
const SEPARATORS: [char; 2] = ['_', '-'];

/// Turn a classifier label into a human-readable search phrase.
///
/// Separators become spaces, whitespace runs collapse to one space, and the
/// result is trimmed, so `"hot_dog"` and `" hot  dog "` both give `"hot dog"`.
/// Applying it twice gives the same result as applying it once.
pub fn normalize(label: &str) -> String {
    label
        .split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
