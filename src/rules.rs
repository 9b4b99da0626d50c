/*!
 * Rule-based word mangling for wordlist attacks
 */

/// Fixed decorations applied by the rule set
const NUMERIC_SUFFIX: &str = "123";
const SYMBOL: &str = "!";

/// Upper-case the first character, lower-case the rest
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Expand a base word into its rule-derived variants
///
/// The base word always comes first; duplicates are dropped, so a word that
/// is already lower-case yields fewer variants.
pub fn expand(word: &str) -> Vec<String> {
    let candidates = [
        word.to_string(),
        word.to_lowercase(),
        word.to_uppercase(),
        capitalize(word),
        word.chars().rev().collect(),
        format!("{}{}", word, NUMERIC_SUFFIX),
        format!("{}{}", word, SYMBOL),
        format!("{}{}", SYMBOL, word),
    ];

    let mut variants: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}
