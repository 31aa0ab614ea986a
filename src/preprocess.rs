//! Query/document text preparation before embedding.

/// Contraction and symbol rewrites applied before embedding. Order matters:
/// possessives are rewritten before the symbol substitutions touch the text.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("men's", "mens"),
    ("women's", "womens"),
    ("children's", "childrens"),
    ("&", "and"),
    ("+", "and"),
    ("/", " "),
];

/// Word budget for a single embedding input. Overlong texts keep the first
/// and last halves so both the leading intent and trailing modifiers (size,
/// color) survive, instead of naive head truncation.
pub(crate) const MAX_EMBED_WORDS: usize = 256;

/// Trim, collapse whitespace, normalize contractions/symbols, and enforce
/// the word budget.
pub(crate) fn preprocess(text: &str) -> String {
    let mut processed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    for (old, new) in REPLACEMENTS {
        if processed.contains(old) {
            processed = processed.replace(old, new);
        }
    }

    let words: Vec<&str> = processed.split_whitespace().collect();
    if words.len() <= MAX_EMBED_WORDS {
        return words.join(" ");
    }

    let half = MAX_EMBED_WORDS / 2;
    let mut kept: Vec<&str> = Vec::with_capacity(MAX_EMBED_WORDS);
    kept.extend_from_slice(&words[..half]);
    kept.extend_from_slice(&words[words.len() - half..]);
    kept.join(" ")
}
