//! Gender-aware post-filtering of retrieval results.

use crate::intent::{contains_any, MEN_TERMS};
use crate::types::{Gender, RetrievalResult};

/// Title vocabularies. These extend the query-side tables with the singular
/// forms that show up in product titles but rarely in queries.
pub(crate) const MALE_TITLE_TERMS: &[&str] = &[
    "men", "men's", "mens", "male", "boy", "boys", "guy", "guys", "man",
];
pub(crate) const FEMALE_TITLE_TERMS: &[&str] = &[
    "women", "women's", "womens", "female", "girl", "girls", "lady", "ladies", "woman",
];

fn title_terms(gender: Gender) -> &'static [&'static str] {
    match gender {
        Gender::Men => MALE_TITLE_TERMS,
        Gender::Women => FEMALE_TITLE_TERMS,
        // Unisex never reaches the strict filter; fall back to the query
        // vocabularies so the helper stays total.
        Gender::Unisex => MEN_TERMS,
    }
}

/// Whether a lowercased title mentions the given gender at all.
pub(crate) fn title_mentions(title: &str, gender: Gender) -> bool {
    contains_any(title, title_terms(gender))
}

/// Strict mutual exclusivity: at least one target-gender term and none from
/// the opposite vocabulary. Titles mentioning both genders fail.
pub(crate) fn title_matches_exclusively(title: &str, gender: Gender) -> bool {
    let Some(opposite) = gender.opposite() else {
        return true;
    };
    title_mentions(title, gender) && !title_mentions(title, opposite)
}

/// Filter retrieval results by gender, padding back unfiltered candidates
/// when the strict filter leaves fewer than `top_k`.
///
/// Padding appends the remaining results in their original retrieval order,
/// regardless of gender, and stops once `top_k` is reached or the pool is
/// exhausted. Availability beats filter strictness here on purpose; do not
/// tighten it. With no gender (or unisex) this is a pass-through.
pub fn filter_by_gender(
    results: Vec<RetrievalResult>,
    gender: Option<Gender>,
    top_k: usize,
) -> Vec<RetrievalResult> {
    let Some(gender) = gender else {
        return results;
    };
    if gender == Gender::Unisex {
        return results;
    }

    let mut matched: Vec<RetrievalResult> = Vec::new();
    let mut rest: Vec<RetrievalResult> = Vec::new();
    for result in results {
        let title = result.product.title.to_lowercase();
        if title_matches_exclusively(&title, gender) {
            matched.push(result);
        } else {
            rest.push(result);
        }
    }

    if matched.len() < top_k {
        let needed = top_k - matched.len();
        tracing::debug!(
            gender = gender.as_str(),
            matched = matched.len(),
            padding = needed.min(rest.len()),
            "gender filter under top_k; padding with unfiltered results"
        );
        matched.extend(rest.into_iter().take(needed));
    }
    matched
}
