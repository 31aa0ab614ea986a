//! Query intent analysis.
//!
//! A pure string scan over fixed vocabularies. The tables are declared here
//! rather than buried in control flow so each one can be tested and extended
//! on its own. Matching is case-insensitive and word-boundary-aware; each
//! single-valued category takes the first vocabulary entry that matches, in
//! declared order. This module never errors.

use serde::Serialize;

use crate::types::Gender;

pub(crate) const MEN_TERMS: &[&str] = &[
    "men", "men's", "mens", "male", "boy", "boys", "guy", "guys", "gentlemen",
];
pub(crate) const WOMEN_TERMS: &[&str] = &[
    "women", "women's", "womens", "female", "girl", "girls", "lady", "ladies",
];
const UNISEX_TERMS: &[&str] = &["unisex", "both", "all"];

const OCCASIONS: &[(Occasion, &[&str])] = &[
    (Occasion::Beach, &["beach", "swim", "pool", "vacation", "resort", "tropical"]),
    (Occasion::Wedding, &["wedding", "bridal", "formal", "ceremony", "reception"]),
    (Occasion::Office, &["office", "work", "professional", "business", "corporate"]),
    (Occasion::Sports, &["sports", "gym", "workout", "running", "exercise", "athletic"]),
    (Occasion::Casual, &["casual", "everyday", "comfort", "relaxed", "lounge"]),
    (Occasion::Party, &["party", "nightclub", "evening", "celebration"]),
    (Occasion::Travel, &["travel", "airport", "flight", "journey"]),
];

const SEASONS: &[(Season, &[&str])] = &[
    (Season::Summer, &["summer", "hot", "warm", "sunny", "heat"]),
    (Season::Winter, &["winter", "cold", "snow", "freezing", "chilly"]),
    (Season::Spring, &["spring", "blossom", "fresh", "light"]),
    (Season::Fall, &["fall", "autumn", "cool", "crisp"]),
];

const PRICE_RANGES: &[(PriceRange, &[&str])] = &[
    (PriceRange::Budget, &["cheap", "budget", "affordable", "inexpensive", "low cost"]),
    (PriceRange::Premium, &["expensive", "luxury", "premium", "high end", "designer"]),
];

const RATING_TERMS: &[&str] = &[
    "rated", "rating", "ratings", "stars", "review", "reviews", "popular", "best selling",
];

pub(crate) const BRANDS: &[&str] = &["nike", "adidas", "zara", "h&m", "levi", "gucci", "prada"];

pub(crate) const COLORS: &[&str] = &[
    "red", "blue", "green", "black", "white", "yellow", "pink", "purple",
];

pub(crate) const STYLES: &[&str] = &[
    "vintage", "modern", "classic", "trendy", "bohemian", "minimalist",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    Beach,
    Wedding,
    Office,
    Sports,
    Casual,
    Party,
    Travel,
}

impl Occasion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occasion::Beach => "beach",
            Occasion::Wedding => "wedding",
            Occasion::Office => "office",
            Occasion::Sports => "sports",
            Occasion::Casual => "casual",
            Occasion::Party => "party",
            Occasion::Travel => "travel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Summer,
    Winter,
    Spring,
    Fall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceRange {
    Budget,
    Premium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// Structured signals extracted from one query string. Recomputed per
/// request, never cached across query strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub gender: Option<Gender>,
    pub occasion: Option<Occasion>,
    pub season: Option<Season>,
    pub price_range: Option<PriceRange>,
    pub rating_sensitive: bool,
    pub brands: Vec<&'static str>,
    pub colors: Vec<&'static str>,
    pub styles: Vec<&'static str>,
    pub complexity: Complexity,
}

/// Case-insensitive, word-boundary-aware term check. `haystack` must
/// already be lowercased; vocabulary terms are declared lowercase.
pub(crate) fn contains_term(haystack: &str, term: &str) -> bool {
    let bytes = haystack.as_bytes();
    for (start, _) in haystack.match_indices(term) {
        let end = start + term.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

pub(crate) fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| contains_term(haystack, t))
}

fn detect_gender(query: &str) -> Option<Gender> {
    // Declared-order precedence: men, women, unisex.
    if contains_any(query, MEN_TERMS) {
        Some(Gender::Men)
    } else if contains_any(query, WOMEN_TERMS) {
        Some(Gender::Women)
    } else if contains_any(query, UNISEX_TERMS) {
        Some(Gender::Unisex)
    } else {
        None
    }
}

/// Analyze a free-text query into structured signals.
pub fn analyze(text: &str) -> Intent {
    let query = text.trim().to_lowercase();

    let gender = detect_gender(&query);
    let occasion = OCCASIONS
        .iter()
        .find(|(_, terms)| contains_any(&query, terms))
        .map(|(o, _)| *o);
    let season = SEASONS
        .iter()
        .find(|(_, terms)| contains_any(&query, terms))
        .map(|(s, _)| *s);
    let price_range = PRICE_RANGES
        .iter()
        .find(|(_, terms)| contains_any(&query, terms))
        .map(|(p, _)| *p);
    let rating_sensitive = contains_any(&query, RATING_TERMS);

    let brands: Vec<&'static str> = BRANDS
        .iter()
        .copied()
        .filter(|b| contains_term(&query, b))
        .collect();
    let colors: Vec<&'static str> = COLORS
        .iter()
        .copied()
        .filter(|c| contains_term(&query, c))
        .collect();
    let styles: Vec<&'static str> = STYLES
        .iter()
        .copied()
        .filter(|s| contains_term(&query, s))
        .collect();

    let word_count = text.split_whitespace().count();
    let complexity = if word_count > 4 || (gender.is_some() && occasion.is_some()) {
        Complexity::Complex
    } else if word_count > 2 {
        Complexity::Medium
    } else {
        Complexity::Simple
    };

    Intent {
        gender,
        occasion,
        season,
        price_range,
        rating_sensitive,
        brands,
        colors,
        styles,
        complexity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_matching_rejects_substrings() {
        assert!(contains_term("men's running shoes", "men"));
        assert!(contains_term("shoes for men", "men"));
        // "men" inside "women" must not match.
        assert!(!contains_term("women's dress", "men"));
        assert!(!contains_term("mentor gift", "men"));
    }

    #[test]
    fn boundary_matching_handles_phrases_and_symbols() {
        assert!(contains_term("a low cost option", "low cost"));
        assert!(contains_term("h&m jacket", "h&m"));
        assert!(contains_term("levi's jeans", "levi"));
    }

    #[test]
    fn gender_detection_declared_order() {
        assert_eq!(analyze("men's running shoes").gender, Some(Gender::Men));
        assert_eq!(analyze("dress for ladies").gender, Some(Gender::Women));
        assert_eq!(analyze("unisex perfume").gender, Some(Gender::Unisex));
        assert_eq!(analyze("running shoes").gender, None);
        // Both vocabularies present: men wins by declared order.
        assert_eq!(analyze("men and women hats").gender, Some(Gender::Men));
    }

    #[test]
    fn occasion_first_match_wins() {
        assert_eq!(analyze("beach wedding outfit").occasion, Some(Occasion::Beach));
        assert_eq!(analyze("office wear").occasion, Some(Occasion::Office));
        assert_eq!(analyze("plain shirt").occasion, None);
    }

    #[test]
    fn season_and_price_signals() {
        let intent = analyze("cheap summer dress");
        assert_eq!(intent.season, Some(Season::Summer));
        assert_eq!(intent.price_range, Some(PriceRange::Budget));

        let intent = analyze("luxury winter coat");
        assert_eq!(intent.season, Some(Season::Winter));
        assert_eq!(intent.price_range, Some(PriceRange::Premium));
    }

    #[test]
    fn rating_sensitivity() {
        assert!(analyze("best rated sneakers").rating_sensitive);
        assert!(analyze("popular hoodies").rating_sensitive);
        assert!(analyze("shoes with good reviews").rating_sensitive);
        assert!(!analyze("red sneakers").rating_sensitive);
    }

    #[test]
    fn brands_colors_styles_collect_all_matches() {
        let intent = analyze("vintage red nike or adidas sneakers");
        assert_eq!(intent.brands, vec!["nike", "adidas"]);
        assert_eq!(intent.colors, vec!["red"]);
        assert_eq!(intent.styles, vec!["vintage"]);
    }

    #[test]
    fn complexity_rules() {
        assert_eq!(analyze("shoes").complexity, Complexity::Simple);
        assert_eq!(analyze("red shoes").complexity, Complexity::Simple);
        assert_eq!(analyze("bright red shoes").complexity, Complexity::Medium);
        assert_eq!(
            analyze("bright red running shoes today").complexity,
            Complexity::Complex
        );
        // Gender + occasion forces complex even under the word threshold.
        assert_eq!(analyze("men's beach wear").complexity, Complexity::Complex);
    }

    #[test]
    fn analysis_is_case_insensitive() {
        let intent = analyze("MEN'S NIKE Running Shoes");
        assert_eq!(intent.gender, Some(Gender::Men));
        assert_eq!(intent.brands, vec!["nike"]);
        assert_eq!(intent.occasion, Some(Occasion::Sports));
    }

    #[test]
    fn empty_query_yields_empty_intent() {
        let intent = analyze("");
        assert_eq!(intent.gender, None);
        assert_eq!(intent.occasion, None);
        assert!(!intent.rating_sensitive);
        assert_eq!(intent.complexity, Complexity::Simple);
    }
}
