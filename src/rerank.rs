//! Cross-encoder reranking with business-rule adjustments and explanations.
//!
//! The reranker builds a weighted scoring text per candidate, scores all
//! (query, text) pairs in one capability call, applies deterministic
//! intent-derived boosts and drops, and attaches a human-readable
//! explanation to every surviving result.

use std::sync::Arc;

use crate::capability::CrossEncoder;
use crate::error::CapabilityError;
use crate::filter::title_mentions;
use crate::intent::{contains_term, Intent, Occasion, PriceRange};
use crate::types::{Gender, Product, RankedResult, RetrievalResult};

const SENTIMENT_WORDS: &[&str] = &[
    "best", "perfect", "ideal", "great", "excellent", "premium", "quality", "comfortable",
    "stylish", "fashion", "elegant", "beautiful", "amazing", "wonderful", "superb",
];

const MATERIAL_WORDS: &[&str] = &["cotton", "polyester", "silk", "wool", "linen", "fabric"];
const STYLE_FEATURE_WORDS: &[&str] = &["style", "design", "fit", "fashion", "look"];
const QUALITY_LINE_WORDS: &[&str] = &["comfort", "quality", "perfect", "ideal", "great", "excellent"];

const MAX_FEATURES: usize = 8;
const MAX_DESCRIPTION_LINES: usize = 3;
const MAX_SUB_CATEGORIES: usize = 3;
const MAX_EXPLANATION_REASONS: usize = 2;

const GENDER_BOOST: f32 = 1.15;
const RATING_BOOST: f32 = 1.10;
const BRAND_BOOST: f32 = 1.12;
const COLOR_BOOST: f32 = 1.08;
const SCORE_CAP: f32 = 1.0;

/// Title keywords that justify an "ideal for {occasion}" explanation.
const OCCASION_TITLE_TERMS: &[(Occasion, &[&str])] = &[
    (Occasion::Beach, &["beach", "swim", "summer", "vacation", "tropical"]),
    (Occasion::Wedding, &["wedding", "formal", "elegant", "dress", "bridal"]),
    (Occasion::Office, &["office", "professional", "business", "work", "corporate"]),
    (Occasion::Sports, &["sports", "athletic", "gym", "running", "training"]),
    (Occasion::Casual, &["casual", "everyday", "comfort", "relaxed"]),
    (Occasion::Party, &["party", "evening", "night", "celebration"]),
    (Occasion::Travel, &["travel", "comfort", "airport", "journey"]),
];

pub struct Reranker {
    cross_encoder: Arc<dyn CrossEncoder>,
}

impl Reranker {
    pub fn new(cross_encoder: Arc<dyn CrossEncoder>) -> Self {
        Self { cross_encoder }
    }

    /// Score, adjust, explain, and rank the candidates. Returns at most
    /// `max_results` entries sorted by descending final score (ties keep
    /// retrieval order), with dense 1-based ranks.
    ///
    /// A cross-encoder failure propagates; the orchestrator treats it as
    /// recoverable and serves unranked results instead.
    pub fn rerank(
        &self,
        query: &str,
        intent: &Intent,
        candidates: &[RetrievalResult],
        max_results: usize,
    ) -> Result<Vec<RankedResult>, CapabilityError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(count = candidates.len(), query, "reranking candidates");

        let texts: Vec<String> = candidates
            .iter()
            .map(|c| scoring_text(&c.product))
            .collect();
        let scores = self.cross_encoder.score(query, &texts)?;
        if scores.len() != candidates.len() {
            return Err(CapabilityError::CountMismatch {
                expected: candidates.len(),
                actual: scores.len(),
            });
        }

        let mut ranked: Vec<RankedResult> = Vec::with_capacity(candidates.len());
        for (candidate, raw_score) in candidates.iter().zip(scores) {
            let product = &candidate.product;
            if should_drop(product, intent) {
                continue;
            }

            let relevance = apply_boosts(raw_score, product, intent);
            let boost_note = if relevance != raw_score {
                Some(format!("boosted from {raw_score:.3}"))
            } else {
                None
            };
            let explanation = explain(query, product, relevance, intent);

            ranked.push(RankedResult {
                product: product.clone(),
                relevance,
                rank: 0, // assigned after the sort
                explanation,
                boost_note,
            });
        }

        // Stable sort: ties keep original retrieval order.
        ranked.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(max_results);
        for (i, result) in ranked.iter_mut().enumerate() {
            result.rank = i + 1;
        }
        Ok(ranked)
    }
}

/// Post-scoring business-rule drops: strict gender exclusivity and explicit
/// price-range violations. Products without a price are never price-dropped.
fn should_drop(product: &Product, intent: &Intent) -> bool {
    if let Some(opposite) = intent.gender.and_then(|g| g.opposite()) {
        if title_mentions(&product.title.to_lowercase(), opposite) {
            return true;
        }
    }

    if let (Some(range), Some(price)) = (intent.price_range, product.price) {
        match range {
            PriceRange::Budget if price > 50.0 => return true,
            PriceRange::Premium if price < 30.0 => return true,
            _ => {}
        }
    }
    false
}

/// Multiplicative boosts applied in sequence, capped at 1.0.
fn apply_boosts(score: f32, product: &Product, intent: &Intent) -> f32 {
    let title = product.title.to_lowercase();
    let mut score = score;

    if let Some(gender) = intent.gender {
        if gender != Gender::Unisex && title_mentions(&title, gender) {
            score *= GENDER_BOOST;
        }
    }
    if intent.rating_sensitive && product.rating.is_some_and(|r| r >= 4.0) {
        score *= RATING_BOOST;
    }
    if !intent.brands.is_empty() {
        if let Some(brand) = &product.brand {
            let brand = brand.to_lowercase();
            if intent.brands.iter().any(|b| brand.contains(b)) {
                score *= BRAND_BOOST;
            }
        }
    }
    if !intent.colors.is_empty() && intent.colors.iter().any(|c| contains_term(&title, c)) {
        score *= COLOR_BOOST;
    }

    score.min(SCORE_CAP)
}

/// Assemble the weighted scoring text the cross-encoder sees.
pub(crate) fn scoring_text(product: &Product) -> String {
    let title = &product.title;
    let title_lower = title.to_lowercase();

    let sentiment: Vec<&str> = SENTIMENT_WORDS
        .iter()
        .copied()
        .filter(|w| title_lower.contains(w))
        .collect();
    let sentiment = if sentiment.is_empty() {
        String::new()
    } else {
        format!(" {}", sentiment.join(" "))
    };

    // Categorize features so materials lead, then style, then the rest.
    let mut material = Vec::new();
    let mut style = Vec::new();
    let mut functional = Vec::new();
    for feature in product.features.iter().take(MAX_FEATURES) {
        let f = feature.to_lowercase();
        if MATERIAL_WORDS.iter().any(|w| f.contains(w)) {
            material.push(f);
        } else if STYLE_FEATURE_WORDS.iter().any(|w| f.contains(w)) {
            style.push(f);
        } else {
            functional.push(f);
        }
    }
    let features_text = material
        .into_iter()
        .chain(style)
        .chain(functional)
        .collect::<Vec<_>>()
        .join(" ");

    // First lines of the description, quality-signal lines first.
    let mut important = Vec::new();
    for line in product.description.lines().take(MAX_DESCRIPTION_LINES) {
        let lower = line.to_lowercase();
        if QUALITY_LINE_WORDS.iter().any(|w| lower.contains(w)) {
            important.insert(0, line);
        } else {
            important.push(line);
        }
    }
    let description = important.join(" ");

    let category_context = match product.categories.split_first() {
        Some((main, rest)) => {
            let subs = rest
                .iter()
                .take(MAX_SUB_CATEGORIES)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            format!("{main} {subs}")
        }
        None => String::new(),
    };

    let price_context = match product.price {
        Some(p) if p < 20.0 => " budget affordable cheap",
        Some(p) if p < 50.0 => " moderately priced value",
        Some(p) if p < 100.0 => " premium quality",
        Some(_) => " luxury high-end expensive",
        None => "",
    };
    let rating_context = match product.rating {
        Some(r) if r >= 4.5 => " highly rated excellent reviews",
        Some(r) if r >= 4.0 => " well reviewed popular",
        Some(r) if r >= 3.0 => " decent ratings",
        _ => "",
    };
    let brand_context = product
        .brand
        .as_deref()
        .map(|b| format!(" {b}"))
        .unwrap_or_default();

    let combined = format!(
        "{title}{sentiment}. {features_text}. {category_context}. \
         {description}{price_context}{rating_context}{brand_context}"
    );
    clean_scoring_text(&combined)
}

/// Keep word characters, whitespace, and periods; collapse runs of
/// whitespace.
fn clean_scoring_text(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || c == '.' || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn confidence_phrase(score: f32) -> &'static str {
    if score > 0.85 {
        "excellent match"
    } else if score > 0.7 {
        "great match"
    } else if score > 0.5 {
        "good match"
    } else {
        "somewhat relevant"
    }
}

/// Build the per-result explanation: confidence phrase, then up to two
/// matched-signal reasons, then the numeric score to three decimals.
fn explain(query: &str, product: &Product, score: f32, intent: &Intent) -> String {
    let title = product.title.to_lowercase();
    let mut reasons: Vec<String> = Vec::new();

    match intent.gender {
        Some(Gender::Men) if title_mentions(&title, Gender::Men) => {
            reasons.push("specifically designed for men".into());
        }
        Some(Gender::Women) if title_mentions(&title, Gender::Women) => {
            reasons.push("specifically designed for women".into());
        }
        Some(Gender::Unisex) => reasons.push("suitable for all genders".into()),
        _ => {}
    }

    if let Some(occasion) = intent.occasion {
        let matched = OCCASION_TITLE_TERMS
            .iter()
            .find(|(o, _)| *o == occasion)
            .is_some_and(|(_, terms)| terms.iter().any(|t| contains_term(&title, t)));
        if matched {
            reasons.push(format!("ideal for {} occasions", occasion.as_str()));
        } else {
            reasons.push(format!("appropriate for {} settings", occasion.as_str()));
        }
    }

    let matched_colors: Vec<&str> = intent
        .colors
        .iter()
        .copied()
        .filter(|c| contains_term(&title, c))
        .collect();
    if !matched_colors.is_empty() {
        reasons.push(format!("available in {}", matched_colors.join(", ")));
    }

    if !intent.brands.is_empty() {
        if let Some(brand) = &product.brand {
            reasons.push(format!("from {brand} brand"));
        }
    }

    if let Some(price) = product.price {
        match intent.price_range {
            Some(PriceRange::Budget) if price < 30.0 => {
                reasons.push("fits your budget needs".into());
            }
            Some(PriceRange::Premium) if price > 80.0 => {
                reasons.push("matches your premium preference".into());
            }
            _ => {}
        }
        if price < 25.0 {
            reasons.push("budget-friendly pricing".into());
        } else if price > 100.0 {
            reasons.push("premium quality investment".into());
        }
    }

    if let Some(rating) = product.rating {
        if intent.rating_sensitive && rating >= 4.0 {
            reasons.push("highly rated by customers".into());
        } else if rating >= 4.5 {
            reasons.push("excellent customer ratings".into());
        } else if rating >= 4.0 {
            reasons.push("well reviewed by users".into());
        }
    }

    if let Some(style) = intent.styles.iter().find(|s| contains_term(&title, s)) {
        reasons.push(format!("{style} style as requested"));
    }

    let phrase = confidence_phrase(score);
    let article = if phrase.starts_with('e') { "an" } else { "a" };
    let base = format!("This is {article} {phrase} for '{query}'");
    let body = if reasons.is_empty() {
        base
    } else {
        format!(
            "{base} because it {}",
            reasons[..reasons.len().min(MAX_EXPLANATION_REASONS)].join(", ")
        )
    };
    format!("{body} (confidence: {score:.3})")
}
