//! Offline index builder.
//!
//! Reads a product dataset (JSON array or JSON-lines, malformed lines
//! skipped), composes one embedding document per product, embeds them in
//! batches, and writes the vector store plus the metadata sidecar the
//! server loads at startup.
//!
//! Paths come from the environment: `DATA_PATH`, `INDEX_PATH`, `META_PATH`.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::Value;

use vogue::embedding::EmbeddingService;
use vogue::stub::{StubTextEmbedder, STUB_DIMENSION};
use vogue::{Product, VectorIndex};

fn main() -> anyhow::Result<()> {
    let data_path = env_path("DATA_PATH", "data/products.json");
    let index_path = env_path("INDEX_PATH", "data/vogue.index");
    let meta_path = env_path("META_PATH", "data/meta.json");

    println!("Loading products from {}...", data_path.display());
    let raw = fs::read_to_string(&data_path)
        .with_context(|| format!("dataset not found at {}", data_path.display()))?;
    let products = parse_products(&raw);
    if products.is_empty() {
        bail!("no usable products in {}", data_path.display());
    }
    println!("Loaded {} products", products.len());

    let texts: Vec<String> = products.iter().map(document_text).collect();

    println!("Creating embeddings...");
    let service = EmbeddingService::new(Arc::new(StubTextEmbedder::default()), 1, 1);
    let vectors = service
        .embed_texts(&texts)
        .context("embedding the catalog failed")?;

    let mut index = VectorIndex::new(STUB_DIMENSION);
    for (vector, product) in vectors.into_iter().zip(products) {
        index.push(vector, product)?;
    }

    if let Some(parent) = index_path.parent() {
        fs::create_dir_all(parent)?;
    }
    index.save(&index_path, &meta_path)?;
    println!(
        "Wrote {} vectors to {} and metadata to {}",
        index.len(),
        index_path.display(),
        meta_path.display()
    );
    Ok(())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

/// Parse a whole-file JSON array, or fall back to JSON-lines with bad
/// lines skipped.
fn parse_products(raw: &str) -> Vec<Product> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(values) = serde_json::from_str::<Vec<Value>>(trimmed) {
            return values
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| product_from_value(i, v))
                .collect();
        }
    }

    trimmed
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .filter_map(|(i, line)| match serde_json::from_str::<Value>(line) {
            Ok(v) => product_from_value(i, v),
            Err(err) => {
                eprintln!("skipping line {}: {err}", i + 1);
                None
            }
        })
        .collect()
}

/// Map one raw dataset record into a catalog product. Records without a
/// title are skipped; everything else degrades to defaults.
fn product_from_value(position: usize, value: Value) -> Option<Product> {
    let title = value.get("title")?.as_str()?.trim().to_string();
    if title.is_empty() {
        return None;
    }

    let id = value
        .get("parent_asin")
        .or_else(|| value.get("id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("product-{position}"));

    Some(Product {
        id,
        title,
        price: number_field(&value, "price"),
        rating: number_field(&value, "average_rating").or_else(|| number_field(&value, "rating")),
        brand: value
            .get("store")
            .or_else(|| value.get("brand"))
            .and_then(Value::as_str)
            .map(str::to_string),
        categories: string_list(&value, "categories"),
        features: string_list(&value, "features"),
        description: text_field(&value, "description")
            .or_else(|| text_field(&value, "product_description"))
            .unwrap_or_default(),
        raw: value,
    })
}

/// Numbers arrive as JSON numbers or as strings like "24.99".
fn number_field(value: &Value, key: &str) -> Option<f32> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().trim_start_matches('$').parse().ok(),
        _ => None,
    }
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A description field is either a string or a list of paragraphs.
fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

/// The text that gets embedded for one product: title, features,
/// categories, description, then price and rating tags.
fn document_text(product: &Product) -> String {
    let mut parts: Vec<String> = vec![product.title.clone()];
    if !product.features.is_empty() {
        parts.push(product.features.join(" . "));
    }
    if !product.categories.is_empty() {
        parts.push(product.categories.join(" . "));
    }
    if !product.description.is_empty() {
        parts.push(product.description.clone());
    }
    if let Some(price) = product.price {
        parts.push(format!("price: {price}"));
    }
    if let Some(rating) = product.rating {
        parts.push(format!("rating: {rating}"));
    }
    parts.join(" . ")
}
