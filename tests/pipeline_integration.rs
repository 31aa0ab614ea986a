//! End-to-end pipeline tests: build a catalog, persist it, reload it, and
//! run searches through the engine the way the server binary does.

use std::sync::Arc;

use vogue::capability::TextEmbedder;
use vogue::stub::{OverlapCrossEncoder, StubCaptioner, StubTextEmbedder};
use vogue::{
    EngineConfig, Gender, Product, QueryRequest, SearchEngine, VectorIndex,
};

const DIM: usize = 96;

fn product(id: &str, title: &str, price: Option<f32>, rating: Option<f32>) -> Product {
    Product {
        id: id.into(),
        title: title.into(),
        price,
        rating,
        brand: None,
        categories: vec!["Clothing".into()],
        features: vec![],
        description: String::new(),
        raw: serde_json::json!({ "parent_asin": id }),
    }
}

fn catalog() -> Vec<Product> {
    vec![
        product("m-shoe", "Men's Running Shoes", Some(59.99), Some(4.6)),
        product("w-dress", "Women's Summer Dress", Some(34.50), Some(4.2)),
        product("m-jacket", "Men's Leather Jacket", Some(120.0), Some(4.8)),
        product("w-pants", "Women's Yoga Pants", Some(24.99), Some(3.9)),
        product("tote", "Canvas Tote Bag", Some(14.99), None),
        product("scarf", "Wool Winter Scarf", Some(19.99), Some(4.1)),
    ]
}

fn build_engine() -> SearchEngine {
    let embedder = StubTextEmbedder::new(DIM);
    let mut index = VectorIndex::new(DIM);
    for p in catalog() {
        let v = embedder
            .embed(std::slice::from_ref(&p.title))
            .unwrap()
            .pop()
            .unwrap();
        index.push(v, p).unwrap();
    }
    SearchEngine::new(
        index,
        Arc::new(embedder),
        Arc::new(OverlapCrossEncoder),
        Some(Arc::new(StubCaptioner)),
        None,
        EngineConfig::default(),
    )
    .unwrap()
}

#[test]
fn persisted_index_serves_the_same_results() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("vogue.index");
    let meta_path = dir.path().join("meta.json");

    let embedder = StubTextEmbedder::new(DIM);
    let mut index = VectorIndex::new(DIM);
    for p in catalog() {
        let v = embedder
            .embed(std::slice::from_ref(&p.title))
            .unwrap()
            .pop()
            .unwrap();
        index.push(v, p).unwrap();
    }
    index.save(&index_path, &meta_path).unwrap();

    let reloaded = VectorIndex::load(&index_path, &meta_path).unwrap();
    let engine = SearchEngine::new(
        reloaded,
        Arc::new(StubTextEmbedder::new(DIM)),
        Arc::new(OverlapCrossEncoder),
        None,
        None,
        EngineConfig::default(),
    )
    .unwrap();

    let fresh = build_engine();
    let req = QueryRequest::text("canvas tote bag");
    let a = engine.search(&req).unwrap();
    let b = fresh.search(&req).unwrap();
    assert_eq!(a.results[0].id, b.results[0].id);
    assert_eq!(a.results.len(), b.results.len());
}

#[test]
fn exact_title_query_ranks_its_product_first() {
    let engine = build_engine();
    let response = engine
        .search(&QueryRequest::text("Canvas Tote Bag"))
        .unwrap();
    assert_eq!(response.results[0].id, "tote");
    assert!(response.message.is_none());
}

#[test]
fn gendered_query_filters_and_reranks() {
    let engine = build_engine();
    let mut req = QueryRequest::text("men's running shoes");
    req.rerank = true;
    req.top_k = 3;
    let response = engine.search(&req).unwrap();

    assert!(response.reranked);
    // The strict gender drop removes women's products entirely.
    for hit in &response.results {
        assert!(
            !hit.title.to_lowercase().contains("women"),
            "unexpected {}",
            hit.title
        );
    }
    let first = &response.results[0];
    assert_eq!(first.rank, Some(1));
    let explanation = first.explanation.as_deref().unwrap();
    assert!(explanation.contains("confidence:"));
}

#[test]
fn explicit_gender_filter_overrides_detected_gender() {
    let engine = build_engine();
    let mut req = QueryRequest::text("men's shoes");
    req.gender_filter = Some(Gender::Women);
    req.top_k = 2;
    let response = engine.search(&req).unwrap();
    // The override wins: women's products surface first.
    assert!(response.results[0].title.to_lowercase().contains("women"));
}

#[test]
fn ranked_scores_are_capped_and_descending() {
    let engine = build_engine();
    let mut req = QueryRequest::text("women's summer dress");
    req.rerank = true;
    let response = engine.search(&req).unwrap();

    let scores: Vec<f32> = response.results.iter().map(|h| h.score).collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
    assert!(scores.iter().all(|s| *s <= 1.0));
}

#[test]
fn searches_are_deterministic() {
    let engine = build_engine();
    let req = QueryRequest::text("wool winter scarf");
    let a = engine.search(&req).unwrap();
    let b = engine.search(&req).unwrap();

    let ids_a: Vec<&str> = a.results.iter().map(|h| h.id.as_str()).collect();
    let ids_b: Vec<&str> = b.results.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids_a, ids_b);
    for (x, y) in a.results.iter().zip(&b.results) {
        assert_eq!(x.score, y.score);
    }
}

#[test]
fn top_k_larger_than_catalog_returns_everything_once() {
    let engine = build_engine();
    let mut req = QueryRequest::text("clothing");
    req.top_k = 100;
    let response = engine.search(&req).unwrap();
    assert_eq!(response.results.len(), catalog().len());

    let mut ids: Vec<&str> = response.results.iter().map(|h| h.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), catalog().len());
}

#[test]
fn response_serializes_for_the_wire() {
    let engine = build_engine();
    let mut req = QueryRequest::text("men's leather jacket");
    req.rerank = true;
    req.top_k = 2;
    let response = engine.search(&req).unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["reranked"], true);
    assert_eq!(json["query"], "men's leather jacket");
    let first = &json["results"][0];
    assert!(first["rank"].is_number());
    assert!(first["explanation"].is_string());
    // Raw catalog metadata is carried through.
    assert!(first["raw"]["parent_asin"].is_string());
}

#[test]
fn no_results_message_on_empty_catalog() {
    let engine = {
        let index = VectorIndex::new(DIM);
        SearchEngine::new(
            index,
            Arc::new(StubTextEmbedder::new(DIM)),
            Arc::new(OverlapCrossEncoder),
            None,
            None,
            EngineConfig::default(),
        )
        .unwrap()
    };
    let response = engine.search(&QueryRequest::text("anything")).unwrap();
    assert!(response.results.is_empty());
    assert_eq!(
        response.message.as_deref(),
        Some("No products found matching your criteria")
    );
}
