//! Thread-safety tests: one shared engine serving parallel searches, and
//! the embedding cache under concurrent access.

use std::sync::Arc;
use std::thread;

use vogue::capability::TextEmbedder;
use vogue::embedding::EmbeddingService;
use vogue::stub::{OverlapCrossEncoder, StubTextEmbedder};
use vogue::{EngineConfig, Product, QueryRequest, SearchEngine, VectorIndex};

const DIM: usize = 64;

fn product(id: &str, title: &str) -> Product {
    Product {
        id: id.into(),
        title: title.into(),
        price: Some(29.99),
        rating: Some(4.3),
        brand: None,
        categories: vec![],
        features: vec![],
        description: String::new(),
        raw: serde_json::Value::Null,
    }
}

fn build_engine() -> Arc<SearchEngine> {
    let embedder = StubTextEmbedder::new(DIM);
    let mut index = VectorIndex::new(DIM);
    for p in [
        product("1", "Men's Running Shoes"),
        product("2", "Women's Summer Dress"),
        product("3", "Canvas Tote Bag"),
        product("4", "Wool Winter Scarf"),
    ] {
        let v = embedder
            .embed(std::slice::from_ref(&p.title))
            .unwrap()
            .pop()
            .unwrap();
        index.push(v, p).unwrap();
    }
    Arc::new(
        SearchEngine::new(
            index,
            Arc::new(embedder),
            Arc::new(OverlapCrossEncoder),
            None,
            None,
            EngineConfig::default(),
        )
        .unwrap(),
    )
}

#[test]
fn parallel_searches_agree_with_serial_ones() {
    let engine = build_engine();
    let queries = [
        "Men's Running Shoes",
        "Women's Summer Dress",
        "Canvas Tote Bag",
        "Wool Winter Scarf",
    ];

    let serial: Vec<Vec<String>> = queries
        .iter()
        .map(|q| {
            engine
                .search(&QueryRequest::text(*q))
                .unwrap()
                .results
                .into_iter()
                .map(|h| h.id)
                .collect()
        })
        .collect();

    let handles: Vec<_> = queries
        .iter()
        .enumerate()
        .flat_map(|(qi, q)| {
            let engine = engine.clone();
            (0..4).map(move |_| {
                let engine = engine.clone();
                let q = q.to_string();
                thread::spawn(move || {
                    let ids: Vec<String> = engine
                        .search(&QueryRequest::text(q))
                        .unwrap()
                        .results
                        .into_iter()
                        .map(|h| h.id)
                        .collect();
                    (qi, ids)
                })
            })
        })
        .collect();

    for handle in handles {
        let (qi, ids) = handle.join().unwrap();
        assert_eq!(ids, serial[qi], "query {} diverged", queries[qi]);
    }
}

#[test]
fn parallel_reranked_searches_do_not_interfere() {
    let engine = build_engine();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut req = QueryRequest::text(if i % 2 == 0 {
                    "men's running shoes"
                } else {
                    "women's summer dress"
                });
                req.rerank = true;
                engine.search(&req).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let response = handle.join().unwrap();
        assert!(response.reranked);
        // The opposite-gender product never leaks across threads.
        let wrong_id = if i % 2 == 0 { "2" } else { "1" };
        for hit in &response.results {
            assert_ne!(hit.id, wrong_id, "thread {i} got {}", hit.title);
        }
    }
}

#[test]
fn embedding_cache_is_consistent_under_contention() {
    let service = Arc::new(EmbeddingService::new(
        Arc::new(StubTextEmbedder::new(DIM)),
        100,
        100,
    ));

    let baseline = service.embed_text("red dress").unwrap();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            thread::spawn(move || {
                let mut last = Vec::new();
                for _ in 0..50 {
                    last = service.embed_text("red dress").unwrap();
                }
                last
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), baseline);
    }
}

#[test]
fn distinct_texts_embed_concurrently_without_cross_talk() {
    let service = Arc::new(EmbeddingService::new(
        Arc::new(StubTextEmbedder::new(DIM)),
        100,
        100,
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = service.clone();
            thread::spawn(move || {
                let text = format!("query number {i}");
                let v = service.embed_text(&text).unwrap();
                (text, v)
            })
        })
        .collect();

    let results: Vec<(String, Vec<f32>)> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (text, vector) in results {
        // Each thread's vector matches a fresh serial embedding of its text.
        assert_eq!(vector, service.embed_text(&text).unwrap());
    }
}
