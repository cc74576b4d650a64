//! Engine lifecycle, persistence and search behaviour against on-disk sources

mod common;

use common::{faq, order, sample_faqs, Fixture, HashingProvider};
use std::sync::Arc;
use supportrag::embedding::{Corpus, FlatIndex, IndexBuilder};
use supportrag::knowledge::KnowledgeStore;
use supportrag::retrieval;
use supportrag::storage::IndexStore;
use supportrag::{InitOutcome, SupportError};

const QUERIES: [&str; 4] = [
    "refund time",
    "change address",
    "pay with a card",
    "cancel my order",
];

#[test]
fn test_refund_scenario() {
    let fixture = Fixture::new(
        &[faq("How do refunds work?", "Refunds post in 3-5 days.")],
        &[],
    );
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();

    let results = engine.relevant("refund time", 0.3, 1).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].entry.question, "How do refunds work?");
    assert!(results[0].similarity_score >= 0.3);

    let json = serde_json::to_value(&results[0]).unwrap();
    assert!(json["similarity_score"].as_f64().unwrap() >= 0.3);
}

#[test]
fn test_empty_sources_initialize() {
    let fixture = Fixture::new(&[], &[]);
    let provider = Arc::new(HashingProvider::new());
    let engine = fixture.engine(provider.clone());

    let outcome = engine.initialize().unwrap();
    assert_eq!(
        outcome,
        InitOutcome::Built {
            entries: 0,
            persisted: true
        }
    );
    assert_eq!(provider.batch_calls(), 0);
    assert!(engine.relevant("anything", 0.3, 5).unwrap().is_empty());
    assert!(engine.search("anything", 10).unwrap().is_empty());
}

#[test]
fn test_missing_sources_initialize() {
    let fixture = Fixture::new(&[], &[]);
    std::fs::remove_file(&fixture.config.sources.faq_file).unwrap();
    std::fs::write(&fixture.config.sources.order_file, "[{ broken").unwrap();

    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();
    assert_eq!(engine.entry_count(), Some(0));
}

#[test]
fn test_uninitialized_engine_is_an_error() {
    let fixture = Fixture::new(&sample_faqs(), &[]);
    let engine = fixture.engine(Arc::new(HashingProvider::new()));

    assert!(!engine.is_ready());
    assert!(matches!(
        engine.search("refund", 3),
        Err(SupportError::EngineNotInitialized)
    ));
    assert!(matches!(
        engine.relevant("refund", 0.3, 3),
        Err(SupportError::EngineNotInitialized)
    ));
}

#[test]
fn test_initialize_is_idempotent_and_reloads() {
    let fixture = Fixture::new(&sample_faqs(), &[order("ORD001", "Thai Garden", "preparing")]);

    let provider = Arc::new(HashingProvider::new());
    let engine = fixture.engine(provider.clone());
    assert_eq!(
        engine.initialize().unwrap(),
        InitOutcome::Built {
            entries: 5,
            persisted: true
        }
    );
    let calls_after_build = provider.batch_calls();
    assert_eq!(engine.initialize().unwrap(), InitOutcome::AlreadyReady);
    assert_eq!(provider.batch_calls(), calls_after_build);

    // A fresh engine restores from disk without touching the encoder
    let fresh_provider = Arc::new(HashingProvider::new());
    let fresh = fixture.engine(fresh_provider.clone());
    assert_eq!(
        fresh.initialize().unwrap(),
        InitOutcome::Loaded { entries: 5 }
    );
    assert_eq!(fresh_provider.batch_calls(), 0);

    let before = engine.search("order ORD001", 1).unwrap();
    let after = fresh.search("order ORD001", 1).unwrap();
    assert_eq!(before[0].entry.source_order_id.as_deref(), Some("ORD001"));
    assert_eq!(before[0].entry, after[0].entry);
    assert_eq!(before[0].row, after[0].row);
    assert!((before[0].score - after[0].score).abs() < 1e-5);
}

#[test]
fn test_save_load_roundtrip_preserves_search() {
    let fixture = Fixture::new(
        &sample_faqs(),
        &[
            order("ORD001", "Thai Garden", "preparing"),
            order("ORD002", "Pizza Palace", "delivered"),
        ],
    );
    let provider = Arc::new(HashingProvider::new());
    let knowledge = KnowledgeStore::new(
        fixture.config.sources.faq_file.clone(),
        fixture.config.sources.order_file.clone(),
    );
    let corpus = IndexBuilder::new(provider.clone(), 3)
        .build(knowledge.assemble())
        .unwrap();

    let store = IndexStore::new(fixture.index_path(), "_faqs");
    store.save(&corpus).unwrap();
    assert!(fixture.dir.path().join("data/faiss_index_faqs.json").exists());
    let loaded = store.load(common::DIMENSION).unwrap();

    for query in QUERIES {
        let original = retrieval::search(provider.as_ref(), &corpus, query, 4).unwrap();
        let restored = retrieval::search(provider.as_ref(), &loaded, query, 4).unwrap();
        assert_eq!(original.len(), restored.len());
        for (a, b) in original.iter().zip(&restored) {
            assert_eq!(a.entry, b.entry);
            assert_eq!(a.row, b.row);
            assert!((a.score - b.score).abs() < 1e-5);
        }
    }
}

#[test]
fn test_cardinality_ordering_and_bounds() {
    let fixture = Fixture::new(&sample_faqs(), &[order("ORD001", "Thai Garden", "preparing")]);
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();
    let rows = engine.entry_count().unwrap();

    for query in QUERIES {
        for k in [1, 2, rows, rows + 3] {
            let results = engine.search(query, k).unwrap();
            assert_eq!(results.len(), k.min(rows));
            assert!(results.windows(2).all(|w| {
                w[0].score > w[1].score || (w[0].score == w[1].score && w[0].row < w[1].row)
            }));
            assert!(results.iter().all(|r| (-1.0..=1.0).contains(&r.score)));
        }
    }
}

#[test]
fn test_ties_prefer_lower_rows() {
    let duplicate = faq("Where is my food?", "Check the live map in the app.");
    let fixture = Fixture::new(&[duplicate.clone(), duplicate.clone(), duplicate], &[]);
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();

    let rows: Vec<usize> = engine
        .search("where is my food", 3)
        .unwrap()
        .iter()
        .map(|r| r.row)
        .collect();
    assert_eq!(rows, vec![0, 1, 2]);
}

#[test]
fn test_threshold_monotonicity() {
    let fixture = Fixture::new(&sample_faqs(), &[order("ORD001", "Thai Garden", "preparing")]);
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();

    let thresholds = [-1.0, 0.0, 0.1, 0.2, 0.3, 0.5, 0.8, 1.0];
    for query in QUERIES {
        for pair in thresholds.windows(2) {
            let (low, high) = (pair[0], pair[1]);
            let loose = engine.relevant(query, low, 5).unwrap();
            let strict = engine.relevant(query, high, 5).unwrap();
            assert!(strict.len() <= loose.len());
            assert!(strict.iter().all(|s| loose.contains(s)));
            assert!(strict.iter().all(|s| s.similarity_score >= high));
        }
        assert!(engine.relevant(query, 1.01, 5).unwrap().is_empty());
    }
}

#[test]
fn test_truncated_entries_artifact_triggers_rebuild() {
    let fixture = Fixture::new(&sample_faqs(), &[]);
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();

    // Rewrite the entries artifact with one entry fewer than the index has rows
    let entries_path = engine.store().entries_path().to_path_buf();
    let mut artifact: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&entries_path).unwrap()).unwrap();
    artifact["entries"].as_array_mut().unwrap().pop();
    std::fs::write(&entries_path, serde_json::to_vec_pretty(&artifact).unwrap()).unwrap();

    let provider = Arc::new(HashingProvider::new());
    let fresh = fixture.engine(provider.clone());
    assert_eq!(
        fresh.initialize().unwrap(),
        InitOutcome::Built {
            entries: 4,
            persisted: true
        }
    );
    assert!(provider.batch_calls() > 0);

    // The rebuilt pair is consistent again
    let reloaded = fixture.engine(Arc::new(HashingProvider::new()));
    assert_eq!(
        reloaded.initialize().unwrap(),
        InitOutcome::Loaded { entries: 4 }
    );
}

#[test]
fn test_mismatched_pair_drops_rows_at_query_time() {
    let provider = HashingProvider::new();
    let vectors = vec![
        provider_embed(&provider, "refund policy"),
        provider_embed(&provider, "refund timing"),
        provider_embed(&provider, "refund status"),
    ];
    let index = FlatIndex::from_vectors(common::DIMENSION, vectors).unwrap();
    let entries = supportrag::knowledge::assemble_entries(
        vec![supportrag::knowledge::FaqRecord {
            question: "How do refunds work?".to_string(),
            answer: "Refunds post in 3-5 days.".to_string(),
            category: None,
        }],
        &[],
    );
    let corpus = Corpus::from_parts(index, entries, "hashing-bow");

    let results = retrieval::search(&provider, &corpus, "refund", 3).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].row, 0);
}

fn provider_embed(provider: &HashingProvider, text: &str) -> Vec<f32> {
    use supportrag::embedding::EmbeddingProvider;
    provider.embed(text).unwrap()
}

#[test]
fn test_rebuild_picks_up_new_sources() {
    let fixture = Fixture::new(&sample_faqs(), &[]);
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();
    assert_eq!(engine.entry_count(), Some(4));

    fixture.write_orders(&[
        order("ORD001", "Thai Garden", "preparing"),
        order("ORD002", "Pizza Palace", "delivered"),
    ]);
    assert_eq!(engine.rebuild().unwrap(), 6);
    assert_eq!(engine.entry_count(), Some(6));

    let top = engine.search("Pizza Palace order", 1).unwrap();
    assert_eq!(top[0].entry.source_order_id.as_deref(), Some("ORD002"));
    assert_eq!(top[0].row, 5);
}

#[test]
fn test_failed_rebuild_save_keeps_serving_previous_pair() {
    let mut fixture = Fixture::new(&sample_faqs(), &[]);
    fixture.config.index.path = fixture.dir.path().join("store").join("index.bin");
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();

    // Replace the index directory with a plain file so the save cannot land
    std::fs::remove_dir_all(fixture.dir.path().join("store")).unwrap();
    std::fs::write(fixture.dir.path().join("store"), b"not a directory").unwrap();
    fixture.write_faqs(&[faq("New question", "New answer")]);

    let err = engine.rebuild().unwrap_err();
    assert!(matches!(err, SupportError::Persistence(_)));
    assert_eq!(engine.entry_count(), Some(4));
    assert_eq!(
        engine.search("refund time", 1).unwrap()[0].entry.question,
        "How do refunds work?"
    );
}

#[test]
fn test_initialize_serves_unsaved_index_when_save_fails() {
    let mut fixture = Fixture::new(&sample_faqs(), &[]);
    std::fs::write(fixture.dir.path().join("blocked"), b"file").unwrap();
    fixture.config.index.path = fixture.dir.path().join("blocked").join("index.bin");

    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    assert_eq!(
        engine.initialize().unwrap(),
        InitOutcome::Built {
            entries: 4,
            persisted: false
        }
    );
    assert!(engine.is_ready());
}

#[test]
fn test_rebuild_during_concurrent_searches() {
    let v1: Vec<_> = (0..6)
        .map(|i| faq(&format!("delivery question {}", i), "version one answer"))
        .collect();
    let v2: Vec<_> = (0..9)
        .map(|i| faq(&format!("delivery question {}", i), "version two answer"))
        .collect();

    let fixture = Fixture::new(&v1, &[]);
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();
    fixture.write_faqs(&v2);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    let corpus = engine.snapshot().unwrap();
                    let results = engine.search("delivery question", 20).unwrap();
                    assert!(results.len() == 6 || results.len() == 9);
                    let version = results[0].entry.answer.clone();
                    assert!(results.iter().all(|r| r.entry.answer == version));
                    assert_eq!(corpus.index().len(), corpus.len());
                }
            });
        }

        scope.spawn(|| {
            for _ in 0..3 {
                assert_eq!(engine.rebuild().unwrap(), 9);
            }
        });
    });

    assert_eq!(engine.entry_count(), Some(9));
}

#[test]
fn test_blank_queries_return_nothing() {
    let empty = Fixture::new(&[], &[]);
    let engine = empty.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();
    assert!(engine.search("", 5).unwrap().is_empty());

    let fixture = Fixture::new(&sample_faqs(), &[]);
    let engine = fixture.engine(Arc::new(HashingProvider::new()));
    engine.initialize().unwrap();
    assert!(engine.search("", 5).unwrap().is_empty());
    assert!(engine.relevant("   ", 0.3, 5).unwrap().is_empty());
}

#[test]
fn test_blank_source_record_does_not_block_initialize() {
    let fixture = Fixture::new(
        &[
            faq("How do refunds work?", "Refunds post in 3-5 days."),
            faq("", ""),
        ],
        &[],
    );
    let engine = fixture.engine(Arc::new(HashingProvider::new()));

    let outcome = engine.initialize().unwrap();
    assert_eq!(
        outcome,
        InitOutcome::Built {
            entries: 2,
            persisted: true
        }
    );

    let results = engine.search("refund time", 2).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entry.question, "How do refunds work?");
    assert_eq!(results[1].row, 1);
    assert_eq!(results[1].score, 0.0);
}

#[test]
fn test_rebuild_on_fresh_engine_embeds_once() {
    let fixture = Fixture::new(&sample_faqs(), &[]);
    let provider = Arc::new(HashingProvider::new());
    let engine = fixture.engine(provider.clone());

    assert!(!engine.is_ready());
    assert_eq!(engine.rebuild().unwrap(), 4);
    // Four entries at batch size 2
    assert_eq!(provider.batch_calls(), 2);
    assert!(engine.is_ready());
    assert!(engine.store().exists());

    // A later process loads the pair instead of embedding again
    let reloaded = fixture.engine(provider.clone());
    assert_eq!(
        reloaded.initialize().unwrap(),
        InitOutcome::Loaded { entries: 4 }
    );
    assert_eq!(provider.batch_calls(), 2);
}
