use super::*;
use tempfile::TempDir;

fn document(id: &str, embedding: Vec<f32>) -> VectorDocument {
    VectorDocument {
        id: id.to_string(),
        embedding,
        metadata: DocumentMetadata {
            title: format!("Document {}", id),
            text: format!("Body of document {}", id),
            url: format!("https://wiki.example.com/doc/{}", id),
        },
    }
}

fn single_document_store() -> VectorStore {
    let mut store = VectorStore::new();
    store
        .add(VectorDocument {
            id: "1".to_string(),
            embedding: vec![1.0, 0.0],
            metadata: DocumentMetadata {
                title: "A".to_string(),
                text: "...".to_string(),
                url: "u".to_string(),
            },
        })
        .expect("should add document");
    store
}

#[test]
fn identical_vector_scores_one() {
    let store = single_document_store();
    let results = store.search(&[1.0, 0.0], 5);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.id, "1");
    assert_eq!(results[0].document.metadata.title, "A");
    assert!((results[0].score - 1.0).abs() < f32::EPSILON);
}

#[test]
fn orthogonal_vector_scores_zero() {
    let store = single_document_store();
    let results = store.search(&[0.0, 1.0], 5);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.id, "1");
    assert!(results[0].score.abs() < f32::EPSILON);
}

#[test]
fn empty_store_returns_no_results() {
    let store = VectorStore::new();
    assert!(store.search(&[1.0, 0.0, 0.0], 5).is_empty());
    assert_eq!(store.dimension(), None);
}

#[test]
fn search_sorts_descending_and_limits() {
    let mut store = VectorStore::new();
    store
        .add_batch(vec![
            document("far", vec![0.0, 1.0, 0.0]),
            document("close", vec![0.9, 0.1, 0.0]),
            document("opposite", vec![-1.0, 0.0, 0.0]),
            document("exact", vec![2.0, 0.0, 0.0]),
            document("middle", vec![0.5, 0.5, 0.0]),
        ])
        .expect("should add batch");

    let results = store.search(&[1.0, 0.0, 0.0], 3);
    let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
    assert_eq!(ids, vec!["exact", "close", "middle"]);

    let all = store.search(&[1.0, 0.0, 0.0], 10);
    assert_eq!(all.len(), 5);
    for pair in all.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for result in &all {
        assert!((-1.0..=1.0).contains(&result.score));
    }
    assert_eq!(all[4].document.id, "opposite");
}

#[test]
fn ties_keep_insertion_order() {
    let mut store = VectorStore::new();
    for id in ["first", "second", "third"] {
        store
            .add(document(id, vec![0.0, 1.0]))
            .expect("should add document");
    }

    let results = store.search(&[0.0, 3.0], 2);
    let ids: Vec<&str> = results.iter().map(|r| r.document.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second"]);
}

#[test]
fn zero_limit_returns_nothing() {
    let store = single_document_store();
    assert!(store.search(&[1.0, 0.0], 0).is_empty());
}

#[test]
fn zero_norm_vectors_score_zero() {
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);

    let mut store = VectorStore::new();
    store
        .add(document("zero", vec![0.0, 0.0]))
        .expect("should add document");
    let results = store.search(&[1.0, 1.0], 1);
    assert_eq!(results[0].score, 0.0);
}

#[test]
fn cosine_similarity_is_symmetric() {
    let vectors: [&[f32]; 4] = [
        &[0.3, -1.2, 4.5, 0.0],
        &[1.0, 1.0, 1.0, 1.0],
        &[-0.7, 0.2, 0.9, 2.2],
        &[0.0, 0.0, 0.0, 0.0],
    ];

    for a in vectors {
        for b in vectors {
            assert_eq!(cosine_similarity(a, b), cosine_similarity(b, a));
        }
    }
}

#[test]
fn cosine_similarity_ignores_magnitude() {
    let score = cosine_similarity(&[1.0, 2.0, 3.0], &[10.0, 20.0, 30.0]);
    assert!((score - 1.0).abs() < 1e-6);

    let score = cosine_similarity(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]);
    assert!((score + 1.0).abs() < 1e-6);
}

#[test]
fn add_allows_duplicate_ids() {
    let mut store = VectorStore::new();
    store
        .add(document("same", vec![1.0, 0.0]))
        .expect("should add first");
    store
        .add(document("same", vec![0.0, 1.0]))
        .expect("should add duplicate");

    assert_eq!(store.len(), 2);
}

#[test]
fn add_rejects_mismatched_dimension() {
    let mut store = single_document_store();
    let result = store.add(document("wide", vec![1.0, 0.0, 0.0]));

    assert!(matches!(
        result,
        Err(AskError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));
    assert_eq!(store.len(), 1);
}

#[test]
fn clear_empties_store() {
    let mut store = single_document_store();
    store.clear();
    assert!(store.is_empty());
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("nested").join("store.json");

    let mut store = VectorStore::new();
    store
        .add_batch(vec![
            document("1", vec![0.25, -0.5, 0.75]),
            document("2", vec![1.0, 0.0, 0.0]),
            document("1", vec![0.0, 0.0, 1.0]),
        ])
        .expect("should add batch");
    store.save(&path).await.expect("should save store");

    let mut loaded = VectorStore::new();
    assert!(loaded.load(&path).await);
    assert_eq!(loaded, store);
    assert_eq!(loaded.dimension(), Some(3));
}

#[tokio::test]
async fn saved_file_is_json_array() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("store.json");

    single_document_store()
        .save(&path)
        .await
        .expect("should save store");

    let raw = std::fs::read_to_string(&path).expect("should read store file");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("should be json");
    let entries = value.as_array().expect("should be an array");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], "1");
    assert_eq!(entries[0]["metadata"]["url"], "u");
}

#[tokio::test]
async fn load_missing_file_leaves_store_untouched() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut store = single_document_store();

    assert!(!store.load(&temp_dir.path().join("missing.json")).await);
    assert_eq!(store, single_document_store());
}

#[tokio::test]
async fn load_corrupt_file_leaves_store_untouched() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("corrupt.json");
    std::fs::write(&path, "{ this is not a store").expect("should write file");

    let mut store = single_document_store();
    assert!(!store.load(&path).await);
    assert_eq!(store, single_document_store());
}

#[tokio::test]
async fn load_mixed_dimensions_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("mixed.json");
    let documents = vec![document("1", vec![1.0, 0.0]), document("2", vec![1.0])];
    std::fs::write(
        &path,
        serde_json::to_string(&documents).expect("should serialize"),
    )
    .expect("should write file");

    let mut store = VectorStore::new();
    assert!(!store.load(&path).await);
    assert!(store.is_empty());
}

#[tokio::test]
async fn load_replaces_existing_contents() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("store.json");

    let mut saved = VectorStore::new();
    saved
        .add(document("from-disk", vec![0.0, 1.0]))
        .expect("should add document");
    saved.save(&path).await.expect("should save store");

    let mut store = single_document_store();
    assert!(store.load(&path).await);
    assert_eq!(store.len(), 1);
    assert_eq!(store.documents()[0].id, "from-disk");
}
