//! End-to-end pipeline tests over in-memory storage and scripted providers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use docvault_rag::{
    CHUNK_INDEX_KEY, Document, EmbeddingProvider, GenerationProvider, InMemoryVectorStore,
    NO_DOCUMENTS_MESSAGE, NO_RESPONSE_MESSAGE, RagConfig, RagError, RagPipeline, TOTAL_CHUNKS_KEY,
};
use tokio::sync::Mutex;

/// Deterministic hash-based embedder: the vector direction depends only on
/// the input bytes, so identical texts always embed identically.
struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut embedding = vec![0.0f32; self.dimensions];
        for (i, v) in embedding.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        // L2-normalise so cosine distance behaves.
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[&str]) -> docvault_rag::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// Embedder whose backend is permanently down.
struct FailingEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _texts: &[&str]) -> docvault_rag::Result<Vec<Vec<f32>>> {
        Err(RagError::EmbeddingError {
            provider: "mock".to_string(),
            message: "backend unavailable".to_string(),
        })
    }
}

/// Generator that returns a scripted reply and records what it was asked.
struct ScriptedGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedGenerator {
    fn new(reply: Option<&str>) -> Self {
        Self {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn last_prompt(&self) -> String {
        self.last_prompt.lock().await.clone().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn query(&self, prompt: &str) -> docvault_rag::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().await = Some(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn chat(&self, prompt: &str) -> docvault_rag::Result<Option<String>> {
        self.query(prompt).await
    }

    async fn clear_history(&self) {}
}

fn retrieval_pipeline(config: RagConfig) -> RagPipeline {
    RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbedder::new(16)))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap()
}

fn generating_pipeline(config: RagConfig, generator: Arc<ScriptedGenerator>) -> RagPipeline {
    RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashEmbedder::new(16)))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generation_provider(generator)
        .build()
        .unwrap()
}

#[tokio::test]
async fn ingest_stores_every_chunk_and_reports_the_count() {
    let config = RagConfig::builder().chunk_size(40).chunk_overlap(10).build().unwrap();
    let pipeline = retrieval_pipeline(config);
    pipeline.init().await.unwrap();

    let document = Document::new(
        "Zebra Notes",
        "Zebras graze on the open plain. They sleep standing up. Stripes confuse biting flies.",
    );
    let parent_id = document.id.clone();

    let stored = pipeline.ingest(&[document]).await.unwrap();
    assert!(stored >= 2, "expected the document to split, got {stored} chunk(s)");

    let listed = pipeline.list_all().await.unwrap();
    assert_eq!(listed.len(), stored);
    for chunk in &listed {
        assert!(chunk.id.starts_with(&format!("{parent_id}_")));
        assert_eq!(chunk.title, "Zebra Notes");
        assert!(chunk.embedding.is_none(), "list must not leak embeddings");
    }
}

#[tokio::test]
async fn single_chunk_documents_carry_position_metadata() {
    let pipeline = retrieval_pipeline(RagConfig::default());

    let document = Document::new("Notes", "Short enough for one chunk.")
        .with_id("notes-1")
        .with_metadata("source", "notes.txt");
    let stored = pipeline.ingest(&[document]).await.unwrap();
    assert_eq!(stored, 1);

    let listed = pipeline.list_all().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "notes-1_0");
    assert_eq!(listed[0].metadata.get(CHUNK_INDEX_KEY).map(String::as_str), Some("0"));
    assert_eq!(listed[0].metadata.get(TOTAL_CHUNKS_KEY).map(String::as_str), Some("1"));
    assert_eq!(listed[0].metadata.get("source").map(String::as_str), Some("notes.txt"));
}

#[tokio::test]
async fn reingesting_a_stable_id_overwrites_instead_of_duplicating() {
    let pipeline = retrieval_pipeline(RagConfig::default());

    let first = Document::new("Notes", "alpha beta").with_id("notes-1");
    pipeline.ingest(&[first]).await.unwrap();

    let second = Document::new("Notes", "gamma delta").with_id("notes-1");
    pipeline.ingest(&[second]).await.unwrap();

    let listed = pipeline.list_all().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content, "gamma delta");
}

#[tokio::test]
async fn search_returns_sorted_unique_titles() {
    let config =
        RagConfig::builder().chunk_size(30).chunk_overlap(5).top_k(10).build().unwrap();
    let pipeline = retrieval_pipeline(config);

    let documents = [
        Document::new(
            "Zebra Notes",
            "Zebras graze on the open plain. They sleep standing up. Stripes confuse biting flies.",
        ),
        Document::new("Alpha Notes", "Short."),
    ];
    let stored = pipeline.ingest(&documents).await.unwrap();
    assert!(stored > 2, "multi-chunk document needed to exercise deduplication");

    // top_k covers every stored chunk, so both documents surface, the
    // multi-chunk one exactly once.
    let titles = pipeline.search("anything").await.unwrap();
    assert_eq!(titles, vec!["Alpha Notes".to_string(), "Zebra Notes".to_string()]);
}

#[tokio::test]
async fn generate_feeds_retrieved_context_and_question_to_the_model() {
    let generator = Arc::new(ScriptedGenerator::new(Some("Paris.")));
    let pipeline = generating_pipeline(RagConfig::default(), generator.clone());

    let document = Document::new("France facts", "The capital of France is Paris.");
    pipeline.ingest(&[document]).await.unwrap();

    let answer = pipeline.generate("What is the capital of France?").await.unwrap();
    assert_eq!(answer, "Paris.");
    assert_eq!(generator.calls(), 1);

    let prompt = generator.last_prompt().await;
    assert!(prompt.contains("The capital of France is Paris."));
    assert!(prompt.contains("Question: What is the capital of France?"));
}

#[tokio::test]
async fn generate_joins_context_from_every_retrieved_chunk() {
    let generator = Arc::new(ScriptedGenerator::new(Some("ok")));
    let config = RagConfig::builder().top_k(10).build().unwrap();
    let pipeline = generating_pipeline(config, generator.clone());

    let documents = [
        Document::new("A", "Logs rotate weekly."),
        Document::new("B", "Backups run nightly."),
    ];
    pipeline.ingest(&documents).await.unwrap();
    pipeline.generate("when do things run?").await.unwrap();

    let prompt = generator.last_prompt().await;
    assert!(prompt.contains("Logs rotate weekly."));
    assert!(prompt.contains("Backups run nightly."));
}

#[tokio::test]
async fn generate_short_circuits_when_nothing_is_retrieved() {
    let generator = Arc::new(ScriptedGenerator::new(Some("must never be seen")));
    let pipeline = generating_pipeline(RagConfig::default(), generator.clone());

    let answer = pipeline.generate("anything at all").await.unwrap();
    assert_eq!(answer, NO_DOCUMENTS_MESSAGE);
    assert_eq!(generator.calls(), 0, "the model must not run without context");
}

#[tokio::test]
async fn generate_maps_a_silent_model_to_the_fixed_message() {
    let generator = Arc::new(ScriptedGenerator::new(None));
    let pipeline = generating_pipeline(RagConfig::default(), generator.clone());

    pipeline.ingest(&[Document::new("Notes", "content")]).await.unwrap();
    let answer = pipeline.generate("anything").await.unwrap();
    assert_eq!(answer, NO_RESPONSE_MESSAGE);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn generate_requires_a_generation_provider() {
    let pipeline = retrieval_pipeline(RagConfig::default());
    let err = pipeline.generate("anything").await.unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)), "got {err:?}");
}

#[tokio::test]
async fn summarize_renders_the_template_without_touching_retrieval() {
    let generator = Arc::new(ScriptedGenerator::new(Some("A summary.")));
    // The embedder is down, so any retrieval attempt would surface as an error.
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(FailingEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .generation_provider(generator.clone())
        .build()
        .unwrap();

    let summary = pipeline.summarize("The report text.").await.unwrap();
    assert_eq!(summary, "A summary.");

    let prompt = generator.last_prompt().await;
    assert!(prompt.contains("Text to summarize: The report text."));
}

#[tokio::test]
async fn embedding_failures_propagate_from_ingest_and_search() {
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(FailingEmbedder))
        .vector_store(Arc::new(InMemoryVectorStore::new()))
        .build()
        .unwrap();

    let err = pipeline.ingest(&[Document::new("Notes", "content")]).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }), "got {err:?}");

    let err = pipeline.search("anything").await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }), "got {err:?}");
}
