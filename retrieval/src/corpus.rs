//! Documents and the corpus they form.

use saathi_embeddings::Embedding;
use serde::{Deserialize, Serialize};

/// Sentences indexed when no corpus is configured.
const DEFAULT_SENTENCES: &[&str] = &[
    "DigiSaathi helps people learn about digital technologies.",
    "UPI lets you send money instantly from your bank account using a mobile phone.",
    "A strong password mixes letters, numbers and symbols and is never reused.",
    "Two-factor authentication adds a one-time code on top of your password.",
    "DigiLocker stores verified copies of government documents in the cloud.",
    "Never share an OTP with anyone, including callers claiming to be from your bank.",
    "Public Wi-Fi networks can be monitored, so avoid banking on them.",
    "Aadhaar is a twelve-digit identity number issued to residents of India.",
];

/// The built-in corpus.
pub fn default_corpus() -> Vec<String> {
    DEFAULT_SENTENCES.iter().map(|s| (*s).to_string()).collect()
}

/// A single indexed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Position in the corpus.
    pub id: usize,

    /// Original text.
    pub text: String,

    /// Embedding of `text`.
    pub vector: Embedding,

    /// True when `vector` is a fallback rather than a live embedding.
    pub is_fallback: bool,
}

/// Ordered documents sharing a single vector dimension.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    dimension: usize,
}

impl Corpus {
    pub(crate) fn new(documents: Vec<Document>, dimension: usize) -> Self {
        debug_assert!(documents.iter().all(|d| d.vector.len() == dimension));
        debug_assert!(documents.iter().enumerate().all(|(i, d)| d.id == i));
        Self {
            documents,
            dimension,
        }
    }

    /// Get a document by id.
    pub fn get(&self, id: usize) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Vector dimension shared by every document.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Ids of documents whose vectors are fallbacks.
    pub fn fallback_ids(&self) -> Vec<usize> {
        self.documents
            .iter()
            .filter(|d| d.is_fallback)
            .map(|d| d.id)
            .collect()
    }
}
