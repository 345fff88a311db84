//! Retrieval-augmented answering over the policy document
//!
//! ```text
//! startup:   document ──► pages ──► embeddings ──► FlatL2Index
//!
//! question ──► embed ──► top-k pages ──► prompt ──► Gemini ──► answer
//!                                                      │
//!                                          (error) ────┴──► retrieved text
//! ```

pub mod engine;
pub mod prompt;

pub use engine::{Answer, AnswerSource, RagEngine, RagOptions, RetrievedChunk};
