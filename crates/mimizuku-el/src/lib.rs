//! EL 記述論理 推論エンジン
//!
//! このクレートは EL フラグメントの完備化 (saturation) アルゴリズムを提供します:
//! - 構造的な概念式 (⊤, 概念名, ⊓, ∃)
//! - 関連概念インデックス
//! - 完備化グラフと 6 つの完備化規則
//! - 包摂クエリ (subsumers / classification)

pub mod config;
pub mod graph;
pub mod loader;
pub mod model;
pub mod reasoner;
pub mod relevance;
pub mod rules;
pub mod trace;

pub use config::ReasonerConfig;
pub use graph::{CompletionGraph, Individual, IndividualId, RoleEdge};
pub use loader::{ConceptFormatter, DlSyntaxFormatter, DlSyntaxLoader, JsonLoader, MalformedAxiom, OntologyLoader, SourceAxiom};
pub use model::{Axiom, AxiomKind, ConceptExpr, Conjunction, TBox};
pub use reasoner::{Reasoner, Saturation};
pub use relevance::RelevanceIndex;
pub use rules::{RuleEngine, RuleKind, Terminology};
pub use trace::{Change, CompletionEvent, CompletionObserver, EventLog, TracingObserver};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElError {
    #[error("Malformed axiom #{index}: {reason}")]
    MalformedAxiom { index: usize, reason: String },

    #[error("Unknown individual: {0}")]
    UnknownIndividual(String),

    #[error("Duplicate individual: {0}")]
    DuplicateIndividual(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Loader error: {0}")]
    LoaderError(String),

    #[error("Parse error at {position}: {message}")]
    ParseError { position: usize, message: String },
}
