pub mod assistant;
pub mod charts;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod ingestion;
pub mod insights;
pub mod lexicon;
pub mod llm;
pub mod patterns;
pub mod profiler;
pub mod quality;
pub mod relevance;
pub mod sampler;
pub mod stats;
pub mod summary;
pub mod table;

pub use assistant::{Analyst, AssistantResponse, ResponseType};
pub use charts::{chart_data, ChartData, ChartKind};
pub use config::Settings;
pub use context::{build_context, chunked_analysis, ChunkAnalysis, ContextAssembler, ContextProfile};
pub use dataset::{Dataset, SemanticType};
pub use error::{AnalystError, Result};
pub use patterns::analyze_patterns;
pub use profiler::{profile, ColumnProfile};
pub use quality::assess_quality;
pub use relevance::{RelevanceDecision, RelevanceGate};
pub use sampler::{sample, SampleResult, SampleStrategy, Sampler};
pub use summary::summarize;
