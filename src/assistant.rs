//! Analyst - session coordinator for question answering over one dataset.
//!
//! Holds the loaded dataset, a relevance gate scoped to its columns and the
//! language model. Every question goes through the same pipeline:
//! 1. no dataset -> `NoData`
//! 2. out of scope -> `Rejected`
//! 3. opinion request -> technical opinion, computed locally
//! 4. otherwise -> LLM answer over the comprehensive context, plus insights

use crate::config::Settings;
use crate::context::{ContextAssembler, ContextProfile};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::ingestion;
use crate::insights::{analyze_dataset, technical_opinion};
use crate::lexicon::Lexicon;
use crate::llm::{answer_prompt, insight_prompt, LanguageModel};
use crate::relevance::RelevanceGate;
use crate::sampler::Sampler;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    NoData,
    Rejected,
    Opinion,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantResponse {
    pub kind: ResponseType,
    pub message: String,
    pub insights: Option<String>,
}

impl AssistantResponse {
    fn new(kind: ResponseType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            insights: None,
        }
    }
}

pub struct Analyst {
    settings: Settings,
    dataset: Option<Dataset>,
    gate: RelevanceGate,
    assembler: ContextAssembler,
    model: Box<dyn LanguageModel>,
}

impl Analyst {
    pub fn new(settings: Settings, model: Box<dyn LanguageModel>) -> Result<Self> {
        settings.validate()?;
        let lexicon = Lexicon::load_or_builtin(settings.lexicon_path.as_deref())?;
        let gate = RelevanceGate::new(lexicon)
            .with_length_bounds(settings.min_question_length, settings.max_question_length);
        let assembler = ContextAssembler::new(Sampler::new(settings.max_sample_size));

        Ok(Self {
            settings,
            dataset: None,
            gate,
            assembler,
            model,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn gate(&self) -> &RelevanceGate {
        &self.gate
    }

    pub fn load_csv(&mut self, path: impl AsRef<Path>) -> Result<&Dataset> {
        let dataset = ingestion::load_csv(path, &self.settings)?;
        Ok(self.set_dataset(dataset))
    }

    /// Replace the current dataset; the gate switches to its columns.
    pub fn set_dataset(&mut self, dataset: Dataset) -> &Dataset {
        let columns = dataset.column_names();
        self.gate.set_active_columns(columns.as_slice());
        info!(
            "Dataset set: {} rows x {} columns",
            dataset.height(),
            dataset.width()
        );
        self.dataset.insert(dataset)
    }

    pub fn clear_dataset(&mut self) {
        self.dataset = None;
        self.gate.clear_active_columns();
    }

    pub fn context(&self, profile: ContextProfile) -> Result<Option<String>> {
        self.dataset
            .as_ref()
            .map(|ds| self.assembler.assemble(ds, profile))
            .transpose()
    }

    /// LLM insights for the dataset as a whole
    pub async fn initial_insights(&self) -> Result<Option<String>> {
        let Some(context) = self.context(ContextProfile::Comprehensive)? else {
            return Ok(None);
        };
        let insights = self.model.generate(&insight_prompt(&context, None)).await?;
        Ok(Some(insights))
    }

    pub fn is_opinion_request(&self, question: &str) -> bool {
        let q = question.to_lowercase();
        self.gate
            .lexicon()
            .opinion_requests()
            .any(|term| q.contains(term))
    }

    pub async fn ask(&self, question: &str) -> Result<AssistantResponse> {
        let Some(dataset) = self.dataset.as_ref() else {
            return Ok(AssistantResponse::new(
                ResponseType::NoData,
                "Please load a CSV file first.",
            ));
        };

        let decision = self.gate.evaluate(question, None::<&[String]>);
        if !decision.relevant {
            info!("Rejected question: {}", decision.reason);
            return Ok(AssistantResponse::new(
                ResponseType::Rejected,
                format!(
                    "This question does not look related to the loaded data ({}). \
                     Please ask about the dataset's columns, values or patterns.",
                    decision.reason
                ),
            ));
        }

        if self.is_opinion_request(question) {
            return Ok(AssistantResponse::new(
                ResponseType::Opinion,
                technical_opinion(dataset)?,
            ));
        }

        let context = self.assembler.assemble(dataset, ContextProfile::Comprehensive)?;
        let answer = self.model.generate(&answer_prompt(&context, question)).await?;
        let follow_up = self
            .model
            .generate(&insight_prompt(&context, Some(question)))
            .await?;
        let facts = analyze_dataset(dataset)?.render();

        Ok(AssistantResponse {
            kind: ResponseType::Answer,
            message: answer,
            insights: Some(format!("{}\n{}", facts, follow_up)),
        })
    }
}
