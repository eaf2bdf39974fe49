//! Named-entity recognition for person mentions.
//!
//! The recognizer is an explicit dependency handed to the pipeline at
//! construction. The production backend (rust-bert token classification) sits
//! behind the optional `ner-bert` feature so that consumers without a libtorch
//! toolchain can still build the crate; without a backend, every recognition
//! fails with [`NerError::ModelUnavailable`] rather than pretending an empty
//! extraction was performed.

use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised by entity recognition backends.
#[derive(Debug, Error)]
pub enum NerError {
    /// No NER model could be loaded for this process.
    #[error("NER model unavailable: {0}")]
    ModelUnavailable(String),
    /// The model was loaded but failed while classifying text.
    #[error("NER inference failed: {0}")]
    Inference(String),
}

/// A single span the recognizer classified, with its entity label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntity {
    /// Text of the recognized span.
    pub text: String,
    /// Entity label assigned by the model (e.g. `PER`, `PERSON`).
    pub label: String,
}

/// Interface implemented by NER backends.
///
/// Given identical text and an identical model version, implementations are
/// expected to return the same spans across runs; model-internal
/// nondeterminism is an accepted limitation of a backend, not of this trait.
pub trait EntityRecognizer: Send + Sync {
    /// Classify entity spans in the supplied text.
    fn recognize(&self, text: &str) -> Result<Vec<NamedEntity>, NerError>;
}

/// Person-name extraction on top of an injected recognizer.
///
/// Runs the model once over the full document text and reduces PERSON-labelled
/// spans to a case-folded, deduplicated name set.
pub struct EntityExtractor {
    recognizer: Box<dyn EntityRecognizer>,
}

impl EntityExtractor {
    /// Wrap a recognizer backend.
    pub fn new(recognizer: Box<dyn EntityRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Extract the set of lowercase person names mentioned in `text`.
    pub fn extract_person_names(&self, text: &str) -> Result<BTreeSet<String>, NerError> {
        let entities = self.recognizer.recognize(text)?;
        let mut names = BTreeSet::new();
        for entity in entities {
            if !is_person_label(&entity.label) {
                continue;
            }
            let name = entity.text.trim().to_lowercase();
            if !name.is_empty() {
                names.insert(name);
            }
        }
        tracing::debug!(names = names.len(), "Extracted person names");
        Ok(names)
    }
}

fn is_person_label(label: &str) -> bool {
    let label = label.to_uppercase();
    label == "PER" || label == "PERSON" || label.ends_with("-PER")
}

/// Build the recognizer backend for the current build configuration.
#[cfg(feature = "ner-bert")]
pub fn load_recognizer() -> Result<Box<dyn EntityRecognizer>, NerError> {
    Ok(Box::new(bert::BertRecognizer::load()?))
}

/// Build the recognizer backend for the current build configuration.
///
/// Without the `ner-bert` feature there is no model to load. The returned
/// backend fails every recognition with [`NerError::ModelUnavailable`], so
/// each document run fails hard while the rest of the service (including
/// queries over previously indexed chunks) stays available.
#[cfg(not(feature = "ner-bert"))]
pub fn load_recognizer() -> Result<Box<dyn EntityRecognizer>, NerError> {
    tracing::warn!("Built without the `ner-bert` feature; document ingestion will be rejected");
    Ok(Box::new(UnavailableRecognizer))
}

/// Backend used when no NER model is compiled in. Every call fails; an
/// absent model is never represented as an empty extraction.
pub struct UnavailableRecognizer;

impl EntityRecognizer for UnavailableRecognizer {
    fn recognize(&self, _text: &str) -> Result<Vec<NamedEntity>, NerError> {
        Err(NerError::ModelUnavailable(
            "built without the `ner-bert` feature".to_string(),
        ))
    }
}

#[cfg(feature = "ner-bert")]
mod bert {
    use super::{EntityRecognizer, NamedEntity, NerError};
    use rust_bert::pipelines::ner::NERModel;
    use std::sync::Mutex;

    /// rust-bert token-classification backend.
    pub struct BertRecognizer {
        // NERModel is not Sync; predictions are serialized through the lock.
        model: Mutex<NERModel>,
    }

    impl BertRecognizer {
        pub fn load() -> Result<Self, NerError> {
            let model = NERModel::new(Default::default())
                .map_err(|err| NerError::ModelUnavailable(err.to_string()))?;
            Ok(Self {
                model: Mutex::new(model),
            })
        }
    }

    impl EntityRecognizer for BertRecognizer {
        fn recognize(&self, text: &str) -> Result<Vec<NamedEntity>, NerError> {
            let model = self
                .model
                .lock()
                .map_err(|_| NerError::Inference("model lock poisoned".to_string()))?;
            let predictions = model.predict_full_entities(&[text]);
            let entities = predictions
                .into_iter()
                .flatten()
                .map(|entity| NamedEntity {
                    text: entity.word,
                    label: entity.label,
                })
                .collect();
            Ok(entities)
        }
    }
}
