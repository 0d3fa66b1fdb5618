mod classifier;

pub use classifier::{Device, SentimentClassifier};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Sentiment annotation for a single headline. `score` is the winning
/// class probability, in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f64,
}

type Registry = Mutex<HashMap<(String, Device), Arc<Mutex<SentimentClassifier>>>>;

/// Process-wide classifier cache keyed by (model id, device), populated on
/// first use. Session construction is expensive (tokenizer + model file
/// resolution + ONNX session), so repeat calls reuse the same handle.
static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn classifier_for(model_id: &str, device: Device) -> Result<Arc<Mutex<SentimentClassifier>>> {
    let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = registry
        .lock()
        .map_err(|_| anyhow!("classifier registry lock poisoned"))?;
    let key = (model_id.to_string(), device);
    if let Some(existing) = map.get(&key) {
        return Ok(existing.clone());
    }
    // built under the registry lock so concurrent callers load a model once
    let built = Arc::new(Mutex::new(SentimentClassifier::new(model_id, device)?));
    map.insert(key, built.clone());
    Ok(built)
}

/// Annotate a batch of titles in one model call, preserving input order.
/// An empty batch short-circuits without resolving or loading the model.
/// Any failure here is fatal to the run; there is no partial annotation.
pub fn annotate(model_id: &str, device: Device, titles: &[String]) -> Result<Vec<Sentiment>> {
    if titles.is_empty() {
        return Ok(Vec::new());
    }
    let classifier = classifier_for(model_id, device)?;
    let mut guard = classifier
        .lock()
        .map_err(|_| anyhow!("classifier lock poisoned"))?;
    guard.classify(titles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_short_circuits_without_loading_a_model() {
        // no network and no model files in the test environment, so this
        // only passes if the registry is never touched
        let out = annotate("distilbert-base-uncased-finetuned-sst-2-english", Device::Cpu, &[])
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn device_parses_from_env_style_strings() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda);
        assert!("tpu".parse::<Device>().is_err());
    }
}
