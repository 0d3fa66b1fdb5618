use anyhow::{Context, Result, anyhow, bail};
use hf_hub::api::sync::Api;
use ndarray::{Array2, ArrayD, s};
use std::collections::HashMap;
use tokenizers::Tokenizer;

// onnx runtime (ORT)
use ort::inputs;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::value::Value;

use crate::sentiment::Sentiment;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda,
}

impl std::str::FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda),
            other => bail!("unknown device {other:?} (expected \"cpu\" or \"cuda\")"),
        }
    }
}

/// Text-classification head over a Hugging Face model: tokenizer + ONNX
/// session + the label names from the repo's config.json.
pub struct SentimentClassifier {
    tok: Tokenizer,
    session: Session,
    labels: HashMap<usize, String>,
    feeds_token_type_ids: bool,
}

impl SentimentClassifier {
    pub fn new(model_id: &str, device: Device) -> Result<Self> {
        let tok = Tokenizer::from_pretrained(model_id, None)
            .map_err(|e| anyhow!("{e}"))
            .context("load tokenizer")?;
        let labels = resolve_labels(model_id).context("resolve id2label from config.json")?;
        let onnx_path = resolve_onnx(model_id).context("resolve ONNX model via HF Hub")?;
        let session = build_session(&onnx_path, device)?;
        // distilbert-style graphs have no token_type_ids input; bert-style do
        let feeds_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");
        Ok(Self {
            tok,
            session,
            labels,
            feeds_token_type_ids,
        })
    }

    /// Classify a batch in one session run. Output order matches input
    /// order; one `Sentiment` per input text.
    pub fn classify(&mut self, texts: &[String]) -> Result<Vec<Sentiment>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tok
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("{e}"))?;
        let batch = encodings.len();
        let max_len = encodings
            .iter()
            .map(|enc| enc.get_ids().len())
            .max()
            .unwrap_or(0);
        if max_len == 0 {
            bail!("tokenizer produced zero-length sequences");
        }

        // Build padded input tensors
        let mut ids = Array2::<i64>::zeros((batch, max_len));
        let mut mask = Array2::<i64>::zeros((batch, max_len));
        let mut type_ids = Array2::<i64>::zeros((batch, max_len));
        for (i, enc) in encodings.iter().enumerate() {
            for (j, &id) in enc.get_ids().iter().enumerate() {
                ids[[i, j]] = id as i64;
            }
            for (j, &m) in enc.get_attention_mask().iter().enumerate() {
                mask[[i, j]] = m as i64;
            }
            for (j, &t) in enc.get_type_ids().iter().enumerate() {
                type_ids[[i, j]] = t as i64;
            }
        }

        let ids_val = Value::from_array(ids).map_err(|e| anyhow!("{}", e))?;
        let mask_val = Value::from_array(mask).map_err(|e| anyhow!("{}", e))?;
        let type_ids_val = Value::from_array(type_ids).map_err(|e| anyhow!("{}", e))?;

        let outputs = if self.feeds_token_type_ids {
            self.session.run(inputs! {
                "input_ids" => &ids_val,
                "attention_mask" => &mask_val,
                "token_type_ids" => &type_ids_val,
            })
        } else {
            self.session.run(inputs! {
                "input_ids" => &ids_val,
                "attention_mask" => &mask_val,
            })
        }
        .map_err(|e| anyhow!("{}", e))?;

        // First output holds the logits, [batch, num_labels]
        let first = outputs
            .iter()
            .next()
            .map(|(_n, v)| v)
            .ok_or_else(|| anyhow!("no outputs from ONNX session"))?;
        let arr_view = first.try_extract_array().map_err(|e| anyhow!("{}", e))?;
        let logits: ArrayD<f32> = arr_view.to_owned();
        if logits.ndim() != 2 {
            bail!("unexpected logits rank {}; expected 2", logits.ndim());
        }
        if logits.shape()[0] != batch {
            bail!(
                "logits batch {} does not match input batch {}",
                logits.shape()[0],
                batch
            );
        }

        let mut out = Vec::with_capacity(batch);
        for i in 0..batch {
            let row = logits.slice(s![i, ..]).to_vec();
            let probs = softmax(&row);
            let (idx, score) = argmax(&probs);
            let label = self
                .labels
                .get(&idx)
                .cloned()
                .unwrap_or_else(|| format!("LABEL_{idx}"));
            out.push(Sentiment {
                label,
                score: score as f64,
            });
        }
        Ok(out)
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn argmax(probs: &[f32]) -> (usize, f32) {
    let mut best = (0usize, f32::NEG_INFINITY);
    for (i, &p) in probs.iter().enumerate() {
        if p > best.1 {
            best = (i, p);
        }
    }
    best
}

fn resolve_labels(model_id: &str) -> Result<HashMap<usize, String>> {
    let api = Api::new()?;
    let repo = api.model(model_id.to_string());
    let path = repo.get("config.json")?;
    let config: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;

    let mut labels = HashMap::new();
    if let Some(map) = config.get("id2label").and_then(|v| v.as_object()) {
        for (key, value) in map {
            if let (Ok(idx), Some(label)) = (key.parse::<usize>(), value.as_str()) {
                labels.insert(idx, label.to_string());
            }
        }
    }
    // missing id2label is not fatal; classify falls back to LABEL_{i}
    Ok(labels)
}

fn resolve_onnx(model_id: &str) -> Result<std::path::PathBuf> {
    let api = Api::new()?;
    let repo = api.model(model_id.to_string());

    let candidates = ["onnx/model.onnx", "model.onnx"];
    for name in candidates {
        if let Ok(p) = repo.get(name) {
            return Ok(p);
        }
    }

    bail!("could not find an ONNX file in {model_id}")
}

fn build_session(onnx_path: &std::path::Path, device: Device) -> Result<Session> {
    let builder = SessionBuilder::new()
        .map_err(|e| anyhow!("{}", e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| anyhow!("{}", e))?;

    #[allow(unreachable_code)]
    let builder = match device {
        Device::Cpu => builder,
        Device::Cuda => {
            #[cfg(feature = "cuda")]
            {
                use ort::execution_providers::CUDAExecutionProvider;
                builder
                    .with_execution_providers([CUDAExecutionProvider::default().into()])
                    .map_err(|e| anyhow!("{}", e))?
            }
            #[cfg(not(feature = "cuda"))]
            {
                bail!(
                    "binary built without CUDA support; rebuild with `--features cuda` and ensure CUDA is available"
                )
            }
        }
    };

    let model_bytes = std::fs::read(onnx_path).map_err(|e| anyhow!("{}", e))?;
    let session = builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| anyhow!("{}", e))?;
    Ok(session)
}
