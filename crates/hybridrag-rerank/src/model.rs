//! Local model directories: lookup and loading.
//!
//! A model directory holds `config.json`, `tokenizer.json` and either
//! `model.safetensors` or `pytorch_model.bin`.

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::info;

use hybridrag_core::{Error, Result};

/// Upper bound for sequence length when the config does not give one.
const DEFAULT_MAX_POSITIONS: usize = 512;

/// Fields read from `config.json` in addition to the BERT config itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigShape {
    pub hidden_size: usize,
    #[serde(default)]
    pub max_position_embeddings: Option<usize>,
    #[serde(default)]
    pub model_type: Option<String>,
}

impl ConfigShape {
    pub fn max_positions(&self) -> usize { self.max_position_embeddings.unwrap_or(DEFAULT_MAX_POSITIONS) }
}

pub struct ModelBundle {
    pub dir: PathBuf,
    pub bert_config: BertConfig,
    pub shape: ConfigShape,
    pub tokenizer: Tokenizer,
    pub tensors: HashMap<String, Tensor>,
    pub device: Device,
}

impl ModelBundle {
    pub fn var_builder(&self) -> VarBuilder<'static> {
        VarBuilder::from_tensors(self.tensors.clone(), DType::F32, &self.device)
    }

    pub fn has_tensor(&self, name: &str) -> bool { self.tensors.contains_key(name) }

    pub fn tensor_dims(&self, name: &str) -> Option<Vec<usize>> { self.tensors.get(name).map(|t| t.dims().to_vec()) }

    /// Sub-path of the encoder weights: `None` at the root, or the model type
    /// (`bert`) for checkpoints saved with a task head.
    pub fn encoder_prefix(&self) -> Option<String> {
        if self.has_tensor("embeddings.word_embeddings.weight") { return None; }
        self.shape.model_type.clone().filter(|mt| self.has_tensor(&format!("{mt}.embeddings.word_embeddings.weight")))
    }

    /// Loads the BERT encoder from wherever it lives in the checkpoint.
    pub fn load_encoder(&self) -> Result<BertModel> {
        let vb = self.var_builder();
        let vb = match self.encoder_prefix() { Some(prefix) => vb.pp(prefix), None => vb };
        BertModel::load(vb, &self.bert_config).map_err(|e| init_err(format!("{}: {e}", self.dir.display())))
    }
}

fn init_err(e: impl std::fmt::Display) -> Error { Error::RerankerInit(e.to_string()) }

/// Finds a model directory: `name` as a path, then `$APP_MODEL_DIR/<name>`,
/// then `models/<name>`.
pub fn resolve_model_dir(name: &str) -> Result<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.is_dir() { return Ok(direct); }
    if let Ok(root) = std::env::var("APP_MODEL_DIR") {
        let p = Path::new(&root).join(name);
        if p.is_dir() { return Ok(p); }
    }
    let local = Path::new("models").join(name);
    if local.is_dir() { return Ok(local); }
    Err(Error::RerankerInit(format!("could not locate model directory for '{name}'")))
}

fn load_tensors(dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = dir.join("model.safetensors");
    if safetensors.exists() {
        return candle_core::safetensors::load(&safetensors, device).map_err(|e| init_err(format!("{}: {e}", safetensors.display())));
    }
    let pickle = dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle).map_err(|e| init_err(format!("{}: {e}", pickle.display())))?;
        return weights
            .into_iter()
            .map(|(name, t)| t.to_device(device).map(|t| (name, t)))
            .collect::<candle_core::Result<HashMap<_, _>>>()
            .map_err(|e| init_err(format!("{}: {e}", pickle.display())));
    }
    Err(Error::RerankerInit(format!("no model.safetensors or pytorch_model.bin in {}", dir.display())))
}

pub fn load_bundle(dir: &Path, device: &Device) -> Result<ModelBundle> {
    let config_path = dir.join("config.json");
    let raw = std::fs::read_to_string(&config_path).map_err(|e| init_err(format!("{}: {e}", config_path.display())))?;
    let bert_config: BertConfig = serde_json::from_str(&raw).map_err(|e| init_err(format!("{}: {e}", config_path.display())))?;
    let shape: ConfigShape = serde_json::from_str(&raw).map_err(|e| init_err(format!("{}: {e}", config_path.display())))?;

    let tokenizer_path = dir.join("tokenizer.json");
    let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| init_err(format!("{}: {e}", tokenizer_path.display())))?;

    let tensors = load_tensors(dir, device)?;
    info!(path = %dir.display(), tensors = tensors.len(), "model weights loaded");
    Ok(ModelBundle { dir: dir.to_path_buf(), bert_config, shape, tokenizer, tensors, device: device.clone() })
}
