use std::fs;
use std::path::Path;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;
use tracing::info;

use crate::embed::EmbeddingProvider;
use crate::error::{FaqbotError, Result};

fn oracle(action: &str, err: impl std::fmt::Display) -> FaqbotError {
    FaqbotError::EmbeddingOracleFailure(format!("{action}: {err}"))
}

/// BERT hyperparameters as found in a sentence-transformers `config.json`.
/// Missing fields fall back to all-MiniLM-L6-v2.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct BertShape {
    hidden_size: usize,
    intermediate_size: usize,
    num_attention_heads: usize,
    num_hidden_layers: usize,
    vocab_size: usize,
    max_position_embeddings: usize,
    type_vocab_size: usize,
    layer_norm_eps: f64,
}

impl Default for BertShape {
    fn default() -> Self {
        Self {
            hidden_size: 384,
            intermediate_size: 1536,
            num_attention_heads: 12,
            num_hidden_layers: 6,
            vocab_size: 30522,
            max_position_embeddings: 512,
            type_vocab_size: 2,
            layer_norm_eps: 1e-12,
        }
    }
}

impl BertShape {
    /// `config.json` next to the weights, when present.
    fn beside(model_path: &Path) -> Result<Self> {
        let path = model_path.with_file_name("config.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .map_err(|err| FaqbotError::Config(format!("read {}: {err}", path.display())))?;
        let shape: Self = serde_json::from_str(&text)
            .map_err(|err| FaqbotError::Config(format!("parse {}: {err}", path.display())))?;
        if shape.num_attention_heads == 0 || shape.hidden_size % shape.num_attention_heads != 0 {
            return Err(FaqbotError::Config(format!(
                "hidden_size {} is not divisible by {} attention heads",
                shape.hidden_size, shape.num_attention_heads
            )));
        }
        Ok(shape)
    }

    fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
}

struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    norm: LayerNorm,
    heads: usize,
    head_dim: usize,
}

impl SelfAttention {
    fn load(vb: VarBuilder, shape: &BertShape) -> candle_core::Result<Self> {
        let h = shape.hidden_size;
        let inner = vb.pp("self");
        let out = vb.pp("output");
        Ok(Self {
            query: candle_nn::linear(h, h, inner.pp("query"))?,
            key: candle_nn::linear(h, h, inner.pp("key"))?,
            value: candle_nn::linear(h, h, inner.pp("value"))?,
            output: candle_nn::linear(h, h, out.pp("dense"))?,
            norm: candle_nn::layer_norm(h, shape.layer_norm_eps, out.pp("LayerNorm"))?,
            heads: shape.num_attention_heads,
            head_dim: shape.head_dim(),
        })
    }

    fn split_heads(&self, x: &Tensor, seq_len: usize) -> candle_core::Result<Tensor> {
        x.reshape((1, seq_len, self.heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let (_, seq_len, hidden) = x.dims3()?;
        let q = self.split_heads(&self.query.forward(x)?, seq_len)?;
        let k = self.split_heads(&self.key.forward(x)?, seq_len)?;
        let v = self.split_heads(&self.value.forward(x)?, seq_len)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let weights = q.matmul(&k.t()?)?.affine(scale, 0.0)?;
        let weights = candle_nn::ops::softmax(&weights, D::Minus1)?;
        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((1, seq_len, hidden))?;

        self.norm.forward(&(x + self.output.forward(&context)?)?)
    }
}

struct FeedForward {
    up: Linear,
    down: Linear,
    norm: LayerNorm,
}

impl FeedForward {
    fn load(vb: VarBuilder, shape: &BertShape) -> candle_core::Result<Self> {
        Ok(Self {
            up: candle_nn::linear(
                shape.hidden_size,
                shape.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            down: candle_nn::linear(
                shape.intermediate_size,
                shape.hidden_size,
                vb.pp("output").pp("dense"),
            )?,
            norm: candle_nn::layer_norm(
                shape.hidden_size,
                shape.layer_norm_eps,
                vb.pp("output").pp("LayerNorm"),
            )?,
        })
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        let h = self.down.forward(&self.up.forward(x)?.gelu_erf()?)?;
        self.norm.forward(&(x + h)?)
    }
}

struct EncoderLayer {
    attention: SelfAttention,
    ffn: FeedForward,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, shape: &BertShape) -> candle_core::Result<Self> {
        Ok(Self {
            attention: SelfAttention::load(vb.pp("attention"), shape)?,
            ffn: FeedForward::load(vb, shape)?,
        })
    }

    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        self.ffn.forward(&self.attention.forward(x)?)
    }
}

struct Encoder {
    words: Embedding,
    positions: Embedding,
    token_types: Embedding,
    norm: LayerNorm,
    layers: Vec<EncoderLayer>,
    device: Device,
}

impl Encoder {
    fn load(vb: VarBuilder, shape: &BertShape, device: Device) -> candle_core::Result<Self> {
        let emb = vb.pp("embeddings");
        let h = shape.hidden_size;
        let layers = (0..shape.num_hidden_layers)
            .map(|i| EncoderLayer::load(vb.pp("encoder").pp("layer").pp(i.to_string()), shape))
            .collect::<candle_core::Result<Vec<_>>>()?;
        Ok(Self {
            words: candle_nn::embedding(shape.vocab_size, h, emb.pp("word_embeddings"))?,
            positions: candle_nn::embedding(
                shape.max_position_embeddings,
                h,
                emb.pp("position_embeddings"),
            )?,
            token_types: candle_nn::embedding(
                shape.type_vocab_size,
                h,
                emb.pp("token_type_embeddings"),
            )?,
            norm: candle_nn::layer_norm(h, shape.layer_norm_eps, emb.pp("LayerNorm"))?,
            layers,
            device,
        })
    }

    /// Mean-pooled, L2-normalized sentence vector.
    fn forward(&self, token_ids: &[u32]) -> candle_core::Result<Vec<f32>> {
        let seq_len = token_ids.len();
        let ids = Tensor::new(token_ids, &self.device)?;
        let positions = Tensor::arange(0u32, seq_len as u32, &self.device)?;
        let types = Tensor::zeros(seq_len, DType::U32, &self.device)?;

        let hidden = ((self.words.forward(&ids)? + self.positions.forward(&positions)?)?
            + self.token_types.forward(&types)?)?;
        let mut hidden = self.norm.forward(&hidden)?.unsqueeze(0)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        let pooled = hidden.mean(1)?.squeeze(0)?;
        let norm: f32 = pooled.sqr()?.sum_all()?.sqrt()?.to_scalar()?;
        let pooled = if norm > 0.0 {
            pooled.affine(1.0 / norm as f64, 0.0)?
        } else {
            pooled
        };
        pooled.to_vec1::<f32>()
    }
}

/// Sentence embeddings from a BERT-family model such as all-MiniLM-L6-v2, run on the
/// CPU with candle. Loads `model.safetensors`, a `tokenizer.json`, and an optional
/// `config.json` beside the weights.
pub struct MiniLmEmbeddingProvider {
    encoder: Encoder,
    tokenizer: tokenizers::Tokenizer,
    max_tokens: usize,
}

impl MiniLmEmbeddingProvider {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let shape = BertShape::beside(model_path)?;
        let device = Device::Cpu;
        // SAFETY: the weights file must not change while it is mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[model_path], DType::F32, &device)
                .map_err(|err| oracle(&format!("map {}", model_path.display()), err))?
        };
        let encoder = Encoder::load(vb, &shape, device)
            .map_err(|err| oracle(&format!("load {}", model_path.display()), err))?;
        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path)
            .map_err(|err| oracle(&format!("load {}", tokenizer_path.display()), err))?;
        info!(
            model = %model_path.display(),
            layers = shape.num_hidden_layers,
            dim = shape.hidden_size,
            "embedding model loaded"
        );
        Ok(Self {
            encoder,
            tokenizer,
            max_tokens: shape.max_position_embeddings,
        })
    }

    /// Token ids for `text`, cut to the position limit while keeping the final `[SEP]`.
    fn token_ids(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|err| oracle("tokenize", err))?;
        let mut ids = encoding.get_ids().to_vec();
        if ids.len() > self.max_tokens {
            let last = ids[ids.len() - 1];
            ids.truncate(self.max_tokens - 1);
            ids.push(last);
        }
        Ok(ids)
    }
}

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let ids = self.token_ids(text)?;
        self.encoder
            .forward(&ids)
            .map_err(|err| oracle("encode", err))
    }
}
