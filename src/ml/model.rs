// ============================================================
// Layer 5 - Encoder-Decoder Translation Model
// ============================================================
// A post-norm transformer encoder-decoder:
//
//   source ids [B, S]                 target ids [B, T]
//        │                                 │  drop last → [B, T-1]
//   token + position embedding        token + position embedding
//        │                                 │
//   EncoderBlock × L                  DecoderBlock × L
//   (self-attn, pad mask)             (causal self-attn + pad mask,
//        │                             cross-attn over memory)
//        └──────── memory [B, S, D] ───────┤
//                                          ▼
//                                   Linear → logits [B, T-1, V]
//
// The decoder sees target[:, :-1] and is scored against
// target[:, 1:], so position t predicts token t+1.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

use anyhow::Result;
use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::gelu,
};

use crate::domain::traits::TextCodec;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct TranslationModelConfig {
    pub vocab_size: usize,
    /// Longest sequence (special tokens included) on either side
    pub max_len:    usize,
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_layers: usize,
    pub d_ff:       usize,
    pub dropout:    f64,
    #[config(default = 0)]
    pub pad_id:     usize,
    #[config(default = 2)]
    pub bos_id:     usize,
    #[config(default = 3)]
    pub eos_id:     usize,
}

impl TranslationModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TranslationModel<B> {
        let src_embedding      = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let trg_embedding      = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_len, self.d_model).init(device);

        let encoder: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let decoder: Vec<DecoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();

        TranslationModel {
            src_embedding,
            trg_embedding,
            position_embedding,
            encoder,
            decoder,
            encoder_norm: LayerNormConfig::new(self.d_model).init(device),
            decoder_norm: LayerNormConfig::new(self.d_model).init(device),
            output:       LinearConfig::new(self.d_model, self.vocab_size).init(device),
            dropout:      DropoutConfig::new(self.dropout).init(),
            max_len:      self.max_len,
            pad_id:       self.pad_id,
            bos_id:       self.bos_id,
            eos_id:       self.eos_id,
        }
    }

    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn:   self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn:   self.attention(device),
            cross_attn:  self.attention(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:       LayerNormConfig::new(self.d_model).init(device),
            norm2:       LayerNormConfig::new(self.d_model).init(device),
            norm3:       LayerNormConfig::new(self.d_model).init(device),
            dropout:     DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── EncoderBlock ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(pad_mask))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));

        let ffn = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn))
    }
}

// ─── DecoderBlock ─────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub cross_attn:  MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub norm3:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(
        &self,
        x:           Tensor<B, 3>,
        memory:      Tensor<B, 3>,
        causal_mask: Tensor<B, 3, Bool>,
        trg_pad:     Tensor<B, 2, Bool>,
        src_pad:     Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let attn = self
            .self_attn
            .forward(
                MhaInput::self_attn(x.clone())
                    .mask_attn(causal_mask)
                    .mask_pad(trg_pad),
            )
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));

        let cross = self
            .cross_attn
            .forward(MhaInput::new(x.clone(), memory.clone(), memory).mask_pad(src_pad))
            .context;
        let x = self.norm2.forward(x + self.dropout.forward(cross));

        let ffn = self.ffn_linear2.forward(gelu(self.ffn_linear1.forward(x.clone())));
        self.norm3.forward(x + self.dropout.forward(ffn))
    }
}

// ─── TranslationModel ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TranslationModel<B: Backend> {
    pub src_embedding:      Embedding<B>,
    pub trg_embedding:      Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub encoder:            Vec<EncoderBlock<B>>,
    pub decoder:            Vec<DecoderBlock<B>>,
    pub encoder_norm:       LayerNorm<B>,
    pub decoder_norm:       LayerNorm<B>,
    pub output:             Linear<B>,
    pub dropout:            Dropout,
    pub max_len:            usize,
    pub pad_id:             usize,
    pub bos_id:             usize,
    pub eos_id:             usize,
}

impl<B: Backend> TranslationModel<B> {
    /// source: [B, S], target: [B, T] → logits [B, T-1, vocab]
    pub fn forward(&self, source: Tensor<B, 2, Int>, target: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, trg_len] = target.dims();
        let decoder_input = target.slice([0..batch_size, 0..trg_len - 1]);

        let (memory, src_pad) = self.encode(source);
        self.decode(decoder_input, memory, src_pad)
    }

    /// Cross entropy between logits and target[:, 1:], ignoring padding.
    pub fn loss(&self, logits: Tensor<B, 3>, target: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        let [batch_size, positions, vocab] = logits.dims();

        let labels = target
            .slice([0..batch_size, 1..positions + 1])
            .reshape([batch_size * positions]);
        let logits = logits.reshape([batch_size * positions, vocab]);

        CrossEntropyLossConfig::new()
            .with_pad_tokens(Some(vec![self.pad_id]))
            .init(&logits.device())
            .forward(logits, labels)
    }

    /// Forward pass and loss in one call.
    pub fn forward_loss(
        &self,
        source: Tensor<B, 2, Int>,
        target: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let logits = self.forward(source, target.clone());
        let loss   = self.loss(logits.clone(), target);
        (loss, logits)
    }

    /// Encoder memory [B, S, D] and the source padding mask [B, S].
    pub fn encode(&self, source: Tensor<B, 2, Int>) -> (Tensor<B, 3>, Tensor<B, 2, Bool>) {
        let pad_mask = source.clone().equal_elem(self.pad_id as i64);

        let mut x = self.embed(&self.src_embedding, source);
        for block in &self.encoder {
            x = block.forward(x, pad_mask.clone());
        }
        (self.encoder_norm.forward(x), pad_mask)
    }

    /// Decoder logits [B, T, vocab] for an already shifted target prefix.
    pub fn decode(
        &self,
        target:  Tensor<B, 2, Int>,
        memory:  Tensor<B, 3>,
        src_pad: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch_size, trg_len] = target.dims();
        let device  = target.device();
        let trg_pad = target.clone().equal_elem(self.pad_id as i64);
        let causal  = generate_autoregressive_mask::<B>(batch_size, trg_len, &device);

        let mut x = self.embed(&self.trg_embedding, target);
        for block in &self.decoder {
            x = block.forward(x, memory.clone(), causal.clone(), trg_pad.clone(), src_pad.clone());
        }
        self.output.forward(self.decoder_norm.forward(x))
    }

    fn embed(&self, table: &Embedding<B>, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();
        let tok_emb = table.forward(ids);

        // Attention is order-blind, so position is added explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        self.dropout.forward(tok_emb + pos_emb)
    }

    /// Greedy decoding of one sentence: start from [BOS], append the argmax
    /// token until [EOS] or `max_len` tokens.
    pub fn translate(&self, text: &str, codec: &dyn TextCodec) -> Result<String> {
        let ids = self.greedy_ids(codec.encode(text)?);
        codec.decode(&ids, true)
    }

    /// Greedy output ids (starting with [BOS]) for one encoded source sequence.
    pub fn greedy_ids(&self, mut source_ids: Vec<u32>) -> Vec<u32> {
        if source_ids.len() > self.max_len {
            source_ids.truncate(self.max_len);
            if let Some(last) = source_ids.last_mut() {
                *last = self.eos_id as u32;
            }
        }

        let device    = self.output.weight.val().device();
        let src_flat: Vec<i32> = source_ids.iter().map(|&id| id as i32).collect();
        let source    = Tensor::<B, 1, Int>::from_ints(src_flat.as_slice(), &device)
            .reshape([1, src_flat.len()]);
        let (memory, src_pad) = self.encode(source);

        let mut output: Vec<i32> = vec![self.bos_id as i32];
        while output.len() < self.max_len {
            let prefix = Tensor::<B, 1, Int>::from_ints(output.as_slice(), &device)
                .reshape([1, output.len()]);
            let logits = self.decode(prefix, memory.clone(), src_pad.clone());
            let [_, steps, vocab] = logits.dims();

            let next = logits
                .slice([0..1, steps - 1..steps, 0..vocab])
                .reshape([1, vocab])
                .argmax(1)
                .into_scalar()
                .elem::<i64>() as i32;

            output.push(next);
            if next == self.eos_id as i32 {
                break;
            }
        }

        output.into_iter().map(|id| id as u32).collect()
    }
}
