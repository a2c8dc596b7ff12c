//! Prompt codec: maps prompt text to token ids and generated ids back to
//! text, using the flat vocabulary shipped alongside the exported engine
//! bundle.
//!
//! The vocabulary file is the sentencepiece-style `vocab.json` emitted at
//! export time: a single JSON object of `token -> id`, where word-initial
//! tokens carry the `▁` marker and the specials below hold fixed slots.
//! Encoding here only needs to be faithful for prompts (short instruction
//! text); the heavy lifting — transcription — happens inside the graph.

use crate::error::OcrError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Word-initial marker used by sentencepiece vocabularies.
const WORD_BOUNDARY: char = '\u{2581}';

const BOS_TOKEN: &str = "<s>";
const EOS_TOKEN: &str = "</s>";
const UNK_TOKEN: &str = "<unk>";
/// The image placeholder has its own vocabulary slot; the graph swaps it for
/// the projected image embedding.
const IMAGE_TOKEN: &str = "<image>";

/// Token/id mapping for the engine bundle.
pub struct PromptCodec {
    token_to_id: HashMap<String, i64>,
    id_to_token: HashMap<i64, String>,
    bos_id: i64,
    eos_id: i64,
    unk_id: i64,
}

impl PromptCodec {
    /// Load `vocab.json` from the model bundle.
    pub fn from_file(path: &Path) -> Result<Self, OcrError> {
        let raw = std::fs::read_to_string(path).map_err(|e| OcrError::EngineLoad {
            path: path.display().to_string(),
            detail: format!("vocab read failed: {e}"),
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| OcrError::EngineLoad {
            path: path.display().to_string(),
            detail: format!("vocab parse failed: {e}"),
        })?;
        let map = value.as_object().ok_or_else(|| OcrError::EngineLoad {
            path: path.display().to_string(),
            detail: "vocab must be a JSON object of token -> id".into(),
        })?;

        let mut token_to_id = HashMap::with_capacity(map.len());
        for (token, id) in map {
            let id = id.as_i64().ok_or_else(|| OcrError::EngineLoad {
                path: path.display().to_string(),
                detail: format!("non-integer id for token {token:?}"),
            })?;
            token_to_id.insert(token.clone(), id);
        }
        Self::from_table(token_to_id).map_err(|detail| OcrError::EngineLoad {
            path: path.display().to_string(),
            detail,
        })
    }

    /// Build a codec from an in-memory table. Specials must be present.
    pub fn from_table(token_to_id: HashMap<String, i64>) -> Result<Self, String> {
        let lookup = |t: &str| {
            token_to_id
                .get(t)
                .copied()
                .ok_or_else(|| format!("vocab is missing the {t:?} token"))
        };
        let bos_id = lookup(BOS_TOKEN)?;
        let eos_id = lookup(EOS_TOKEN)?;
        let unk_id = lookup(UNK_TOKEN)?;
        lookup(IMAGE_TOKEN)?;

        let id_to_token = token_to_id
            .iter()
            .map(|(t, &i)| (i, t.clone()))
            .collect::<HashMap<_, _>>();

        Ok(Self {
            token_to_id,
            id_to_token,
            bos_id,
            eos_id,
            unk_id,
        })
    }

    /// Number of entries in the vocabulary.
    pub fn vocab_size(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn eos_id(&self) -> i64 {
        self.eos_id
    }

    /// Encode a prompt to ids, BOS-prefixed.
    ///
    /// Special tokens (`<image>` etc.) match whole; ordinary words match the
    /// word-initial form first and fall back to per-character pieces, with
    /// `<unk>` for anything outside the vocabulary.
    pub fn encode(&self, prompt: &str) -> Vec<i64> {
        let mut ids = vec![self.bos_id];
        for word in prompt.split_whitespace() {
            if let Some(&id) = self.token_to_id.get(word) {
                // whole-word hit, including specials like <image>
                ids.push(id);
                continue;
            }
            let marked = format!("{WORD_BOUNDARY}{word}");
            if let Some(&id) = self.token_to_id.get(&marked) {
                ids.push(id);
                continue;
            }
            // character fallback, word-initial marker on the first piece
            for (i, ch) in word.chars().enumerate() {
                let piece = if i == 0 {
                    format!("{WORD_BOUNDARY}{ch}")
                } else {
                    ch.to_string()
                };
                ids.push(self.token_to_id.get(&piece).copied().unwrap_or(self.unk_id));
            }
        }
        ids
    }

    /// Decode generated ids to text, stopping at EOS and skipping specials.
    pub fn decode(&self, ids: &[i64]) -> String {
        let mut out = String::new();
        for &id in ids {
            if id == self.eos_id {
                break;
            }
            if id == self.bos_id || id == self.unk_id {
                continue;
            }
            let Some(token) = self.id_to_token.get(&id) else {
                continue;
            };
            if token.starts_with('<') && token.ends_with('>') {
                continue;
            }
            if let Some(rest) = token.strip_prefix(WORD_BOUNDARY) {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(rest);
            } else {
                out.push_str(token);
            }
        }
        out
    }
}
