//! Word Pool
//!
//! Fixed vocabulary the rounds draw from. Each round takes a uniform sample
//! of distinct words and picks the target uniformly from that sample.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::glyph;
use crate::core::rng::DeterministicRng;

/// Words offered per round.
pub const DEFAULT_POOL_SIZE: usize = 18;

/// Built-in vocabulary.
const BUILTIN_WORDS: &[&str] = &[
    "AQUA", "BANE", "BLAST", "BREATH", "CHANNEL", "CURSE", "DEPTH", "EFFICIENCY",
    "FEATHER", "FIRE", "FLAME", "FORTUNE", "FROST", "IMPALING", "INFINITY", "KNOCKBACK",
    "LOOTING", "LOYALTY", "LUCK", "LURE", "MENDING", "MULTISHOT", "PIERCING", "POWER",
    "PROTECTION", "PUNCH", "QUICK", "RIPTIDE", "SHARPNESS", "SILK", "SMITE", "SOUL",
    "SPEED", "STRIDER", "SWEEPING", "SWIFT", "THORNS", "TOUCH", "UNBREAKING", "VANISHING",
    "BINDING", "RESPIRATION", "AFFINITY", "SNEAK", "DENSITY", "BREACH", "WIND", "BURST",
];

/// One round's draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDraw {
    /// Word the player must find.
    pub target: String,
    /// Encoded target.
    pub target_symbol: String,
    /// Encoded options, target included, in draw order.
    pub options: Vec<String>,
}

/// Errors loading a vocabulary file.
#[derive(Debug, thiserror::Error)]
pub enum WordPoolError {
    /// File could not be read.
    #[error("failed to read word list: {0}")]
    Io(#[from] std::io::Error),

    /// File is not a JSON array of strings.
    #[error("invalid word list: {0}")]
    Json(#[from] serde_json::Error),

    /// No usable words after normalization.
    #[error("word list is empty")]
    Empty,
}

/// The vocabulary.
#[derive(Debug, Clone)]
pub struct WordPool {
    words: Vec<String>,
}

impl Default for WordPool {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WordPool {
    /// Pool over the built-in vocabulary.
    pub fn builtin() -> Self {
        Self {
            words: normalize(BUILTIN_WORDS.iter().copied()),
        }
    }

    /// Pool over a custom vocabulary.
    ///
    /// Words are trimmed, uppercased and deduplicated; blanks are dropped.
    pub fn new<I, S>(words: I) -> Result<Self, WordPoolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = normalize(words);
        if words.is_empty() {
            return Err(WordPoolError::Empty);
        }
        Ok(Self { words })
    }

    /// Load a JSON array of words.
    pub fn from_json_file(path: &Path) -> Result<Self, WordPoolError> {
        let text = std::fs::read_to_string(path)?;
        let words: Vec<String> = serde_json::from_str(&text)?;
        Self::new(words)
    }

    /// Vocabulary size.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True if the vocabulary is empty (never the case for a constructed pool).
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Draw a round: `size` distinct words (clamped to the vocabulary) and a
    /// target among them.
    pub fn draw(&self, rng: &mut DeterministicRng, size: usize) -> RoundDraw {
        let selected: Vec<&String> = rng
            .sample_indices(self.words.len(), size.max(1))
            .into_iter()
            .filter_map(|i| self.words.get(i))
            .collect();

        let target = rng
            .choose(&selected)
            .map(|w| (*w).clone())
            .unwrap_or_default();

        RoundDraw {
            target_symbol: glyph::encode(&target),
            options: selected.iter().map(|w| glyph::encode(w)).collect(),
            target,
        }
    }

    /// Word behind an encoded symbol, if it belongs to the vocabulary.
    pub fn word_for_symbol(&self, symbol: &str) -> Option<&str> {
        self.words
            .iter()
            .find(|w| glyph::encode(w) == symbol)
            .map(String::as_str)
    }
}

fn normalize<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_uppercase())
        .filter(|w| !w.is_empty())
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_pool_is_large_enough() {
        assert!(WordPool::builtin().len() >= DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_draw_shape() {
        let pool = WordPool::builtin();
        let mut rng = DeterministicRng::new(42);
        let draw = pool.draw(&mut rng, DEFAULT_POOL_SIZE);

        assert_eq!(draw.options.len(), DEFAULT_POOL_SIZE);
        assert!(draw.options.contains(&draw.target_symbol));
        assert_eq!(draw.target_symbol, glyph::encode(&draw.target));

        let distinct: BTreeSet<_> = draw.options.iter().collect();
        assert_eq!(distinct.len(), draw.options.len());
    }

    #[test]
    fn test_draw_is_reproducible() {
        let pool = WordPool::builtin();
        let a = pool.draw(&mut DeterministicRng::new(7), DEFAULT_POOL_SIZE);
        let b = pool.draw(&mut DeterministicRng::new(7), DEFAULT_POOL_SIZE);
        assert_eq!(a, b);
    }

    #[test]
    fn test_draw_clamps_to_vocabulary() {
        let pool = WordPool::new(["one", "two", "three"]).unwrap();
        let draw = pool.draw(&mut DeterministicRng::new(1), DEFAULT_POOL_SIZE);
        assert_eq!(draw.options.len(), 3);
    }

    #[test]
    fn test_normalization() {
        let pool = WordPool::new(["  fire ", "FIRE", "", "frost"]).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.word_for_symbol(&glyph::encode("FROST")), Some("FROST"));
        assert_eq!(pool.word_for_symbol("nope"), None);
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        assert!(matches!(
            WordPool::new(Vec::<String>::new()),
            Err(WordPoolError::Empty)
        ));
        assert!(matches!(WordPool::new(["   "]), Err(WordPoolError::Empty)));
    }
}
