//! Token counting for packed output
//!
//! The default is a character-based estimate (3.5 characters per token),
//! cheap enough to run on every repack. Exact counts for OpenAI models are
//! available through tiktoken.

mod error;
mod model;

pub use error::{TokenizerError, TokenizerResult};
pub use model::Model;

use tiktoken_rs::CoreBPE;

/// Upper bounds (exclusive) of the budget tiers, in tokens
pub const TIER_THRESHOLDS: [(usize, TokenTier); 3] = [
    (8_000, TokenTier::Comfortable),
    (32_000, TokenTier::Moderate),
    (100_000, TokenTier::Large),
];

/// Estimate tokens as `ceil(chars / 3.5)`
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    (chars * 2).div_ceil(7)
}

/// How much of a context window an artifact is likely to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TokenTier {
    /// Below 8,000 tokens
    Comfortable,
    /// Below 32,000 tokens
    Moderate,
    /// Below 100,000 tokens
    Large,
    /// 100,000 tokens or more
    Oversized,
}

impl TokenTier {
    /// Classify a token count
    pub fn classify(tokens: usize) -> Self {
        TIER_THRESHOLDS
            .iter()
            .find(|(limit, _)| tokens < *limit)
            .map(|(_, tier)| *tier)
            .unwrap_or(TokenTier::Oversized)
    }
}

/// Result of token counting operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCount {
    /// Number of tokens in the text
    pub tokens: usize,
    /// Whether the count is exact rather than estimated
    pub exact: bool,
}

/// Trait defining the interface for tokenizers
pub trait Tokenizer: Send + Sync {
    /// Count tokens in the given text
    fn count_tokens(&self, text: &str) -> TokenizerResult<TokenCount>;

    /// Get the context window size, if known
    fn model_context_window(&self) -> Option<usize>;
}

/// Character-ratio estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct Estimator;

impl Tokenizer for Estimator {
    fn count_tokens(&self, text: &str) -> TokenizerResult<TokenCount> {
        Ok(TokenCount {
            tokens: estimate_tokens(text),
            exact: false,
        })
    }

    fn model_context_window(&self) -> Option<usize> {
        None
    }
}

/// Exact BPE counting for OpenAI models
pub struct TiktokenTokenizer {
    model: Model,
    encoding: CoreBPE,
}

impl TiktokenTokenizer {
    /// Load the encoding for `model`
    pub fn new(model: Model) -> TokenizerResult<Self> {
        let encoding = tiktoken_rs::get_bpe_from_model(model.model_id())
            .map_err(|e| TokenizerError::UnsupportedModel(format!("{}: {}", model, e)))?;
        Ok(Self { model, encoding })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn count_tokens(&self, text: &str) -> TokenizerResult<TokenCount> {
        Ok(TokenCount {
            tokens: self.encoding.encode_ordinary(text).len(),
            exact: true,
        })
    }

    fn model_context_window(&self) -> Option<usize> {
        Some(self.model.context_window())
    }
}

/// Create the exact tokenizer for `model`, or the estimator when none is given
pub fn create_tokenizer(model: Option<Model>) -> TokenizerResult<Box<dyn Tokenizer>> {
    match model {
        Some(model) => Ok(Box::new(TiktokenTokenizer::new(model)?)),
        None => Ok(Box::new(Estimator)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcdefg"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(3500)), 1000);
        assert_eq!(estimate_tokens(&"x".repeat(3501)), 1001);
        // counted in characters, not bytes
        assert_eq!(estimate_tokens("ééééééé"), 2);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(TokenTier::classify(0), TokenTier::Comfortable);
        assert_eq!(TokenTier::classify(7_999), TokenTier::Comfortable);
        assert_eq!(TokenTier::classify(8_000), TokenTier::Moderate);
        assert_eq!(TokenTier::classify(31_999), TokenTier::Moderate);
        assert_eq!(TokenTier::classify(32_000), TokenTier::Large);
        assert_eq!(TokenTier::classify(99_999), TokenTier::Large);
        assert_eq!(TokenTier::classify(100_000), TokenTier::Oversized);
        assert_eq!(TokenTier::Oversized.to_string(), "oversized");
    }

    #[test]
    fn test_default_tokenizer_is_estimate() {
        let tokenizer = create_tokenizer(None).unwrap();
        let count = tokenizer.count_tokens("Hello, world!").unwrap();
        assert_eq!(count.tokens, 4);
        assert!(!count.exact);
        assert_eq!(tokenizer.model_context_window(), None);
    }

    #[test]
    fn test_model_metadata() {
        assert_eq!(Model::Gpt4.model_id(), "gpt-4");
        assert_eq!(Model::Gpt4o.context_window(), 128_000);
    }

    #[test]
    fn test_tiktoken_counts_exactly() {
        let tokenizer = TiktokenTokenizer::new(Model::Gpt4).unwrap();
        let count = tokenizer.count_tokens("hello world").unwrap();
        assert!(count.exact);
        assert_eq!(count.tokens, 2);
    }
}
