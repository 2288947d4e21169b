//! Keyword normalization
//!
//! Equivalent spellings must derive the same token, so every keyword goes
//! through one [`NormalizationPolicy`] before it reaches the PRF. The policy is
//! part of the vault configuration; changing it changes every token.

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroize;

use crate::error::KeywordError;

/// Default upper bound on a normalized keyword, in bytes.
pub const DEFAULT_MAX_KEYWORD_BYTES: usize = 256;

/// Case rule applied after Unicode normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFolding {
    /// Keep case as supplied
    Preserve,
    /// Unicode lowercase mapping
    #[default]
    Lowercase,
}

/// Unicode normalization form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnicodeForm {
    /// No Unicode normalization
    None,
    /// Canonical composition
    Nfc,
    /// Compatibility composition
    #[default]
    Nfkc,
}

/// Rules that turn a raw keyword into a [`Keyword`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationPolicy {
    /// Case rule
    pub case_folding: CaseFolding,
    /// Unicode normalization form
    pub unicode_form: UnicodeForm,
    /// Maximum normalized length in bytes
    pub max_keyword_bytes: usize,
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self {
            case_folding: CaseFolding::default(),
            unicode_form: UnicodeForm::default(),
            max_keyword_bytes: DEFAULT_MAX_KEYWORD_BYTES,
        }
    }
}

impl NormalizationPolicy {
    /// Normalize a raw keyword.
    ///
    /// Applies the Unicode form, trims surrounding whitespace, then applies the
    /// case rule. Rejects empty results and results over `max_keyword_bytes`.
    pub fn normalize(&self, raw: &str) -> Result<Keyword, KeywordError> {
        // Compose before trimming: compatibility forms can map to whitespace
        let mut composed: String = match self.unicode_form {
            UnicodeForm::None => raw.to_owned(),
            UnicodeForm::Nfc => raw.nfc().collect(),
            UnicodeForm::Nfkc => raw.nfkc().collect(),
        };

        let trimmed = composed.trim();
        let folded = match self.case_folding {
            CaseFolding::Preserve => Keyword(trimmed.to_owned()),
            CaseFolding::Lowercase => Keyword(trimmed.to_lowercase()),
        };
        composed.zeroize();

        if folded.0.is_empty() {
            return Err(KeywordError::Empty);
        }

        if folded.0.len() > self.max_keyword_bytes {
            return Err(KeywordError::TooLong {
                max: self.max_keyword_bytes,
                actual: folded.0.len(),
            });
        }

        Ok(folded)
    }
}

/// A normalized keyword.
///
/// Only produced by [`NormalizationPolicy::normalize`]. Holds plaintext, so
/// the buffer is zeroized on drop and `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Keyword(String);

impl Keyword {
    /// Normalized text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalized UTF-8 bytes, as fed to the PRF.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Keyword(<redacted>)")
    }
}

impl Drop for Keyword {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}
