//! Filename pattern extraction
//!
//! Asset files follow `{pattern}_{suffix}.{ext}` where `pattern` is 2 to 5
//! `-`-joined SKU segments. The extension and everything from the first
//! suffix separator on are dropped; what remains must be a pattern in full:
//!
//! ```text
//! 10A001-UTS-00_front.jpg        → 10A001-UTS-00
//! 10a001-uts-00-01.PNG           → 10A001-UTS-00-01
//! 10A001-UTS-00-draft_x.jpg      → None (segment is not a variant code)
//! 10A001-UTS-00-01-02-03.jpg     → None (six segments)
//! 10A001_front.jpg               → None (type code missing)
//! ```
//!
//! Letters are compared case-insensitively; filenames are free-form input,
//! not stored identifiers.

use crate::ident::sku::{
    ArtworkCode, CompositeSku, SkuError, TypeCode, VariantCode, SEPARATOR, VARIANT_SLOTS,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default separator between identifier prefix and free-form suffix
pub const DEFAULT_SUFFIX_SEPARATOR: char = '_';

/// Identifier prefix recovered from a filename
///
/// Holds artwork + type and 0 to 3 explicit variant codes. How many variant
/// segments were given decides the match tier, so the explicit count is kept
/// next to the defaulted SKU. Serialized in its rendered form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SkuPattern {
    defaulted: CompositeSku,
    explicit_variants: usize,
}

impl SkuPattern {
    pub fn new(
        artwork: ArtworkCode,
        type_code: TypeCode,
        variants: &[VariantCode],
    ) -> Result<Self, SkuError> {
        Ok(Self {
            defaulted: CompositeSku::new(artwork, type_code, variants)?,
            explicit_variants: variants.len(),
        })
    }

    /// Parse the rendered form, e.g. `10A001-UTS-00`
    pub fn parse(text: &str) -> Result<Self, SkuError> {
        let segments: Vec<&str> = text.split(SEPARATOR).collect();
        if segments.len() < 2 {
            return Err(SkuError::Malformed {
                raw: text.to_string(),
                reason: "expected artwork code and type code".to_string(),
            });
        }
        if segments.len() > 2 + VARIANT_SLOTS {
            return Err(SkuError::TooManyVariants(segments.len() - 2));
        }

        let artwork = ArtworkCode::parse(segments[0])?;
        let type_code = TypeCode::parse(segments[1])?;
        let variants = segments[2..]
            .iter()
            .map(|segment| VariantCode::parse(segment))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(artwork, type_code, &variants)
    }

    /// Case-insensitive [`SkuPattern::parse`] for filename stems
    ///
    /// Every `-`-separated segment has to be part of the pattern; a leftover
    /// segment means the stem is not an identifier.
    pub fn from_segments(text: &str) -> Option<Self> {
        Self::parse(&text.to_ascii_uppercase()).ok()
    }

    pub fn artwork(&self) -> &ArtworkCode {
        self.defaulted.artwork()
    }

    pub fn type_code(&self) -> &TypeCode {
        self.defaulted.type_code()
    }

    /// Explicit variant codes (unpadded)
    pub fn variants(&self) -> &[VariantCode] {
        &self.defaulted.variants()[..self.explicit_variants]
    }

    /// Number of recovered segments (2..=5)
    pub fn segment_count(&self) -> usize {
        2 + self.explicit_variants
    }

    /// True if any explicit variant segment is the placeholder
    pub fn has_placeholder(&self) -> bool {
        self.variants().iter().any(|v| v.is_placeholder())
    }

    /// Pattern defaulted to a full SKU (trailing `99`s)
    pub fn to_sku(&self) -> &CompositeSku {
        &self.defaulted
    }
}

impl fmt::Display for SkuPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.artwork(), SEPARATOR, self.type_code())?;
        for code in self.variants() {
            write!(f, "{}{}", SEPARATOR, code)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for SkuPattern {
    type Error = SkuError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SkuPattern> for String {
    fn from(pattern: SkuPattern) -> Self {
        pattern.to_string()
    }
}

/// Extracts [`SkuPattern`]s from filenames
#[derive(Debug, Clone)]
pub struct FilenameExtractor {
    suffix_separator: char,
}

impl Default for FilenameExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIX_SEPARATOR)
    }
}

impl FilenameExtractor {
    pub fn new(suffix_separator: char) -> Self {
        Self { suffix_separator }
    }

    /// Identifier pattern of a filename, if it has one
    ///
    /// Directory components (either slash style) are ignored.
    pub fn extract(&self, filename: &str) -> Option<SkuPattern> {
        let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

        let stem = match base.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => base,
        };

        let pattern = stem
            .split_once(self.suffix_separator)
            .map_or(stem, |(pattern, _suffix)| pattern);

        let result = SkuPattern::from_segments(pattern);
        tracing::debug!(
            filename,
            pattern = ?result.as_ref().map(|p| p.to_string()),
            "Extracted filename pattern"
        );
        result
    }
}

/// Extract with the default `_` suffix separator
pub fn extract(filename: &str) -> Option<SkuPattern> {
    FilenameExtractor::default().extract(filename)
}
