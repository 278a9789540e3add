//! Composite SKU composition and parsing
//!
//! A composite SKU is `{ArtworkCode}-{TypeCode}-{VAR1}-{VAR2}-{VAR3}`.
//! Producers may omit trailing `99` segments; [`CompositeSku::parse`]
//! restores them, so every parsed value carries exactly three variant codes.
//!
//! Missing trailing slots are filled in one place only: [`pad_to_three`],
//! called from [`CompositeSku::new`]. Both [`compose`] and
//! [`CompositeSku::parse`] go through `new`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between SKU segments
pub const SEPARATOR: char = '-';

/// Number of variant dimension slots
pub const VARIANT_SLOTS: usize = 3;

/// SKU errors
///
/// Every variant carries the offending raw text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkuError {
    /// Whole SKU rejected
    #[error("Malformed SKU '{raw}': {reason}")]
    Malformed { raw: String, reason: String },

    #[error("Malformed artwork code '{0}': expected 2 digits, 1 letter A-Z, 3 digits")]
    MalformedArtworkCode(String),

    #[error("Malformed type code '{0}': expected 3 letters A-Z")]
    MalformedTypeCode(String),

    #[error("Malformed variant code '{0}': expected exactly 2 digits")]
    MalformedVariantCode(String),

    #[error("Too many variant segments: {0} given, at most 3 allowed")]
    TooManyVariants(usize),
}

// ============================================================================
// Segment types
// ============================================================================

/// Permanent artwork identifier, shape `^\d{2}[A-Z]\d{3}$`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtworkCode(String);

impl ArtworkCode {
    /// Validate and wrap an artwork code
    pub fn parse(raw: &str) -> Result<Self, SkuError> {
        let bytes = raw.as_bytes();
        let well_formed = bytes.len() == 6
            && bytes[..2].iter().all(u8::is_ascii_digit)
            && bytes[2].is_ascii_uppercase()
            && bytes[3..].iter().all(u8::is_ascii_digit);

        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(SkuError::MalformedArtworkCode(raw.to_string()))
        }
    }

    /// Build from already range-checked parts
    pub(crate) fn from_parts(period: u8, block_letter: char, sequence_in_block: u16) -> Self {
        Self(format!("{:02}{}{:03}", period, block_letter, sequence_in_block))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-digit period segment
    pub fn period(&self) -> &str {
        &self.0[..2]
    }

    /// Block letter
    pub fn block_letter(&self) -> char {
        self.0.as_bytes()[2] as char
    }

    /// Three-digit sequence within the block
    pub fn sequence_in_block(&self) -> &str {
        &self.0[3..]
    }
}

impl fmt::Display for ArtworkCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ArtworkCode {
    type Err = SkuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ArtworkCode {
    type Error = SkuError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ArtworkCode> for String {
    fn from(code: ArtworkCode) -> Self {
        code.0
    }
}

/// Product type code, shape `^[A-Z]{3}$`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeCode(String);

impl TypeCode {
    pub fn parse(raw: &str) -> Result<Self, SkuError> {
        let bytes = raw.as_bytes();
        if bytes.len() == 3 && bytes.iter().all(u8::is_ascii_uppercase) {
            Ok(Self(raw.to_string()))
        } else {
            Err(SkuError::MalformedTypeCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TypeCode {
    type Err = SkuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeCode {
    type Error = SkuError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TypeCode> for String {
    fn from(code: TypeCode) -> Self {
        code.0
    }
}

/// Variant dimension code `00`..`99`
///
/// `99` is the placeholder meaning "not applicable / unset"; real dimension
/// values stay within `00`..`98`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VariantCode(u8);

impl VariantCode {
    /// The "not applicable" sentinel
    pub const PLACEHOLDER: VariantCode = VariantCode(99);

    /// Wrap a numeric code (0..=99)
    pub fn new(value: u8) -> Result<Self, SkuError> {
        if value <= 99 {
            Ok(Self(value))
        } else {
            Err(SkuError::MalformedVariantCode(value.to_string()))
        }
    }

    /// Parse exactly two ASCII digits
    pub fn parse(raw: &str) -> Result<Self, SkuError> {
        let bytes = raw.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_digit) {
            return Err(SkuError::MalformedVariantCode(raw.to_string()));
        }
        Ok(Self((bytes[0] - b'0') * 10 + (bytes[1] - b'0')))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_placeholder(self) -> bool {
        self == Self::PLACEHOLDER
    }
}

impl fmt::Display for VariantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for VariantCode {
    type Err = SkuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VariantCode {
    type Error = SkuError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VariantCode> for String {
    fn from(code: VariantCode) -> Self {
        code.to_string()
    }
}

/// Fill unused trailing variant slots with the placeholder
///
/// Callers pass at most [`VARIANT_SLOTS`] codes; [`CompositeSku::new`]
/// rejects longer input before calling this.
pub fn pad_to_three(variants: &[VariantCode]) -> [VariantCode; VARIANT_SLOTS] {
    debug_assert!(variants.len() <= VARIANT_SLOTS);
    let mut padded = [VariantCode::PLACEHOLDER; VARIANT_SLOTS];
    for (slot, code) in padded.iter_mut().zip(variants) {
        *slot = *code;
    }
    padded
}

// ============================================================================
// Composite SKU
// ============================================================================

/// Full purchasable-item identifier
///
/// Always holds three variant codes. `Display` renders all five segments;
/// [`CompositeSku::to_compact_string`] drops trailing placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompositeSku {
    artwork: ArtworkCode,
    type_code: TypeCode,
    variants: [VariantCode; VARIANT_SLOTS],
}

impl CompositeSku {
    /// Compose from parts, defaulting missing trailing slots to `99`
    pub fn new(
        artwork: ArtworkCode,
        type_code: TypeCode,
        variants: &[VariantCode],
    ) -> Result<Self, SkuError> {
        if variants.len() > VARIANT_SLOTS {
            return Err(SkuError::TooManyVariants(variants.len()));
        }

        Ok(Self {
            artwork,
            type_code,
            variants: pad_to_three(variants),
        })
    }

    /// Decompose a SKU string
    ///
    /// Accepts 2 to 5 `-`-separated segments. No whitespace trimming or case
    /// folding is applied.
    pub fn parse(raw: &str) -> Result<Self, SkuError> {
        let malformed = |reason: String| SkuError::Malformed {
            raw: raw.to_string(),
            reason,
        };

        let segments: Vec<&str> = raw.split(SEPARATOR).collect();
        if !(2..=2 + VARIANT_SLOTS).contains(&segments.len()) {
            return Err(malformed(format!(
                "expected 2 to 5 segments separated by '{}', found {}",
                SEPARATOR,
                segments.len()
            )));
        }

        let artwork = ArtworkCode::parse(segments[0]).map_err(|e| malformed(e.to_string()))?;
        let type_code = TypeCode::parse(segments[1]).map_err(|e| malformed(e.to_string()))?;
        let variants = segments[2..]
            .iter()
            .map(|segment| VariantCode::parse(segment))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| malformed(e.to_string()))?;

        Self::new(artwork, type_code, &variants)
    }

    pub fn artwork(&self) -> &ArtworkCode {
        &self.artwork
    }

    pub fn type_code(&self) -> &TypeCode {
        &self.type_code
    }

    pub fn variants(&self) -> &[VariantCode; VARIANT_SLOTS] {
        &self.variants
    }

    pub fn into_parts(self) -> (ArtworkCode, TypeCode, [VariantCode; VARIANT_SLOTS]) {
        (self.artwork, self.type_code, self.variants)
    }

    /// True when every variant slot holds the placeholder
    pub fn is_all_placeholder(&self) -> bool {
        self.variants.iter().all(|v| v.is_placeholder())
    }

    /// Render with trailing placeholder segments omitted
    pub fn to_compact_string(&self) -> String {
        let used = self
            .variants
            .iter()
            .rposition(|v| !v.is_placeholder())
            .map_or(0, |last| last + 1);

        let mut out = format!("{}{}{}", self.artwork, SEPARATOR, self.type_code);
        for code in &self.variants[..used] {
            out.push(SEPARATOR);
            out.push_str(&code.to_string());
        }
        out
    }
}

impl fmt::Display for CompositeSku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.artwork, SEPARATOR, self.type_code)?;
        for code in &self.variants {
            write!(f, "{}{}", SEPARATOR, code)?;
        }
        Ok(())
    }
}

impl FromStr for CompositeSku {
    type Err = SkuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CompositeSku {
    type Error = SkuError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CompositeSku> for String {
    fn from(sku: CompositeSku) -> Self {
        sku.to_string()
    }
}

/// Compose a SKU from parts (free-function form of [`CompositeSku::new`])
pub fn compose(
    artwork: ArtworkCode,
    type_code: TypeCode,
    variants: &[VariantCode],
) -> Result<CompositeSku, SkuError> {
    CompositeSku::new(artwork, type_code, variants)
}

/// Parse a SKU (free-function form of [`CompositeSku::parse`])
pub fn parse(raw: &str) -> Result<CompositeSku, SkuError> {
    CompositeSku::parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(s: &str) -> ArtworkCode {
        ArtworkCode::parse(s).unwrap()
    }

    fn ty(s: &str) -> TypeCode {
        TypeCode::parse(s).unwrap()
    }

    fn var(v: u8) -> VariantCode {
        VariantCode::new(v).unwrap()
    }

    #[test]
    fn test_compose_pads_missing_slots() {
        let sku = compose(art("10A001"), ty("UTS"), &[var(0)]).unwrap();
        assert_eq!(sku.to_string(), "10A001-UTS-00-99-99");
        assert_eq!(sku.to_compact_string(), "10A001-UTS-00");
    }

    #[test]
    fn test_compose_rejects_four_variants() {
        let err = compose(art("10A001"), ty("UTS"), &[var(0), var(1), var(2), var(3)]).unwrap_err();
        assert_eq!(err, SkuError::TooManyVariants(4));
    }

    #[test]
    fn test_parse_compose_round_trip() {
        let cases: Vec<(&str, &str, Vec<u8>)> = vec![
            ("10A001", "UTS", vec![]),
            ("10A001", "UTS", vec![0]),
            ("11Z999", "DIG", vec![98, 0]),
            ("12C042", "PST", vec![1, 2, 3]),
            ("10A001", "DIG", vec![99, 99, 99]),
        ];

        for (a, t, v) in cases {
            let variants: Vec<VariantCode> = v.iter().map(|n| var(*n)).collect();
            let sku = compose(art(a), ty(t), &variants).unwrap();
            let (pa, pt, pv) = parse(&sku.to_string()).unwrap().into_parts();
            assert_eq!(pa, art(a));
            assert_eq!(pt, ty(t));
            assert_eq!(pv, pad_to_three(&variants));
        }
    }

    #[test]
    fn test_full_form_string_round_trips_exactly() {
        for s in ["10A001-UTS-00-01-99", "25B120-DIG-99-99-99", "10A001-UTS-05-06-07"] {
            assert_eq!(parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_short_form_restores_trailing_placeholders() {
        let sku = parse("10A001-UTS-00-01").unwrap();
        assert_eq!(sku.variants(), &[var(0), var(1), VariantCode::PLACEHOLDER]);
        assert_eq!(sku, parse("10A001-UTS-00-01-99").unwrap());
    }

    #[test]
    fn test_parse_rejects_segment_counts_outside_range() {
        for raw in ["10A001", "10A001-UTS-00-01-02-03", ""] {
            match parse(raw) {
                Err(SkuError::Malformed { raw: r, .. }) => assert_eq!(r, raw),
                other => panic!("expected Malformed for '{}', got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_parse_errors_name_the_raw_value() {
        for raw in [
            "1A001-UTS",
            "10a001-UTS",
            "10A001-uts",
            "10A001-UTS-1",
            "10A001-UTS-001",
            "10A001-UTS-0x",
            " 10A001-UTS",
        ] {
            let err = parse(raw).unwrap_err();
            assert!(
                err.to_string().contains(raw),
                "error for '{}' should quote it: {}",
                raw,
                err
            );
        }
    }

    #[test]
    fn test_variant_code_bounds() {
        assert!(VariantCode::new(99).unwrap().is_placeholder());
        assert!(!VariantCode::new(98).unwrap().is_placeholder());
        assert!(VariantCode::new(100).is_err());
        assert_eq!(VariantCode::parse("07").unwrap().value(), 7);
    }

    #[test]
    fn test_artwork_code_accessors() {
        let code = art("11C042");
        assert_eq!(code.period(), "11");
        assert_eq!(code.block_letter(), 'C');
        assert_eq!(code.sequence_in_block(), "042");
    }

    #[test]
    fn test_serde_uses_full_string_form() {
        let sku = parse("10A001-UTS-00").unwrap();
        let json = serde_json::to_string(&sku).unwrap();
        assert_eq!(json, "\"10A001-UTS-00-99-99\"");
        let back: CompositeSku = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sku);
        assert!(serde_json::from_str::<CompositeSku>("\"10A001\"").is_err());
    }
}
