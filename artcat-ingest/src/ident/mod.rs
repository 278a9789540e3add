//! Identifier minting and composite SKUs
//!
//! - [`sequence`]: ordinal source contract
//! - [`code`]: ordinal → artwork code
//! - [`sku`]: composite SKU types, composition and parsing

pub mod code;
pub mod sequence;
pub mod sku;

pub use code::{generate, CodeError, CodeGenerator};
pub use sequence::{AtomicSequenceAuthority, AuthorityError, Ordinal, SequenceAuthority};
pub use sku::{
    compose, pad_to_three, parse, ArtworkCode, CompositeSku, SkuError, TypeCode, VariantCode,
};
