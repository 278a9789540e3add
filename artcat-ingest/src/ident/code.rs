//! Artwork code generation
//!
//! Maps an ordinal and the current period into a fixed-width code:
//!
//! ```text
//! period          = 10 + floor((current_year - period_start_year) / 10)
//! block_letter    = 'A' + floor(ordinal / 1000) mod 26
//! sequence_in_blk = ordinal mod 1000
//! code            = {period:02}{block_letter}{sequence_in_blk:03}
//! ```
//!
//! [`generate`] is the pure mapping. After 26 blocks (26,000 ordinals) the
//! letter cycles back to `A`, so ordinals `n` and `n + 26_000` produce the
//! same code within one period. [`CodeGenerator`] applies the configured
//! [`WraparoundPolicy`] on top; the default refuses to mint such codes.

use super::sequence::{AuthorityError, Ordinal, SequenceAuthority};
use super::sku::ArtworkCode;
use artcat_common::config::{CatalogSettings, WraparoundPolicy};
use chrono::Datelike;
use thiserror::Error;
use tracing::{debug, warn};

/// Ordinals per block letter
pub const BLOCK_SIZE: Ordinal = 1000;

/// Number of block letters (`A`..=`Z`)
pub const BLOCK_COUNT: Ordinal = 26;

/// Distinct codes per period before letters repeat
pub const CODES_PER_CYCLE: Ordinal = BLOCK_SIZE * BLOCK_COUNT;

/// Period number of the first decade
pub const FIRST_PERIOD: i64 = 10;

/// Code generation errors
#[derive(Debug, Error)]
pub enum CodeError {
    #[error("Year {current_year} precedes period start year {period_start_year}")]
    YearBeforePeriodStart {
        period_start_year: i32,
        current_year: i32,
    },

    #[error("Period {0} does not fit in two digits")]
    PeriodOverflow(i64),

    /// Wraparound refused under [`WraparoundPolicy::Fail`]
    #[error("Ordinal {ordinal} would reuse block letters in period {period} (limit {limit} codes)")]
    BlockSpaceExhausted {
        ordinal: Ordinal,
        period: u8,
        limit: Ordinal,
    },

    #[error(transparent)]
    Authority(#[from] AuthorityError),
}

/// Two-digit period for a year
pub fn period_for_year(period_start_year: i32, current_year: i32) -> Result<u8, CodeError> {
    if current_year < period_start_year {
        return Err(CodeError::YearBeforePeriodStart {
            period_start_year,
            current_year,
        });
    }

    let elapsed = i64::from(current_year) - i64::from(period_start_year);
    let period = FIRST_PERIOD + elapsed / 10;
    u8::try_from(period)
        .ok()
        .filter(|p| *p <= 99)
        .ok_or(CodeError::PeriodOverflow(period))
}

/// Pure ordinal → code mapping (letters wrap silently after 26 blocks)
pub fn generate(
    ordinal: Ordinal,
    period_start_year: i32,
    current_year: i32,
) -> Result<ArtworkCode, CodeError> {
    let period = period_for_year(period_start_year, current_year)?;
    let block_index = (ordinal / BLOCK_SIZE) % BLOCK_COUNT;
    let block_letter = (b'A' + block_index as u8) as char;
    let sequence_in_block = (ordinal % BLOCK_SIZE) as u16;

    Ok(ArtworkCode::from_parts(period, block_letter, sequence_in_block))
}

/// Mints artwork codes from a sequence authority
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    period_start_year: i32,
    wraparound: WraparoundPolicy,
}

impl CodeGenerator {
    pub fn new(period_start_year: i32, wraparound: WraparoundPolicy) -> Self {
        Self {
            period_start_year,
            wraparound,
        }
    }

    pub fn from_settings(settings: &CatalogSettings) -> Self {
        Self::new(settings.period_start_year, settings.block_wraparound)
    }

    /// Code for an ordinal in a given year, honouring the wraparound policy
    pub fn code_for(&self, ordinal: Ordinal, current_year: i32) -> Result<ArtworkCode, CodeError> {
        if ordinal >= CODES_PER_CYCLE {
            let period = period_for_year(self.period_start_year, current_year)?;
            match self.wraparound {
                WraparoundPolicy::Fail => {
                    return Err(CodeError::BlockSpaceExhausted {
                        ordinal,
                        period,
                        limit: CODES_PER_CYCLE,
                    });
                }
                WraparoundPolicy::Reuse => {
                    warn!(
                        ordinal,
                        period,
                        "Block letters wrapped; code may collide with an earlier artwork"
                    );
                }
            }
        }

        generate(ordinal, self.period_start_year, current_year)
    }

    /// Draw the next ordinal and generate its code for the current UTC year
    ///
    /// Authority failures propagate unchanged; no local ordinal is guessed.
    pub async fn mint(&self, authority: &dyn SequenceAuthority) -> Result<ArtworkCode, CodeError> {
        let ordinal = authority.next().await?;
        let code = self.code_for(ordinal, chrono::Utc::now().year())?;
        debug!(ordinal, code = %code, "Minted artwork code");
        Ok(code)
    }
}
