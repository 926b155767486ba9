//! Domain error taxonomy, layered per component the way downstream crates
//! (`cfd-engine`, `portfolio-manager`, `trading-engine`) compose their own
//! error enums via `#[from]` into a top-level error.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the calculation kernel and the core entity types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    #[error("leverage must be >= 1, got {0}")]
    InvalidLeverage(Decimal),

    #[error("competition end_time must be after start_time")]
    InvalidCompetitionWindow,

    #[error("max_leverage must be between 1 and 100, got {0}")]
    InvalidMaxLeverage(u32),

    #[error(
        "maintenance_margin_pct ({maintenance}) must be strictly below the initial margin \
         percentage implied by max_leverage ({initial})"
    )]
    MaintenanceMarginTooHigh { maintenance: Decimal, initial: Decimal },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn invalid_quantity_displays_the_offending_value() {
        let err = DomainError::InvalidQuantity(dec!(-1));
        assert!(err.to_string().contains("-1"));
    }
}
