//! Calculation kernel (C1): pure, total, referentially-transparent arithmetic
//! over `Decimal`. Every function here is a direct translation of one formula
//! from the specification's §4.1 and carries its own focused unit test.
//!
//! No function in this crate touches the database, the clock, or any other
//! side effect. Downstream crates (`cfd-engine`, `portfolio-manager`,
//! `trading-engine`) call these functions rather than reimplementing the
//! arithmetic.

use rust_decimal::Decimal;
use types::enums::PositionSide;

/// `quantity * price`, the face value of an exposure.
pub fn notional(quantity: Decimal, price: Decimal) -> Decimal {
    quantity * price
}

/// Collateral locked for a position: `notional / leverage`.
pub fn margin_required(notional_value: Decimal, leverage: Decimal) -> Decimal {
    notional_value / leverage
}

/// Unrealized P&L for a long or short position.
pub fn unrealized_pnl(
    side: PositionSide,
    quantity: Decimal,
    entry_price: Decimal,
    current_price: Decimal,
) -> Decimal {
    match side {
        PositionSide::Long => quantity * (current_price - entry_price),
        PositionSide::Short => quantity * (entry_price - current_price),
    }
}

/// `pnl / base * 100`, or 0 if `base` is zero.
pub fn pnl_pct(pnl: Decimal, base: Decimal) -> Decimal {
    if base.is_zero() {
        Decimal::ZERO
    } else {
        (pnl / base) * Decimal::from(100)
    }
}

/// `cash_balance + unrealized_pnl`.
pub fn equity(cash_balance: Decimal, unrealized_pnl: Decimal) -> Decimal {
    cash_balance + unrealized_pnl
}

/// `equity / margin_used * 100`. Caller must not invoke this with
/// `margin_used == 0`; that case is "undefined" per the specification and is
/// represented as `Option::None` at the call site (`portfolio-manager`), not
/// as a sentinel value returned from here.
pub fn margin_level(equity: Decimal, margin_used: Decimal) -> Decimal {
    (equity / margin_used) * Decimal::from(100)
}

/// `total_notional / equity`, or 0 if `equity == 0`.
pub fn current_leverage(total_notional: Decimal, equity: Decimal) -> Decimal {
    if equity.is_zero() {
        Decimal::ZERO
    } else {
        total_notional / equity
    }
}

/// `100 / max_leverage`: the initial margin percentage implied by a
/// competition's max leverage (GLOSSARY).
pub fn initial_margin_pct(max_leverage: Decimal) -> Decimal {
    Decimal::from(100) / max_leverage
}

/// `margin_level < (maintenance_margin_pct / initial_margin_pct) * 100`.
pub fn check_liquidation(
    margin_level: Decimal,
    maintenance_margin_pct: Decimal,
    initial_margin_pct: Decimal,
) -> bool {
    let threshold = (maintenance_margin_pct / initial_margin_pct) * Decimal::from(100);
    margin_level < threshold
}

/// `winning / total * 100`, or 0 if there have been no trades.
pub fn win_rate(winning_trades: u32, total_trades: u32) -> Decimal {
    if total_trades == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(winning_trades) * Decimal::from(100) / Decimal::from(total_trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn notional_is_quantity_times_price() {
        assert_eq!(notional(dec!(0.05), dec!(100_000)), dec!(5000));
    }

    #[test]
    fn margin_required_divides_notional_by_leverage() {
        assert_eq!(margin_required(dec!(5000), dec!(2)), dec!(2500));
    }

    #[test]
    fn unrealized_pnl_long_profits_on_price_increase() {
        let pnl = unrealized_pnl(PositionSide::Long, dec!(0.05), dec!(100_000), dec!(105_000));
        assert_eq!(pnl, dec!(250));
    }

    #[test]
    fn unrealized_pnl_short_profits_on_price_decrease() {
        let pnl = unrealized_pnl(PositionSide::Short, dec!(1), dec!(4_000), dec!(3_800));
        assert_eq!(pnl, dec!(200));
    }

    #[test]
    fn pnl_pct_is_zero_when_base_is_zero() {
        assert_eq!(pnl_pct(dec!(100), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn pnl_pct_divides_and_scales_to_percent() {
        assert_eq!(pnl_pct(dec!(250), dec!(5000)), dec!(5));
    }

    #[test]
    fn equity_is_cash_plus_unrealized_pnl() {
        assert_eq!(equity(dec!(10_000), dec!(250)), dec!(10_250));
    }

    #[test]
    fn margin_level_is_equity_over_margin_used_as_percent() {
        assert_eq!(margin_level(dec!(10_250), dec!(2500)), dec!(410));
    }

    #[test]
    fn current_leverage_is_zero_when_equity_is_zero() {
        assert_eq!(current_leverage(dec!(5000), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn current_leverage_divides_notional_by_equity() {
        assert_eq!(current_leverage(dec!(10_000), dec!(10_000)), dec!(1));
    }

    #[test]
    fn initial_margin_pct_is_100_over_max_leverage() {
        assert_eq!(initial_margin_pct(dec!(10)), dec!(10));
    }

    #[test]
    fn check_liquidation_triggers_below_threshold() {
        // max_leverage=10 -> initial=10; maintenance=5 -> threshold 50%.
        assert!(check_liquidation(dec!(40), dec!(5), dec!(10)));
        assert!(!check_liquidation(dec!(60), dec!(5), dec!(10)));
    }

    #[test]
    fn win_rate_is_zero_with_no_trades() {
        assert_eq!(win_rate(0, 0), Decimal::ZERO);
    }

    #[test]
    fn win_rate_divides_winners_by_total() {
        assert_eq!(win_rate(3, 4), dec!(75));
    }

    proptest::proptest! {
        #[test]
        fn equity_is_never_less_than_cash_minus_abs_upnl(cash in -1_000_000i64..1_000_000, upnl in -1_000_000i64..1_000_000) {
            let cash = Decimal::from(cash);
            let upnl = Decimal::from(upnl);
            let eq = equity(cash, upnl);
            proptest::prop_assert_eq!(eq, cash + upnl);
        }
    }
}
