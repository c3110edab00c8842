//! 24시간 시세.
//!
//! 변동률은 소수 둘째 자리에서 0에서 먼 쪽으로 반올림합니다 (`0.125` → `0.13`).

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 토큰의 최신 24시간 시세.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub token: String,
    pub last_price: Decimal,
    /// 24시간 변동률 (%), 소수 둘째 자리 반올림
    pub price_change_percent: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl MarketQuote {
    /// 부호가 붙은 변동률 문자열 (`+1.23`, `-0.50`, `0.00`).
    pub fn signed_change(&self) -> String {
        let pct = self
            .price_change_percent
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if pct > Decimal::ZERO {
            format!("+{:.2}", pct)
        } else {
            format!("{:.2}", pct)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote(pct: Decimal) -> MarketQuote {
        MarketQuote {
            token: "BNB".into(),
            last_price: dec!(300),
            price_change_percent: pct,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_signed_change() {
        assert_eq!(quote(dec!(1.234)).signed_change(), "+1.23");
        assert_eq!(quote(dec!(-0.5)).signed_change(), "-0.50");
        assert_eq!(quote(dec!(0)).signed_change(), "0.00");
        assert_eq!(quote(dec!(0.125)).signed_change(), "+0.13");
    }
}
