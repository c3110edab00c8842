//! 마켓 레코드와 스냅샷.
//!
//! 업스트림 JSON은 필드 표기가 일정하지 않습니다. 숫자가 문자열로 오기도 하고
//! `event_time`은 epoch 밀리초 또는 RFC 3339 문자열일 수 있습니다.
//! 역직렬화는 이를 모두 수용하고, 직렬화는 항상 같은 형태(밀리초, 10진 문자열)를 냅니다.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// 단일 캔들과 지표 값.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRecord {
    #[serde(
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_event_time"
    )]
    pub event_time: DateTime<Utc>,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub open: Decimal,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub high: Decimal,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub low: Decimal,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub close: Decimal,
    /// 0-100 범위로 잘린 RSI
    #[serde(deserialize_with = "deserialize_rsi")]
    pub rsi: u8,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub median_close: Decimal,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub moving_average: Decimal,
}

/// 하나의 (심볼, 인터벌) 쌍에 대한 레코드 목록. 항상 최신순입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<MarketRecord>);

impl Snapshot {
    /// 정렬되지 않은 레코드로 스냅샷을 만듭니다.
    ///
    /// `event_time` 내림차순 안정 정렬이므로 같은 시각의 레코드는 입력 순서를 유지합니다.
    pub fn from_unsorted(mut records: Vec<MarketRecord>) -> Self {
        records.sort_by(|a, b| b.event_time.cmp(&a.event_time));
        Self(records)
    }

    pub fn records(&self) -> &[MarketRecord] {
        &self.0
    }

    pub fn latest(&self) -> Option<&MarketRecord> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_records(self) -> Vec<MarketRecord> {
        self.0
    }

    /// 구독자에게 보낼 JSON 배열 문자열.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<MarketRecord>::deserialize(deserializer).map(Snapshot::from_unsorted)
    }
}

// ==================== serde 헬퍼 ====================

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Int(i64),
    Float(f64),
    Str(String),
}

fn serialize_millis<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.timestamp_millis())
}

fn deserialize_event_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let millis = match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Int(ms) => ms,
        NumOrStr::Float(ms) => ms as i64,
        NumOrStr::Str(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<i64>() {
                ms
            } else {
                return DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| de::Error::custom(format!("invalid event_time '{s}': {e}")));
            }
        }
    };

    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| de::Error::custom(format!("event_time out of range: {millis}")))
}

fn deserialize_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Int(v) => Ok(Decimal::from(v)),
        NumOrStr::Float(v) => Decimal::try_from(v).map_err(de::Error::custom),
        NumOrStr::Str(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map_err(|e| de::Error::custom(format!("invalid decimal '{s}': {e}"))),
    }
}

fn deserialize_rsi<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Int(v) => v as f64,
        NumOrStr::Float(v) => v,
        NumOrStr::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid rsi '{s}': {e}")))?,
    };
    if raw.is_nan() {
        return Err(de::Error::custom("rsi is NaN"));
    }
    Ok(raw.trunc().clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn record(ms: i64, close: Decimal) -> MarketRecord {
        MarketRecord {
            event_time: Utc.timestamp_millis_opt(ms).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            rsi: 50,
            median_close: close,
            moving_average: close,
        }
    }

    #[test]
    fn test_parses_mixed_upstream_fields() {
        let json = r#"[
            {"event_time": 1700000000000, "open": "1.5", "high": 2, "low": 1.25,
             "close": "1.75", "rsi": "71.9", "median_close": 1.6, "moving_average": "1.7"},
            {"event_time": "2023-11-15T00:00:00Z", "open": 1, "high": 1, "low": 1,
             "close": 1, "rsi": 130, "median_close": 1, "moving_average": 1}
        ]"#;

        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let records = snapshot.records();

        assert_eq!(records.len(), 2);
        // 2023-11-15 > 2023-11-14 (1700000000000)
        assert_eq!(records[0].rsi, 100);
        assert_eq!(records[1].rsi, 71);
        assert_eq!(records[1].open, dec!(1.5));
        assert_eq!(records[1].low, dec!(1.25));
    }

    #[test]
    fn test_serializes_event_time_as_millis() {
        let json = serde_json::to_value(record(1_700_000_000_000, dec!(2))).unwrap();
        assert_eq!(json["event_time"], 1_700_000_000_000i64);
        assert_eq!(json["close"], "2");
    }

    #[test]
    fn test_rejects_garbage() {
        let json = r#"[{"event_time": "yesterday", "open": 1, "high": 1, "low": 1,
            "close": 1, "rsi": 1, "median_close": 1, "moving_average": 1}]"#;
        assert!(serde_json::from_str::<Snapshot>(json).is_err());
    }

    #[test]
    fn test_latest_is_newest() {
        let snapshot = Snapshot::from_unsorted(vec![record(1, dec!(1)), record(3, dec!(3)), record(2, dec!(2))]);
        assert_eq!(snapshot.latest().unwrap().close, dec!(3));
    }

    proptest! {
        #[test]
        fn prop_sort_is_stable_descending(times in proptest::collection::vec(0i64..20, 0..40)) {
            let input: Vec<MarketRecord> = times
                .iter()
                .enumerate()
                .map(|(i, &t)| record(t, Decimal::from(i as i64)))
                .collect();

            let sorted = Snapshot::from_unsorted(input).into_records();

            for pair in sorted.windows(2) {
                prop_assert!(pair[0].event_time >= pair[1].event_time);
                if pair[0].event_time == pair[1].event_time {
                    // close에 원래 인덱스를 담았으므로 입력 순서가 유지되어야 함
                    prop_assert!(pair[0].close < pair[1].close);
                }
            }
        }
    }
}
