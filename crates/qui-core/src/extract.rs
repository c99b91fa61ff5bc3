//! 支配カウンタ（レコード内の reductionCounter の最大値）の抽出

use serde_json::Value;

use crate::document::ExperimentRecord;
use crate::error::RecordError;

/// 最古のシミュレータ出力で各頂点が `{"reductionCounter": n}` の形をしているときのキー
pub const LEGACY_COUNTER_KEY: &str = "reductionCounter";

/// 1頂点分のカウンタ値を非負整数として読む
fn counter_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::Object(obj) => obj.get(LEGACY_COUNTER_KEY).and_then(Value::as_u64),
        _ => None,
    }
}

/// 実験サイズ（反射頂点数 = カウンタの個数）
pub fn experiment_size(record: &ExperimentRecord) -> u64 {
    record.reduction_counters.len() as u64
}

/// レコードの支配カウンタを求める
///
/// `zero_clamp` が真で最大値がちょうど 0 のときは 1 を返す（プロット軸を縮退させないため）。
pub fn dominant_counter(record: &ExperimentRecord, zero_clamp: bool) -> Result<u64, RecordError> {
    let mut max: Option<u64> = None;
    for (index, value) in record.reduction_counters.iter().enumerate() {
        let Some(n) = counter_value(value) else {
            return Err(RecordError::InvalidCounter {
                index,
                value: value.clone(),
            });
        };
        max = Some(max.map_or(n, |m| m.max(n)));
    }
    match max {
        None => Err(RecordError::EmptyRecord),
        Some(0) if zero_clamp => Ok(1),
        Some(m) => Ok(m),
    }
}

/// [`dominant_counter`] の別名（外部コマンドから見た名前）
pub fn extract_dominant(record: &ExperimentRecord, zero_clamp: bool) -> Result<u64, RecordError> {
    dominant_counter(record, zero_clamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::records;
    use proptest::prelude::*;
    use serde_json::json;

    fn record(counters: Value) -> ExperimentRecord {
        serde_json::from_value(json!({ "reductionCounterInformation": counters })).unwrap()
    }

    #[test]
    fn test_dominant_counter_scenario() {
        let recs = records(json!({
            "list": [{"reductionCounterInformation": [0, 2, 5], "duration": 1}]
        }))
        .unwrap();
        assert_eq!(extract_dominant(&recs[0], false).unwrap(), 5);
        assert_eq!(extract_dominant(&recs[0], true).unwrap(), 5);
        assert_eq!(experiment_size(&recs[0]), 3);
    }

    #[test]
    fn test_empty_record() {
        assert_eq!(dominant_counter(&record(json!([])), false), Err(RecordError::EmptyRecord));
        assert_eq!(dominant_counter(&record(json!([])), true), Err(RecordError::EmptyRecord));
    }

    #[test]
    fn test_invalid_counters() {
        for (bad, index) in [
            (json!([1, "2"]), 1),
            (json!([-1]), 0),
            (json!([1, 2.5]), 1),
            (json!([null]), 0),
            (json!([[1]]), 0),
            (json!([3, {"other": 1}]), 1),
        ] {
            match dominant_counter(&record(bad.clone()), false) {
                Err(RecordError::InvalidCounter { index: got, .. }) => {
                    assert_eq!(got, index, "{bad}")
                }
                other => panic!("{bad}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_legacy_counter_objects() {
        let rec = record(json!([{"reductionCounter": 4}, {"reductionCounter": 9}, 2]));
        assert_eq!(dominant_counter(&rec, false).unwrap(), 9);
    }

    #[test]
    fn test_zero_clamp() {
        let zeros = record(json!([0, 0]));
        assert_eq!(dominant_counter(&zeros, false).unwrap(), 0);
        assert_eq!(dominant_counter(&zeros, true).unwrap(), 1);

        // 真の最大値が 1 のときも 1（クランプと区別できないのは仕様どおり）
        let ones = record(json!([1, 0]));
        assert_eq!(dominant_counter(&ones, true).unwrap(), 1);
    }

    proptest! {
        #[test]
        fn prop_zero_clamp_never_returns_zero(counters in prop::collection::vec(0u64..20, 1..10)) {
            let rec = record(json!(counters));
            let raw = dominant_counter(&rec, false).unwrap();
            let clamped = dominant_counter(&rec, true).unwrap();
            prop_assert!(clamped >= 1);
            prop_assert_eq!(raw, *counters.iter().max().unwrap());
            if raw == 0 {
                prop_assert_eq!(clamped, 1);
            } else {
                prop_assert_eq!(clamped, raw);
            }
        }
    }
}
