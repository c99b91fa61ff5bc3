//! 実験出力ドキュメントの形状判別と正規化
//!
//! シミュレータのバージョンによって、出力 JSON は次のどれかの形をしている。
//!
//! - Legacy: 実験ごとの reductionCounter 配列を並べただけの配列 `[[1,2],[3]]`
//! - Canonical: `{ "list": [...], "globalInformations": {...} }`
//! - NestedWrapped: `list[i].reductionCounterInformation` が1段余計に包まれたもの
//! - Unannotated: `list` だけがあり `globalInformations` が欠けたもの
//!
//! 形状は [`classify`] で一度だけ決め、[`normalize`] が `match` で Canonical へ書き換える。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ShapeError;
use crate::extract::LEGACY_COUNTER_KEY;

pub const LIST_KEY: &str = "list";
pub const GLOBAL_INFORMATIONS_KEY: &str = "globalInformations";
pub const COUNTERS_KEY: &str = "reductionCounterInformation";
pub const DURATION_KEY: &str = "duration";

/// ドキュメントの形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    Legacy,
    Canonical,
    NestedWrapped,
    Unannotated,
}

/// `globalInformations.sizes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sizes {
    pub motorcycles: u64,
    pub intersections: u64,
}

/// `globalInformations.performance`（各フェーズの所要時間）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub motorcycles: f64,
    pub intersection_cache: f64,
    pub calculate_random_lists: f64,
}

/// 実行全体のメタデータ。Legacy からの変換時はすべて 0 のプレースホルダになる。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalInformations {
    pub sizes: Sizes,
    pub performance: Performance,
}

impl GlobalInformations {
    fn placeholder_value() -> Value {
        // 構造体はすべて数値フィールドなので失敗しない
        serde_json::to_value(GlobalInformations::default()).unwrap_or(Value::Null)
    }
}

/// 1回のシミュレーション実行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    /// 反射頂点ごとの reductionCounter（検証は抽出時に行うので生の値で保持する）
    #[serde(rename = "reductionCounterInformation")]
    pub reduction_counters: Vec<Value>,
    #[serde(default)]
    pub duration: f64,
}

impl ExperimentRecord {
    pub fn new(reduction_counters: Vec<Value>) -> Self {
        Self {
            reduction_counters,
            duration: 0.0,
        }
    }
}

/// 正規化結果
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub document: Value,
    pub changed: bool,
}

fn missing(reason: impl Into<String>) -> ShapeError {
    ShapeError::MissingShape {
        reason: reason.into(),
    }
}

/// `list` 要素が1段余計に包まれているか
fn is_wrapped_entry(entry: &Value) -> bool {
    entry
        .get(COUNTERS_KEY)
        .and_then(Value::as_object)
        .is_some_and(|inner| inner.contains_key(COUNTERS_KEY))
}

/// ドキュメントの形状を判別する
pub fn classify(document: &Value) -> Result<DocumentShape, ShapeError> {
    match document {
        Value::Array(experiments) => {
            if let Some(pos) = experiments.iter().position(|e| !e.is_array()) {
                return Err(missing(format!("legacy entry #{pos} is not an array")));
            }
            Ok(DocumentShape::Legacy)
        }
        Value::Object(obj) => {
            let Some(list) = obj.get(LIST_KEY) else {
                return Err(missing(format!("object has no \"{LIST_KEY}\" key")));
            };
            let Some(list) = list.as_array() else {
                return Err(missing(format!("\"{LIST_KEY}\" is not an array")));
            };
            if list.first().is_some_and(is_wrapped_entry) {
                return Ok(DocumentShape::NestedWrapped);
            }
            if let Some(pos) = list.iter().position(|e| !e.is_object()) {
                return Err(missing(format!("\"{LIST_KEY}\" entry #{pos} is not an object")));
            }
            if obj.contains_key(GLOBAL_INFORMATIONS_KEY) {
                Ok(DocumentShape::Canonical)
            } else {
                Ok(DocumentShape::Unannotated)
            }
        }
        other => Err(missing(format!("unexpected top-level {}", json_kind(other)))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn canonical_entry(counters: Value, duration: Value) -> Value {
    let mut entry = Map::new();
    entry.insert(COUNTERS_KEY.to_string(), counters);
    entry.insert(DURATION_KEY.to_string(), duration);
    Value::Object(entry)
}

/// `{"reductionCounter": n}` を `n` に置き換える（整数でなければそのまま残し、抽出時に弾く）
fn plain_counter(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.get(LEGACY_COUNTER_KEY).is_some_and(Value::is_u64) => {
            obj.remove(LEGACY_COUNTER_KEY).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn wrap_legacy(experiments: Vec<Value>) -> Value {
    let list = experiments
        .into_iter()
        .map(|counters| {
            let counters = match counters {
                Value::Array(items) => Value::Array(items.into_iter().map(plain_counter).collect()),
                other => other,
            };
            canonical_entry(counters, Value::from(0))
        })
        .collect();
    let mut doc = Map::new();
    doc.insert(LIST_KEY.to_string(), Value::Array(list));
    doc.insert(GLOBAL_INFORMATIONS_KEY.to_string(), GlobalInformations::placeholder_value());
    Value::Object(doc)
}

/// 包まれた要素を内側のオブジェクトで置き換える。内側に duration がなければ外側の値を引き継ぐ。
fn unwrap_entry(entry: Value) -> Value {
    let Value::Object(mut outer) = entry else {
        return entry;
    };
    match outer.remove(COUNTERS_KEY) {
        Some(Value::Object(mut inner)) if inner.contains_key(COUNTERS_KEY) => {
            if !inner.contains_key(DURATION_KEY) {
                let duration = outer.remove(DURATION_KEY).unwrap_or_else(|| Value::from(0));
                inner.insert(DURATION_KEY.to_string(), duration);
            }
            Value::Object(inner)
        }
        Some(other) => {
            outer.insert(COUNTERS_KEY.to_string(), other);
            Value::Object(outer)
        }
        None => Value::Object(outer),
    }
}

fn ensure_global_informations(obj: &mut Map<String, Value>) {
    if !obj.contains_key(GLOBAL_INFORMATIONS_KEY) {
        obj.insert(GLOBAL_INFORMATIONS_KEY.to_string(), GlobalInformations::placeholder_value());
    }
}

/// ドキュメントを Canonical 形へ書き換える
///
/// 何段包まれていても1回の呼び出しで Canonical になるまで繰り返す。
/// Canonical を渡した場合はそのまま返し `changed = false`。
pub fn normalize(document: Value) -> Result<Normalized, ShapeError> {
    let mut document = document;
    let mut changed = false;
    loop {
        let shape = classify(&document)?;
        document = match (shape, document) {
            (DocumentShape::Canonical, doc) => {
                return Ok(Normalized {
                    document: doc,
                    changed,
                });
            }
            (DocumentShape::Legacy, Value::Array(experiments)) => wrap_legacy(experiments),
            (DocumentShape::NestedWrapped, Value::Object(mut obj)) => {
                if let Some(Value::Array(list)) = obj.remove(LIST_KEY) {
                    let list = list.into_iter().map(unwrap_entry).collect();
                    obj.insert(LIST_KEY.to_string(), Value::Array(list));
                }
                ensure_global_informations(&mut obj);
                Value::Object(obj)
            }
            (DocumentShape::Unannotated, Value::Object(mut obj)) => {
                ensure_global_informations(&mut obj);
                Value::Object(obj)
            }
            (_, other) => return Err(missing(format!("unexpected {}", json_kind(&other)))),
        };
        changed = true;
    }
}

/// ドキュメント（どの形状でもよい）から実験レコードを取り出す
///
/// 正規化はメモリ上だけで行い、ディスクには書き戻さない。
pub fn records(document: Value) -> Result<Vec<ExperimentRecord>, ShapeError> {
    let Normalized { document, .. } = normalize(document)?;
    let Value::Object(mut obj) = document else {
        return Err(missing("normalized document is not an object"));
    };
    let Some(Value::Array(list)) = obj.remove(LIST_KEY) else {
        return Err(missing(format!("normalized document has no \"{LIST_KEY}\" array")));
    };
    list.into_iter()
        .enumerate()
        .map(|(i, entry)| {
            serde_json::from_value::<ExperimentRecord>(entry)
                .map_err(|e| missing(format!("\"{LIST_KEY}\" entry #{i}: {e}")))
        })
        .collect()
}
