//! 2段のヒストグラム（実験サイズ → 支配カウンタ → 出現回数）
//!
//! 集計は純粋な fold として書けるようにしてある。
//!
//! ```
//! use qui_core::histogram::{HistogramTable, accumulate};
//!
//! let observations = [(3, 5), (3, 5), (4, 1)];
//! let table = observations
//!     .iter()
//!     .fold(HistogramTable::new(), |t, &(size, counter)| accumulate(t, size, counter));
//! assert_eq!(table.count(3, 5), 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// JSON 上の形（キーは10進文字列）
type RawTable = BTreeMap<String, BTreeMap<String, u64>>;

/// 実験サイズ → (支配カウンタ → 出現回数)
///
/// キーはメモリ上では常に整数。出現回数は常に 1 以上。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistogramTable(BTreeMap<u64, BTreeMap<u64, u64>>);

/// デシリアライズ時の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("key {0:?} is not a non-negative integer")]
    InvalidKey(String),
    #[error("count for size {size}, counter {counter} must be positive")]
    ZeroCount { size: u64, counter: u64 },
    #[error("count for size {size}, counter {counter} overflows u64")]
    Overflow { size: u64, counter: u64 },
}

impl HistogramTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 観測を `delta` 回分追加する（`delta == 0` は何もしない、上限で飽和する）
    pub fn add(&mut self, size: u64, counter: u64, delta: u64) {
        if delta == 0 {
            return;
        }
        let slot = self.0.entry(size).or_default().entry(counter).or_insert(0);
        *slot = slot.saturating_add(delta);
    }

    /// 別のテーブルを足し込む
    pub fn merge(mut self, other: HistogramTable) -> Self {
        for (size, inner) in other.0 {
            for (counter, count) in inner {
                self.add(size, counter, count);
            }
        }
        self
    }

    pub fn count(&self, size: u64, counter: u64) -> u64 {
        self.0.get(&size).and_then(|inner| inner.get(&counter)).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 全観測数（上限で飽和する）
    pub fn total(&self) -> u64 {
        self.0
            .values()
            .flat_map(|inner| inner.values())
            .fold(0u64, |acc, &count| acc.saturating_add(count))
    }

    /// 観測された最大の支配カウンタと、そのときの実験サイズ（最小のもの）
    pub fn max_counter(&self) -> Option<(u64, u64)> {
        self.observations()
            .map(|(size, counter, _)| (size, counter))
            .fold(None, |best, (size, counter)| match best {
                Some((_, c)) if c >= counter => best,
                _ => Some((size, counter)),
            })
    }

    /// `(size, counter, count)` を昇順に列挙する
    pub fn observations(&self) -> impl Iterator<Item = (u64, u64, u64)> + '_ {
        self.0.iter().flat_map(|(&size, inner)| {
            inner.iter().map(move |(&counter, &count)| (size, counter, count))
        })
    }

    pub fn buckets(&self) -> &BTreeMap<u64, BTreeMap<u64, u64>> {
        &self.0
    }

    /// 各サイズ内でカウンタを昇順に並べ、値ではなく順位（0始まり）で数え直して合算する
    pub fn flatten_by_index(&self) -> BTreeMap<usize, u64> {
        let mut out = BTreeMap::new();
        for inner in self.0.values() {
            // BTreeMap なので反復順が昇順
            for (rank, &count) in inner.values().enumerate() {
                let slot = out.entry(rank).or_insert(0u64);
                *slot = slot.saturating_add(count);
            }
        }
        out
    }

    /// サイズをまたいで同じカウンタ値の出現回数を合算する（キー昇順）
    pub fn merge_outer(&self) -> BTreeMap<u64, u64> {
        let mut out = BTreeMap::new();
        for inner in self.0.values() {
            for (&counter, &count) in inner {
                let slot = out.entry(counter).or_insert(0u64);
                *slot = slot.saturating_add(count);
            }
        }
        out
    }
}

/// fold 用の1ステップ（観測を1件追加したテーブルを返す）
pub fn accumulate(mut table: HistogramTable, size: u64, counter: u64) -> HistogramTable {
    table.add(size, counter, 1);
    table
}

pub fn flatten_by_index(table: &HistogramTable) -> BTreeMap<usize, u64> {
    table.flatten_by_index()
}

pub fn merge_outer(table: &HistogramTable) -> BTreeMap<u64, u64> {
    table.merge_outer()
}

fn parse_key(key: &str) -> Result<u64, TableError> {
    key.trim().parse::<u64>().map_err(|_| TableError::InvalidKey(key.to_string()))
}

impl TryFrom<RawTable> for HistogramTable {
    type Error = TableError;

    /// 文字列キーを整数に正規化する。"07" と "7" のように同じ整数になるキーは合算する。
    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        let mut table = HistogramTable::new();
        for (size_key, inner) in raw {
            let size = parse_key(&size_key)?;
            for (counter_key, count) in inner {
                let counter = parse_key(&counter_key)?;
                if count == 0 {
                    return Err(TableError::ZeroCount { size, counter });
                }
                let slot = table.0.entry(size).or_default().entry(counter).or_insert(0);
                *slot = slot
                    .checked_add(count)
                    .ok_or(TableError::Overflow { size, counter })?;
            }
        }
        Ok(table)
    }
}

impl Serialize for HistogramTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // serde_json は整数キーを10進文字列として書き出す
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for HistogramTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTable::deserialize(deserializer)?;
        HistogramTable::try_from(raw).map_err(serde::de::Error::custom)
    }
}
