//! エラー型
//!
//! 純粋関数層（正規化・抽出）はパスを知らないので [`ShapeError`] / [`RecordError`] を返し、
//! ファイル単位の処理層でパス付きの [`QuiError`] に包む。

use std::path::{Path, PathBuf};

use serde_json::Value;

/// ドキュメント形状の判別に失敗した
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    /// Legacy / Canonical のどちらの目印も持たない
    #[error("document is neither legacy nor canonical: {reason}")]
    MissingShape { reason: String },
}

/// 1レコード分の支配カウンタ抽出に失敗した
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// reductionCounter が空で最大値が定義できない
    #[error("record has no reduction counters")]
    EmptyRecord,

    /// 非負整数でないカウンタ値
    #[error("counter #{index} is not a non-negative integer: {value}")]
    InvalidCounter { index: usize, value: Value },
}

/// 非数値カウンタを見つけたときの方針
///
/// 既存コマンドの挙動が「実行全体を止める」と「そのファイルだけ飛ばす」で割れていたため、
/// どちらにするかは呼び出し側が明示的に選ぶ。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidCounterPolicy {
    /// 警告を出してファイルをスキップし、走査を続ける
    #[default]
    Skip,
    /// 走査全体を中断する
    Abort,
}

/// ファイル単位の処理エラー（すべて対象パスを保持する）
#[derive(Debug, thiserror::Error)]
pub enum QuiError {
    #[error("{}: invalid JSON: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: {source}", .path.display())]
    MissingShape {
        path: PathBuf,
        #[source]
        source: ShapeError,
    },

    #[error("{}: record #{record} has no reduction counters", .path.display())]
    EmptyRecord { path: PathBuf, record: usize },

    #[error("{}: record #{record}: counter #{index} is not a non-negative integer: {value}", .path.display())]
    InvalidCounter {
        path: PathBuf,
        record: usize,
        index: usize,
        value: Value,
    },

    #[error("{}: invalid histogram table: {reason}", .path.display())]
    InvalidTable { path: PathBuf, reason: String },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl QuiError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        QuiError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn from_record(path: &Path, record: usize, err: RecordError) -> Self {
        match err {
            RecordError::EmptyRecord => QuiError::EmptyRecord {
                path: path.to_path_buf(),
                record,
            },
            RecordError::InvalidCounter { index, value } => QuiError::InvalidCounter {
                path: path.to_path_buf(),
                record,
                index,
                value,
            },
        }
    }

    pub(crate) fn from_shape(path: &Path, source: ShapeError) -> Self {
        QuiError::MissingShape {
            path: path.to_path_buf(),
            source,
        }
    }

    /// 対象ファイルのパス（パターンエラーのみ `None`）
    pub fn path(&self) -> Option<&Path> {
        match self {
            QuiError::InvalidJson { path, .. }
            | QuiError::MissingShape { path, .. }
            | QuiError::EmptyRecord { path, .. }
            | QuiError::InvalidCounter { path, .. }
            | QuiError::InvalidTable { path, .. }
            | QuiError::Io { path, .. } => Some(path),
            QuiError::InvalidPattern { .. } => None,
        }
    }

    /// 走査全体を止めるべきエラーか
    ///
    /// ファイルシステムエラーは常に致命的。非数値カウンタは `policy` に従う。
    /// それ以外はそのファイルだけスキップする。
    pub fn is_fatal(&self, policy: InvalidCounterPolicy) -> bool {
        match self {
            QuiError::Io { .. } | QuiError::InvalidPattern { .. } => true,
            QuiError::InvalidCounter { .. } => policy == InvalidCounterPolicy::Abort,
            QuiError::InvalidJson { .. }
            | QuiError::MissingShape { .. }
            | QuiError::EmptyRecord { .. }
            | QuiError::InvalidTable { .. } => false,
        }
    }
}

pub type QuiResult<T> = Result<T, QuiError>;
