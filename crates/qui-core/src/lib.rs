//! モーターサイクルグラフ縮約実験の出力集計ライブラリ
//!
//! シミュレータが書き出した JSON を読み、形状を Canonical へ正規化し、
//! 実験ごとの支配カウンタ（reductionCounter の最大値）を
//! 「実験サイズ → 支配カウンタ → 出現回数」のヒストグラムへ畳み込む。
//!
//! - [`document`]: 形状判別と正規化
//! - [`extract`]: 支配カウンタの抽出
//! - [`histogram`]: ヒストグラムと派生ビュー
//! - [`scan`] / [`pipeline`]: ディレクトリ走査とファイル単位のエラー分離

pub mod document;
pub mod error;
pub mod extract;
pub mod histogram;
pub mod io;
pub mod loader;
pub mod pipeline;
pub mod scan;

pub use document::{DocumentShape, ExperimentRecord, GlobalInformations, Normalized, classify, normalize};
pub use error::{InvalidCounterPolicy, QuiError, QuiResult, RecordError, ShapeError};
pub use extract::{dominant_counter, experiment_size, extract_dominant};
pub use histogram::{HistogramTable, accumulate, flatten_by_index, merge_outer};
pub use pipeline::{
    FixReport, ScanConfig, ScanReport, SkippedFile, fix_directory, normalize_file, scan_histogram,
};
