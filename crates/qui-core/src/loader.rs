//! JSON ドキュメント / ヒストグラムの読み書き

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::{QuiError, QuiResult};
use crate::histogram::HistogramTable;
use crate::io::{open_reader, open_writer};

/// JSON として読めることだけを確認して読み込む
pub fn read_document(path: &Path) -> QuiResult<Value> {
    let reader = open_reader(path).map_err(|e| QuiError::io(path, e))?;
    // gzip の破損もここで serde_json のエラーとして上がってくるので、ファイル単位のスキップ対象にする
    serde_json::from_reader(reader).map_err(|source| QuiError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

fn write_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> QuiResult<()> {
    let mut w = open_writer(path).map_err(|e| QuiError::io(path, e))?;
    serde_json::to_writer_pretty(&mut w, value)
        .map_err(|e| QuiError::io(path, std::io::Error::other(e)))?;
    w.write_all(b"\n").map_err(|e| QuiError::io(path, e))?;
    w.close().map_err(|e| QuiError::io(path, e))
}

/// ドキュメントを同じパスへ上書きする（トランザクションではない）
pub fn write_document(path: &Path, document: &Value) -> QuiResult<()> {
    write_pretty(path, document)
}

/// 保存済みヒストグラムを読み込む（文字列キーはここで整数に正規化される）
pub fn load_table(path: &Path) -> QuiResult<HistogramTable> {
    let value = read_document(path)?;
    serde_json::from_value(value).map_err(|e| QuiError::InvalidTable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn save_table(path: &Path, table: &HistogramTable) -> QuiResult<()> {
    write_pretty(path, table)
}
