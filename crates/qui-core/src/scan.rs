//! ディレクトリ走査（再帰 glob）

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::{QuiError, QuiResult};

pub const DEFAULT_PATTERN: &str = "*.json";

/// `root` 以下を再帰的に走査し、ファイル名が `pattern` に一致する通常ファイルを返す
///
/// ディレクトリ・シンボリックリンク・デバイス等は黙ってスキップする。
/// 結果はパス順にソートする（集計結果自体は順序に依存しない）。
pub fn find_files(root: &Path, pattern: &str) -> QuiResult<Vec<PathBuf>> {
    let pat = Pattern::new(pattern).map_err(|source| QuiError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    // 存在しないルートは WalkDir だと空になるだけなので先に確認する
    std::fs::metadata(root).map_err(|e| QuiError::io(root, e))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // 走査途中で消えたエントリや権限のないサブディレクトリ
                log::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry.file_name().to_str().is_some_and(|name| pat.matches(name));
        if matches {
            files.push(entry.into_path());
        }
    }
    files.sort();
    log::debug!("found {} files matching {pattern:?} under {}", files.len(), root.display());
    Ok(files)
}
