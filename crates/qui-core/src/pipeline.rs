//! ディレクトリ単位の処理（ファイルごとのエラー分離つき fold）

use std::path::{Path, PathBuf};

use crate::document::{normalize, records};
use crate::error::{InvalidCounterPolicy, QuiError, QuiResult};
use crate::extract::{dominant_counter, experiment_size};
use crate::histogram::{HistogramTable, accumulate};
use crate::loader::{read_document, write_document};
use crate::scan::{DEFAULT_PATTERN, find_files};

/// 走査設定
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 走査するルートディレクトリ
    pub root: PathBuf,
    /// ファイル名に対する glob（既定: `*.json`）
    pub pattern: String,
    /// 最大値 0 を 1 として数えるか
    pub zero_clamp: bool,
    /// 非数値カウンタを見つけたときの方針
    pub on_invalid_counter: InvalidCounterPolicy,
}

impl ScanConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pattern: DEFAULT_PATTERN.to_string(),
            zero_clamp: false,
            on_invalid_counter: InvalidCounterPolicy::default(),
        }
    }
}

/// スキップしたファイルとその理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// ヒストグラム走査の結果
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub table: HistogramTable,
    pub files_seen: usize,
    pub records: usize,
    pub skipped: Vec<SkippedFile>,
}

/// 正規化走査の結果
#[derive(Debug, Clone, Default)]
pub struct FixReport {
    pub rewritten: Vec<PathBuf>,
    pub unchanged: usize,
    pub skipped: Vec<SkippedFile>,
}

/// 1ファイル分の `(実験サイズ, 支配カウンタ)` を取り出す
///
/// どれか1レコードでも失敗したらファイル全体を失敗とし、部分的な観測は返さない。
pub fn observe_file(path: &Path, zero_clamp: bool) -> QuiResult<Vec<(u64, u64)>> {
    let document = read_document(path)?;
    let records = records(document).map_err(|e| QuiError::from_shape(path, e))?;
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            dominant_counter(record, zero_clamp)
                .map(|counter| (experiment_size(record), counter))
                .map_err(|e| QuiError::from_record(path, i, e))
        })
        .collect()
}

/// 致命的でないエラーは警告して `skipped` に記録し、致命的なものはそのまま返す
fn triage(
    path: &Path,
    err: QuiError,
    policy: InvalidCounterPolicy,
    skipped: &mut Vec<SkippedFile>,
) -> QuiResult<()> {
    if err.is_fatal(policy) {
        log::error!("aborting scan: {err}");
        return Err(err);
    }
    log::warn!("skipping {}: {err}", path.display());
    skipped.push(SkippedFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    });
    Ok(())
}

/// `root` 以下の全ファイルを畳み込んでヒストグラムを作る
pub fn scan_histogram(config: &ScanConfig) -> QuiResult<ScanReport> {
    let files = find_files(&config.root, &config.pattern)?;
    log::info!("scanning {} files under {}", files.len(), config.root.display());

    let mut report = ScanReport::default();
    let mut biggest: Option<u64> = None;

    for path in &files {
        report.files_seen += 1;
        let observations = match observe_file(path, config.zero_clamp) {
            Ok(obs) => obs,
            Err(e) => {
                triage(path, e, config.on_invalid_counter, &mut report.skipped)?;
                continue;
            }
        };
        report.records += observations.len();
        for (size, counter) in observations {
            if biggest.is_none_or(|b| counter > b) {
                biggest = Some(counter);
                log::info!(
                    "new biggest reduction counter: reflex_node_count={size} biggest={counter} file={}",
                    path.display()
                );
            }
            report.table = accumulate(report.table, size, counter);
        }
    }

    log::info!(
        "scanned {} files ({} records, {} skipped)",
        report.files_seen,
        report.records,
        report.skipped.len()
    );
    Ok(report)
}

fn normalize_path(path: &Path, write: bool) -> QuiResult<bool> {
    let document = read_document(path)?;
    let normalized = normalize(document).map_err(|e| QuiError::from_shape(path, e))?;
    if normalized.changed && write {
        write_document(path, &normalized.document)?;
    }
    Ok(normalized.changed)
}

/// ファイルを Canonical 形へ正規化し、変更があれば同じパスへ上書きする
pub fn normalize_file(path: &Path) -> QuiResult<bool> {
    normalize_path(path, true)
}

/// 上書きせずに、正規化で変更が生じるかだけを調べる
pub fn needs_normalization(path: &Path) -> QuiResult<bool> {
    normalize_path(path, false)
}

/// `root` 以下の全ファイルを正規化する（`dry_run` では書き込まない）
pub fn fix_directory(config: &ScanConfig, dry_run: bool) -> QuiResult<FixReport> {
    let files = find_files(&config.root, &config.pattern)?;
    log::info!("normalizing {} files under {}", files.len(), config.root.display());

    let mut report = FixReport::default();
    for path in &files {
        let result = if dry_run {
            needs_normalization(path)
        } else {
            normalize_file(path)
        };
        match result {
            Ok(true) => {
                log::info!(
                    "{} {}",
                    if dry_run { "would rewrite" } else { "rewrote" },
                    path.display()
                );
                report.rewritten.push(path.clone());
            }
            Ok(false) => {
                log::debug!("already canonical: {}", path.display());
                report.unchanged += 1;
            }
            Err(e) => triage(path, e, config.on_invalid_counter, &mut report.skipped)?,
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn test_scan_skips_bad_files_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.json", r#"{"list":[{"reductionCounterInformation":[0,2,5],"duration":1}]}"#);
        write(root, "b/legacy.json", "[[1,2],[3]]");
        write(root, "c/empty.json", r#"{"list":[{"reductionCounterInformation":[]}]}"#);
        write(root, "d/broken.json", "not json");
        write(root, "e/shape.json", r#"{"foo": 1}"#);

        let report = scan_histogram(&ScanConfig::new(root)).unwrap();
        assert_eq!(report.files_seen, 5);
        assert_eq!(report.records, 3);
        assert_eq!(report.skipped.len(), 3);
        assert!(report.skipped.iter().any(|s| s.path.ends_with("c/empty.json")));

        let expected: HistogramTable =
            serde_json::from_value(json!({"3": {"5": 1}, "2": {"2": 1}, "1": {"3": 1}})).unwrap();
        assert_eq!(report.table, expected);
    }

    #[test]
    fn test_empty_record_drops_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "x.json", "[[4, 1], []]");
        let err = observe_file(&path, false).unwrap_err();
        assert!(matches!(err, QuiError::EmptyRecord { record: 1, .. }), "{err:?}");

        let report = scan_histogram(&ScanConfig::new(dir.path())).unwrap();
        assert!(report.table.is_empty());
    }

    #[test]
    fn test_invalid_counter_policy() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.json", r#"[[1, "x"]]"#);
        write(dir.path(), "good.json", "[[7]]");

        let mut config = ScanConfig::new(dir.path());
        let report = scan_histogram(&config).unwrap();
        assert_eq!(report.table.count(1, 7), 1);
        assert_eq!(report.skipped.len(), 1);

        config.on_invalid_counter = InvalidCounterPolicy::Abort;
        let err = scan_histogram(&config).unwrap_err();
        assert!(matches!(err, QuiError::InvalidCounter { .. }));
    }

    #[test]
    fn test_zero_clamp_in_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "z.json", "[[0, 0]]");
        let mut config = ScanConfig::new(dir.path());
        config.zero_clamp = true;
        let report = scan_histogram(&config).unwrap();
        assert_eq!(report.table.count(2, 1), 1);
        assert_eq!(report.table.count(2, 0), 0);
    }

    #[test]
    fn test_normalize_file_rewrites_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "legacy.json", "[[1,2],[3]]");

        assert!(needs_normalization(&path).unwrap());
        // dry run は書き込まない
        assert_eq!(fs::read_to_string(&path).unwrap(), "[[1,2],[3]]");

        assert!(normalize_file(&path).unwrap());
        let first = fs::read_to_string(&path).unwrap();
        assert!(!normalize_file(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), first);

        let doc: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(doc["list"][1], json!({"reductionCounterInformation": [3], "duration": 0}));
    }

    #[test]
    fn test_normalize_file_writes_plain_counters() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "oldest.json",
            r#"[[{"reductionCounter":1},{"reductionCounter":4}]]"#,
        );

        assert!(normalize_file(&path).unwrap());
        let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["list"][0]["reductionCounterInformation"], json!([1, 4]));
        assert!(!normalize_file(&path).unwrap());

        // 書き換え後も同じ観測になる
        assert_eq!(observe_file(&path, false).unwrap(), vec![(2, 4)]);
    }

    #[test]
    fn test_fix_directory_reports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "legacy.json", "[[1]]");
        write(
            dir.path(),
            "canonical.json",
            r#"{"list":[],"globalInformations":{"sizes":{},"performance":{}}}"#,
        );
        write(dir.path(), "broken.json", "{");

        let config = ScanConfig::new(dir.path());
        let dry = fix_directory(&config, true).unwrap();
        assert_eq!(dry.rewritten.len(), 1);
        assert_eq!(dry.unchanged, 1);
        assert_eq!(dry.skipped.len(), 1);

        let real = fix_directory(&config, false).unwrap();
        assert_eq!(real.rewritten, dry.rewritten);
        let again = fix_directory(&config, false).unwrap();
        assert!(again.rewritten.is_empty());
        assert_eq!(again.unchanged, 2);
    }

    #[test]
    fn test_file_order_does_not_matter() {
        // 同じ内容を別名で置いても、名前の並びに関係なく同じテーブルになる
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let bodies = ["[[1,4],[2]]", "[[9,9,0]]", "[[3],[3]]"];
        for (i, body) in bodies.iter().enumerate() {
            write(a.path(), &format!("{i}.json"), body);
            write(b.path(), &format!("{}.json", bodies.len() - i), body);
        }
        let ta = scan_histogram(&ScanConfig::new(a.path())).unwrap().table;
        let tb = scan_histogram(&ScanConfig::new(b.path())).unwrap().table;
        assert_eq!(ta, tb);
    }
}
