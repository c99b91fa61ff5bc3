//! ヒストグラムの出力（テキスト / JSON / CSV）

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Result;
use clap::ValueEnum;
use qui_core::HistogramTable;

/// 出力するビュー
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum View {
    /// 実験サイズ → 支配カウンタ → 出現回数
    Table,
    /// サイズをまたいで支配カウンタごとに合算（merge_outer）
    Merged,
    /// サイズ内の順位ごとに合算（flatten_by_index）
    Ranked,
}

/// 出力形式
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    /// プロット用の CSV
    Csv,
}

pub fn render(table: &HistogramTable, view: View, format: Format) -> Result<String> {
    let out = match (view, format) {
        (View::Table, Format::Text) => table_text(table),
        (View::Table, Format::Json) => serde_json::to_string_pretty(table)?,
        (View::Table, Format::Csv) => {
            let rows = table
                .observations()
                .map(|(size, counter, count)| vec![size.to_string(), counter.to_string(), count.to_string()]);
            csv(&["experiment_size", "dominant_counter", "count"], rows)
        }
        (View::Merged, Format::Text) => series_text("dominant_counter", &table.merge_outer()),
        (View::Merged, Format::Json) => serde_json::to_string_pretty(&table.merge_outer())?,
        (View::Merged, Format::Csv) => series_csv("dominant_counter", &table.merge_outer()),
        (View::Ranked, Format::Text) => series_text("rank", &table.flatten_by_index()),
        (View::Ranked, Format::Json) => serde_json::to_string_pretty(&table.flatten_by_index())?,
        (View::Ranked, Format::Csv) => series_csv("rank", &table.flatten_by_index()),
    };
    Ok(out)
}

fn table_text(table: &HistogramTable) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{:>17} | {:>16} | {:>8}", "reflex_node_count", "dominant_counter", "count");
    let _ = writeln!(s, "{}", "=".repeat(47));
    for (size, inner) in table.buckets() {
        for (i, (counter, count)) in inner.iter().enumerate() {
            // サイズは各ブロックの先頭行にだけ出す
            let label = if i == 0 { size.to_string() } else { String::new() };
            let _ = writeln!(s, "{label:>17} | {counter:>16} | {count:>8}");
        }
    }
    let _ = writeln!(s, "{}", "-".repeat(47));
    let _ = writeln!(s, "{:>17} | {:>16} | {:>8}", "total", "", table.total());
    if let Some((size, counter)) = table.max_counter() {
        let _ = writeln!(s, "biggest dominant counter: {counter} (reflex_node_count: {size})");
    }
    s
}

fn series_text<K: std::fmt::Display>(key: &str, series: &BTreeMap<K, u64>) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{key:>16} | {:>8}", "count");
    let _ = writeln!(s, "{}", "=".repeat(27));
    for (k, count) in series {
        let _ = writeln!(s, "{k:>16} | {count:>8}");
    }
    s
}

fn series_csv<K: std::fmt::Display>(key: &str, series: &BTreeMap<K, u64>) -> String {
    csv(&[key, "count"], series.iter().map(|(k, c)| vec![k.to_string(), c.to_string()]))
}

fn csv(headers: &[&str], rows: impl Iterator<Item = Vec<String>>) -> String {
    // 値はすべて整数なのでクォートは不要
    let mut s = headers.join(",");
    s.push('\n');
    for row in rows {
        s.push_str(&row.join(","));
        s.push('\n');
    }
    s
}
