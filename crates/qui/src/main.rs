//! モーターサイクルグラフ縮約実験の集計 CLI
//!
//! # 使用例
//!
//! ```bash
//! # 全実験を集計して outfile.json に保存
//! qui run --input-dir runs/
//!
//! # 支配カウンタごとの分布（プロット用 CSV）
//! qui histogram --input-dir runs/ --format csv --output hist.csv
//!
//! # サイズ内順位ごとの分布
//! qui motorcycle-accumulation --input-dir runs/
//!
//! # 古い形式の出力ファイルをその場で正規化
//! qui fix-output-format --input-dir runs/ --dry-run
//!
//! # 保存済みテーブルを再表示
//! qui report --table outfile.json --view merged
//! ```

mod report;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use qui_core::io::open_writer;
use qui_core::loader::{load_table, save_table};
use qui_core::scan::DEFAULT_PATTERN;
use qui_core::{
    HistogramTable, InvalidCounterPolicy, ScanConfig, ScanReport, fix_directory, scan_histogram,
};

use report::{Format, View, render};

#[derive(Parser)]
#[command(
    name = "qui",
    version,
    about = "モーターサイクルグラフ縮約実験の出力を集計する"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// 実験出力 JSON を含むディレクトリ（再帰的に走査）
    #[arg(long)]
    input_dir: PathBuf,

    /// ファイル名の glob パターン（例: "*.json.gz"）
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// 非数値のカウンタを見つけたら走査全体を中断する（既定: 警告してそのファイルをスキップ）
    #[arg(long)]
    abort_on_invalid_counter: bool,
}

impl ScanArgs {
    fn to_config(&self, zero_clamp: bool) -> ScanConfig {
        ScanConfig {
            root: self.input_dir.clone(),
            pattern: self.pattern.clone(),
            zero_clamp,
            on_invalid_counter: if self.abort_on_invalid_counter {
                InvalidCounterPolicy::Abort
            } else {
                InvalidCounterPolicy::Skip
            },
        }
    }
}

/// 最大値 0 のレコードを 1 として数えるか（コマンドごとに既定値が違う）
#[derive(Args, Debug, Clone, Copy)]
struct ClampArgs {
    /// 最大値 0 を 1 として数える
    #[arg(long, overrides_with = "no_zero_clamp")]
    zero_clamp: bool,

    /// 最大値 0 をそのまま 0 として数える
    #[arg(long, overrides_with = "zero_clamp")]
    no_zero_clamp: bool,
}

impl ClampArgs {
    fn resolve(self, default: bool) -> bool {
        if self.zero_clamp {
            true
        } else if self.no_zero_clamp {
            false
        } else {
            default
        }
    }
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// 出力形式
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// 出力先（"-" で標準出力; .gz対応）
    #[arg(long, default_value = "-")]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Cmd {
    /// 全実験を集計し、テーブルを表示して JSON に保存する
    Run {
        #[command(flatten)]
        scan: ScanArgs,
        #[command(flatten)]
        clamp: ClampArgs,
        /// テーブルの保存先
        #[arg(long, default_value = "outfile.json")]
        save: PathBuf,
        /// 表示形式
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// 支配カウンタごとの出現回数（サイズをまたいで合算）
    Histogram {
        #[command(flatten)]
        scan: ScanArgs,
        #[command(flatten)]
        clamp: ClampArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// サイズ内の順位ごとの出現回数（異なるサイズの分布を比較する）
    MotorcycleAccumulation {
        #[command(flatten)]
        scan: ScanArgs,
        #[command(flatten)]
        clamp: ClampArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// 古い形式の出力ファイルを Canonical 形へその場で書き換える
    FixOutputFormat {
        #[command(flatten)]
        scan: ScanArgs,
        /// 書き換えずに対象ファイルだけを表示する
        #[arg(long)]
        dry_run: bool,
    },
    /// 保存済みテーブルを読み込んで表示する
    Report {
        /// `run` が保存したテーブル JSON
        #[arg(long)]
        table: PathBuf,
        #[arg(long, value_enum, default_value_t = View::Table)]
        view: View,
        #[command(flatten)]
        out: OutputArgs,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Run {
            scan,
            clamp,
            save,
            format,
        } => run_run(&scan, clamp.resolve(false), &save, format),
        Cmd::Histogram { scan, clamp, out } => {
            run_view(&scan, clamp.resolve(true), View::Merged, &out)
        }
        Cmd::MotorcycleAccumulation { scan, clamp, out } => {
            run_view(&scan, clamp.resolve(true), View::Ranked, &out)
        }
        Cmd::FixOutputFormat { scan, dry_run } => run_fix(&scan, dry_run),
        Cmd::Report { table, view, out } => run_report(&table, view, &out),
    }
}

fn scan(args: &ScanArgs, zero_clamp: bool) -> Result<ScanReport> {
    let config = args.to_config(zero_clamp);
    let report = scan_histogram(&config)
        .with_context(|| format!("走査に失敗しました: {}", config.root.display()))?;
    if report.table.is_empty() {
        log::warn!("有効な実験データがありません: {}", config.root.display());
    }
    Ok(report)
}

fn emit(text: &str, output: &Path) -> Result<()> {
    let mut w = open_writer(output)
        .with_context(|| format!("出力先を開けません: {}", output.display()))?;
    w.write_all(text.as_bytes())?;
    w.close().with_context(|| format!("書き込みに失敗しました: {}", output.display()))?;
    Ok(())
}

fn run_run(args: &ScanArgs, zero_clamp: bool, save: &Path, format: Format) -> Result<()> {
    let report = scan(args, zero_clamp)?;
    save_table(save, &report.table)
        .with_context(|| format!("テーブルを保存できません: {}", save.display()))?;
    log::info!("saved table to {}", save.display());
    emit(&render(&report.table, View::Table, format)?, Path::new("-"))
}

fn run_view(args: &ScanArgs, zero_clamp: bool, view: View, out: &OutputArgs) -> Result<()> {
    let report = scan(args, zero_clamp)?;
    emit(&render(&report.table, view, out.format)?, &out.output)
}

fn run_fix(args: &ScanArgs, dry_run: bool) -> Result<()> {
    let config = args.to_config(false);
    let report = fix_directory(&config, dry_run)
        .with_context(|| format!("正規化に失敗しました: {}", config.root.display()))?;

    let verb = if dry_run { "would rewrite" } else { "rewritten" };
    for path in &report.rewritten {
        println!("{verb}: {}", path.display());
    }
    for skipped in &report.skipped {
        println!("skipped: {}", skipped.reason);
    }
    println!(
        "{verb}: {}, unchanged: {}, skipped: {}",
        report.rewritten.len(),
        report.unchanged,
        report.skipped.len()
    );
    Ok(())
}

fn run_report(table_path: &Path, view: View, out: &OutputArgs) -> Result<()> {
    let table: HistogramTable = load_table(table_path)
        .with_context(|| format!("テーブルを読み込めません: {}", table_path.display()))?;
    emit(&render(&table, view, out.format)?, &out.output)
}
