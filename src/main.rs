// 命令行入口
//
// title-normalize [--json] [--changed-only] [TEXT...]
// title-normalize --library FILE [--apply] [--select 1,2,3] [--config FILE] [--json]

use anyhow::{bail, Context, Result};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use title_normalizer::config::NormalizerConfig;
use title_normalizer::library::{BatchRunner, BookId, MemoryLibrary};
use title_normalizer::text::TextEngine;

/// 命令行参数
#[derive(Debug, Default, PartialEq)]
struct Options {
    json: bool,
    changed_only: bool,
    apply: bool,
    library: Option<PathBuf>,
    config: Option<PathBuf>,
    select: Option<Vec<BookId>>,
    texts: Vec<String>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Options> {
    let mut opts = Options::default();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => opts.json = true,
            "--changed-only" => opts.changed_only = true,
            "--apply" => opts.apply = true,
            "--library" => {
                let path = iter.next().context("--library 需要文件路径")?;
                opts.library = Some(PathBuf::from(path));
            }
            "--config" => {
                let path = iter.next().context("--config 需要文件路径")?;
                opts.config = Some(PathBuf::from(path));
            }
            "--select" => {
                let list = iter.next().context("--select 需要 ID 列表")?;
                opts.select = Some(parse_ids(&list)?);
            }
            "--" => {
                opts.texts.extend(iter.by_ref());
            }
            flag if flag.starts_with("--") => bail!("未知参数: {}", flag),
            _ => opts.texts.push(arg),
        }
    }

    if opts.apply && opts.library.is_none() {
        bail!("--apply 只能和 --library 一起使用");
    }

    Ok(opts)
}

fn parse_ids(list: &str) -> Result<Vec<BookId>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map(BookId)
                .with_context(|| format!("无效的 ID: {}", s))
        })
        .collect()
}

fn load_config(path: Option<&Path>) -> NormalizerConfig {
    let loaded = match path {
        Some(p) => NormalizerConfig::load_from(p),
        None => NormalizerConfig::load(),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!("加载配置失败，使用默认配置: {:#}", e);
        NormalizerConfig::new()
    })
}

/// 提案文件的默认目录：配置文件所在目录
fn proposals_base_dir(config: Option<&Path>) -> PathBuf {
    let config_file = match config {
        Some(p) => Some(p.to_path_buf()),
        None => NormalizerConfig::config_path()
            .map_err(|e| tracing::warn!("无法定位配置目录: {:#}", e))
            .ok(),
    };
    config_file
        .as_deref()
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 按命令行参数构造批处理器
fn library_runner(opts: &Options) -> BatchRunner {
    let config = load_config(opts.config.as_deref());
    let base_dir = proposals_base_dir(opts.config.as_deref());
    BatchRunner::new(config, &base_dir)
}

fn run_text(opts: &Options) -> Result<()> {
    let engine = TextEngine::new();

    let inputs: Vec<String> = if opts.texts.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<_>>()
            .context("读取标准输入失败")?
    } else {
        opts.texts.clone()
    };

    for input in &inputs {
        let result = engine.transform(Some(input));
        if opts.changed_only && !result.changed {
            continue;
        }
        if opts.json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            println!("{}", result.text());
        }
    }

    Ok(())
}

fn run_library(opts: &Options, path: &Path) -> Result<()> {
    let mut library = MemoryLibrary::load(path)?;
    if let Some(ids) = &opts.select {
        library.select(ids.clone());
    }

    let runner = library_runner(opts);
    let (proposals, report) = runner.run(&mut library, opts.apply)?;

    if opts.json {
        let output = serde_json::json!({
            "proposals": proposals.changes,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if proposals.changes.is_empty() {
        println!("No changes proposed: titles/series already normalized");
    } else if !opts.apply {
        println!("Proposed normalization changes:");
        for change in &proposals.changes {
            println!("{}", change.describe());
        }
    } else {
        println!("{}", report.summary());
    }

    if opts.apply && report.applied > 0 {
        library.save(path)?;
    }

    if !report.is_success() {
        bail!("{} 条记录写回失败", report.failures.len());
    }

    Ok(())
}

fn main() -> Result<()> {
    // 初始化日志（输出到 stderr，不干扰结果输出）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let opts = parse_args(std::env::args().skip(1))?;

    match &opts.library {
        Some(path) => run_library(&opts, path),
        None => run_text(&opts),
    }
}
