//! termsub 命令行入口：读取文本，按规则文档改写后输出

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use termsub::{ConfigManager, TermEngine};

#[derive(Debug, Parser)]
#[command(name = "termsub", version, about = "Rewrite recurring terms in chapter text")]
struct Cli {
    /// 规则文档（扁平数组或结构化格式的 JSON）
    #[arg(short, long)]
    rules: PathBuf,

    /// 目标文件名，用于推导 book-key（缺省时使用规则文件名）
    #[arg(short, long)]
    target: Option<String>,

    /// 输入文本文件，缺省读取标准输入
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// 输出文件，缺省写到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut builder = ConfigManager::custom()
        .rule_path(&cli.rules)
        .verbose(cli.verbose);
    if let Some(target) = &cli.target {
        builder = builder.target_name(target);
    }

    let engine = TermEngine::new(builder.build())
        .await
        .with_context(|| format!("failed to load rules from {}", cli.rules.display()))?;

    let text = match &cli.input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read standard input")?;
            buf
        }
    };

    let outcome = engine.rewrite_detailed(&text).context("rewrite failed")?;
    info!(
        "applied {} of {} candidate matches ({} overlapping discarded)",
        outcome.stats.accepted, outcome.stats.candidates, outcome.stats.discarded
    );

    match &cli.output {
        Some(path) => tokio::fs::write(path, outcome.text.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(outcome.text.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
