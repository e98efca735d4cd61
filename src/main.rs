//! # Chaser-Pilot 命令行入口
//!
//! 通过 Chrome DevTools Protocol 操作一个已在运行的浏览器页面。
//!
//! ## 主要功能
//! - 导航、读取可访问性快照、按 ref 点击与输入
//! - 按键、滚动、截图、提取正文
//! - `--json` 模式下每次调用输出一个 JSON 对象
//!
//! ## 退出码
//! - `0`: 成功
//! - `1`: 未恢复的错误，或 ref 已失效（此时输出结构化的失效信息）
//!
//! ## 环境变量
//! - `PILOT_HOST` / `PILOT_PORT`: 调试端点（默认: 127.0.0.1:9222）
//! - `PILOT_LOG_LEVEL`: 日志级别（默认: warn），`RUST_LOG` 优先

use anyhow::Context;
use chaser_pilot::{
    config::Config,
    page::{Page, ScrollDirection},
    snapshot::{ElementRef, Filter, RefOutcome, SnapshotOptions, StaleRef},
};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Drive a running browser through its remote debugging port
#[derive(Parser)]
#[command(name = "chaser-pilot")]
#[command(version)]
struct Cli {
    /// Remote debugging port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Remote debugging host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Print one JSON object instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Navigate to a URL
    Go {
        url: String,
    },

    /// Print the accessibility snapshot
    Read {
        /// interactive or all
        #[arg(long, default_value = "interactive")]
        filter: Filter,

        /// Maximum DOM depth
        #[arg(long)]
        depth: Option<u32>,
    },

    /// Click an element by ref
    Click {
        /// Element ref, e.g. e12
        target: ElementRef,
    },

    /// Type text, into a ref or the focused element
    Type {
        text: String,

        /// Element ref to fill
        #[arg(long = "ref")]
        target: Option<ElementRef>,

        /// Press Enter afterwards
        #[arg(long)]
        submit: bool,
    },

    /// Press a named key (Enter, Tab, Escape, Backspace, arrows)
    Key {
        name: String,
    },

    /// Save a PNG screenshot
    Snap {
        /// Capture the whole document
        #[arg(long)]
        full: bool,

        /// Output path
        #[arg(short, long, default_value = "screenshot.png")]
        output: PathBuf,
    },

    /// Scroll up, down, top or bottom
    Scroll {
        direction: ScrollDirection,

        /// Pixels for up/down
        amount: Option<u32>,
    },

    /// Sleep for a number of seconds
    Wait {
        seconds: f64,
    },

    /// Print the page's readable text
    Text,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())?,
        None => Config::from_env()?,
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(host) = &cli.host {
        config.host = host.clone();
    }
    config.validate()?;
    Ok(config)
}

fn init_logging(config: &Config) {
    // Respect RUST_LOG when it names a level, otherwise the configured one
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .or_else(|| config.log_level.parse::<Level>().ok())
        .unwrap_or(Level::WARN);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    // Only fails if a subscriber is already installed
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Print `value` as JSON, or `human` otherwise
fn emit(json_mode: bool, value: serde_json::Value, human: impl FnOnce() -> String) {
    if json_mode {
        println!("{}", value);
    } else {
        println!("{}", human());
    }
}

fn report_stale(stale: &StaleRef) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string(stale)?);
    Ok(ExitCode::FAILURE)
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
    let json_mode = cli.json;
    let mut page = Page::from_config(config)?;

    match cli.command {
        Commands::Go { url } => {
            let nav = page.navigate(&url).await?;
            emit(json_mode, json!(nav), || {
                format!("Navigated to {} ({})", nav.url, nav.title)
            });
        }
        Commands::Read { filter, depth } => {
            let options = SnapshotOptions {
                filter,
                max_depth: depth.unwrap_or(page.config().snapshot_depth),
            };
            let snapshot = page.snapshot(options).await?;
            emit(json_mode, serde_json::to_value(&snapshot)?, || {
                snapshot.tree.clone()
            });
        }
        Commands::Click { target } => match page.click(&target).await? {
            RefOutcome::Done(point) => emit(
                json_mode,
                json!({ "ok": true, "ref": target.to_string(), "x": point.x, "y": point.y }),
                || format!("Clicked {}", target),
            ),
            RefOutcome::Stale(stale) => return report_stale(&stale),
        },
        Commands::Type {
            text,
            target,
            submit,
        } => match page.type_text(&text, target.as_ref(), submit).await? {
            RefOutcome::Done(()) => emit(
                json_mode,
                json!({ "ok": true, "chars": text.chars().count(), "submitted": submit }),
                || format!("Typed {} characters", text.chars().count()),
            ),
            RefOutcome::Stale(stale) => return report_stale(&stale),
        },
        Commands::Key { name } => {
            page.press_key(&name).await?;
            emit(json_mode, json!({ "ok": true, "key": name }), || {
                format!("Pressed {}", name)
            });
        }
        Commands::Snap { full, output } => {
            let png = page.screenshot(full).await?;
            tokio::fs::write(&output, &png)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            emit(
                json_mode,
                json!({ "path": output.display().to_string(), "bytes": png.len(), "full": full }),
                || format!("Saved {} ({} bytes)", output.display(), png.len()),
            );
        }
        Commands::Scroll { direction, amount } => {
            page.scroll(direction, amount).await?;
            emit(
                json_mode,
                json!({ "ok": true, "direction": direction.to_string() }),
                || format!("Scrolled {}", direction),
            );
        }
        Commands::Wait { seconds } => {
            let duration = Duration::try_from_secs_f64(seconds)
                .map_err(|_| anyhow::anyhow!("Invalid wait duration: {}", seconds))?;
            page.wait(duration).await;
            emit(json_mode, json!({ "ok": true, "seconds": seconds }), || {
                format!("Waited {}s", seconds)
            });
        }
        Commands::Text => {
            let text = page.page_text().await?;
            emit(json_mode, json!({ "text": text }), || text.clone());
        }
    }

    page.close().await;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);
    debug!("Chaser-Pilot v{} on {}", chaser_pilot::VERSION, config.endpoint());

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            // Keep the io cause for file errors; library errors already carry their detail
            match e.downcast_ref::<chaser_pilot::Error>() {
                Some(_) => eprintln!("error: {}", e),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
