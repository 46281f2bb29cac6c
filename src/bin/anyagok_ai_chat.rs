//! anyagok-ai-chat — 命令行诊断工具：发送一次对话请求或检查提供方可用性
//!
//! Usage:
//!   anyagok-ai-chat chat [--stream] [--no-cache] [--system <text>] [--config <file>] <prompt...>
//!   anyagok-ai-chat check [--config <file>]
//!
//! Logging is controlled by `RUST_LOG` (default `anyagok_ai=info`).

use anyhow::{bail, Context};
use anyagok_ai::{AiConfig, ChatOptions, Message, ProviderFactory, StreamChunk};
use futures::StreamExt;
use std::io::Write;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct ChatArgs {
    stream: bool,
    no_cache: bool,
    system: Option<String>,
    config: Option<String>,
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("anyagok_ai=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    match args[1].as_str() {
        "chat" => cmd_chat(parse_chat_args(&args[2..])?).await,
        "check" => cmd_check(config_flag(&args[2..])).await,
        "version" | "--version" | "-V" => {
            println!("anyagok-ai-chat {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!(
        r#"anyagok-ai-chat — AI provider diagnostic tool

USAGE:
    anyagok-ai-chat <COMMAND> [OPTIONS]

COMMANDS:
    chat [OPTIONS] <prompt...>  Send one prompt through the provider factory
        --stream                Print the reply as it streams in
        --no-cache              Skip the response cache
        --system <text>         Prepend a system message
        --config <file>         Load YAML configuration instead of the environment
    check [--config <file>]     Probe every configured provider
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    OPENAI_API_KEY, ANTHROPIC_API_KEY, AI_PRIMARY_PROVIDER, AI_FALLBACK_PROVIDER,
    AI_MAX_RETRIES, AI_HTTP_TIMEOUT_SECS, RUST_LOG"#
    );
}

fn config_flag(args: &[String]) -> Option<String> {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1).cloned())
}

fn parse_chat_args(args: &[String]) -> anyhow::Result<ChatArgs> {
    let mut parsed = ChatArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--stream" => parsed.stream = true,
            "--no-cache" => parsed.no_cache = true,
            "--system" => {
                parsed.system = Some(iter.next().context("--system needs a value")?.clone());
            }
            "--config" => {
                parsed.config = Some(iter.next().context("--config needs a path")?.clone());
            }
            other => parsed.prompt.push(other.to_string()),
        }
    }
    if parsed.prompt.is_empty() {
        bail!("no prompt given");
    }
    Ok(parsed)
}

fn load_factory(config: Option<&str>) -> anyhow::Result<ProviderFactory> {
    let config = match config {
        Some(path) => {
            AiConfig::from_path(path).with_context(|| format!("failed to load config from {path}"))?
        }
        None => AiConfig::from_env().context("failed to read configuration from environment")?,
    };
    ProviderFactory::from_config(&config).context("failed to build provider factory")
}

async fn cmd_chat(args: ChatArgs) -> anyhow::Result<()> {
    let factory = load_factory(args.config.as_deref())?;

    let mut messages = Vec::new();
    if let Some(system) = &args.system {
        messages.push(Message::system(system.as_str()));
    }
    messages.push(Message::user(args.prompt.join(" ")));

    if args.stream {
        let mut stream = factory.stream_chat(&messages, None).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            match chunk {
                StreamChunk::ContentDelta { content } => {
                    write!(stdout, "{content}")?;
                    stdout.flush()?;
                }
                StreamChunk::HtmlGenerated { html } => writeln!(stdout, "\n{html}")?,
                StreamChunk::Error { message } => {
                    writeln!(stdout)?;
                    factory.shutdown();
                    bail!("stream failed: {message}");
                }
                StreamChunk::Done => writeln!(stdout)?,
                _ => {}
            }
        }
    } else {
        let options = if args.no_cache {
            ChatOptions::new().no_cache()
        } else {
            ChatOptions::new()
        };
        let reply = factory.chat_with(&messages, options).await?;
        println!("{}", reply.content);
        if let Some(usage) = reply.usage {
            eprintln!(
                "tokens: prompt={} completion={} total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
    }

    factory.shutdown();
    Ok(())
}

async fn cmd_check(config: Option<String>) -> anyhow::Result<()> {
    let factory = load_factory(config.as_deref())?;
    let mut any = false;
    for kind in factory.configured_providers() {
        let driver = factory.provider(kind)?;
        let ok = driver.is_available().await;
        any |= ok;
        println!(
            "{:<8} {:<28} {}",
            kind.as_str(),
            driver.model(),
            if ok { "available" } else { "unavailable" }
        );
    }
    factory.shutdown();
    if !any {
        bail!("no AI provider is reachable");
    }
    Ok(())
}
