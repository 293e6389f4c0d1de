//! Courier binary entry point.
//!
//! Usage:
//!   courier run --token <token>
//!   courier --store redis push-text --chat-id <id> <text>
//!   courier --store redis push-photo --chat-id <id> --url <url> [--caption <text>]

use anyhow::Context;
use clap::{Parser, Subcommand};
use courier::{LogConfig, LogFormat, PushTarget, QueueOverrides, SinkOverrides};
use delivery_queue::{Envelope, QueueConfig};
use tracing::info;

/// Courier: retrying outbound delivery for Telegram bots.
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Retrying outbound delivery queue for the Telegram Bot API")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    queue: QueueOverrides,

    /// Log level or filter directive
    #[arg(long, global = true, env = "COURIER_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (compact, json)
    #[arg(long, global = true, env = "COURIER_LOG_FORMAT", default_value = "compact")]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Consume the queue and deliver until interrupted
    Run {
        #[command(flatten)]
        sink: SinkOverrides,
    },
    /// Enqueue a text message
    PushText {
        #[command(flatten)]
        target: PushTarget,

        /// Message text
        text: String,
    },
    /// Enqueue a photo by URL
    PushPhoto {
        #[command(flatten)]
        target: PushTarget,

        /// Photo URL
        #[arg(long)]
        url: String,

        /// Optional caption
        #[arg(long, default_value = "")]
        caption: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    courier::logging::init_with_config(&LogConfig {
        service_name: "courier".into(),
        default_level: cli.log_level.clone(),
        format: cli.log_format,
    })?;

    let base = QueueConfig::from_env()
        .context("Failed to read queue configuration from environment")?;
    let config = cli.queue.apply(base).context("Invalid queue configuration")?;

    info!(
        backend = ?config.store.backend(),
        pool_size = config.pool_size,
        "Configuration loaded"
    );

    let interval = config.retry.base_interval;
    match cli.command {
        Command::Run { sink } => {
            let sink_config = sink.to_config().context("Invalid Telegram configuration")?;
            courier::run(config, sink_config).await?;
        }
        Command::PushText { target, text } => {
            let envelope = Envelope::text(target.chat_id, target.reply_to, text, interval);
            courier::push(&config, envelope).await?;
        }
        Command::PushPhoto {
            target,
            url,
            caption,
        } => {
            let envelope = Envelope::photo(target.chat_id, target.reply_to, url, caption, interval);
            courier::push(&config, envelope).await?;
        }
    }

    Ok(())
}
