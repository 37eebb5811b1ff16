use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::info;

use redrive_amqp::{AmqpChannel, AmqpConnection};
use redrive_core::ops::{
    inspect_queue, purge_queue, report_status, retry_messages, PURGE_CONFIRMATION,
};
use redrive_core::report::{BodyPreview, QueueState};
use redrive_core::{AdminChannel, AdminConfig, InspectReport, RetryReport};

/// Characters of body shown per message before truncation.
const BODY_PREVIEW_LIMIT: usize = 600;

#[derive(Parser)]
#[command(
    name = "redrive",
    about = "Dead-letter queue administration for the message pipeline"
)]
struct Cli {
    /// Path to the configuration file (default: redrive.toml,
    /// /etc/redrive/redrive.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show depth and consumer counts for the monitored dead-letter queues
    Status,

    /// Show messages from a dead-letter queue without consuming them
    Inspect {
        /// Queue name (e.g. "ingestion_queue_dlq")
        queue: String,

        /// Maximum number of messages to show
        #[arg(long, default_value = "10")]
        count: usize,
    },

    /// Move messages from a dead-letter queue back to their origin queue
    Retry {
        /// Dead-letter queue to drain from
        queue: String,

        /// Maximum number of messages to move
        #[arg(long, default_value = "10")]
        count: usize,

        /// Target queue (default: the queue name without its "_dlq" suffix)
        #[arg(long)]
        target: Option<String>,
    },

    /// Permanently delete every message in a dead-letter queue
    Purge {
        /// Queue to purge
        queue: String,
    },

    /// Declare an origin queue with its dead-letter exchange and queue
    Setup {
        /// Origin queue name (e.g. "ingestion_queue")
        queue: String,
    },
}

fn load_config(path_override: Option<&Path>) -> AdminConfig {
    let default_paths = [
        Path::new("redrive.toml"),
        Path::new("/etc/redrive/redrive.toml"),
    ];
    let candidates: Vec<&Path> = match path_override {
        Some(path) => vec![path],
        None => default_paths.into_iter().filter(|p| p.exists()).collect(),
    };

    for path in candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded configuration");
                    return config;
                }
                Err(err) => {
                    eprintln!("error parsing {}: {err}", path.display());
                    process::exit(1);
                }
            },
            Err(err) => {
                eprintln!("error reading {}: {err}", path.display());
                process::exit(1);
            }
        }
    }

    info!("no config file found, using defaults");
    AdminConfig::default()
}

async fn cmd_status(channel: &mut AmqpChannel<'_>, queues: &[String]) -> i32 {
    let statuses = match report_status(channel, queues).await {
        Ok(statuses) => statuses,
        Err(err) => {
            eprintln!("Error: {err}");
            return 1;
        }
    };

    println!(
        "Dead-letter queue status at {}",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    println!();

    let name_width = statuses
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(5)
        .max(5);

    println!("{:<name_width$}  {:>8}  {:>9}", "QUEUE", "MESSAGES", "CONSUMERS");
    for status in &statuses {
        match status.state {
            QueueState::Ready {
                message_count,
                consumer_count,
            } => println!(
                "{:<name_width$}  {:>8}  {:>9}",
                status.name, message_count, consumer_count
            ),
            QueueState::NotFound => {
                println!("{:<name_width$}  not found", status.name);
            }
        }
    }

    let mut warned = false;
    for status in &statuses {
        if let QueueState::Ready { message_count, .. } = status.state {
            if message_count > 0 {
                if !warned {
                    println!();
                    warned = true;
                }
                println!(
                    "warning: {} failed message{} in {}",
                    message_count,
                    if message_count == 1 { "" } else { "s" },
                    status.name
                );
            }
        }
    }

    0
}

async fn cmd_inspect(channel: &mut AmqpChannel<'_>, queue: &str, count: usize) -> i32 {
    let report = match inspect_queue(channel, queue, count).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            return 1;
        }
    };

    print_inspect_report(&report);
    0
}

fn print_inspect_report(report: &InspectReport) {
    if report.messages.is_empty() {
        println!("No messages in \"{}\".", report.queue);
    } else {
        println!(
            "Showing {} message{} from \"{}\":",
            report.messages.len(),
            if report.messages.len() == 1 { "" } else { "s" },
            report.queue
        );
        for inspected in &report.messages {
            let headers = &inspected.message.headers;
            println!();
            println!(
                "Message #{}{}",
                inspected.position,
                if inspected.message.redelivered {
                    "  (redelivered)"
                } else {
                    ""
                }
            );
            println!("  Retry count:  {}", headers.retry_count);
            if let Some(reason) = &headers.retry_reason {
                println!("  Retry reason: {reason}");
            }
            if let Some(reason) = &headers.dlq_reason {
                println!("  DLQ reason:   {reason}");
            }
            if headers.manual_retry {
                let when = headers
                    .manual_retry_time
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_else(|| "unknown time".to_string());
                println!("  Manual retry: yes ({when})");
            }
            for (name, value) in &headers.extra {
                println!("  {name}: {value}");
            }

            let body = match &inspected.preview {
                BodyPreview::Json(value) => {
                    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
                }
                BodyPreview::Raw(text) => text.clone(),
            };
            println!("  Body:");
            for line in truncated(&body).lines() {
                println!("    {line}");
            }
        }
    }

    if let Some(err) = &report.aborted {
        println!();
        println!(
            "note: inspection stopped early after {} message{}: {err}",
            report.messages.len(),
            if report.messages.len() == 1 { "" } else { "s" },
        );
    }
}

async fn cmd_retry(
    channel: &mut AmqpChannel<'_>,
    queue: &str,
    count: usize,
    target: Option<&str>,
) -> i32 {
    let report = match retry_messages(channel, queue, count, target).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            return 1;
        }
    };

    print_retry_report(&report);
    0
}

fn print_retry_report(report: &RetryReport) {
    println!(
        "Moved {} of {} requested message{} from \"{}\" to \"{}\" ({} left behind)",
        report.moved,
        report.attempted,
        if report.attempted == 1 { "" } else { "s" },
        report.source,
        report.target,
        report.remaining_in_source
    );
    if report.ran_dry() {
        println!(
            "note: only {} message{} available in the dead-letter queue",
            report.moved,
            if report.moved == 1 { " was" } else { "s were" }
        );
    }
    if let Some(err) = &report.aborted {
        println!("note: batch aborted after {} message{}: {err}",
            report.moved,
            if report.moved == 1 { "" } else { "s" },
        );
    }
}

async fn cmd_purge(channel: &mut AmqpChannel<'_>, queue: &str) -> i32 {
    // Display intent first, then require the literal confirmation. The token
    // is read interactively so no script can pre-satisfy it.
    let counts = match channel.queue_status(queue).await {
        Ok(Some(counts)) => counts,
        Ok(None) => {
            eprintln!("Error: queue not found: {queue}");
            return 1;
        }
        Err(err) => {
            eprintln!("Error: {err}");
            return 1;
        }
    };

    println!(
        "This will permanently delete {} message{} from \"{queue}\".",
        counts.message_count,
        if counts.message_count == 1 { "" } else { "s" },
    );
    let token = read_confirmation();

    match purge_queue(channel, queue, &token).await {
        Ok(outcome) if outcome.purged => {
            println!(
                "Purged {} message{} from \"{queue}\".",
                outcome.previous_count,
                if outcome.previous_count == 1 { "" } else { "s" },
            );
            0
        }
        Ok(_) => {
            println!("Cancelled; \"{queue}\" was not touched.");
            0
        }
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}

async fn cmd_setup(channel: &mut AmqpChannel<'_>, queue: &str) -> i32 {
    match channel.ensure_dlq_topology(queue).await {
        Ok(topology) => {
            println!(
                "Declared \"{}\" with dead-letter exchange \"{}\" feeding \"{}\".",
                topology.queue, topology.exchange, topology.dead_letter_queue
            );
            0
        }
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}

fn read_confirmation() -> String {
    print!("Type '{PURGE_CONFIRMATION}' to confirm: ");
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    // EOF or a read error leaves the line empty, which never matches.
    let _ = std::io::stdin().read_line(&mut line);
    line.trim_end_matches(['\r', '\n']).to_string()
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    redrive_core::telemetry::init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    // RABBITMQ_URL overrides the [amqp] config section wholesale.
    let uri = std::env::var("RABBITMQ_URL").unwrap_or_else(|_| config.amqp.uri());
    let connect_timeout = Duration::from_secs(config.amqp.connect_timeout_secs);

    let connection = match AmqpConnection::open(&uri, connect_timeout).await {
        Ok(connection) => connection,
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(1);
        }
    };

    let code = {
        let mut channel = match connection.channel().await {
            Ok(channel) => channel,
            Err(err) => {
                eprintln!("Error: {err}");
                connection.close().await;
                process::exit(1);
            }
        };

        match cli.command {
            Commands::Status => cmd_status(&mut channel, &config.dlq.queues).await,
            Commands::Inspect { queue, count } => cmd_inspect(&mut channel, &queue, count).await,
            Commands::Retry {
                queue,
                count,
                target,
            } => cmd_retry(&mut channel, &queue, count, target.as_deref()).await,
            Commands::Purge { queue } => cmd_purge(&mut channel, &queue).await,
            Commands::Setup { queue } => cmd_setup(&mut channel, &queue).await,
        }
    };

    connection.close().await;
    process::exit(code);
}

/// Cap `text` for display, counting characters rather than bytes so the cut
/// never lands inside a UTF-8 sequence.
fn truncated(text: &str) -> String {
    let mut chars = text.char_indices();
    match chars.nth(BODY_PREVIEW_LIMIT) {
        Some((offset, _)) => format!(
            "{}... ({} characters total)",
            &text[..offset],
            text.chars().count()
        ),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::truncated;

    #[test]
    fn short_bodies_pass_through() {
        assert_eq!(truncated("{\"id\":1}"), "{\"id\":1}");
    }

    #[test]
    fn long_bodies_are_cut_on_a_character_boundary() {
        let body = "ñ".repeat(700);
        let cut = truncated(&body);
        assert!(cut.starts_with(&"ñ".repeat(10)));
        assert!(cut.ends_with("(700 characters total)"));
    }
}
