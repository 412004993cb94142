use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    connection: &'a str,
    event: &'a str,
    args: &'a [Value],
    timestamp: String,
}

#[derive(Serialize)]
struct SentOutput<'a> {
    address: String,
    event: &'a str,
    args: &'a [Value],
    status: &'static str,
}

/// Render one received event.
pub fn render_event(
    connection: &str,
    event: &str,
    args: &[Value],
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                connection,
                event,
                args,
                timestamp: now_unix_seconds(),
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CONNECTION", "EVENT", "ARGS"])
                .add_row(vec![
                    connection.to_string(),
                    event.to_string(),
                    args_preview(args),
                ]);
            table.to_string()
        }
        OutputFormat::Pretty => format!("{connection} {event} {}", args_preview(args)),
    }
}

/// Render the confirmation printed after a successful emit.
pub fn render_sent(
    address: &str,
    event: &str,
    args: &[Value],
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => {
            let out = SentOutput {
                address: address.to_string(),
                event,
                args,
                status: "sent",
            };
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "EVENT", "ARGS", "STATUS"])
                .add_row(vec![
                    address.to_string(),
                    event.to_string(),
                    args_preview(args),
                    "sent".to_string(),
                ]);
            table.to_string()
        }
        OutputFormat::Pretty => format!("sent {event} {} to {address}", args_preview(args)),
    }
}

fn args_preview(args: &[Value]) -> String {
    serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
