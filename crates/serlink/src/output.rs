use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serlink_link::{LinkStats, Role};

#[derive(Clone, Debug, Copy, ValueEnum)]
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

/// Summary printed after a transfer.
#[derive(Debug, Serialize)]
pub struct TransferReport<'a> {
    pub device: &'a str,
    pub role: Role,
    /// Payloads sent or received.
    pub messages: usize,
    pub bytes: u64,
    pub stats: LinkStats,
}

pub fn print_report(out: &mut dyn Write, report: &TransferReport<'_>, format: OutputFormat) {
    let rendered = match format {
        OutputFormat::Json => {
            serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METRIC", "VALUE"])
                .add_row(vec!["device".to_string(), report.device.to_string()])
                .add_row(vec!["role".to_string(), report.role.to_string()])
                .add_row(vec!["messages".to_string(), report.messages.to_string()])
                .add_row(vec!["bytes".to_string(), report.bytes.to_string()]);
            for (name, value) in report.stats.entries() {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            table.to_string()
        }
        OutputFormat::Pretty => {
            let mut line = format!(
                "device={} role={} messages={} bytes={}",
                report.device, report.role, report.messages, report.bytes
            );
            for (name, value) in report.stats.entries() {
                line.push_str(&format!(" {name}={value}"));
            }
            line
        }
    };
    let _ = writeln!(out, "{rendered}");
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> TransferReport<'static> {
        TransferReport {
            device: "/dev/ttyS0",
            role: Role::Initiator,
            messages: 2,
            bytes: 1500,
            stats: LinkStats {
                frames_sent: 4,
                retransmissions: 1,
                ..LinkStats::default()
            },
        }
    }

    fn render(format: OutputFormat) -> String {
        let mut out = Vec::new();
        print_report(&mut out, &report(), format);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn json_report_nests_stats() {
        let value: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(value["role"], "initiator");
        assert_eq!(value["bytes"], 1500);
        assert_eq!(value["stats"]["retransmissions"], 1);
    }

    #[test]
    fn pretty_report_is_one_line() {
        let text = render(OutputFormat::Pretty);
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("frames_sent=4"));
        assert!(text.contains("role=initiator"));
    }

    #[test]
    fn table_report_lists_every_counter() {
        let text = render(OutputFormat::Table);
        for (name, _) in LinkStats::default().entries() {
            assert!(text.contains(name), "{name} missing");
        }
    }
}
