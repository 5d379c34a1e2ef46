//! Console output formatter for council results

use colored::Colorize;
use council_application::RunCouncilOutput;
use council_domain::{Message, Role};
use serde_json::json;

/// Formats council results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the coordinator transcript followed by the final answer
    pub fn format(output: &RunCouncilOutput) -> String {
        let mut out = String::new();

        out.push_str(&Self::header("Feature Council"));
        out.push('\n');

        out.push_str(&Self::section_header("Transcript"));
        // The last entry is the final answer, shown separately below.
        let body = output
            .transcript
            .split_last()
            .map(|(_, rest)| rest)
            .unwrap_or_default();
        for message in body {
            out.push_str(&Self::format_message(message));
        }

        out.push_str(&Self::section_header("Final Answer"));
        out.push('\n');
        out.push_str(&output.final_answer);
        out.push('\n');

        out.push_str(&format!(
            "\n{} {} decision(s), {} round(s), {} message(s) routed\n",
            "Stats:".dimmed(),
            output.decision_cycles,
            output.rounds,
            output.stats.delivered
        ));
        out.push_str(&Self::footer());

        out
    }

    /// Format the final answer only (concise output)
    pub fn format_answer_only(output: &RunCouncilOutput) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{}\n\n",
            "=== Feature Council Answer ===".cyan().bold()
        ));
        out.push_str(&output.final_answer);
        out.push('\n');
        out
    }

    /// Format as JSON
    pub fn format_json(output: &RunCouncilOutput) -> String {
        let value = json!({
            "final_answer": output.final_answer,
            "decision_cycles": output.decision_cycles,
            "rounds": output.rounds,
            "transcript": output.transcript,
            "stats": {
                "published": output.stats.published,
                "sent": output.stats.sent,
                "delivered": output.stats.delivered,
            },
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_message(message: &Message) -> String {
        let label = format!("── {} ({}) ──", message.source(), message.role());
        let label = match message.role() {
            Role::User => label.green().bold(),
            Role::Assistant => label.yellow().bold(),
            Role::System => label.dimmed(),
        };
        format!("\n{}\n{}\n", label, message.content())
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}
