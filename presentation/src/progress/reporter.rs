//! Progress reporting for council runs

use colored::Colorize;
use council_application::ports::progress::CoordinationProgress;
use council_domain::{ActorId, RoutingDecision, preview};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress during a council run with a spinner and a round bar
pub struct ProgressReporter {
    spinner: ProgressBar,
    round_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(Self::spinner_style());
        spinner.set_prefix("Council");
        spinner.enable_steady_tick(Duration::from_millis(120));
        Self {
            spinner,
            round_bar: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn round_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("  {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn describe(decision: &RoutingDecision) -> String {
        match decision {
            RoutingDecision::AskWorker { worker, question } => {
                format!("asking {}: {}", worker, preview(question, 60))
            }
            RoutingDecision::AskAllWorkers { question } => {
                format!("asking all workers: {}", preview(question, 60))
            }
            RoutingDecision::AskExternal { question } => {
                format!("asking you: {}", preview(question, 60))
            }
            RoutingDecision::Final { .. } => "answering".to_string(),
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinationProgress for ProgressReporter {
    fn on_decision_start(&self, cycle: usize) {
        self.spinner
            .set_message(format!("deciding (cycle {})...", cycle));
    }

    fn on_decision(&self, decision: &RoutingDecision) {
        self.spinner.println(format!(
            "{} {}",
            "->".cyan(),
            Self::describe(decision)
        ));
        self.spinner.set_message("waiting for workers...");
    }

    fn on_round_start(&self, expected: usize) {
        let bar = ProgressBar::new(expected as u64);
        bar.set_style(Self::round_style());
        bar.set_prefix("Round");
        if let Ok(mut slot) = self.round_bar.lock() {
            *slot = Some(bar);
        }
    }

    fn on_round_reply(&self, worker: &ActorId, _received: usize, _expected: usize) {
        if let Ok(slot) = self.round_bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            bar.set_message(format!("{} {}", "v".green(), worker));
            bar.inc(1);
        }
    }

    fn on_round_complete(&self) {
        if let Ok(mut slot) = self.round_bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_with_message("complete".green().to_string());
        }
    }

    fn on_direct_reply(&self, worker: &ActorId) {
        self.spinner
            .println(format!("  {} {} replied", "v".green(), worker));
    }

    fn on_final(&self, _answer: &str) {
        self.spinner
            .finish_with_message("final answer ready".green().to_string());
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl CoordinationProgress for SimpleProgress {
    fn on_decision(&self, decision: &RoutingDecision) {
        println!("{} {}", "->".cyan(), ProgressReporter::describe(decision));
    }

    fn on_round_complete(&self) {
        println!("  {} round complete", "v".green());
    }

    fn on_direct_reply(&self, worker: &ActorId) {
        println!("  {} {} replied", "v".green(), worker);
    }
}
