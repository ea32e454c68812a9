//! Host application interface
//!
//! The planner talks to its host (a CLI, a CAD plugin, a test) only through
//! [`PlanHost`]: confirmation questions, final reports, progress and
//! cancellation polling.

use crate::error::PlanError;
use crate::part::Program;

/// End-of-run message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Failure(String),
    Warnings(String),
}

/// Callbacks into the application running the planner
pub trait PlanHost {
    /// Ask a yes/no question.
    fn confirm(&mut self, question: &str) -> bool;

    fn report(&mut self, report: Report);

    /// Stage progress in percent.
    fn progress(&mut self, _percent: u32, _message: &str) {}

    /// Polled between stages.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Turns a finished program into machine output
pub trait PostProcessor {
    fn name(&self) -> &str;

    fn process(&mut self, program: &Program) -> Result<String, PlanError>;
}

/// Host with fixed answers that records what it is told
#[derive(Debug, Clone, Default)]
pub struct ScriptedHost {
    /// Answer to every confirmation question
    pub confirm_answer: bool,
    /// Report cancellation once this many progress updates arrived
    pub cancel_after: Option<usize>,
    pub questions: Vec<String>,
    pub reports: Vec<Report>,
    pub progress: Vec<(u32, String)>,
}

impl ScriptedHost {
    pub fn new(confirm_answer: bool) -> Self {
        Self {
            confirm_answer,
            ..Self::default()
        }
    }

    pub fn cancelling_after(mut self, updates: usize) -> Self {
        self.cancel_after = Some(updates);
        self
    }
}

impl PlanHost for ScriptedHost {
    fn confirm(&mut self, question: &str) -> bool {
        self.questions.push(question.to_string());
        self.confirm_answer
    }

    fn report(&mut self, report: Report) {
        self.reports.push(report);
    }

    fn progress(&mut self, percent: u32, message: &str) {
        self.progress.push((percent, message.to_string()));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_after
            .is_some_and(|updates| self.progress.len() >= updates)
    }
}
