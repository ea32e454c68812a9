//! Plain-text setup sheet
//!
//! Lists the stock, the tool table and the operations in program order so the
//! operator can load the machine before running the job.

use crate::error::PlanError;
use crate::host::PostProcessor;
use crate::operation::Operation;
use crate::part::Program;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Setup sheet post-processor
#[derive(Debug, Clone)]
pub struct SetupSheet {
    title: String,
    generated_at: Option<DateTime<Utc>>,
}

impl SetupSheet {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generated_at: None,
        }
    }

    /// Fix the timestamp printed in the header.
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }

    pub fn render(&self, program: &Program) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        let at = self.generated_at.unwrap_or_else(Utc::now);

        writeln!(out, "; {}", self.title)?;
        writeln!(out, "; Generated: {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        if let Some(stock) = &program.stock {
            writeln!(
                out,
                "; Stock: {} {:.1} x {:.1} x {:.1} mm",
                stock.material, stock.width, stock.height, stock.thickness
            )?;
        }
        if let Some(clearance) = program.clearance_height {
            writeln!(out, "; Clearance height: {:.3} mm", clearance)?;
        }

        writeln!(out)?;
        writeln!(out, "TOOLS")?;
        for tool in &program.tools {
            writeln!(
                out,
                "  T{:<3} {:<22} cutting length {:.1} mm",
                tool.slot, tool.name, tool.cutting_length
            )?;
        }

        writeln!(out)?;
        writeln!(out, "OPERATIONS")?;
        for (n, op) in program.operations.iter().enumerate() {
            write!(
                out,
                "  {:>3}. {:<8} T{:<3} Z{:.3} -> Z{:.3}",
                n + 1,
                op.kind(),
                op.slot(),
                op.top_z(),
                op.bottom_z()
            )?;
            match op {
                Operation::Profile(p) => write!(
                    out,
                    "  {:?}{}{}",
                    p.side,
                    if p.rough { "" } else { " finish" },
                    if p.tabs.is_empty() {
                        String::new()
                    } else {
                        format!(", {} tabs", p.tabs.len())
                    }
                )?,
                Operation::Pocket(p) => write!(out, "  step over {:.3}", p.step_over)?,
                Operation::Drill(d) => write!(out, "  {} points", d.points.len())?,
            }
            if let Some(title) = op.title() {
                write!(out, "  ({})", title)?;
            }
            writeln!(out)?;
        }
        Ok(out)
    }
}

impl Default for SetupSheet {
    fn default() -> Self {
        Self::new("MillPlan setup sheet")
    }
}

impl PostProcessor for SetupSheet {
    fn name(&self) -> &str {
        "setup-sheet"
    }

    fn process(&mut self, program: &Program) -> Result<String, PlanError> {
        self.render(program)
            .map_err(|e| PlanError::PostProcess(e.to_string()))
    }
}
