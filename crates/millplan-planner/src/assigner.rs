//! Tool-holder slot assignment
//!
//! Each category owns a fixed ordered list of slot ids. A catalog tool is bound
//! to the next free slot the first time an operation needs it and keeps that
//! slot for the rest of the run. The bound tools are staged and only handed to
//! the program once the run has finished without a failure.

use crate::error::PlanError;
use millplan_core::{CutterSet, Tool, ToolCategory};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Tool entry of the machining program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramTool {
    pub slot: u32,
    pub name: String,
    pub diameter: f64,
    pub category: ToolCategory,
    pub cutting_length: f64,
}

impl ProgramTool {
    fn from_tool(slot: u32, tool: &Tool) -> Self {
        Self {
            slot,
            name: tool.name(),
            diameter: tool.diameter,
            category: tool.category,
            cutting_length: tool.cutting_length,
        }
    }
}

/// Lazily binds the tools of one category to slots
#[derive(Debug, Clone)]
pub struct ToolAssigner {
    cutters: CutterSet,
    slots: Vec<u32>,
    next_slot: usize,
    bound: HashMap<usize, u32>,
    staged: Vec<ProgramTool>,
}

impl ToolAssigner {
    pub fn new(cutters: CutterSet, slots: Vec<u32>) -> Self {
        Self {
            cutters,
            slots,
            next_slot: 0,
            bound: HashMap::new(),
            staged: Vec::new(),
        }
    }

    pub fn cutters(&self) -> &CutterSet {
        &self.cutters
    }

    pub fn category(&self) -> ToolCategory {
        self.cutters.category()
    }

    /// Slot of a tool, binding the next free one on first use.
    pub fn add_if_not_added(&mut self, index: usize) -> Result<(u32, &Tool), PlanError> {
        let category = self.cutters.category();
        let tool = self.cutters.get(index).ok_or_else(|| PlanError::UnknownTool {
            category: category.plural().to_string(),
            index,
        })?;

        if let Some(slot) = self.bound.get(&index) {
            return Ok((*slot, tool));
        }

        let slot = *self
            .slots
            .get(self.next_slot)
            .ok_or_else(|| PlanError::SlotsExhausted {
                category: category.plural().to_string(),
                tool: tool.name(),
            })?;

        debug!("Binding {} to slot {}", tool.name(), slot);
        self.next_slot += 1;
        self.bound.insert(index, slot);
        self.staged.push(ProgramTool::from_tool(slot, tool));
        Ok((slot, tool))
    }

    /// Slot already bound to a tool, if any
    pub fn slot_of(&self, index: usize) -> Option<u32> {
        self.bound.get(&index).copied()
    }

    pub fn remaining_slots(&self) -> usize {
        self.slots.len().saturating_sub(self.next_slot)
    }

    pub fn staged(&self) -> &[ProgramTool] {
        &self.staged
    }

    /// Hand over the staged tools in binding order, leaving none behind.
    pub fn take_staged(&mut self) -> Vec<ProgramTool> {
        std::mem::take(&mut self.staged)
    }
}
