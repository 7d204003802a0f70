use serde::Serialize;

use crate::features::SkippedOrder;

/// Employees allocated to one order during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub order_id: String,
    pub employees: Vec<String>,
    /// Workforce the order asked for.
    pub requested: usize,
}

impl Allocation {
    /// How many employees short of the requirement this order ended up.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.employees.len())
    }
}

/// One order's line in a scheduling report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentReport {
    pub order_id: String,
    pub employees: Vec<String>,
    pub priority: i64,
    pub urgency_tier: u8,
    pub shortfall: usize,
}

/// Outcome of a scheduling run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleReport {
    pub assignments: Vec<AssignmentReport>,
    pub skipped: Vec<SkippedOrder>,
    pub employees_remaining: usize,
    pub persisted: bool,
}

impl ScheduleReport {
    pub fn partial_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.shortfall > 0).count()
    }
}
