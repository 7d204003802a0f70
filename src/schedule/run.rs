use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, instrument};

use super::roster::assign_roster;
use super::types::{AssignmentReport, ScheduleReport};
use crate::features::{build_features, FeatureOutcome, SkippedOrder};
use crate::model::{to_priority, ModelError, Predictor};
use crate::store::{fetch_employees, fetch_orders, write_assignment, DocumentStore, StoreError};

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("No orders found")]
    NoOrders,

    #[error("No valid orders found")]
    NoValidOrders { skipped: Vec<SkippedOrder> },

    #[error("No employees available")]
    NoEmployees,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One scheduling run: fetch orders and roster, predict priorities in a
/// single batch, partition the roster over the orders and, when `persist` is
/// set, write each assignment back onto its order.
///
/// Orders are visited in feature-matrix order. The predicted priority is
/// reported alongside each assignment but does not reorder the orders.
///
/// The first failed write aborts the run; assignments already written stay
/// written.
#[instrument(skip(store, predictor))]
pub fn run_schedule(
    store: &dyn DocumentStore,
    predictor: Option<&dyn Predictor>,
    today: NaiveDate,
    persist: bool,
) -> Result<ScheduleReport, ScheduleError> {
    let predictor = predictor.ok_or(ScheduleError::ModelUnavailable)?;

    let orders = fetch_orders(store)?;
    let (features, skipped) = match build_features(&orders, today) {
        FeatureOutcome::NoOrders => return Err(ScheduleError::NoOrders),
        FeatureOutcome::AllSkipped(skipped) => {
            return Err(ScheduleError::NoValidOrders { skipped })
        }
        FeatureOutcome::Ready { features, skipped } => (features, skipped),
    };

    let roster = fetch_employees(store)?;
    if roster.is_empty() {
        return Err(ScheduleError::NoEmployees);
    }

    let predictions = predictor.predict(&features.rows)?;
    if predictions.len() != features.len() {
        return Err(ModelError::Invalid(format!(
            "model returned {} predictions for {} rows",
            predictions.len(),
            features.len()
        ))
        .into());
    }
    let priorities = predictions
        .into_iter()
        .map(to_priority)
        .collect::<Result<Vec<_>, _>>()?;

    let (allocations, employees_remaining) =
        assign_roster(&features.order_ids, &features.workforce, &roster);

    if persist {
        for allocation in &allocations {
            write_assignment(store, &allocation.order_id, &allocation.employees)?;
            debug!(
                order_id = %allocation.order_id,
                employees = allocation.employees.len(),
                "assignment written"
            );
        }
    }

    let assignments: Vec<AssignmentReport> = allocations
        .into_iter()
        .zip(priorities)
        .zip(&features.tiers)
        .map(|((allocation, priority), &tier)| AssignmentReport {
            shortfall: allocation.shortfall(),
            order_id: allocation.order_id,
            employees: allocation.employees,
            priority,
            urgency_tier: tier,
        })
        .collect();

    let report = ScheduleReport {
        assignments,
        skipped,
        employees_remaining,
        persisted: persist,
    };
    info!(
        orders = report.assignments.len(),
        skipped = report.skipped.len(),
        partial = report.partial_count(),
        employees = roster.len(),
        persisted = persist,
        "scheduling run complete"
    );
    Ok(report)
}
