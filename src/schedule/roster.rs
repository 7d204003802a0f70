use tracing::warn;

use super::types::Allocation;
use crate::store::EmployeeRecord;

/// Greedy roster partition.
///
/// Walks the orders in the given order and hands each one the next
/// `workforce` employees from `roster` (expected to be sorted by rating,
/// highest first). Every employee is used at most once. When the roster runs
/// out an order gets whatever is left, possibly nobody.
///
/// Returns the allocations (parallel to `order_ids`) and the number of
/// employees left unassigned.
pub fn assign_roster(
    order_ids: &[String],
    workforce: &[i64],
    roster: &[EmployeeRecord],
) -> (Vec<Allocation>, usize) {
    let mut remaining = roster.iter();
    let mut allocations = Vec::with_capacity(order_ids.len());

    for (order_id, &needed) in order_ids.iter().zip(workforce) {
        let requested = usize::try_from(needed).unwrap_or(0);
        let employees: Vec<String> = remaining
            .by_ref()
            .take(requested)
            .map(|e| e.id.clone())
            .collect();

        let allocation = Allocation {
            order_id: order_id.clone(),
            employees,
            requested,
        };
        if allocation.shortfall() > 0 {
            warn!(
                order_id = %order_id,
                requested,
                assigned = allocation.employees.len(),
                "roster exhausted, partial assignment"
            );
        }
        allocations.push(allocation);
    }

    (allocations, remaining.len())
}
