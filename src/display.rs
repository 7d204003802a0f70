use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::features::SkipReason;
use crate::schedule::{AssignmentReport, ScheduleReport};

/// Formats the employee list of an assignment, e.g. `E1, E2` or `[NONE]`.
pub fn format_employees(employees: &[String]) -> String {
    if employees.is_empty() {
        "[NONE]".to_string()
    } else {
        employees.join(", ")
    }
}

fn format_assignment(assignment: &AssignmentReport) -> String {
    let mut line = format!(
        "{} (priority {}, tier {}) -> {}",
        assignment.order_id,
        assignment.priority,
        assignment.urgency_tier,
        format_employees(&assignment.employees)
    );
    if assignment.shortfall > 0 {
        line.push_str(&format!(" [short by {}]", assignment.shortfall));
    }
    line
}

fn skip_reason(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::MissingDeliveryDate => "no delivery date",
        SkipReason::UnparseableDeliveryDate => "unreadable delivery date",
    }
}

/// Writes the report in the plain text layout used by the CLI.
pub fn render_report<W: Write>(out: &mut W, report: &ScheduleReport) -> io::Result<()> {
    let title = if report.persisted {
        "Job Schedule"
    } else {
        "Job Schedule (dry run, not saved)"
    };
    writeln!(out, "** {} **", title)?;

    for assignment in &report.assignments {
        writeln!(out, "{}", format_assignment(assignment))?;
    }

    if !report.skipped.is_empty() {
        writeln!(out, "Skipped orders ({}):", report.skipped.len())?;
        for skipped in &report.skipped {
            writeln!(out, "  - {} ({})", skipped.order_id, skip_reason(skipped.reason))?;
        }
    }

    writeln!(
        out,
        "Orders: {}, partially staffed: {}, employees left: {}",
        report.assignments.len(),
        report.partial_count(),
        report.employees_remaining
    )?;
    Ok(())
}

pub fn print_report(report: &ScheduleReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    render_report(&mut handle, report)
}

pub fn write_report_to_file<P: AsRef<Path>>(report: &ScheduleReport, path: P) -> io::Result<()> {
    let mut file = File::create(path)?;
    render_report(&mut file, report)
}
