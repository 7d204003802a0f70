pub mod roster;
pub mod run;
pub mod types;

pub use roster::assign_roster;
pub use run::{run_schedule, ScheduleError};
pub use types::{Allocation, AssignmentReport, ScheduleReport};
