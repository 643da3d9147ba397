pub mod analyze;
pub mod health;
pub mod job;
pub mod labels;

pub use analyze::analyze_connectivity;
pub use health::hello;
pub use job::{cancel_job, get_job, get_job_text};
pub use labels::get_phase_labels;
