//! Patient queue records and their display projection
//!
//! Raw records come from the sync layer untouched; everything a view needs is
//! derived here.

pub mod format;
pub mod lenient;
pub mod list;
pub mod projection;
pub mod types;

pub use format::{format_date, parse_date, FormatOptions};
pub use list::{
    patient_queue_request, patient_queues_list, queue_resource_key, PatientQueueList,
    QueueListResult, DEFAULT_BASE_ROUTE,
};
pub use projection::{count, project, project_at};
pub use types::{
    Creator, LocationRef, Patient, Person, QueueResponse, QueueViewModel, RawQueueRecord,
    UuidDisplay, PLACEHOLDER, UNKNOWN_AGE,
};
