// Library entry point
pub mod config;
pub mod queue;
pub mod sync;

pub use config::{ClientConfig, ConfigError};
pub use queue::{patient_queue_request, patient_queues_list, PatientQueueList, QueueListResult};
pub use sync::SynchronizationRegistry;
