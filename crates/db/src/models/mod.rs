pub mod job;
pub mod job_log;
pub mod lock;
pub mod status;
