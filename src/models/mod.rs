pub mod candidate;
pub mod company;
pub mod crawl_snapshot;
pub mod discovery_queue;
pub mod job;
pub mod match_record;
pub mod pipeline_run;
pub mod raw_job;
