pub mod capability;
pub mod handlers;
pub mod orchestrator;
pub mod retry;
pub mod steps;
pub mod task_store;
