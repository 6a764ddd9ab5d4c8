// Refund engine: discover expired swaps on each chain and refund them
pub mod cursor;
pub mod observer;
pub mod orchestrator;
pub mod scanner;
pub mod scheduler;
pub mod submitter;

pub use scheduler::RefundScheduler;
