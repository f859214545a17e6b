//! Delivery pipeline: queue, dispatch loop, and worker pool.

pub mod dispatcher;
pub mod queue;
pub mod worker;

pub use dispatcher::DispatchLoop;
pub use queue::DeliveryQueue;
pub use worker::{DeliveryReport, WorkItem, WorkerPool};
