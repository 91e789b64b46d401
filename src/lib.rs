//! Bounded-concurrency execution of a fixed collection of async tasks.
//!
//! [`map`] invokes a sequence of thunks with at most `concurrency` of them in
//! flight and returns their values in input order. [`pool`] is the primitive
//! underneath: it keeps a window of invocations of one task full until the task
//! reports that no work remains.
//!
//! A failing invocation never cancels its siblings. It stops new invocations
//! from being launched, the run waits for everything already in flight, and
//! then fails with every captured failure.

mod dispatcher;
mod error;
mod manager;
mod pool;
mod task;

pub use dispatcher::{map, map_spawned, DEFAULT_CONCURRENCY};
pub use error::{PoolError, TaskFailure};
pub use manager::BoundedPool;
pub use pool::{pool, pool_spawned};
pub use task::{TaskToExecute, Thunk};
