//! Keeping in-memory task and message lists in step with their list
//! resources.
//!
//! Every list is an ordered sequence that is only ever replaced wholesale
//! or appended to. Remote calls run in the background and their outcomes
//! are applied on the owning thread, in the order they arrive.

pub mod collection;
pub mod messages;
pub mod remote;
pub mod tasks;

#[cfg(test)]
pub(crate) mod mock;

pub use collection::{Collection, SyncState};
pub use messages::MessageLog;
pub use remote::RemoteCollection;
pub use tasks::{LocalTasks, RemoteTasks, TASKS_KEY, TaskBackend, TaskMode, TaskSynchronizer};
