//! Polling side of a monitoring session: the change gate and cancellation.

pub mod poller;
pub mod shutdown;

pub use poller::{ChangeGate, ChangeGatedPoller, PollCounters, PollEvent};
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};
