//! `sdkinit_proc` v1:
//! Child process supervisor with termination-signal relay.
//!
//! Modules:
//! - `spec`       : command/mode/exit models and errors
//! - `signal`     : relayed signals and signal sources
//! - `child`      : owned child handle and its signalling view
//! - `supervisor` : synchronous and supervised run loops
//!
//! Unix only: signals are delivered with `kill(2)`.

pub mod child;
pub mod signal;
pub mod spec;
pub mod supervisor;

pub use child::{ChildHandle, ChildSignaller, launch};
pub use signal::{ChannelSignalSource, EnumSignal, OsSignalSource, SignalSource};
pub use spec::{
    EnumSupervisorMode, SpecChildExit, SpecCommand, SupervisorError, SupervisorResult,
};
pub use supervisor::{Supervisor, run_supervised, run_synchronous};
