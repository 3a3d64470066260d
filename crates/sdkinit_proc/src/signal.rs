//! Termination signals and the sources they are received from.

use std::fmt;
use std::future::Future;

use nix::libc;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::mpsc;

use crate::spec::SupervisorError;

/// Signals relayed from the supervisor to its child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EnumSignal {
    /// `SIGINT`.
    Interrupt = libc::SIGINT,
    /// `SIGTERM`.
    Terminate = libc::SIGTERM,
}

impl EnumSignal {
    /// Every signal the supervisor subscribes to.
    pub const ALL: [EnumSignal; 2] = [EnumSignal::Interrupt, EnumSignal::Terminate];

    /// Raw signal number.
    pub fn number(self) -> libc::c_int {
        self as libc::c_int
    }

    fn kind(self) -> SignalKind {
        SignalKind::from_raw(self.number())
    }
}

impl fmt::Display for EnumSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                EnumSignal::Interrupt => "SIGINT",
                EnumSignal::Terminate => "SIGTERM",
            }
        )
    }
}

impl From<EnumSignal> for nix::sys::signal::Signal {
    fn from(signal: EnumSignal) -> Self {
        match signal {
            EnumSignal::Interrupt => Self::SIGINT,
            EnumSignal::Terminate => Self::SIGTERM,
        }
    }
}

impl TryFrom<libc::c_int> for EnumSignal {
    type Error = libc::c_int;

    fn try_from(n: libc::c_int) -> Result<Self, Self::Error> {
        match n {
            libc::SIGINT => Ok(EnumSignal::Interrupt),
            libc::SIGTERM => Ok(EnumSignal::Terminate),
            _ => Err(n),
        }
    }
}

/// Stream of signals delivered to the supervisor.
///
/// The supervisor takes the source by value, so tests can substitute
/// [`ChannelSignalSource`] for the process-wide [`OsSignalSource`].
pub trait SignalSource: Send + 'static {
    /// Wait for the next signal; `None` once the source is closed.
    fn recv(&mut self) -> impl Future<Output = Option<EnumSignal>> + Send;
}

/// Process-wide subscription to `SIGINT` and `SIGTERM`.
///
/// Installing it replaces the default disposition of both signals for the rest
/// of the process lifetime, so the supervisor is no longer killed by them.
#[derive(Debug)]
pub struct OsSignalSource {
    sig_interrupt: Signal,
    sig_terminate: Signal,
}

impl OsSignalSource {
    /// Subscribe to every signal in [`EnumSignal::ALL`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn register() -> Result<Self, SupervisorError> {
        let register_one = |sig: EnumSignal| {
            signal(sig.kind()).map_err(|e| SupervisorError::SignalRegistration {
                signal: sig,
                source: e,
            })
        };
        Ok(Self {
            sig_interrupt: register_one(EnumSignal::Interrupt)?,
            sig_terminate: register_one(EnumSignal::Terminate)?,
        })
    }
}

impl SignalSource for OsSignalSource {
    async fn recv(&mut self) -> Option<EnumSignal> {
        tokio::select! {
            v = self.sig_interrupt.recv() => v.map(|()| EnumSignal::Interrupt),
            v = self.sig_terminate.recv() => v.map(|()| EnumSignal::Terminate),
        }
    }
}

/// In-process signal source fed through an unbounded channel.
#[derive(Debug)]
pub struct ChannelSignalSource {
    rx: mpsc::UnboundedReceiver<EnumSignal>,
}

impl ChannelSignalSource {
    /// Create a source plus the sender used to inject signals into it.
    ///
    /// The source closes once every sender is dropped.
    pub fn new() -> (mpsc::UnboundedSender<EnumSignal>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl SignalSource for ChannelSignalSource {
    async fn recv(&mut self) -> Option<EnumSignal> {
        self.rx.recv().await
    }
}
