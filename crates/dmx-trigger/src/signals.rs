//! Unix signal wiring.
//!
//! Signals never do work themselves: tokio records them, and the event loop
//! turns them into [`Wakeup`]s between frames.

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

use crate::runner::{Wakeup, WakeupSource};

/// SIGINT, SIGTERM and SIGCHLD streams.
pub struct UnixSignals {
    interrupt: Signal,
    terminate: Signal,
    child: Signal,
}

impl UnixSignals {
    /// Register the handlers. Must be called from inside the runtime.
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            child: signal(SignalKind::child())?,
        })
    }
}

impl WakeupSource for UnixSignals {
    async fn next_wakeup(&mut self) -> Wakeup {
        tokio::select! {
            _ = self.interrupt.recv() => Wakeup::Terminate("SIGINT"),
            _ = self.terminate.recv() => Wakeup::Terminate("SIGTERM"),
            _ = self.child.recv() => Wakeup::ChildExited,
        }
    }
}
