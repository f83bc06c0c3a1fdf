//! Child process launching and reaping, plus the termination flag shared
//! with signal handling.
//!
//! Nothing here ever waits on a child. [`ProcessSupervisor::reap`] polls
//! outstanding children with `try_wait` and is meant to be called once per
//! event loop iteration.

use std::fmt;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, TriggerError};

/// A fully interpolated command ready to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Starts commands on behalf of action effects.
///
/// Implementations must return as soon as the command is started and never
/// wait for it to finish.
pub trait CommandLauncher {
    /// Start the command
    fn launch(&mut self, command: &CommandLine) -> Result<()>;
}

/// Launches child processes and reaps them without blocking.
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    children: Vec<Child>,
    launched: u64,
    reaped: u64,
}

impl ProcessSupervisor {
    /// Create a supervisor with no children
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every child that has exited. Returns how many were reaped.
    ///
    /// Children still running are left alone. A child whose status cannot be
    /// queried is dropped from the list, since the OS no longer knows it.
    pub fn reap(&mut self) -> usize {
        let before = self.children.len();

        self.children.retain_mut(|child| match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                if status.success() {
                    tracing::debug!("Child {} exited with {}", child.id(), status);
                } else {
                    tracing::info!("Child {} exited with {}", child.id(), status);
                }
                false
            }
            Err(e) => {
                tracing::warn!("Failed to query child {}: {}", child.id(), e);
                false
            }
        });

        let reaped = before - self.children.len();
        self.reaped += reaped as u64;
        reaped
    }

    /// Number of children not yet reaped
    pub fn outstanding(&self) -> usize {
        self.children.len()
    }

    /// Total number of children launched
    pub fn launched(&self) -> u64 {
        self.launched
    }

    /// Total number of children reaped
    pub fn reaped(&self) -> u64 {
        self.reaped
    }
}

impl CommandLauncher for ProcessSupervisor {
    fn launch(&mut self, command: &CommandLine) -> Result<()> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| TriggerError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        tracing::debug!("Started '{}' as pid {}", command, child.id());
        self.children.push(child);
        self.launched += 1;
        Ok(())
    }
}

/// Set once an operator asked the program to stop.
///
/// Clones share the same flag. Setting it only stores an atomic, so it is
/// safe to call from a signal notification path.
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag {
    requested: Arc<AtomicBool>,
}

impl TerminationFlag {
    /// Create a cleared flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the event loop to stop
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
