//! The single-threaded event loop.
//!
//! Each iteration reaps finished children, checks for a termination request
//! and then waits for exactly one event: a wakeup (signal) or a frame. A frame
//! is always processed to completion before the next check, so termination
//! never interrupts a frame.

use dmx_trigger_control::{ControlError, DmxReceiver};
use dmx_trigger_core::{DmxUpdate, FrameReport, ProcessSupervisor, TerminationFlag, TriggerEngine};

/// Consecutive socket errors after which the source is considered dead.
const MAX_CONSECUTIVE_IO_ERRORS: u32 = 10;

/// Something that delivers DMX updates.
pub trait FrameSource {
    /// Next update, or `None` once the source has closed. Must be cancel safe.
    async fn next_update(&mut self) -> Option<Result<DmxUpdate, ControlError>>;
}

impl FrameSource for DmxReceiver {
    async fn next_update(&mut self) -> Option<Result<DmxUpdate, ControlError>> {
        Some(self.recv_update().await)
    }
}

/// Asynchronous notifications the loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// Operator asked to stop
    Terminate(&'static str),
    /// At least one child exited
    ChildExited,
}

/// Something that delivers wakeups. Must be cancel safe.
pub trait WakeupSource {
    /// Wait for the next wakeup
    async fn next_wakeup(&mut self) -> Wakeup;
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Termination was requested
    Terminated,
    /// The frame source closed
    SourceClosed,
    /// The frame source kept failing
    SourceFailed,
}

/// Counters collected over the loop's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames handed to the engine
    pub frames_processed: u64,
    /// Updates for other universes or flagged with an error
    pub frames_ignored: u64,
    /// Packets that could not be decoded
    pub bad_packets: u64,
    /// Actions fired successfully
    pub actions_fired: u64,
    /// Actions whose effects failed
    pub actions_failed: u64,
}

impl LoopStats {
    fn record(&mut self, report: Option<FrameReport>) {
        match report {
            Some(report) => {
                self.frames_processed += 1;
                self.actions_fired += report.actions_fired as u64;
                self.actions_failed += report.actions_failed as u64;
            }
            None => self.frames_ignored += 1,
        }
    }
}

/// Run until termination is requested or the source gives up.
pub async fn run<S, W>(
    engine: &mut TriggerEngine,
    source: &mut S,
    wakeups: &mut W,
    supervisor: &mut ProcessSupervisor,
    termination: &TerminationFlag,
) -> (LoopExit, LoopStats)
where
    S: FrameSource,
    W: WakeupSource,
{
    let mut stats = LoopStats::default();
    let mut io_errors = 0u32;

    let exit = loop {
        supervisor.reap();
        if termination.is_requested() {
            break LoopExit::Terminated;
        }

        tokio::select! {
            biased;

            wakeup = wakeups.next_wakeup() => match wakeup {
                Wakeup::Terminate(reason) => {
                    tracing::info!("Received {}, shutting down", reason);
                    termination.request();
                }
                // Reaped at the top of the next iteration
                Wakeup::ChildExited => {}
            },

            update = source.next_update() => match update {
                None => break LoopExit::SourceClosed,
                Some(Ok(update)) => {
                    io_errors = 0;
                    stats.record(engine.accept(&update, supervisor));
                }
                Some(Err(e)) if e.is_packet_error() => {
                    stats.bad_packets += 1;
                    tracing::debug!("Dropping packet: {}", e);
                }
                Some(Err(e)) => {
                    io_errors += 1;
                    tracing::warn!("Frame source error: {}", e);
                    if io_errors >= MAX_CONSECUTIVE_IO_ERRORS {
                        tracing::error!(
                            "Frame source failed {} times in a row, giving up",
                            io_errors
                        );
                        break LoopExit::SourceFailed;
                    }
                }
            },
        }
    };

    (exit, stats)
}
