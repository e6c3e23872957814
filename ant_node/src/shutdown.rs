//! Interrupt-driven shutdown.
//!
//! The first interrupt ends the running phase. The node is then asked to
//! shut down under a fixed deadline while a second interrupt is still
//! listened for; whichever comes first ends the wait. The node's shutdown
//! keeps running in the background if the wait ends early.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use crate::node::Node;

pub const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(15);

const INTERRUPT_CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Interrupt,
    Terminate,
    /// Raised programmatically through an [`InterruptTrigger`].
    Manual,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Interrupt => f.write_str("interrupt"),
            Interrupt::Terminate => f.write_str("terminated"),
            Interrupt::Manual => f.write_str("manual"),
        }
    }
}

/// Sending half of an interrupt channel.
#[derive(Debug, Clone)]
pub struct InterruptTrigger(mpsc::Sender<Interrupt>);

impl InterruptTrigger {
    /// Queue an interrupt. Returns false if nobody listens anymore.
    pub async fn trigger(&self, interrupt: Interrupt) -> bool {
        self.0.send(interrupt).await.is_ok()
    }
}

/// Receiving half of the process interrupt channel.
#[derive(Debug)]
pub struct Interrupts {
    rx: mpsc::Receiver<Interrupt>,
}

impl Interrupts {
    pub fn channel() -> (InterruptTrigger, Interrupts) {
        let (tx, rx) = mpsc::channel(INTERRUPT_CHANNEL_CAPACITY);
        (InterruptTrigger(tx), Interrupts { rx })
    }

    /// Forward SIGINT and SIGTERM into a new channel. Must be called inside a runtime.
    #[cfg(unix)]
    pub fn listen() -> io::Result<Interrupts> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let (trigger, interrupts) = Self::channel();

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    Some(()) = interrupt.recv() => Interrupt::Interrupt,
                    Some(()) = terminate.recv() => Interrupt::Terminate,
                    else => break,
                };
                if !trigger.trigger(received).await {
                    break;
                }
            }
        });

        Ok(interrupts)
    }

    /// Forward ctrl-c into a new channel. Must be called inside a runtime.
    #[cfg(not(unix))]
    pub fn listen() -> io::Result<Interrupts> {
        let (trigger, interrupts) = Self::channel();

        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("failed to listen for ctrl-c: {}", e);
                    break;
                }
                if !trigger.trigger(Interrupt::Interrupt).await {
                    break;
                }
            }
        });

        Ok(interrupts)
    }

    pub async fn recv(&mut self) -> Option<Interrupt> {
        self.rx.recv().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The node finished shutting down, with or without an error.
    Completed,
    /// The deadline passed first.
    DeadlineExceeded,
    /// A second interrupt arrived first.
    Forced,
    /// Shutdown had already been run.
    AlreadyShutDown,
}

/// Owns the interrupt channel and the node handle for the node's lifetime.
///
/// `wait_for_interrupt` and `shutdown` may run on different tasks.
pub struct ShutdownOrchestrator {
    interrupts: Mutex<Interrupts>,
    node: Mutex<Option<Arc<dyn Node>>>,
    deadline: Duration,
}

impl ShutdownOrchestrator {
    pub fn new(interrupts: Interrupts, node: Arc<dyn Node>) -> Self {
        Self {
            interrupts: Mutex::new(interrupts),
            node: Mutex::new(Some(node)),
            deadline: SHUTDOWN_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Block until the first interrupt. Returns `None` if the channel closed instead.
    pub async fn wait_for_interrupt(&self) -> Option<Interrupt> {
        let received = self.interrupts.lock().await.recv().await;
        match received {
            Some(sig) => tracing::debug!("received signal: {}", sig),
            None => tracing::debug!("interrupt channel closed"),
        }
        tracing::info!("shutting down");
        received
    }

    /// Shut the node down under the deadline, unless another interrupt comes first.
    /// Errors from the node are logged, never returned.
    pub async fn shutdown(&self) -> ShutdownOutcome {
        let Some(node) = self.node.lock().await.take() else {
            return ShutdownOutcome::AlreadyShutDown;
        };

        let deadline = Instant::now() + self.deadline;
        // Detached: dropping the handle leaves the node's shutdown running.
        let mut graceful = tokio::spawn(async move { node.shutdown(deadline).await });

        let second_interrupt = async { self.interrupts.lock().await.recv().await };

        tokio::select! {
            finished = tokio::time::timeout_at(deadline, &mut graceful) => match finished {
                Ok(Ok(Ok(()))) => ShutdownOutcome::Completed,
                Ok(Ok(Err(e))) => {
                    tracing::error!("shutdown: {}", e);
                    ShutdownOutcome::Completed
                }
                Ok(Err(e)) => {
                    tracing::error!("shutdown: {}", e);
                    ShutdownOutcome::Completed
                }
                Err(_) => {
                    tracing::error!("shutdown: deadline exceeded");
                    ShutdownOutcome::DeadlineExceeded
                }
            },
            Some(sig) = second_interrupt => {
                tracing::debug!("received signal: {}", sig);
                ShutdownOutcome::Forced
            }
        }
    }
}
