//! Running the node in the foreground or under a service manager.

use std::ffi::OsString;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::shutdown::{ShutdownOrchestrator, ShutdownOutcome};

pub const SERVICE_NAME: &str = "AntSvc";

/// A start/stop pair.
///
/// In the foreground `start` blocks until the program should stop. Under a
/// service manager `start` is not awaited and `stop` may run on any task.
#[async_trait]
pub trait Program: Send + Sync + 'static {
    async fn start(&self);
    async fn stop(&self);
}

/// Run `start` then `stop` on the current task.
pub async fn run_foreground<P: Program + ?Sized>(program: &P) {
    program.start().await;
    program.stop().await;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    Foreground,
    Service,
}

impl ServiceMode {
    /// Service when started as a systemd unit, which sets `INVOCATION_ID`.
    pub fn detect() -> Self {
        Self::from_invocation_id(std::env::var_os("INVOCATION_ID"))
    }

    fn from_invocation_id(id: Option<OsString>) -> Self {
        match id {
            Some(id) if !id.is_empty() => ServiceMode::Service,
            _ => ServiceMode::Foreground,
        }
    }
}

/// Requests the hosted program to stop. Dropping the handle has the same effect.
#[derive(Debug)]
pub struct ServiceHandle {
    stop: oneshot::Sender<()>,
}

impl ServiceHandle {
    pub fn stop(self) {
        let _ = self.stop.send(());
    }
}

/// Service manager side of a [`Program`].
#[derive(Debug)]
pub struct ServiceHost {
    name: String,
    stop_requested: oneshot::Receiver<()>,
}

impl ServiceHost {
    pub fn new(name: impl Into<String>) -> (Self, ServiceHandle) {
        let (stop, stop_requested) = oneshot::channel();
        (
            Self {
                name: name.into(),
                stop_requested,
            },
            ServiceHandle { stop },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dispatch `start` without waiting for it, then run `stop` once the
    /// handle asks for it or `start` returns on its own.
    pub async fn run(self, program: Arc<dyn Program>) {
        let starter = Arc::clone(&program);
        let started = tokio::spawn(async move { starter.start().await });
        tracing::debug!("service {} started", self.name);

        tokio::select! {
            _ = self.stop_requested => tracing::debug!("service {} stopping", self.name),
            _ = started => tracing::debug!("service {} program returned", self.name),
        }
        program.stop().await;
    }
}

/// The node's program: wait for an interrupt, then shut down.
pub struct NodeProgram {
    orchestrator: ShutdownOrchestrator,
}

impl NodeProgram {
    pub fn new(orchestrator: ShutdownOrchestrator) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Program for NodeProgram {
    async fn start(&self) {
        self.orchestrator.wait_for_interrupt().await;
    }

    async fn stop(&self) {
        match self.orchestrator.shutdown().await {
            ShutdownOutcome::Completed => tracing::info!("shutdown complete"),
            ShutdownOutcome::DeadlineExceeded => tracing::warn!("node did not shut down in time"),
            ShutdownOutcome::Forced => tracing::warn!("shutdown forced"),
            ShutdownOutcome::AlreadyShutDown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::node::{Node, NodeError};
    use crate::shutdown::{Interrupt, Interrupts};

    struct QuickNode {
        stopped: AtomicBool,
    }

    #[async_trait]
    impl Node for QuickNode {
        async fn shutdown(&self, _deadline: Instant) -> Result<(), NodeError> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn node_program() -> (crate::shutdown::InterruptTrigger, Arc<QuickNode>, Arc<NodeProgram>) {
        let (trigger, interrupts) = Interrupts::channel();
        let node = Arc::new(QuickNode {
            stopped: AtomicBool::new(false),
        });
        let orchestrator = ShutdownOrchestrator::new(interrupts, node.clone());
        let program = Arc::new(NodeProgram::new(orchestrator));
        (trigger, node, program)
    }

    #[tokio::test]
    async fn foreground_blocks_until_interrupted() {
        let (trigger, node, program) = node_program();

        let run = tokio::spawn({
            let program = program.clone();
            async move { run_foreground(program.as_ref()).await }
        });

        tokio::task::yield_now().await;
        assert!(!node.stopped.load(Ordering::SeqCst));

        trigger.trigger(Interrupt::Interrupt).await;
        tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
        assert!(node.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn service_stop_does_not_wait_for_start() {
        let (_trigger, node, program) = node_program();

        let (host, handle) = ServiceHost::new(SERVICE_NAME);
        tokio::spawn(host.run(program));
        tokio::task::yield_now().await;
        assert!(!node.stopped.load(Ordering::SeqCst));

        // No interrupt ever arrives; the service manager alone stops the node.
        handle.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !node.stopped.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn dropped_handle_stops_service() {
        let (_trigger, node, program) = node_program();
        let (host, handle) = ServiceHost::new("test");
        assert_eq!(host.name(), "test");

        drop(handle);
        tokio::time::timeout(Duration::from_secs(5), host.run(program)).await.unwrap();
        assert!(node.stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn service_stops_after_interrupt_ends_start() {
        let (trigger, node, program) = node_program();
        let (host, _handle) = ServiceHost::new(SERVICE_NAME);

        let run = tokio::spawn(host.run(program));
        trigger.trigger(Interrupt::Terminate).await;

        tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
        assert!(node.stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn systemd_unit_runs_as_service() {
        assert_eq!(
            ServiceMode::from_invocation_id(Some(OsString::from("5e1f0c2a9b"))),
            ServiceMode::Service
        );
        assert_eq!(ServiceMode::from_invocation_id(Some(OsString::new())), ServiceMode::Foreground);
        assert_eq!(ServiceMode::from_invocation_id(None), ServiceMode::Foreground);
    }
}
