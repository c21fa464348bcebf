//! ConsoleHandle: the entry point used by the presentation layer.

use std::sync::{Arc, Mutex};

use log::{debug, info};
use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use crate::config::ConsoleConfig;
use crate::control::{ControlClient, Notice};
use crate::error::ControlError;
use crate::overlay::{OverlayAnimator, OverlayFrame, SystemTimeSource, TimeSource};
use crate::scheduler::PeriodicTask;
use crate::stream::EventTransport;
use crate::telemetry::{PollerEndpoints, TelemetryPoller};

use super::supervisor::SourceSupervisor;
use super::{ConsoleMessage, ConsoleState, ConsoleView, Mode};

const MESSAGE_CAPACITY: usize = 256;

/// Builder for [`ConsoleHandle`].
pub struct ConsoleBuilder {
    config: ConsoleConfig,
    transport: Option<Arc<dyn EventTransport>>,
    clock: Option<Arc<dyn TimeSource>>,
}

impl ConsoleBuilder {
    /// Replace the HTTP event stream transport.
    pub fn with_transport(mut self, transport: Arc<dyn EventTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the overlay clock.
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Start every background task on the current Tokio runtime.
    pub fn spawn(self) -> Result<ConsoleHandle, ControlError> {
        ConsoleHandle::spawn(self)
    }
}

/// Owns the console's background tasks.
///
/// Reads are cheap snapshots of the latest [`ConsoleView`]; commands apply
/// their change locally first and then forward it upstream. Dropping the
/// handle cancels every task, timer and open connection.
pub struct ConsoleHandle {
    messages: mpsc::Sender<ConsoleMessage>,
    view: watch::Receiver<ConsoleView>,
    mode: watch::Receiver<Mode>,
    control: ControlClient,
    overlay: Mutex<OverlayAnimator>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    poller: Option<PeriodicTask>,
}

impl ConsoleHandle {
    pub fn builder(config: ConsoleConfig) -> ConsoleBuilder {
        ConsoleBuilder {
            config,
            transport: None,
            clock: None,
        }
    }

    fn spawn(builder: ConsoleBuilder) -> Result<Self, ControlError> {
        let ConsoleBuilder {
            config,
            transport,
            clock,
        } = builder;

        let control = ControlClient::new(&config.endpoints, config.polling.request_timeout())?;
        let poller = TelemetryPoller::new(
            PollerEndpoints::from_config(&config.endpoints),
            config.polling.request_timeout(),
            config.synthetic.gauge_seed,
        )?;

        let state = ConsoleState::new(
            config.stream.event_buffer_capacity,
            config.synthetic.force_offline,
        );
        let (view_tx, view) = watch::channel(state.view());
        let (mode_tx, mode) = watch::channel(state.mode());
        let (messages, inbox) = mpsc::channel(MESSAGE_CAPACITY);
        let cancel = CancellationToken::new();

        let coordinator = tokio::spawn(run_coordinator(state, inbox, view_tx, mode_tx, cancel.clone()));

        let supervisor = SourceSupervisor {
            config: config.clone(),
            transport,
            mode: mode.clone(),
            messages: messages.clone(),
            cancel: cancel.clone(),
            live_failed: false,
        };
        let supervisor = tokio::spawn(supervisor.run());

        let poller = spawn_poller(poller, &config, mode.clone(), messages.clone(), cancel.child_token());

        let clock = clock.unwrap_or_else(|| Arc::new(SystemTimeSource::default()));
        let overlay = OverlayAnimator::new(
            config.overlay.width,
            config.overlay.height,
            config.overlay.noise_seed,
            clock,
        );

        info!(
            "[Console] Started (adapter {}, offline {})",
            config.endpoints.adapter, config.synthetic.force_offline
        );

        Ok(Self {
            messages,
            view,
            mode,
            control,
            overlay: Mutex::new(overlay),
            cancel,
            tasks: vec![coordinator, supervisor],
            poller: Some(poller),
        })
    }

    /// Latest view of the console state.
    pub fn view(&self) -> ConsoleView {
        self.view.borrow().clone()
    }

    pub fn mode(&self) -> Mode {
        *self.mode.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConsoleView> {
        self.view.clone()
    }

    /// Stream of views, starting with the current one.
    pub fn view_stream(&self) -> WatchStream<ConsoleView> {
        WatchStream::new(self.view.clone())
    }

    /// Overlay geometry for the current display refresh.
    pub fn overlay_frame(&self) -> OverlayFrame {
        let mut animator = self.overlay.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        animator.frame()
    }

    pub fn restart_animation(&self) {
        let mut animator = self.overlay.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        animator.restart();
    }

    /// Start the demo pipeline upstream. Failures are logged only.
    pub async fn start(&self) {
        self.control.start().await;
    }

    pub async fn set_threshold(&self, threshold: f64) -> Option<Value> {
        self.post(ConsoleMessage::SetThreshold(threshold)).await;
        let result = self.control.set_threshold(threshold).await;
        self.report(result).await
    }

    pub async fn set_opcua_enabled(&self, enabled: bool) -> Option<Value> {
        self.post(ConsoleMessage::SetOpcuaEnabled(enabled)).await;
        let result = self.control.set_opcua_enabled(enabled).await;
        self.report(result).await
    }

    /// Switch online/offline locally, then tell the inference service.
    pub async fn set_force_offline(&self, offline: bool) -> Option<Value> {
        self.post(ConsoleMessage::SetForceOffline(offline)).await;
        let result = self.control.set_force_offline(offline).await;
        self.report(result).await
    }

    pub async fn dismiss_notice(&self) {
        self.post(ConsoleMessage::DismissNotice).await;
    }

    /// Cancel every task and timer. Idempotent.
    pub fn dispose(&mut self) {
        if self.cancel.is_cancelled() && self.tasks.is_empty() {
            return;
        }
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.poller.take();
        debug!("[Console] Disposed");
    }

    async fn post(&self, message: ConsoleMessage) {
        if self.messages.send(message).await.is_err() {
            debug!("[Console] Coordinator stopped; dropping message");
        }
    }

    async fn report(&self, result: Result<Value, ControlError>) -> Option<Value> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.post(ConsoleMessage::CommandFailed(Notice::from_error(&err)))
                    .await;
                None
            }
        }
    }
}

impl Drop for ConsoleHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn run_coordinator(
    mut state: ConsoleState,
    mut inbox: mpsc::Receiver<ConsoleMessage>,
    view: watch::Sender<ConsoleView>,
    mode: watch::Sender<Mode>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = inbox.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        if state.apply(message) {
            mode.send_replace(state.mode());
        }
        view.send_replace(state.view());
    }
    debug!("[Console] Coordinator stopped");
}

fn spawn_poller(
    poller: TelemetryPoller,
    config: &ConsoleConfig,
    mode: watch::Receiver<Mode>,
    messages: mpsc::Sender<ConsoleMessage>,
    cancel: CancellationToken,
) -> PeriodicTask {
    let poller = Arc::new(AsyncMutex::new(poller));

    PeriodicTask::spawn("telemetry-poller", config.polling.interval(), cancel, move || {
        let poller = Arc::clone(&poller);
        let mode = mode.clone();
        let messages = messages.clone();
        async move {
            let started = *mode.borrow();
            let updates = poller.lock().await.poll(started.offline).await;

            // The mode may have flipped while requests were in flight.
            if mode.borrow().epoch != started.epoch {
                debug!("[Console] Dropping poll results from epoch {}", started.epoch);
                return;
            }
            let _ = messages
                .send(ConsoleMessage::Gauges {
                    epoch: started.epoch,
                    updates,
                })
                .await;
        }
    })
}
