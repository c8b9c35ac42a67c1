//! Bridge Coordinator: starts every loop and stops them together.
//!
//! # Tasks
//!
//! ```text
//!                    ┌──────────────────────────┐
//!                    │     TransportManager     │◀─ supervisor (connect / heartbeat)
//!                    └──────────────────────────┘
//!                      ▲            ▲          ▲
//!            read_line │   transfer │          │ VOL_ACP
//!                      │            │          │
//!               command reader   session    dispatcher ──▶ CommandSink / LevelSink
//!                      │          watcher       ▲
//!                      └──── mpsc<InboundEvent> ┘
//! ```
//!
//! All four tasks share one [`ShutdownSignal`].  [`Bridge::stop`] raises it,
//! waits a bounded time for each task, abandons any that do not finish, and
//! closes the link.  Closing takes the link lock, so it waits for whatever
//! operation is in flight; afterwards every operation sees a closed link and
//! ends quietly.

use std::sync::Arc;
use std::time::Duration;

use deck_core::protocol::markers::VOLUME_ACK_LINE;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::command_reader::{CommandReader, InboundEvent, ReaderSettings};
use crate::application::dispatch::{
    CommandSink, DispatchSettings, DispatchUseCase, LevelSink, PanelLayout,
};
use crate::application::session_watcher::{MediaSource, Renderer, SessionWatcher, WatcherSettings};
use crate::application::shutdown::ShutdownSignal;
use crate::application::transfer::{ImageTransfer, TransferSettings};
use crate::application::transport::{
    PortBackend, SupervisorSettings, TransportManager, TransportSettings,
};

/// Capacity of the reader → dispatcher channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything the bridge needs to know, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    pub transport: TransportSettings,
    pub supervisor: SupervisorSettings,
    pub transfer: TransferSettings,
    pub watcher: WatcherSettings,
    pub reader: ReaderSettings,
    pub dispatch: DispatchSettings,
    /// Present in panel mode.
    pub panel: Option<PanelLayout>,
    /// How long `stop` waits for each task.
    pub join_timeout: Duration,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            transport: TransportSettings::default(),
            supervisor: SupervisorSettings::default(),
            transfer: TransferSettings::default(),
            watcher: WatcherSettings::default(),
            reader: ReaderSettings::default(),
            dispatch: DispatchSettings::default(),
            panel: None,
            join_timeout: Duration::from_secs(2),
        }
    }
}

/// The external capabilities the bridge talks to.
pub struct BridgeComponents {
    pub backend: Arc<dyn PortBackend>,
    pub media: Arc<dyn MediaSource>,
    pub renderer: Arc<dyn Renderer>,
    pub sink: Arc<dyn CommandSink>,
    /// Target for panel sliders.
    pub levels: Option<Arc<dyn LevelSink>>,
}

/// Result of [`Bridge::stop`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Tasks that exited within the join timeout.
    pub joined: Vec<&'static str>,
    /// Tasks left running after the join timeout.
    pub abandoned: Vec<&'static str>,
    /// `true` if an open serial handle was closed.
    pub link_closed: bool,
}

/// A running bridge.
pub struct Bridge {
    transport: Arc<TransportManager>,
    shutdown: ShutdownSignal,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    join_timeout: Duration,
    stopped: bool,
}

impl Bridge {
    /// Spawns the supervisor, command reader, dispatcher and session watcher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(settings: BridgeSettings, components: BridgeComponents) -> Self {
        let shutdown = ShutdownSignal::new();
        let transport = Arc::new(TransportManager::new(
            components.backend,
            settings.transport.clone(),
        ));
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut dispatch = DispatchUseCase::new(components.sink, settings.dispatch);
        if let Some(layout) = settings.panel.clone() {
            dispatch = dispatch.with_panel(layout, components.levels);
        }

        let reader = CommandReader::new(Arc::clone(&transport), settings.reader, events_tx);
        let watcher = SessionWatcher::new(
            components.media,
            components.renderer,
            Arc::clone(&transport),
            ImageTransfer::new(Arc::clone(&transport), settings.transfer.clone()),
            settings.watcher,
        );

        let tasks = vec![
            (
                "supervisor",
                tokio::spawn(
                    Arc::clone(&transport).supervise(settings.supervisor, shutdown.clone()),
                ),
            ),
            ("command-reader", tokio::spawn(reader.run(shutdown.clone()))),
            (
                "dispatcher",
                tokio::spawn(run_dispatcher(
                    dispatch,
                    events_rx,
                    Arc::clone(&transport),
                    shutdown.clone(),
                )),
            ),
            ("session-watcher", tokio::spawn(watcher.run(shutdown.clone()))),
        ];
        info!(tasks = tasks.len(), "bridge started");

        Self {
            transport,
            shutdown,
            tasks,
            join_timeout: settings.join_timeout,
            stopped: false,
        }
    }

    /// The shared link, for status queries.
    pub fn transport(&self) -> &Arc<TransportManager> {
        &self.transport
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Signals every task, joins each with a bounded wait, then closes the link.
    ///
    /// A second call does nothing and returns an empty report.
    pub async fn stop(&mut self) -> StopReport {
        let mut report = StopReport::default();
        if self.stopped {
            debug!("bridge already stopped");
            return report;
        }
        self.stopped = true;
        info!("stopping bridge");
        self.shutdown.stop();

        for (name, handle) in self.tasks.drain(..) {
            match tokio::time::timeout(self.join_timeout, handle).await {
                Ok(Ok(())) => report.joined.push(name),
                Ok(Err(e)) => {
                    warn!(task = name, "task ended abnormally: {e}");
                    report.joined.push(name);
                }
                Err(_) => {
                    warn!(
                        task = name,
                        timeout = ?self.join_timeout,
                        "task did not stop in time; abandoning it"
                    );
                    report.abandoned.push(name);
                }
            }
        }

        report.link_closed = self.transport.close().await;
        info!(
            joined = report.joined.len(),
            abandoned = report.abandoned.len(),
            "bridge stopped"
        );
        report
    }
}

/// Applies inbound events until the reader goes away or shutdown fires.
async fn run_dispatcher(
    mut dispatch: DispatchUseCase,
    mut events: mpsc::Receiver<InboundEvent>,
    transport: Arc<TransportManager>,
    shutdown: ShutdownSignal,
) {
    info!("dispatcher started");
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.stopped() => None,
        };
        let Some(event) = event else {
            break;
        };

        let report = dispatch.handle_event(event).await;
        if report.acknowledge_volume {
            if let Err(e) = transport.write_line(VOLUME_ACK_LINE).await {
                warn!("volume acknowledgment not sent: {e}");
            }
        }
    }
    info!("dispatcher stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
