//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided [`MediaEngine`](bridge_traits::MediaEngine) into a playback session
//! and keeps the two connected: engine events (end of queue, playback errors)
//! are pumped into the session controller on a background task until the
//! service is shut down.
//!
//! ```ignore
//! use core_playback::SessionConfig;
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//!
//! let config = CoreConfig::builder().media_engine(engine).build()?;
//! let core = CoreService::new(config, SessionConfig::default())?;
//! core.controller().play(track).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use bridge_traits::EngineEvent;
use core_async::sync::broadcast::{self, error::RecvError};
use core_async::sync::CancellationToken;
use core_async::task::{self, JoinHandle};
use core_playback::{PlaybackSessionController, SessionConfig};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::{init_logging, LoggingConfig};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Primary façade exposed to host applications.
///
/// Must be created inside a tokio runtime. Clones share the same session.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    controller: PlaybackSessionController,
    events: EventBus,
    shutdown: CancellationToken,
    engine_pump: Mutex<Option<JoinHandle<()>>>,
}

impl CoreService {
    /// Builds the session and starts forwarding engine events into it.
    pub fn new(config: CoreConfig, session: SessionConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let controller = PlaybackSessionController::new(
            Arc::clone(&config.media_engine),
            session,
            events.clone(),
        )?;

        let shutdown = CancellationToken::new();
        let engine_pump = task::spawn(pump_engine_events(
            controller.clone(),
            config.media_engine.subscribe(),
            shutdown.clone(),
        ));

        info!(
            session_id = %controller.session_id(),
            event_buffer_size = config.event_buffer_size,
            "Core service started"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                controller,
                events,
                shutdown,
                engine_pump: Mutex::new(Some(engine_pump)),
            }),
        })
    }

    /// The playback session driven by this service.
    pub fn controller(&self) -> &PlaybackSessionController {
        &self.inner.controller
    }

    /// Bus carrying playback and queue events.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Event stream limited to this service's session.
    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
            .for_session(self.inner.controller.session_id().to_string())
    }

    /// Whether engine events are still being forwarded.
    pub fn is_running(&self) -> bool {
        !self.inner.shutdown.is_cancelled()
    }

    /// Stops playback and the engine event pump. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.shutdown.is_cancelled() {
            return Ok(());
        }
        self.inner.shutdown.cancel();

        let pump = self.inner.engine_pump.lock().take();
        if let Some(pump) = pump {
            if let Err(err) = pump.await {
                warn!(error = %err, "Engine event pump ended abnormally");
            }
        }

        let result = self.inner.controller.stop().await;
        info!(session_id = %self.inner.controller.session_id(), "Core service shut down");
        result.map_err(CoreError::from)
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("controller", &self.inner.controller)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Initializes logging, then builds the service.
///
/// The config's logger sink is used unless `logging` already names one.
/// Logging is process-global, so this is meant to be called once per host.
pub fn bootstrap(
    config: CoreConfig,
    session: SessionConfig,
    mut logging: LoggingConfig,
) -> Result<CoreService> {
    if logging.logger_sink.is_none() {
        logging.logger_sink = config.logger_sink.clone();
    }
    init_logging(logging).map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    CoreService::new(config, session)
}

async fn pump_engine_events(
    controller: PlaybackSessionController,
    mut engine_events: broadcast::Receiver<EngineEvent>,
    shutdown: CancellationToken,
) {
    let session_id = controller.session_id();
    debug!(session_id = %session_id, "Engine event pump started");

    loop {
        let received = core_async::select! {
            _ = shutdown.cancelled() => break,
            received = engine_events.recv() => received,
        };

        match received {
            Ok(event) => {
                debug!(session_id = %session_id, event = ?event, "Engine event");
                if let Err(err) = controller.handle_engine_event(event).await {
                    warn!(session_id = %session_id, error = %err, "Engine event handling failed");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(session_id = %session_id, skipped, "Engine events dropped");
            }
            Err(RecvError::Closed) => {
                debug!(session_id = %session_id, "Engine event stream closed");
                break;
            }
        }
    }

    debug!(session_id = %session_id, "Engine event pump stopped");
}
