use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::models::config::{CaptureConstraints, RenderConfig};
use crate::models::error::HostError;
use crate::models::messages::{HostCommand, HostReply};
use crate::models::profile::Profile;
use crate::models::tab::{CaptureHandle, TabId};
use crate::processing::separation::PassThroughSeparation;
use crate::session::capture::{CaptureSession, SessionInfo};
use crate::session::render::RenderContext;
use crate::traits::media_stream::StreamAcquirer;
use crate::traits::separation::SeparationFactory;

const COMMAND_QUEUE_DEPTH: usize = 32;

/// The audio processing host.
///
/// Owns the shared [`RenderContext`] (created on the first session start,
/// never recreated while sessions are live) and the tab → session registry.
/// Only the host mutates the graph; everyone else sends [`HostCommand`]s.
pub struct AudioHost<A: StreamAcquirer> {
    acquirer: A,
    config: RenderConfig,
    constraints: CaptureConstraints,
    profile: Profile,
    separation: SeparationFactory,
    context: Option<RenderContext>,
    sessions: BTreeMap<TabId, CaptureSession>,
}

impl<A: StreamAcquirer> AudioHost<A> {
    pub fn new(acquirer: A, config: RenderConfig, profile: Profile) -> Self {
        let constraints = CaptureConstraints::for_render(&config);
        Self {
            acquirer,
            config,
            constraints,
            profile,
            separation: PassThroughSeparation::factory(),
            context: None,
            sessions: BTreeMap::new(),
        }
    }

    /// Replace the separation stage used for new sessions.
    pub fn with_separation(mut self, factory: SeparationFactory) -> Self {
        self.separation = factory;
        self
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    pub fn live_tabs(&self) -> Vec<TabId> {
        self.sessions.keys().copied().collect()
    }

    pub fn session(&self, tab: TabId) -> Option<SessionInfo> {
        self.sessions.get(&tab).map(CaptureSession::info)
    }

    fn ensure_context(&mut self) -> Result<&RenderContext, HostError> {
        if self.context.is_none() {
            let mut ctx = RenderContext::new(self.config.clone())?;
            ctx.start()?;
            log::info!("audio host: rendering context created");
            self.context = Some(ctx);
        }
        self.context
            .as_ref()
            .ok_or_else(|| HostError::LaunchFailed("rendering context unavailable".into()))
    }

    /// Start capture for `tab`. A tab that already has a session is left alone.
    ///
    /// On acquisition failure nothing is registered.
    pub fn start(&mut self, tab: TabId, handle: &CaptureHandle) -> Result<(), HostError> {
        if self.sessions.contains_key(&tab) {
            log::debug!("audio host: tab {} already has a session", tab);
            return Ok(());
        }
        let format = self.config.block_format();
        self.ensure_context()?;

        let session = CaptureSession::open(
            tab,
            handle,
            &self.acquirer,
            &self.constraints,
            format,
            self.profile,
            (self.separation)(),
        )?;
        if let Some(ctx) = &self.context {
            ctx.connect(tab, session.nodes());
        }
        log::info!(
            "audio host: session {} started for tab {} ({})",
            session.id(),
            tab,
            self.profile
        );
        self.sessions.insert(tab, session);
        Ok(())
    }

    /// Disconnect and release `tab`'s session. Returns whether one existed.
    pub fn stop(&mut self, tab: TabId) -> bool {
        let Some(session) = self.sessions.remove(&tab) else {
            return false;
        };
        if let Some(ctx) = &self.context {
            ctx.disconnect(tab);
        }
        session.teardown();
        log::info!("audio host: session stopped for tab {}", tab);
        true
    }

    /// Stop every session. Returns how many were stopped.
    pub fn stop_all(&mut self) -> usize {
        let tabs = self.live_tabs();
        tabs.into_iter().filter(|tab| self.stop(*tab)).count()
    }

    /// Retune every live session in place; new sessions use `profile` too.
    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = profile;
        for session in self.sessions.values() {
            session.set_profile(profile);
        }
        log::info!(
            "audio host: profile {} applied to {} session(s)",
            profile,
            self.sessions.len()
        );
    }

    /// Stop all sessions and close the rendering context.
    pub fn shutdown(&mut self) {
        self.stop_all();
        if let Some(mut ctx) = self.context.take() {
            ctx.close();
        }
    }

    /// Apply one command. The flag is `false` once the host should exit.
    pub fn handle(&mut self, command: HostCommand) -> (HostReply, bool) {
        let reply = match command {
            HostCommand::Start {
                tab_id,
                capture_handle,
            } => match self.start(tab_id, &capture_handle) {
                Ok(()) => HostReply::ok(),
                Err(e) => {
                    log::warn!("audio host: start for tab {} failed: {}", tab_id, e);
                    HostReply::failed(e.to_string())
                }
            },
            HostCommand::Stop { tab_id } => {
                self.stop(tab_id);
                HostReply::ok()
            }
            HostCommand::StopAll => {
                self.stop_all();
                HostReply::ok()
            }
            HostCommand::SetProfile { profile } => {
                self.set_profile(profile);
                HostReply::ok()
            }
            HostCommand::Status => HostReply::status(self.live_tabs(), self.profile),
            HostCommand::Shutdown => {
                self.shutdown();
                return (HostReply::ok(), false);
            }
        };
        (reply, true)
    }
}

/// A command plus the channel its reply goes back on.
struct HostEnvelope {
    command: HostCommand,
    reply: oneshot::Sender<HostReply>,
}

/// Cloneable request channel into a running audio host.
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: mpsc::Sender<HostEnvelope>,
    timeout: Duration,
}

impl HostHandle {
    /// Send `command` and wait for its correlated reply.
    ///
    /// A closed channel or dropped reply is [`HostError::Unreachable`]; no
    /// answer within the timeout is [`HostError::Timeout`]; `ok: false` is
    /// [`HostError::Rejected`], or `AcquisitionFailed` for a failed start.
    pub async fn request(&self, command: HostCommand) -> Result<HostReply, HostError> {
        let name = command.name();
        let is_start = matches!(command, HostCommand::Start { .. });
        let (reply_tx, reply_rx) = oneshot::channel();
        let envelope = HostEnvelope {
            command,
            reply: reply_tx,
        };

        let exchange = async {
            self.tx
                .send(envelope)
                .await
                .map_err(|_| HostError::Unreachable)?;
            reply_rx.await.map_err(|_| HostError::Unreachable)
        };
        let reply = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| HostError::Timeout)??;

        if reply.ok {
            return Ok(reply);
        }
        let message = reply.error.unwrap_or_else(|| format!("{} failed", name));
        Err(if is_start {
            HostError::AcquisitionFailed(message)
        } else {
            HostError::Rejected(message)
        })
    }

    /// Whether the host thread is still receiving.
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Run `host` on its own named thread and return the handle that drives it.
///
/// Acquisition and context teardown block, so the loop stays off the async
/// runtime. The thread exits on `host:shutdown` or when every handle is
/// dropped; either way all sessions are stopped and the context is closed.
pub fn spawn_host<A>(host: AudioHost<A>, timeout: Duration) -> Result<HostHandle, HostError>
where
    A: StreamAcquirer + 'static,
{
    let (tx, mut rx) = mpsc::channel::<HostEnvelope>(COMMAND_QUEUE_DEPTH);
    thread::Builder::new()
        .name("sam3y-host".into())
        .spawn(move || {
            let mut host = host;
            while let Some(envelope) = rx.blocking_recv() {
                log::debug!("audio host: {}", envelope.command.name());
                let (reply, keep_running) = host.handle(envelope.command);
                if !keep_running {
                    rx.close();
                }
                // Requester may have timed out; nothing to do then.
                let _ = envelope.reply.send(reply);
                if !keep_running {
                    break;
                }
            }
            rx.close();
            host.shutdown();
            log::info!("audio host exited");
        })
        .map_err(|e| HostError::LaunchFailed(format!("failed to spawn host thread: {}", e)))?;
    Ok(HostHandle { tx, timeout })
}
