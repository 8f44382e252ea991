//! JSON-lines bridge: one request per stdin line, one reply per stdout line.
//!
//! Requests are either coordinator intents (`{"type": "toggle-current-tab"}`)
//! or simulator commands that drive the fake browser
//! (`{"type": "sim:open-tab", "url": "..."}`). Tab events raised by a
//! simulator command are handed to the coordinator before the reply is
//! written, so replies always reflect the new state.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use sam3y_core::models::messages::{HostReply, Intent, IntentResponse, TabEvent};
use sam3y_core::models::tab::{TabId, TabInfo};
use sam3y_core::traits::state_store::StateStore;

use crate::browser::SimBrowser;
use crate::oscillator::ToneSpec;
use crate::SimCoordinator;

/// Commands that act on the simulated browser rather than the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BrowserCommand {
    #[serde(rename = "sim:open-tab", rename_all = "camelCase")]
    OpenTab {
        #[serde(default)]
        tab_id: Option<TabId>,
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        tone: ToneSpec,
    },
    #[serde(rename = "sim:activate", rename_all = "camelCase")]
    Activate { tab_id: TabId },
    #[serde(rename = "sim:close", rename_all = "camelCase")]
    Close { tab_id: TabId },
    #[serde(rename = "sim:mute", rename_all = "camelCase")]
    Mute { tab_id: TabId, muted: bool },
    #[serde(rename = "sim:tabs")]
    Tabs,
    #[serde(rename = "sim:host-status")]
    HostStatus,
    #[serde(rename = "sim:installed")]
    Installed,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BridgeRequest {
    Intent(Intent),
    Browser(BrowserCommand),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<TabId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<TabInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BrowserReply {
    fn ok() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    fn failed(error: impl ToString) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    fn tab(tab: TabId) -> Self {
        Self {
            tab_id: Some(tab),
            ..Self::ok()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BridgeResponse {
    Intent(IntentResponse),
    Browser(BrowserReply),
}

/// Routes bridge requests to the coordinator or the simulated browser.
pub struct Bridge<S: StateStore> {
    coordinator: Arc<SimCoordinator<S>>,
    browser: SimBrowser,
    events: mpsc::UnboundedReceiver<TabEvent>,
}

impl<S: StateStore> Bridge<S> {
    /// Takes over the browser's event subscription.
    pub fn new(coordinator: Arc<SimCoordinator<S>>, browser: SimBrowser) -> Self {
        let events = browser.subscribe();
        Self {
            coordinator,
            browser,
            events,
        }
    }

    pub fn coordinator(&self) -> &Arc<SimCoordinator<S>> {
        &self.coordinator
    }

    pub async fn handle(&mut self, request: BridgeRequest) -> BridgeResponse {
        match request {
            BridgeRequest::Intent(intent) => {
                BridgeResponse::Intent(self.coordinator.dispatch(intent).await)
            }
            BridgeRequest::Browser(command) => {
                let reply = self.browser_command(command).await;
                self.drain_events().await;
                BridgeResponse::Browser(reply)
            }
        }
    }

    /// Handle one raw line. Blank lines produce no reply.
    pub async fn handle_line(&mut self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let response = match serde_json::from_str::<BridgeRequest>(trimmed) {
            Ok(request) => {
                log::debug!("bridge request: {:?}", request);
                self.handle(request).await
            }
            Err(e) => {
                log::error!("invalid request: {} (input: {})", e, trimmed);
                BridgeResponse::Browser(BrowserReply::failed(format!("invalid request: {}", e)))
            }
        };
        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("failed to serialize reply: {}", e);
                Some(r#"{"ok":false,"error":"reply serialization failed"}"#.to_string())
            }
        }
    }

    /// Serve lines until the input closes, writing each reply to stdout.
    pub async fn run(&mut self, mut lines: mpsc::UnboundedReceiver<String>) {
        while let Some(line) = lines.recv().await {
            if let Some(reply) = self.handle_line(&line).await {
                emit_line(&reply);
            }
        }
        log::info!("input closed");
    }

    async fn browser_command(&self, command: BrowserCommand) -> BrowserReply {
        let result = match command {
            BrowserCommand::OpenTab {
                tab_id,
                url,
                title,
                tone,
            } => match tab_id {
                Some(id) => self.browser.open_tab_with_id(id, &url, &title, tone),
                None => Ok(self.browser.open_tab(&url, &title, tone)),
            }
            .map(BrowserReply::tab),
            BrowserCommand::Activate { tab_id } => {
                self.browser.activate(tab_id).map(|()| BrowserReply::tab(tab_id))
            }
            BrowserCommand::Close { tab_id } => {
                self.browser.close_tab(tab_id).map(|()| BrowserReply::tab(tab_id))
            }
            BrowserCommand::Mute { tab_id, muted } => self
                .browser
                .set_user_muted(tab_id, muted)
                .map(|()| BrowserReply::tab(tab_id)),
            BrowserCommand::Tabs => Ok(BrowserReply {
                tabs: Some(self.browser.tabs()),
                ..BrowserReply::ok()
            }),
            BrowserCommand::HostStatus => {
                return match self.coordinator.host_status().await {
                    Ok(host) => BrowserReply {
                        host,
                        ..BrowserReply::ok()
                    },
                    Err(e) => BrowserReply::failed(e),
                }
            }
            BrowserCommand::Installed => {
                return match self.coordinator.on_installed().await {
                    Ok(()) => BrowserReply::ok(),
                    Err(e) => BrowserReply::failed(e),
                }
            }
        };
        result.unwrap_or_else(BrowserReply::failed)
    }

    async fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let Err(e) = self.coordinator.handle_event(event).await {
                log::warn!("tab event {:?} failed: {}", event, e);
            }
        }
    }
}

/// Write one JSON line to stdout and flush.
pub fn emit_line(json: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    // The reader may have gone away; nothing useful to do then.
    let _ = writeln!(handle, "{}", json);
    let _ = handle.flush();
}

/// Read stdin on a blocking thread and forward non-empty lines.
///
/// The thread exits when stdin closes or the receiver is dropped.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(text) => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    if tx.send(text).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("stdin read error: {}", e);
                    break;
                }
            }
        }
        log::debug!("stdin reader thread exiting");
    });
    rx
}
