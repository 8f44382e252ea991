use std::collections::{BTreeMap, HashMap};

use tokio::sync::{mpsc, Mutex};

use crate::models::error::{CoordinatorError, HostError, PlatformError, StoreError};
use crate::models::messages::{HostCommand, HostReply, Intent, IntentResponse, StateSnapshot, TabEvent};
use crate::models::persisted::{PersistedState, StatePatch};
use crate::models::profile::Profile;
use crate::models::state::SessionPhase;
use crate::models::tab::{TabId, TabInfo};
use crate::session::host::HostHandle;
use crate::traits::host_launcher::HostLauncher;
use crate::traits::state_store::StateStore;
use crate::traits::tab_platform::TabPlatform;

/// Coordinator-owned state. Never shared outside the coordinator.
#[derive(Debug, Default)]
struct CoordinatorState {
    phases: HashMap<TabId, SessionPhase>,
    /// Tab currently held by global-follow mode.
    active_follow: Option<TabId>,
    host: Option<HostHandle>,
}

impl CoordinatorState {
    fn phase(&self, tab: TabId) -> SessionPhase {
        self.phases.get(&tab).copied().unwrap_or_default()
    }

    fn set_phase(&mut self, tab: TabId, phase: SessionPhase) {
        if phase.is_idle() {
            self.phases.remove(&tab);
        } else {
            self.phases.insert(tab, phase);
        }
    }

    fn live_host(&self) -> Option<HostHandle> {
        self.host.as_ref().filter(|h| h.is_alive()).cloned()
    }
}

/// Decides when per-tab capture sessions start and stop.
///
/// Reacts to intents and tab events, keeps native mute consistent with
/// `mutedBySam3y`, and drives the audio host through its command channel.
/// Every operation runs to completion under one lock before the next begins;
/// the persisted store is assumed to have no other writer.
pub struct SessionCoordinator<P, S, L>
where
    P: TabPlatform,
    S: StateStore,
    L: HostLauncher,
{
    platform: P,
    store: S,
    launcher: L,
    state: Mutex<CoordinatorState>,
}

impl<P, S, L> SessionCoordinator<P, S, L>
where
    P: TabPlatform,
    S: StateStore,
    L: HostLauncher,
{
    pub fn new(platform: P, store: S, launcher: L) -> Self {
        Self {
            platform,
            store,
            launcher,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Flip the active tab's manual flag and start or stop its session.
    ///
    /// Returns the new flag. If the start fails the flag is put back to
    /// `false` before the error is returned.
    pub async fn toggle_current_tab(&self) -> Result<bool, CoordinatorError> {
        let mut st = self.state.lock().await;
        let tab = self.platform.active_tab().await?.id;
        let state = self.store.load().await?;
        let enabled = !state.is_tab_enabled(tab);

        let mut tab_enabled = state.tab_enabled.clone();
        tab_enabled.insert(tab, enabled);
        self.store
            .apply(StatePatch::tab_enabled(tab_enabled.clone()))
            .await?;
        log::info!("tab {}: manual enable -> {}", tab, enabled);

        if enabled {
            if let Err(e) = self.start_inner(&mut st, tab).await {
                tab_enabled.insert(tab, false);
                if let Err(store_err) = self.store.apply(StatePatch::tab_enabled(tab_enabled)).await {
                    log::warn!("tab {}: could not revert manual flag: {}", tab, store_err);
                }
                return Err(e);
            }
        } else if state.global_enabled && st.active_follow == Some(tab) {
            log::debug!("tab {}: still held by global-follow", tab);
        } else {
            self.stop_inner(&mut st, tab).await?;
        }
        Ok(enabled)
    }

    /// Flip global-follow mode.
    ///
    /// Enabling starts a session for the active tab (or waits for the next
    /// activation when no tab is focused). Disabling stops every session,
    /// unmutes every tracked tab and clears all manual flags.
    pub async fn toggle_global(&self) -> Result<bool, CoordinatorError> {
        let mut st = self.state.lock().await;
        let state = self.store.load().await?;
        let enabled = !state.global_enabled;
        self.store.apply(StatePatch::global_enabled(enabled)).await?;
        log::info!("global follow -> {}", enabled);

        if !enabled {
            self.disable_all(&mut st).await?;
            return Ok(false);
        }

        let started = match self.platform.active_tab().await {
            Ok(tab) => self.start_inner(&mut st, tab.id).await.map(|()| Some(tab.id)),
            Err(PlatformError::NoActiveTab) => {
                log::info!("global follow: no focused tab yet");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        };
        match started {
            Ok(follow) => {
                st.active_follow = follow;
                Ok(true)
            }
            Err(e) => {
                if let Err(store_err) = self.store.apply(StatePatch::global_enabled(false)).await {
                    log::warn!("global follow: could not revert flag: {}", store_err);
                }
                Err(e)
            }
        }
    }

    /// Persist the profile and push it to the host if one is running.
    ///
    /// A host that is not running yet picks the profile up at launch.
    pub async fn set_profile(&self, profile: Profile) -> Result<(), CoordinatorError> {
        let mut st = self.state.lock().await;
        self.store.apply(StatePatch::profile(profile)).await?;
        log::info!("profile -> {}", profile);

        if let Some(host) = st.live_host() {
            match host.request(HostCommand::SetProfile { profile }).await {
                Ok(_) => {}
                Err(HostError::Unreachable) => self.release_lost_host(&mut st).await,
                Err(e) => log::warn!("profile broadcast failed: {}", e),
            }
        }
        Ok(())
    }

    /// Start a session for `tab`. A no-op if the running host already serves it.
    pub async fn start_session(&self, tab: TabId) -> Result<(), CoordinatorError> {
        let mut st = self.state.lock().await;
        self.start_inner(&mut st, tab).await
    }

    /// Stop `tab`'s session and give back its native mute. Always ends idle.
    pub async fn stop_session(&self, tab: TabId) -> Result<(), CoordinatorError> {
        let mut st = self.state.lock().await;
        self.stop_inner(&mut st, tab).await
    }

    /// Forget a closed tab and release whatever session it had.
    pub async fn on_tab_removed(&self, tab: TabId) -> Result<(), CoordinatorError> {
        let mut st = self.state.lock().await;
        let state = self.store.load().await?;

        let manually_enabled = state.is_tab_enabled(tab);
        if state.tab_enabled.contains_key(&tab) {
            let mut tab_enabled = state.tab_enabled.clone();
            tab_enabled.remove(&tab);
            self.store.apply(StatePatch::tab_enabled(tab_enabled)).await?;
        }

        let followed = st.active_follow == Some(tab);
        if followed {
            st.active_follow = None;
        }
        if manually_enabled || followed || st.phase(tab).is_live() || state.is_tracked_muted(tab) {
            log::info!("tab {} removed, releasing its session", tab);
            self.stop_inner(&mut st, tab).await?;
        }
        Ok(())
    }

    /// Move global-follow to the newly focused tab.
    pub async fn on_tab_activated(&self, tab: TabId) -> Result<(), CoordinatorError> {
        let mut st = self.state.lock().await;
        let state = self.store.load().await?;
        if !state.global_enabled || st.active_follow == Some(tab) {
            return Ok(());
        }

        if let Some(previous) = st.active_follow.take() {
            if state.is_tab_enabled(previous) {
                log::debug!("tab {}: keeps its manual session", previous);
            } else if let Err(e) = self.stop_inner(&mut st, previous).await {
                log::warn!("global follow: stopping tab {} failed: {}", previous, e);
            }
        }

        self.start_inner(&mut st, tab).await?;
        st.active_follow = Some(tab);
        log::info!("global follow -> tab {}", tab);
        Ok(())
    }

    /// Stop everything and reset the store to install-time defaults.
    pub async fn on_installed(&self) -> Result<(), CoordinatorError> {
        let mut st = self.state.lock().await;
        self.disable_all(&mut st).await?;
        self.store.apply(StatePatch::defaults()).await?;
        log::info!("state reset to defaults");
        Ok(())
    }

    /// Global flag, active tab flag and profile, as a control surface shows them.
    pub async fn snapshot(&self) -> Result<StateSnapshot, CoordinatorError> {
        let _st = self.state.lock().await;
        let state = self.store.load().await?;
        let current_tab_enabled = match self.platform.active_tab().await {
            Ok(tab) => state.is_tab_enabled(tab.id),
            Err(PlatformError::NoActiveTab) => false,
            Err(e) => return Err(e.into()),
        };
        Ok(StateSnapshot {
            global_enabled: state.global_enabled,
            current_tab_enabled,
            profile: state.profile,
        })
    }

    /// Start the session for the tab whose URL or title matches.
    ///
    /// Leaves `tabEnabled` alone. Returns the tab and whether it is tracked
    /// in `mutedBySam3y` afterwards.
    pub async fn start_for_match(
        &self,
        url: Option<&str>,
        title: Option<&str>,
    ) -> Result<(TabId, bool), CoordinatorError> {
        let mut st = self.state.lock().await;
        let tab = self.find_tab(url, title).await?.id;
        self.start_inner(&mut st, tab).await?;
        let tracked = self.store.load().await?.is_tracked_muted(tab);
        Ok((tab, tracked))
    }

    /// Stop the session for the tab whose URL or title matches.
    pub async fn stop_for_match(
        &self,
        url: Option<&str>,
        title: Option<&str>,
    ) -> Result<(TabId, bool), CoordinatorError> {
        let mut st = self.state.lock().await;
        let tab = self.find_tab(url, title).await?.id;
        self.stop_inner(&mut st, tab).await?;
        let tracked = self.store.load().await?.is_tracked_muted(tab);
        Ok((tab, tracked))
    }

    pub async fn handle_event(&self, event: TabEvent) -> Result<(), CoordinatorError> {
        match event {
            TabEvent::Removed { tab_id } => self.on_tab_removed(tab_id).await,
            TabEvent::Activated { tab_id } => self.on_tab_activated(tab_id).await,
        }
    }

    /// Handle tab events in arrival order until the sender side closes.
    pub async fn run_events(&self, mut events: mpsc::UnboundedReceiver<TabEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(event).await {
                log::warn!("tab event {:?} failed: {}", event, e);
            }
        }
        log::debug!("tab event channel closed");
    }

    /// Run one intent and shape the response. Never fails; errors become `ok: false`.
    pub async fn dispatch(&self, intent: Intent) -> IntentResponse {
        let result = match intent {
            Intent::ToggleCurrentTab => self.toggle_current_tab().await.map(IntentResponse::enabled),
            Intent::ToggleGlobal => self.toggle_global().await.map(IntentResponse::enabled),
            Intent::SetProfile { profile } => self.set_profile(profile).await.map(|()| IntentResponse::ok()),
            Intent::StartForUrl { url, title } => self
                .start_for_match(url.as_deref(), title.as_deref())
                .await
                .map(|(tab, tracked)| IntentResponse::tracked(tab, tracked)),
            Intent::StopForUrl { url, title } => self
                .stop_for_match(url.as_deref(), title.as_deref())
                .await
                .map(|(tab, tracked)| IntentResponse::tracked(tab, tracked)),
            Intent::GetState => self.snapshot().await.map(IntentResponse::snapshot),
        };
        result.unwrap_or_else(|e| {
            log::warn!("intent failed: {}", e);
            IntentResponse::failed(&e)
        })
    }

    pub async fn session_phase(&self, tab: TabId) -> SessionPhase {
        self.state.lock().await.phase(tab)
    }

    pub async fn active_follow_tab(&self) -> Option<TabId> {
        self.state.lock().await.active_follow
    }

    /// Ask the running host for its live tabs and profile, if one is running.
    pub async fn host_status(&self) -> Result<Option<HostReply>, CoordinatorError> {
        let mut st = self.state.lock().await;
        self.reap_dead_host(&mut st).await;
        let Some(host) = st.live_host() else {
            return Ok(None);
        };
        match host.request(HostCommand::Status).await {
            Ok(reply) => Ok(Some(reply)),
            Err(HostError::Unreachable) => {
                self.release_lost_host(&mut st).await;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Shut the host down. The next start launches a fresh one.
    ///
    /// Every tab the host was serving goes back to idle and is unmuted if
    /// the coordinator muted it. Manual and global flags are kept.
    pub async fn shutdown_host(&self) {
        let mut st = self.state.lock().await;
        if let Some(host) = st.host.clone() {
            match host.request(HostCommand::Shutdown).await {
                Ok(_) | Err(HostError::Unreachable) => log::info!("audio host shut down"),
                Err(e) => log::warn!("audio host shutdown: {}", e),
            }
        }
        self.release_lost_host(&mut st).await;
    }

    // -----------------------------------------------------------------------
    // Internals; callers hold the state lock.
    // -----------------------------------------------------------------------

    async fn ensure_host(&self, st: &mut CoordinatorState) -> Result<HostHandle, CoordinatorError> {
        if let Some(host) = st.live_host() {
            return Ok(host);
        }
        self.reap_dead_host(st).await;
        let profile = self.store.load().await?.profile;
        let host = self.launcher.launch(profile)?;
        st.host = Some(host.clone());
        Ok(host)
    }

    async fn start_inner(&self, st: &mut CoordinatorState, tab: TabId) -> Result<(), CoordinatorError> {
        self.reap_dead_host(st).await;
        let phase = st.phase(tab);
        if phase.is_live() {
            log::debug!("tab {}: start ignored, session {}", tab, phase);
            return Ok(());
        }
        let state = self.store.load().await?;

        st.set_phase(tab, SessionPhase::Starting);
        match self.start_steps(st, tab, &state).await {
            Ok(()) => {
                st.set_phase(tab, SessionPhase::Active);
                log::info!("tab {}: session active", tab);
                Ok(())
            }
            Err(e) => {
                st.set_phase(tab, SessionPhase::Idle);
                log::warn!("tab {}: start failed: {}", tab, e);
                Err(e)
            }
        }
    }

    /// Host, capture handle, mute, track, then host start; rolls back on failure.
    async fn start_steps(
        &self,
        st: &mut CoordinatorState,
        tab: TabId,
        state: &PersistedState,
    ) -> Result<(), CoordinatorError> {
        // A tab the user muted stays theirs: no mute, no tracking. Tracking
        // with no session behind it (left by an earlier run) is reused.
        let owned = state.is_tracked_muted(tab);
        let host = self.ensure_host(st).await?;
        let capture_handle = match self.platform.capture_handle(tab).await {
            Ok(handle) => handle,
            Err(e) => {
                if owned {
                    self.release_stale(tab).await;
                }
                return Err(e.into());
            }
        };

        let muted_here = owned || !self.platform.is_muted(tab).await?;
        if owned {
            log::debug!("tab {}: reusing stale mute tracking", tab);
            if let Err(e) = self.platform.set_muted(tab, true).await {
                self.release_stale(tab).await;
                return Err(e.into());
            }
        } else if muted_here {
            self.platform.set_muted(tab, true).await?;
            let mut tracked = state.muted_by_sam3y.clone();
            tracked.insert(tab, true);
            if let Err(e) = self.store.apply(StatePatch::muted_by_sam3y(tracked)).await {
                self.unmute(tab).await;
                return Err(e.into());
            }
        }

        let command = HostCommand::Start {
            tab_id: tab,
            capture_handle,
        };
        let result = match host.request(command.clone()).await {
            Err(HostError::Unreachable) => {
                log::info!("audio host unreachable, relaunching");
                self.release_lost_host(st).await;
                match self.ensure_host(st).await {
                    Ok(host) => host.request(command).await.map_err(CoordinatorError::from),
                    Err(e) => Err(e),
                }
            }
            other => other.map_err(CoordinatorError::from),
        };
        let Err(e) = result else {
            return Ok(());
        };

        if matches!(e, CoordinatorError::Host(HostError::Timeout)) {
            self.request_stop(st, tab).await;
        }
        if muted_here {
            if let Err(store_err) = self.untrack(tab).await {
                log::warn!("tab {}: rollback could not untrack: {}", tab, store_err);
            }
            self.unmute(tab).await;
        }
        Err(e)
    }

    /// Untrack `tab` and unmute it if it was tracked. Failures are logged.
    async fn release_stale(&self, tab: TabId) {
        match self.untrack(tab).await {
            Ok(true) => self.unmute(tab).await,
            Ok(false) => {}
            Err(e) => log::warn!("tab {}: could not untrack: {}", tab, e),
        }
    }

    async fn stop_inner(&self, st: &mut CoordinatorState, tab: TabId) -> Result<(), CoordinatorError> {
        st.set_phase(tab, SessionPhase::Stopping);
        self.request_stop(st, tab).await;

        let result = match self.untrack(tab).await {
            Ok(true) => {
                self.unmute(tab).await;
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => Err(e.into()),
        };
        st.set_phase(tab, SessionPhase::Idle);
        log::info!("tab {}: session stopped", tab);
        result
    }

    /// Best-effort host stop. An unreachable host counts as stopped.
    async fn request_stop(&self, st: &mut CoordinatorState, tab: TabId) {
        let Some(host) = st.host.clone() else {
            return;
        };
        match host.request(HostCommand::Stop { tab_id: tab }).await {
            Ok(_) => {}
            Err(HostError::Unreachable) => {
                log::debug!("tab {}: host gone, treating as stopped", tab);
                self.release_lost_host(st).await;
            }
            Err(e) => log::warn!("tab {}: host stop failed: {}", tab, e),
        }
    }

    /// Forget a host whose channel has closed, releasing its sessions.
    async fn reap_dead_host(&self, st: &mut CoordinatorState) {
        if st.host.as_ref().is_some_and(|h| !h.is_alive()) {
            log::info!("audio host has exited");
            self.release_lost_host(st).await;
        }
    }

    /// Drop the host handle and move every tab it served back to idle.
    ///
    /// Tracked tabs are untracked and unmuted. A tab mid-start or mid-stop
    /// belongs to the operation running it and is skipped.
    async fn release_lost_host(&self, st: &mut CoordinatorState) {
        st.host = None;
        let orphaned: Vec<TabId> = st
            .phases
            .iter()
            .filter(|(_, phase)| phase.is_active())
            .map(|(tab, _)| *tab)
            .collect();
        for tab in orphaned {
            st.set_phase(tab, SessionPhase::Idle);
            if st.active_follow == Some(tab) {
                st.active_follow = None;
            }
            self.release_stale(tab).await;
            log::info!("tab {}: session lost with its host", tab);
        }
    }

    async fn disable_all(&self, st: &mut CoordinatorState) -> Result<(), CoordinatorError> {
        if let Some(host) = st.host.clone() {
            match host.request(HostCommand::StopAll).await {
                Ok(_) => {}
                Err(HostError::Unreachable) => st.host = None,
                Err(e) => log::warn!("host stop-all failed: {}", e),
            }
        }

        let state = self.store.load().await?;
        let tracked = state.tracked_muted_tabs();
        let cleared: BTreeMap<TabId, bool> =
            state.tab_enabled.keys().map(|tab| (*tab, false)).collect();
        self.store
            .apply(StatePatch {
                tab_enabled: Some(cleared),
                muted_by_sam3y: Some(BTreeMap::new()),
                ..Default::default()
            })
            .await?;
        for tab in &tracked {
            self.unmute(*tab).await;
        }

        st.phases.clear();
        st.active_follow = None;
        log::info!("all sessions stopped, {} tab(s) unmuted", tracked.len());
        Ok(())
    }

    /// Drop `tab` from `mutedBySam3y`. Returns whether it was tracked.
    async fn untrack(&self, tab: TabId) -> Result<bool, StoreError> {
        let state = self.store.load().await?;
        if !state.muted_by_sam3y.contains_key(&tab) {
            return Ok(false);
        }
        let mut tracked = state.muted_by_sam3y;
        let was_muted = tracked.remove(&tab).unwrap_or(false);
        self.store.apply(StatePatch::muted_by_sam3y(tracked)).await?;
        Ok(was_muted)
    }

    /// Native unmute; a closed tab is fine.
    async fn unmute(&self, tab: TabId) {
        match self.platform.set_muted(tab, false).await {
            Ok(()) | Err(PlatformError::StaleTab(_)) => {}
            Err(e) => log::warn!("tab {}: unmute failed: {}", tab, e),
        }
    }

    async fn find_tab(&self, url: Option<&str>, title: Option<&str>) -> Result<TabInfo, CoordinatorError> {
        self.platform
            .query_tabs()
            .await?
            .into_iter()
            .find(|tab| tab.matches(url, title))
            .ok_or_else(|| {
                CoordinatorError::TabNotFound(url.or(title).unwrap_or("<none>").to_string())
            })
    }
}
