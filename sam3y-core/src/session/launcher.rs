use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::config::CoordinatorConfig;
use crate::models::error::HostError;
use crate::models::profile::Profile;
use crate::session::host::{spawn_host, AudioHost, HostHandle};
use crate::traits::host_launcher::HostLauncher;
use crate::traits::media_stream::StreamAcquirer;
use crate::traits::separation::SeparationFactory;

/// Launches the audio host in-process, on its own thread.
pub struct LocalHostLauncher<A: StreamAcquirer + Clone + 'static> {
    acquirer: A,
    config: CoordinatorConfig,
    separation: Option<SeparationFactory>,
    launches: AtomicUsize,
}

impl<A: StreamAcquirer + Clone + 'static> LocalHostLauncher<A> {
    pub fn new(acquirer: A, config: CoordinatorConfig) -> Self {
        Self {
            acquirer,
            config,
            separation: None,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn with_separation(mut self, factory: SeparationFactory) -> Self {
        self.separation = Some(factory);
        self
    }

    /// How many hosts this launcher has created.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl<A: StreamAcquirer + Clone + 'static> HostLauncher for LocalHostLauncher<A> {
    fn launch(&self, profile: Profile) -> Result<HostHandle, HostError> {
        self.config.validate().map_err(HostError::LaunchFailed)?;

        let mut host = AudioHost::new(self.acquirer.clone(), self.config.render.clone(), profile);
        if let Some(factory) = &self.separation {
            host = host.with_separation(factory.clone());
        }
        let n = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("launching audio host #{} with profile {}", n, profile);
        spawn_host(host, self.config.host_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::messages::HostCommand;
    use crate::session::capture::tests::ToneAcquirer;

    fn launcher() -> LocalHostLauncher<ToneAcquirer> {
        LocalHostLauncher::new(ToneAcquirer::new(), CoordinatorConfig::default())
    }

    #[test]
    fn launch_rejects_zero_timeout() {
        let config = CoordinatorConfig {
            host_timeout: std::time::Duration::ZERO,
            ..CoordinatorConfig::default()
        };
        let l = LocalHostLauncher::new(ToneAcquirer::new(), config);
        let err = l.launch(Profile::Fast).unwrap_err();
        assert!(matches!(err, HostError::LaunchFailed(_)));
        assert_eq!(l.launches(), 0);
    }

    #[tokio::test]
    async fn launched_host_carries_profile() {
        let l = launcher();
        let handle = l.launch(Profile::Best).unwrap();
        let status = handle.request(HostCommand::Status).await.unwrap();
        assert_eq!(status.profile, Some(Profile::Best));
        assert_eq!(status.tabs, Some(vec![]));
        assert_eq!(l.launches(), 1);
    }
}
