use crate::models::error::HostError;
use crate::models::profile::Profile;
use crate::session::host::HostHandle;

/// Creates the audio processing execution context on first use.
///
/// The coordinator calls `launch` lazily, and again whenever the previous
/// host has become unreachable. `profile` seeds the new host so sessions
/// never start with stale parameters.
pub trait HostLauncher: Send + Sync {
    fn launch(&self, profile: Profile) -> Result<HostHandle, HostError>;
}
