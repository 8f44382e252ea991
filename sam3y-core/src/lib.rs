//! # sam3y-core
//!
//! Platform-agnostic core of the Sam3y tab audio session coordinator.
//!
//! Decides when per-tab capture sessions start and stop, keeps the tab's
//! native mute consistent with what it records in `mutedBySam3y`, and runs
//! each captured stream through a profile-driven voice filter chain inside
//! a lazily created audio host. Browser integrations implement
//! [`TabPlatform`] and [`StreamAcquirer`] and plug into the generic
//! [`SessionCoordinator`].
//!
//! ## Architecture
//!
//! ```text
//! sam3y-core (this crate)
//! ├── traits/       ← TabPlatform, StateStore, StreamAcquirer, MediaStream, HostLauncher, SeparationStage
//! ├── models/       ← TabId, Profile, PersistedState, Intent, HostCommand, errors, configs
//! ├── processing/   ← Biquad, Compressor, ProcessingChain, RingBuffer, mixing
//! ├── session/      ← SessionCoordinator, AudioHost, CaptureSession, RenderContext
//! └── storage/      ← MemoryStore, JsonFileStore
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_block::{AudioBlock, BlockFormat};
pub use models::config::{CaptureConstraints, CoordinatorConfig, MediaSource, RenderConfig};
pub use models::error::{CoordinatorError, HostError, PlatformError, StoreError};
pub use models::messages::{HostCommand, HostReply, Intent, IntentResponse, StateSnapshot, TabEvent};
pub use models::persisted::{PersistedState, StatePatch};
pub use models::profile::{Profile, ProfilePreset};
pub use models::state::SessionPhase;
pub use models::tab::{CaptureHandle, TabId, TabInfo};
pub use processing::chain::ProcessingChain;
pub use processing::ring_buffer::RingBuffer;
pub use processing::separation::PassThroughSeparation;
pub use session::coordinator::SessionCoordinator;
pub use session::host::{spawn_host, AudioHost, HostHandle};
pub use session::launcher::LocalHostLauncher;
pub use session::render::RenderContext;
pub use storage::json_file::JsonFileStore;
pub use storage::memory::MemoryStore;
pub use traits::host_launcher::HostLauncher;
pub use traits::media_stream::{MediaStream, StreamAcquirer};
pub use traits::separation::{SeparationFactory, SeparationStage};
pub use traits::state_store::StateStore;
pub use traits::tab_platform::TabPlatform;
