//! Upload pipeline services
//!
//! - [`staged_file`]: scoped ownership of a received upload on local disk
//! - [`media_relay`]: hands a staged file to the remote media provider
//! - [`upload_orchestrator`]: relay + persist + cleanup

pub mod media_relay;
pub mod staged_file;
pub mod upload_orchestrator;

pub use media_relay::{CloudinaryRelay, MediaRelay, RelayError, RelayedAsset};
pub use staged_file::{CleanupOutcome, StagedFile};
pub use upload_orchestrator::upload_recording;
