//! Encore Core
//!
//! Platform-agnostic track model and collaborator traits for the Encore
//! playback coordinator.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `TrackIdentity`, `StreamHandle`, `DeviceEvent`, etc.
//! - **Collaborator Traits**: `StreamResolver` (provider/plugin resolution) and
//!   `PlaybackDevice` (audio decode/output)
//! - **Error Handling**: `ResolutionError` and `DeviceError`
//!
//! Nothing in here performs I/O. Providers and devices live behind the traits.
//!
//! # Example
//!
//! ```rust
//! use encore_core::types::{AlbumRef, TrackIdentity, TrackSource};
//!
//! let track = TrackIdentity::new("42", "Hyperballad")
//!     .with_artist("Björk")
//!     .with_album(AlbumRef::new("Post"))
//!     .with_duration_ms(321_000);
//!
//! assert_eq!(track.source, TrackSource::Local);
//! assert_eq!(track.display_artists(), "Björk");
//! ```

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DeviceError, ResolutionError};
pub use traits::{PlaybackDevice, StreamResolver};
pub use types::{
    AlbumRef, ArtistRef, DeviceEvent, DeviceEventKind, DevicePosition, Generation, ProviderId,
    StreamHandle, TrackId, TrackIdentity, TrackKey, TrackSource,
};
