//! Domain types shared by the playback coordinator and its collaborators

mod device;
mod ids;
mod stream;
mod track;

pub use device::{DeviceEvent, DeviceEventKind, DevicePosition};
pub use ids::{Generation, ProviderId, TrackId};
pub use stream::StreamHandle;
pub use track::{AlbumRef, ArtistRef, TrackIdentity, TrackKey, TrackSource};
