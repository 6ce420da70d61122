/// Track identity and metadata
use super::ids::{ProviderId, TrackId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a track comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrackSource {
    /// File on local disk, discovered by the scanner
    #[default]
    Local,

    /// Track served by a named plugin/provider
    Provider {
        /// Provider namespace
        id: ProviderId,
    },
}

impl TrackSource {
    /// Namespace the track id is unique within
    pub fn provider_key(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::Provider { id } => id.as_str(),
        }
    }

    /// Whether the track is a local file
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

/// Artist credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRef {
    /// Provider-side artist id, if the provider exposes one
    pub id: Option<String>,

    /// Display name
    pub name: String,
}

impl ArtistRef {
    /// Artist credit without an id
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// Album reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRef {
    /// Album name
    pub name: String,

    /// Cover art reference (URL or path), if known
    pub cover: Option<String>,
}

impl AlbumRef {
    /// Album reference without cover art
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cover: None,
        }
    }

    /// Attach a cover reference
    #[must_use]
    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }
}

/// Canonical representation of a playable item
///
/// Immutable once placed in a queue. The queue shares it by `Arc`, so the
/// state machine looks metadata up instead of copying it around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackIdentity {
    /// Stable id within the provider namespace
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Ordered artist credits
    #[serde(default)]
    pub artists: Vec<ArtistRef>,

    /// Album, if any
    #[serde(default)]
    pub album: Option<AlbumRef>,

    /// Duration in milliseconds (unknown for some streaming sources until resolved)
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// Local file or provider
    #[serde(default)]
    pub source: TrackSource,
}

/// Globally unique key of a track: provider namespace + id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackKey {
    /// Provider namespace (`local` for local files)
    pub provider: String,

    /// Track id within the namespace
    pub id: TrackId,
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

impl TrackIdentity {
    /// Local track with no artist/album metadata
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artists: Vec::new(),
            album: None,
            duration_ms: None,
            source: TrackSource::Local,
        }
    }

    /// Track served by a provider
    pub fn from_provider(
        provider: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            source: TrackSource::Provider {
                id: ProviderId::new(provider),
            },
            ..Self::new(id, title)
        }
    }

    /// Append an artist credit
    #[must_use]
    pub fn with_artist(mut self, name: impl Into<String>) -> Self {
        self.artists.push(ArtistRef::named(name));
        self
    }

    /// Set the album
    #[must_use]
    pub fn with_album(mut self, album: AlbumRef) -> Self {
        self.album = Some(album);
        self
    }

    /// Set the known duration
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Global key (provider + id)
    pub fn key(&self) -> TrackKey {
        TrackKey {
            provider: self.source.provider_key().to_string(),
            id: self.id.clone(),
        }
    }

    /// Whether two identities refer to the same playable item
    pub fn same_track(&self, other: &Self) -> bool {
        self.id == other.id && self.source.provider_key() == other.source.provider_key()
    }

    /// Artist names joined for display ("A, B")
    pub fn display_artists(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_different_provider_is_a_different_track() {
        let local = TrackIdentity::new("1", "Song");
        let remote = TrackIdentity::from_provider("netease", "1", "Song");

        assert!(!local.same_track(&remote));
        assert_ne!(local.key(), remote.key());
        assert_eq!(remote.key().to_string(), "netease:1");
        assert_eq!(local.key().to_string(), "local:1");
    }

    #[test]
    fn display_artists_joins_in_order() {
        let track = TrackIdentity::new("1", "Song")
            .with_artist("First")
            .with_artist("Second");
        assert_eq!(track.display_artists(), "First, Second");
        assert_eq!(TrackIdentity::new("2", "Solo").display_artists(), "");
    }

    #[test]
    fn deserializes_with_defaults() {
        let track: TrackIdentity =
            serde_json::from_str(r#"{"id":"7","title":"Untitled"}"#).unwrap();
        assert_eq!(track.source, TrackSource::Local);
        assert!(track.artists.is_empty());
        assert_eq!(track.duration_ms, None);

        let track: TrackIdentity = serde_json::from_str(
            r#"{"id":"8","title":"Remote","source":{"kind":"provider","id":"bilibili"}}"#,
        )
        .unwrap();
        assert_eq!(track.source.provider_key(), "bilibili");
    }
}
