//! Playlist files
//!
//! A playlist is a TOML document with one `[[track]]` table per entry:
//!
//! ```toml
//! [[track]]
//! id = "42"
//! title = "Hyperballad"
//! artists = ["Björk"]
//! album = "Post"
//! duration_ms = 321000
//! provider = "netease"   # omitted for local files
//! fail = false           # simulate a provider that cannot resolve it
//! ```
use anyhow::{Context, Result};
use encore_core::{AlbumRef, TrackIdentity, TrackKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub artists: Vec<String>,

    #[serde(default)]
    pub album: Option<String>,

    #[serde(default)]
    pub duration_ms: Option<u64>,

    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub fail: bool,
}

impl PlaylistEntry {
    pub fn identity(&self) -> TrackIdentity {
        let mut track = match &self.provider {
            Some(provider) => TrackIdentity::from_provider(provider, &self.id, &self.title),
            None => TrackIdentity::new(&self.id, &self.title),
        };
        for artist in &self.artists {
            track = track.with_artist(artist);
        }
        if let Some(album) = &self.album {
            track = track.with_album(AlbumRef::new(album));
        }
        if let Some(duration_ms) = self.duration_ms {
            track = track.with_duration_ms(duration_ms);
        }
        track
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Playlist {
    #[serde(default, rename = "track")]
    pub tracks: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn parse(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid playlist")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read playlist {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("in {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Track identities in playlist order
    pub fn identities(&self) -> Vec<TrackIdentity> {
        self.tracks.iter().map(PlaylistEntry::identity).collect()
    }

    /// Look up an entry by its id (first match across providers)
    pub fn find(&self, id: &str) -> Option<TrackIdentity> {
        self.tracks
            .iter()
            .find(|entry| entry.id == id)
            .map(PlaylistEntry::identity)
    }

    /// Keys of the entries marked `fail = true`
    pub fn failing_keys(&self) -> HashSet<TrackKey> {
        self.tracks
            .iter()
            .filter(|entry| entry.fail)
            .map(|entry| entry.identity().key())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[track]]
id = "1"
title = "Hyperballad"
artists = ["Björk"]
album = "Post"
duration_ms = 321000

[[track]]
id = "2"
title = "Teardrop"
artists = ["Massive Attack", "Elizabeth Fraser"]
provider = "netease"

[[track]]
id = "3"
title = "Broken Link"
provider = "slowcloud"
fail = true
"#;

    #[test]
    fn parse_sample_playlist() {
        let playlist = Playlist::parse(SAMPLE).unwrap();
        assert_eq!(playlist.len(), 3);

        let tracks = playlist.identities();
        assert_eq!(tracks[0].title, "Hyperballad");
        assert_eq!(tracks[0].duration_ms, Some(321_000));
        assert_eq!(tracks[0].album.as_ref().unwrap().name, "Post");
        assert!(tracks[0].source.is_local());

        assert_eq!(tracks[1].source.provider_key(), "netease");
        assert_eq!(tracks[1].display_artists(), "Massive Attack, Elizabeth Fraser");
    }

    #[test]
    fn failing_entries_are_keyed_by_provider() {
        let playlist = Playlist::parse(SAMPLE).unwrap();
        let failing = playlist.failing_keys();

        assert_eq!(failing.len(), 1);
        assert!(failing.contains(&playlist.find("3").unwrap().key()));
        assert!(!failing.contains(&playlist.find("1").unwrap().key()));
    }

    #[test]
    fn empty_document_is_an_empty_playlist() {
        let playlist = Playlist::parse("").unwrap();
        assert!(playlist.is_empty());
    }

    #[test]
    fn missing_title_is_rejected() {
        assert!(Playlist::parse("[[track]]\nid = \"1\"\n").is_err());
    }

    #[test]
    fn load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mix.toml");
        std::fs::write(&path, "[[track]]\nid = 1\n").unwrap();

        let err = Playlist::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("mix.toml"));
    }
}
