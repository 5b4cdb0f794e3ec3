use serde::{Deserialize, Serialize};

/// Page size requested from the recently-played endpoint.
pub const RECENT_PAGE_SIZE: u32 = 10;

/// Credential pair returned by the accounts service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub expires_in: u64,
    /// Only present on the first authorization of a user.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// Web API payloads. Everything past the track name is optional upstream, so
// it is optional here too.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub item: Option<ApiTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentlyPlayed {
    #[serde(default)]
    pub items: Vec<PlayHistory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistory {
    pub played_at: String,
    pub track: ApiTrack,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiTrack {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Option<Vec<ApiArtist>>,
    #[serde(default)]
    pub external_urls: Option<ExternalUrls>,
    #[serde(default)]
    pub album: Option<ApiAlbum>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiArtist {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAlbum {
    #[serde(default)]
    pub images: Option<Vec<ApiImage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiImage {
    pub url: String,
}

impl ApiTrack {
    fn artist_names(&self) -> Option<String> {
        self.artists.as_ref().map(|artists| {
            artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        })
    }

    fn song_url(&self) -> Option<String> {
        self.external_urls.as_ref().and_then(|u| u.spotify.clone())
    }

    fn image_url(&self, index: usize) -> Option<String> {
        self.album
            .as_ref()
            .and_then(|album| album.images.as_ref())
            .and_then(|images| images.get(index))
            .map(|image| image.url.clone())
    }
}

/// Snapshot of the current playback as served to the browser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NowPlaying {
    pub is_playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_art_url: Option<String>,
}

impl NowPlaying {
    pub fn inactive() -> Self {
        Self::default()
    }

    /// `None` is the 204 case. A missing item means nothing is loaded in the
    /// player, whatever `is_playing` says.
    pub fn from_api(data: Option<CurrentlyPlaying>) -> Self {
        let Some(data) = data else {
            return Self::inactive();
        };
        let Some(item) = data.item else {
            return Self::inactive();
        };

        Self {
            is_playing: data.is_playing && !item.name.is_empty(),
            artist: item.artist_names(),
            song_url: item.song_url(),
            // index 0 is the largest rendition
            album_art_url: item.image_url(0),
            track: Some(item.name).filter(|name| !name.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTrack {
    pub track: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_url: Option<String>,
    #[serde(default)]
    pub album_art_url: Option<String>,
    pub played_at: String,
}

impl RecentTrack {
    pub fn from_api(entry: PlayHistory) -> Self {
        let track = entry.track;
        // Third rendition is the small thumbnail; fall back to the first.
        let album_art_url = track.image_url(2).or_else(|| track.image_url(0));

        Self {
            artist: track.artist_names().unwrap_or_default(),
            song_url: track.song_url(),
            album_art_url,
            track: track.name,
            played_at: entry.played_at,
        }
    }

    /// Maps a history page, newest first as returned upstream.
    pub fn from_page(page: Option<RecentlyPlayed>) -> Vec<Self> {
        page.map(|p| p.items.into_iter().map(Self::from_api).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl ApiTrack {
    pub fn mock(name: &str, artist: &str, images: usize) -> Self {
        Self {
            name: name.to_string(),
            artists: Some(vec![ApiArtist {
                name: artist.to_string(),
            }]),
            external_urls: Some(ExternalUrls {
                spotify: Some(format!("https://open.spotify.com/track/{}", name)),
            }),
            album: Some(ApiAlbum {
                images: Some(
                    (0..images)
                        .map(|i| ApiImage {
                            url: format!("https://i.scdn.co/image/{}", i),
                        })
                        .collect(),
                ),
            }),
        }
    }
}
