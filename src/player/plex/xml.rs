//! Plex XML payloads.
//!
//! Numeric attributes are read as strings and parsed leniently: a garbled
//! number becomes its default rather than failing the whole document.

use crate::error::RemoteResult;
use crate::player::traits::{MediaInfo, PlaybackState, RepeatMode, Snapshot, Track};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TimelineContainer {
    #[serde(rename = "Timeline", default)]
    timelines: Vec<TimelineNode>,
}

#[derive(Debug, Deserialize)]
struct TimelineNode {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "@state")]
    state: Option<String>,
    #[serde(rename = "@time")]
    time: Option<String>,
    #[serde(rename = "@duration")]
    duration: Option<String>,
    #[serde(rename = "@ratingKey")]
    rating_key: Option<String>,
    #[serde(rename = "@volume")]
    volume: Option<String>,
    #[serde(rename = "@shuffle")]
    shuffle: Option<String>,
    #[serde(rename = "@repeat")]
    repeat: Option<String>,
    #[serde(rename = "@machineIdentifier")]
    machine_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataContainer {
    #[serde(rename = "Track", default)]
    tracks: Vec<TrackNode>,
}

#[derive(Debug, Deserialize)]
struct TrackNode {
    #[serde(rename = "@ratingKey")]
    rating_key: Option<String>,
    #[serde(rename = "@parentRatingKey")]
    parent_rating_key: Option<String>,
    #[serde(rename = "@grandparentRatingKey")]
    grandparent_rating_key: Option<String>,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(rename = "@parentTitle")]
    parent_title: Option<String>,
    #[serde(rename = "@grandparentTitle")]
    grandparent_title: Option<String>,
    #[serde(rename = "@userRating")]
    user_rating: Option<String>,
    #[serde(rename = "@thumb")]
    thumb: Option<String>,
    #[serde(rename = "@parentThumb")]
    parent_thumb: Option<String>,
    #[serde(rename = "@grandparentThumb")]
    grandparent_thumb: Option<String>,
    #[serde(rename = "@duration")]
    duration: Option<String>,
    #[serde(rename = "@index")]
    index: Option<String>,
    #[serde(rename = "Media", default)]
    media: Vec<MediaNode>,
}

#[derive(Debug, Deserialize)]
struct MediaNode {
    #[serde(rename = "@audioCodec")]
    audio_codec: Option<String>,
    #[serde(rename = "@bitrate")]
    bitrate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChildrenContainer {
    #[serde(rename = "Track", default)]
    tracks: Vec<ChildNode>,
}

#[derive(Debug, Deserialize)]
struct ChildNode {
    #[serde(rename = "@ratingKey")]
    _rating_key: Option<String>,
}

fn number<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Picks the music timeline out of a `/player/timeline/poll` response.
pub fn parse_timeline(xml: &str) -> RemoteResult<Option<Snapshot>> {
    let container: TimelineContainer = quick_xml::de::from_str(xml)?;
    let Some(node) = container
        .timelines
        .into_iter()
        .find(|t| t.kind.as_deref() == Some("music"))
    else {
        return Ok(None);
    };

    Ok(Some(Snapshot {
        state: PlaybackState::from_plex(node.state.as_deref().unwrap_or("stopped")),
        position_ms: number(node.time.as_deref()).unwrap_or(0),
        duration_ms: number(node.duration.as_deref()).unwrap_or(0),
        rating_key: non_empty(node.rating_key),
        volume: number::<u32>(node.volume.as_deref()).map(|v| v.min(100) as u8),
        shuffle: number::<u8>(node.shuffle.as_deref()).unwrap_or(0) != 0,
        repeat: RepeatMode::from_plex(number(node.repeat.as_deref()).unwrap_or(0)),
        machine_identifier: non_empty(node.machine_identifier),
    }))
}

/// Parses `/library/metadata/{key}`. Ratings come back as floats (`8.0`).
pub fn parse_metadata(xml: &str) -> RemoteResult<Option<Track>> {
    let container: MetadataContainer = quick_xml::de::from_str(xml)?;
    let Some(node) = container.tracks.into_iter().next() else {
        return Ok(None);
    };
    let Some(rating_key) = non_empty(node.rating_key) else {
        return Ok(None);
    };

    let user_rating = number::<f64>(node.user_rating.as_deref())
        .map(|r| r.round().clamp(0.0, 10.0) as u8)
        .unwrap_or(0);

    let media = node.media.into_iter().next().map(|m| MediaInfo {
        codec: non_empty(m.audio_codec),
        bitrate: number(m.bitrate.as_deref()),
    });

    Ok(Some(Track {
        rating_key,
        parent_rating_key: non_empty(node.parent_rating_key),
        grandparent_rating_key: non_empty(node.grandparent_rating_key),
        title: node.title.unwrap_or_default(),
        parent_title: node.parent_title.unwrap_or_default(),
        grandparent_title: node.grandparent_title.unwrap_or_default(),
        user_rating,
        duration_ms: number(node.duration.as_deref()).unwrap_or(0),
        index: number(node.index.as_deref()),
        media,
        thumb: non_empty(node.thumb),
        parent_thumb: non_empty(node.parent_thumb),
        grandparent_thumb: non_empty(node.grandparent_thumb),
    }))
}

pub fn count_children(xml: &str) -> RemoteResult<u32> {
    let container: ChildrenContainer = quick_xml::de::from_str(xml)?;
    Ok(container.tracks.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMELINE: &str = r#"<MediaContainer commandID="4" location="fullScreenMusic">
  <Timeline type="video" state="stopped" />
  <Timeline type="music" state="playing" time="61500" duration="245000" ratingKey="4242"
            key="/library/metadata/4242" volume="65" shuffle="1" repeat="2"
            machineIdentifier="abc-123" />
  <Timeline type="photo" state="stopped" />
</MediaContainer>"#;

    #[test]
    fn test_parse_music_timeline() {
        let snapshot = parse_timeline(TIMELINE).unwrap().unwrap();
        assert_eq!(snapshot.state, PlaybackState::Playing);
        assert_eq!(snapshot.position_ms, 61_500);
        assert_eq!(snapshot.duration_ms, 245_000);
        assert_eq!(snapshot.rating_key.as_deref(), Some("4242"));
        assert_eq!(snapshot.volume, Some(65));
        assert!(snapshot.shuffle);
        assert_eq!(snapshot.repeat, RepeatMode::One);
        assert_eq!(snapshot.machine_identifier.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_timeline_without_music_is_none() {
        let xml = r#"<MediaContainer><Timeline type="video" state="playing" /></MediaContainer>"#;
        assert!(parse_timeline(xml).unwrap().is_none());
    }

    #[test]
    fn test_garbled_numbers_fall_back() {
        let xml = r#"<MediaContainer><Timeline type="music" state="paused" time="abc" /></MediaContainer>"#;
        let snapshot = parse_timeline(xml).unwrap().unwrap();
        assert_eq!(snapshot.state, PlaybackState::Paused);
        assert_eq!(snapshot.position_ms, 0);
        assert_eq!(snapshot.volume, None);
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        assert!(parse_timeline("<MediaContainer><Timeline").is_err());
    }

    #[test]
    fn test_parse_track_metadata() {
        let xml = r#"<MediaContainer size="1">
  <Track ratingKey="4242" parentRatingKey="4200" grandparentRatingKey="4100"
         title="Song" parentTitle="Album" grandparentTitle="Artist" userRating="7.0"
         thumb="/library/metadata/4200/thumb/1" duration="245000" index="3">
    <Media audioCodec="flac" bitrate="1411"><Part file="/music/song.flac" /></Media>
  </Track>
</MediaContainer>"#;
        let track = parse_metadata(xml).unwrap().unwrap();
        assert_eq!(track.rating_key, "4242");
        assert_eq!(track.parent_rating_key.as_deref(), Some("4200"));
        assert_eq!(track.grandparent_title, "Artist");
        assert_eq!(track.user_rating, 7);
        assert_eq!(track.index, Some(3));
        let media = track.media.unwrap();
        assert_eq!(media.codec.as_deref(), Some("flac"));
        assert_eq!(media.bitrate, Some(1411));
    }

    #[test]
    fn test_unrated_track_is_zero() {
        let xml = r#"<MediaContainer><Track ratingKey="1" title="x" /></MediaContainer>"#;
        let track = parse_metadata(xml).unwrap().unwrap();
        assert_eq!(track.user_rating, 0);
        assert!(track.media.is_none());
    }

    #[test]
    fn test_count_children() {
        let xml = r#"<MediaContainer size="3">
  <Track ratingKey="1" /><Track ratingKey="2" /><Track ratingKey="3" />
</MediaContainer>"#;
        assert_eq!(count_children(xml).unwrap(), 3);
        assert_eq!(count_children("<MediaContainer size=\"0\" />").unwrap(), 0);
    }
}
