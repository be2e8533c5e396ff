use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::Error;
use crate::constants;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    #[default]
    Auto,
    Low,
    Medium,
    High,
}

impl FromStr for Quality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => bail!("Unknown quality {s:?}, expected auto, low, medium or high"),
        }
    }
}

impl Display for Quality {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

impl Quality {
    //Bits per second, auto leaves the choice to the player
    pub const fn max_bandwidth(self) -> Option<u64> {
        match self {
            Self::Auto => None,
            Self::Low => Some(500_000),
            Self::Medium => Some(1_500_000),
            Self::High => Some(5_000_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptiveHints {
    pub manifest_type: &'static str,
    pub max_bandwidth: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playback {
    pub url: String,
    pub adaptive: Option<AdaptiveHints>,
}

impl Playback {
    pub fn new(url: String, quality: Quality, adaptive: bool) -> Self {
        Self {
            url,
            adaptive: adaptive.then(|| AdaptiveHints {
                manifest_type: "hls",
                max_bandwidth: quality.max_bandwidth(),
            }),
        }
    }

    pub fn max_bandwidth(&self) -> Option<u64> {
        self.adaptive.as_ref().and_then(|h| h.max_bandwidth)
    }

    //Input stream properties in the form a media center expects them
    pub fn properties(&self) -> Vec<(&'static str, String)> {
        let Some(hints) = &self.adaptive else {
            return Vec::new();
        };

        let mut properties = vec![
            ("inputstream", "inputstream.adaptive".to_owned()),
            (
                "inputstream.adaptive.manifest_type",
                hints.manifest_type.to_owned(),
            ),
        ];

        if let Some(max_bandwidth) = hints.max_bandwidth {
            properties.push((
                "inputstream.adaptive.max_bandwidth",
                max_bandwidth.to_string(),
            ));
        }

        properties
    }
}

#[derive(Deserialize)]
struct PlaybackResponse {
    #[serde(default)]
    result: Option<PlaybackResult>,
}

#[derive(Deserialize)]
struct PlaybackResult {
    #[serde(default)]
    url: Option<String>,
}

//Channel ids become a path segment of the playback endpoint
pub fn is_channel_id(channel_id: &str) -> bool {
    !channel_id.is_empty() && channel_id.bytes().all(|b| b.is_ascii_alphanumeric())
}

pub fn playback_url(channel_id: &str) -> String {
    format!("{}/playbackurl/{channel_id}", constants::JIOTV_API_BASE)
}

pub fn parse_playback_url(response: &str) -> Result<String> {
    let response: PlaybackResponse =
        serde_json::from_str(response).context("Failed to parse playback response")?;

    response
        .result
        .and_then(|r| r.url)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::StreamNotFound.into())
}

#[cfg(test)]
mod tests {
    use super::super::tests::{PLAYBACK, create_logged_in};
    use super::*;

    #[test]
    fn quality_bandwidth() {
        let qualities = [
            ("auto", None),
            ("low", Some(500_000)),
            ("Medium", Some(1_500_000)),
            ("HIGH", Some(5_000_000)),
        ];

        for (quality, bandwidth) in qualities {
            assert_eq!(
                quality.parse::<Quality>().unwrap().max_bandwidth(),
                bandwidth
            );
        }

        assert!("ultra".parse::<Quality>().is_err());
    }

    #[test]
    fn adaptive_properties() {
        let playback = Playback::new(
            "https://live.invalid/index.m3u8".to_owned(),
            Quality::Low,
            true,
        );
        assert_eq!(
            playback.properties(),
            [
                ("inputstream", "inputstream.adaptive".to_owned()),
                ("inputstream.adaptive.manifest_type", "hls".to_owned()),
                ("inputstream.adaptive.max_bandwidth", "500000".to_owned()),
            ]
        );

        let playback = Playback::new(String::new(), Quality::Auto, true);
        assert_eq!(playback.properties().len(), 2);
        assert_eq!(playback.max_bandwidth(), None);

        let playback = Playback::new(String::new(), Quality::High, false);
        assert!(playback.properties().is_empty());
        assert_eq!(playback.max_bandwidth(), None);
    }

    #[test]
    fn channel_ids() {
        for valid in ["144", "1235", "ETV1"] {
            assert!(is_channel_id(valid), "{valid}");
        }

        let invalid = [
            "",
            "../channels",
            "1 HTTP/1.1\r\nX-Injected: yes",
            "144?x=1",
            "1/2",
            "१२",
        ];
        for invalid in invalid {
            assert!(!is_channel_id(invalid), "{invalid}");
        }
    }

    #[test]
    fn parse_response() {
        assert_eq!(
            parse_playback_url(PLAYBACK).unwrap(),
            "https://jiotvmblive.cdn.jio.com/bpk-tv/ETV/index.m3u8?__hdnea__=st=1"
        );

        for missing in [r#"{"result":{"url":""}}"#, r#"{"result":null}"#, "{}"] {
            let error = parse_playback_url(missing).unwrap_err();
            assert_eq!(error.to_string(), "Stream URL not found");
        }
    }

    #[test]
    fn resolve_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = create_logged_in(&dir, [Ok(PLAYBACK)]);
        service.args.quality = Quality::Medium;

        let playback = service.play("1235").unwrap();
        assert_eq!(playback.max_bandwidth(), Some(1_500_000));
        assert_eq!(
            service.client.sent[0].url,
            "https://jiotvapi.media.jio.com/playback/apis/v1/playbackurl/1235"
        );
    }
}
