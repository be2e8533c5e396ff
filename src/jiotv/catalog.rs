use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

use crate::constants;

pub const CATEGORIES: [(&str, u32); 13] = [
    ("Entertainment", 5),
    ("Movies", 6),
    ("Kids", 7),
    ("Sports", 8),
    ("Lifestyle", 9),
    ("Infotainment", 10),
    ("News", 12),
    ("Music", 13),
    ("Devotional", 14),
    ("Business", 15),
    ("Educational", 16),
    ("Shopping", 17),
    ("JioDarshan", 18),
];

pub const LANGUAGES: [(&str, u32); 16] = [
    ("Hindi", 1),
    ("Marathi", 2),
    ("Punjabi", 3),
    ("Urdu", 4),
    ("Bengali", 5),
    ("English", 6),
    ("Malayalam", 7),
    ("Tamil", 8),
    ("Gujarati", 9),
    ("Odia", 10),
    ("Telugu", 11),
    ("Bhojpuri", 12),
    ("Kannada", 13),
    ("Assamese", 14),
    ("Nepali", 15),
    ("French", 16),
];

pub const DEFAULT_LANGUAGE: &str = "Telugu";
const DEFAULT_LANGUAGE_ID: u32 = 11;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Channel {
    #[serde(deserialize_with = "string_or_number")]
    pub channel_id: String,
    pub channel_name: Option<String>,
    #[serde(rename = "channelCategoryId")]
    pub category_id: Option<u32>,
    #[serde(rename = "channelLanguageId")]
    pub language_id: Option<u32>,
    #[serde(rename = "logoUrl")]
    pub logo_url: Option<String>,
}

impl Channel {
    pub fn name(&self) -> &str {
        self.channel_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown")
    }
}

#[derive(Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    result: Option<Vec<Channel>>,
}

//Both constraints must hold, an unset one matches everything
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub category: Option<u32>,
    pub language: Option<u32>,
}

impl Filter {
    pub fn new(category: Option<u32>, language: Option<&str>) -> Self {
        Self {
            category,
            language: language.map(language_id),
        }
    }

    pub fn matches(&self, channel: &Channel) -> bool {
        self.category.is_none_or(|c| channel.category_id == Some(c))
            && self.language.is_none_or(|l| channel.language_id == Some(l))
    }

    pub fn apply(&self, channels: Vec<Channel>) -> Vec<Channel> {
        let total = channels.len();
        let channels: Vec<Channel> = channels.into_iter().filter(|c| self.matches(c)).collect();
        debug!("{self:?} kept {} of {total} channels", channels.len());

        channels
    }
}

//Unknown names fall back to Telugu
pub fn language_id(name: &str) -> u32 {
    LANGUAGES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map_or(DEFAULT_LANGUAGE_ID, |(_, id)| *id)
}

pub fn category_name(id: u32) -> Option<&'static str> {
    CATEGORIES.iter().find(|(_, i)| *i == id).map(|(n, _)| *n)
}

pub fn channels_url() -> String {
    format!("{}/channels", constants::JIOTV_API_BASE)
}

pub fn parse_channels(response: &str) -> Result<Vec<Channel>> {
    let response: ChannelsResponse =
        serde_json::from_str(response).context("Failed to parse channel list")?;

    Ok(response.result.unwrap_or_default())
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::default()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{CHANNELS, create_logged_in};
    use super::*;

    #[test]
    fn parse_channel_list() {
        let channels = parse_channels(CHANNELS).unwrap();
        assert_eq!(channels.len(), 4);
        assert_eq!(
            channels[0],
            Channel {
                channel_id: "144".to_owned(),
                channel_name: Some("Colors HD".to_owned()),
                category_id: Some(5),
                language_id: Some(1),
                logo_url: Some("Colors_HD.png".to_owned()),
            }
        );
        assert_eq!(channels[2].channel_id, "471");
        assert_eq!(channels[3].name(), "Unknown");

        assert!(parse_channels(r#"{"code":200}"#).unwrap().is_empty());
        assert!(parse_channels("<html>").is_err());
    }

    #[test]
    fn filter_by_category_and_language() {
        let channels = parse_channels(CHANNELS).unwrap();
        let ids = |filter: Filter| {
            filter
                .apply(channels.clone())
                .into_iter()
                .map(|c| c.channel_id)
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(Filter::default()), ["144", "1235", "471", "155"]);
        assert_eq!(ids(Filter::new(Some(5), None)), ["144", "1235"]);
        assert_eq!(ids(Filter::new(None, Some("Telugu"))), ["1235", "471"]);
        assert_eq!(ids(Filter::new(Some(5), Some("telugu"))), ["1235"]);
        assert_eq!(ids(Filter::new(Some(8), Some("Telugu"))), Vec::<String>::new());
        assert_eq!(ids(Filter::new(None, Some("English"))), ["155"]);
    }

    #[test]
    fn unknown_language_is_telugu() {
        assert_eq!(language_id("Klingon"), 11);
        assert_eq!(language_id(DEFAULT_LANGUAGE), 11);
        assert_eq!(language_id("Hindi"), 1);
        assert_eq!(category_name(12), Some("News"));
        assert_eq!(category_name(11), None);
    }

    #[test]
    fn fetch_channels() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = create_logged_in(&dir, [Ok(CHANNELS)]);

        let channels = service.channels().unwrap();
        assert_eq!(channels.len(), 4);
        assert_eq!(
            service.client.sent[0].url,
            "https://jiotvapi.media.jio.com/playback/apis/v1/channels"
        );
    }
}
