pub const USER_AGENT: &str = "JioTV/1.0";

pub const PLUGIN_NAME: &str = "RevTV";
pub const PLUGIN_BASE: &str = "plugin://plugin.video.revtv/";

pub const JIOTV_API_BASE: &str = "https://jiotvapi.media.jio.com/playback/apis/v1";
pub const JIOTV_AUTH_BASE: &str = "https://jiotvapi.media.jio.com/authapi/apis/v1";

pub const COUNTRY_CODE: &str = "+91";

pub const DEFAULT_CONFIG_PATH: &str = concat!(env!("CARGO_PKG_NAME"), "/config");
pub const DEFAULT_SETTINGS_PATH: &str = concat!(env!("CARGO_PKG_NAME"), "/settings.json");
