use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

use anyhow::{Context, Result, ensure};
use log::{debug, warn};
use url::form_urlencoded;

use crate::{
    constants,
    dialog::Prompt,
    http::{Client, StatusError},
    jiotv::{
        JioTv,
        catalog::{self, Filter},
        otp::Mobile,
        playback::{self, Playback},
    },
    menu::Directory,
};

pub fn plugin_url(pairs: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();

    format!("{}?{query}", constants::PLUGIN_BASE)
}

#[derive(Default, Debug, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    //Accepts a bare query, one with a leading '?' or a whole plugin URL
    pub fn parse(query: &str) -> Self {
        let query = query.trim();
        let query = query.strip_prefix(constants::PLUGIN_BASE).unwrap_or(query);
        let query = query.strip_prefix('?').unwrap_or(query);

        Self(form_urlencoded::parse(query.as_bytes()).into_owned().collect())
    }

    //Empty values count as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    MainMenu,
    JioTv,
    Categories,
    Languages,
    Channels {
        category: Option<u32>,
        language: Option<String>,
    },
    Play(String),
    Login,
    Logout,
    ComingSoon(String),
    Settings,
}

impl TryFrom<&Params> for Action {
    type Error = anyhow::Error;

    fn try_from(params: &Params) -> Result<Self> {
        let Some(action) = params.get("action") else {
            return Ok(Self::MainMenu);
        };

        Ok(match action {
            "jiotv" => Self::JioTv,
            "jiotv_categories" => Self::Categories,
            "jiotv_languages" => Self::Languages,
            "jiotv_channels" => Self::Channels {
                category: params
                    .get("category")
                    .map(str::parse::<u32>)
                    .transpose()
                    .context("Invalid category")?,
                language: params.get("language").map(str::to_owned),
            },
            "jiotv_play" => {
                let channel_id = params.get("channel_id").context("Missing channel_id")?;
                ensure!(
                    playback::is_channel_id(channel_id),
                    "Invalid channel_id: {channel_id:?}"
                );

                Self::Play(channel_id.to_owned())
            }
            "jiotv_login" => Self::Login,
            "jiotv_logout" => Self::Logout,
            "hotstar" | "sonyliv" | "zee5" | "etvwin" | "sunnxt" | "aha" => {
                Self::ComingSoon(params.get("service").unwrap_or(action).to_owned())
            }
            "coming_soon" => {
                Self::ComingSoon(params.get("service").unwrap_or("This service").to_owned())
            }
            "settings" => Self::Settings,
            _ => {
                warn!("Unknown action: {action}");
                Self::MainMenu
            }
        })
    }
}

#[derive(Debug)]
pub enum Outcome {
    Directory(Directory),
    Play { playback: Playback, title: String },
    Notice(String),
    Text(String),
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(directory) => Display::fmt(directory, f),
            Self::Play { playback, .. } => f.write_str(&playback.url),
            Self::Notice(notice) | Self::Text(notice) => f.write_str(notice),
        }
    }
}

pub struct Router<C: Client, P: Prompt> {
    jiotv: JioTv<C>,
    prompt: P,
}

impl<C: Client, P: Prompt> Router<C, P> {
    pub const fn new(jiotv: JioTv<C>, prompt: P) -> Self {
        Self { jiotv, prompt }
    }

    pub fn route(&mut self, action: Action) -> Result<Outcome> {
        debug!("Router action: {action:?}");

        Ok(match action {
            Action::MainMenu => Outcome::Directory(Directory::main()),
            Action::JioTv => Outcome::Directory(Directory::jiotv(self.jiotv.is_logged_in())),
            Action::Categories => Outcome::Directory(Directory::categories()),
            Action::Languages => Outcome::Directory(Directory::languages()),
            Action::Channels { category, language } => {
                let filter = Filter::new(category, language.as_deref());
                let channels = filter.apply(self.jiotv.channels_or_empty());
                let heading = channels_heading(category, language.as_deref());

                Outcome::Directory(Directory::channels(heading, &channels))
            }
            Action::Play(channel_id) => self.play(&channel_id)?,
            Action::Login => self.login()?,
            Action::Logout => {
                self.jiotv.logout()?;
                Outcome::Notice("Logged out of JioTV".to_owned())
            }
            Action::ComingSoon(service) => Outcome::Notice(format!("{service} is coming soon!")),
            Action::Settings => Outcome::Text(self.settings()),
        })
    }

    fn play(&mut self, channel_id: &str) -> Result<Outcome> {
        let playback = self.jiotv.play(channel_id).map_err(|e| {
            if StatusError::code(&e).is_some() {
                e.context("Failed to get stream")
            } else {
                e
            }
        })?;

        Ok(Outcome::Play {
            playback,
            title: format!("JioTV {channel_id}"),
        })
    }

    fn login(&mut self) -> Result<Outcome> {
        let mobile = match self.jiotv.args().mobile.clone() {
            Some(mobile) => mobile,
            None => self
                .prompt
                .numeric("Enter Jio Mobile Number")?
                .unwrap_or_default(),
        };
        let mobile: Mobile = mobile.parse()?;

        self.jiotv.send_otp(&mobile).map_err(|e| {
            if StatusError::code(&e).is_some() {
                e.context("Failed to send OTP")
            } else {
                e.context("Network error")
            }
        })?;

        let Some(otp) = self.prompt.numeric("Enter OTP received on your phone")? else {
            return Ok(Outcome::Notice("Login cancelled".to_owned()));
        };

        self.jiotv.verify_otp(&mobile, &otp).map_err(|e| {
            if StatusError::code(&e).is_some() {
                e.context("Invalid OTP")
            } else {
                e.context("Verification failed")
            }
        })?;

        Ok(Outcome::Notice("Login successful!".to_owned()))
    }

    //Tokens stay out of the view, the mobile number is masked
    fn settings(&self) -> String {
        let tokens = self.jiotv.tokens();
        let args = self.jiotv.args();

        let login = if tokens.is_valid() {
            "logged in"
        } else {
            "logged out"
        };
        let mobile = tokens
            .mobile()
            .and_then(|m| m.parse::<Mobile>().ok())
            .map_or_else(|| "not set".to_owned(), |m| m.to_string());
        let token_time = tokens
            .token_time()
            .map_or_else(|| "never".to_owned(), |t| t.to_string());

        format!(
            "{} settings\n  \
             settings file: {}\n  \
             jiotv login:   {login}\n  \
             jiotv mobile:  {mobile}\n  \
             token issued:  {token_time}\n  \
             quality:       {}\n  \
             adaptive:      {}\n  \
             language:      {}",
            constants::PLUGIN_NAME,
            tokens.settings().path().display(),
            args.quality,
            args.adaptive,
            catalog::DEFAULT_LANGUAGE,
        )
    }

    #[cfg(test)]
    pub const fn jiotv(&self) -> &JioTv<C> {
        &self.jiotv
    }
}

fn channels_heading(category: Option<u32>, language: Option<&str>) -> String {
    match (category.and_then(catalog::category_name), language) {
        (Some(category), Some(language)) => format!("{language} {category} Channels"),
        (Some(category), None) => format!("{category} Channels"),
        (None, Some(language)) => format!("{language} Channels"),
        (None, None) => "All Channels".to_owned(),
    }
}
