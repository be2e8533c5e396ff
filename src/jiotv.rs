pub mod catalog;
pub mod otp;
pub mod playback;

use std::fmt::{self, Display, Formatter};

use anyhow::{Result, ensure};
use log::{error, info};

use catalog::Channel;
use otp::Mobile;
use playback::{Playback, Quality};

use crate::{
    args::{Parse, Parser},
    auth::TokenManager,
    http::{Client, StatusError},
};

pub const SERVICE: &str = "jiotv";

#[derive(Debug)]
pub enum Error {
    NotLoggedIn,
    SessionExpired,
    InvalidMobile,
    StreamNotFound,
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "Please login first"),
            Self::SessionExpired => write!(f, "Session expired, please login again"),
            Self::InvalidMobile => write!(f, "Please enter valid 10-digit mobile number"),
            Self::StreamNotFound => write!(f, "Stream URL not found"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Args {
    pub quality: Quality,
    pub adaptive: bool,
    pub mobile: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            adaptive: true,
            quality: Quality::default(),
            mobile: Option::default(),
        }
    }
}

impl Parse for Args {
    fn parse(&mut self, parser: &mut Parser) -> Result<()> {
        parser.parse_cfg(&mut self.quality, "--quality", "quality")?;

        let mut no_adaptive = false;
        parser.parse_switch_cfg(&mut no_adaptive, "--no-adaptive", "no-adaptive")?;
        self.adaptive = !no_adaptive;

        parser.parse_opt_string_cfg(&mut self.mobile, "--mobile", "mobile")?;

        Ok(())
    }
}

pub struct JioTv<C: Client> {
    client: C,
    tokens: TokenManager,
    args: Args,
}

impl<C: Client> JioTv<C> {
    pub const fn new(client: C, tokens: TokenManager, args: Args) -> Self {
        Self {
            client,
            tokens,
            args,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.tokens.is_valid()
    }

    pub const fn args(&self) -> &Args {
        &self.args
    }

    pub const fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn logout(&mut self) -> Result<()> {
        info!("Logging out of JioTV");
        self.tokens.clear_token()
    }

    //A stored token is reused until the API answers 401, then refreshed once
    fn authorized_get(&mut self, url: &str) -> Result<String> {
        match self.get_with_token(url) {
            Err(e) if StatusError::is_unauthorized(&e) => {
                info!("Token rejected, refreshing session...");
                self.refresh()?;
                self.get_with_token(url)
            }
            result => result,
        }
    }

    fn get_with_token(&mut self, url: &str) -> Result<String> {
        let token = self.tokens.token().ok_or(Error::NotLoggedIn)?;
        let authorization = format!("Bearer {token}");

        self.client.get(
            url,
            &[
                ("Authorization", authorization.as_str()),
                ("Content-Type", "application/json"),
            ],
        )
    }

    fn post_json(&mut self, url: &str, body: &str) -> Result<String> {
        self.client
            .post(url, &[("Content-Type", "application/json")], body)
    }

    pub fn channels(&mut self) -> Result<Vec<Channel>> {
        let response = self.authorized_get(&catalog::channels_url())?;
        catalog::parse_channels(&response)
    }

    //Catalog failures degrade to an empty listing
    pub fn channels_or_empty(&mut self) -> Vec<Channel> {
        self.channels().unwrap_or_else(|e| {
            error!("Error fetching channels: {e}");
            Vec::new()
        })
    }

    pub fn play(&mut self, channel_id: &str) -> Result<Playback> {
        if !self.is_logged_in() {
            return Err(Error::NotLoggedIn.into());
        }
        ensure!(
            playback::is_channel_id(channel_id),
            "Invalid channel_id: {channel_id:?}"
        );

        let response = self.authorized_get(&playback::playback_url(channel_id))?;
        let url = playback::parse_playback_url(&response)?;

        Ok(Playback::new(url, self.args.quality, self.args.adaptive))
    }

    pub fn send_otp(&mut self, mobile: &Mobile) -> Result<()> {
        info!("Requesting OTP for {mobile}");
        self.post_json(&otp::send_otp_url(), &otp::send_otp_body(mobile))?;

        Ok(())
    }

    pub fn verify_otp(&mut self, mobile: &Mobile, code: &str) -> Result<()> {
        let body = otp::verify_otp_body(mobile, code);
        let response = self.post_json(&otp::verify_otp_url(), &body)?;
        let tokens = otp::parse_tokens(&response)?;

        self.tokens.set_mobile(mobile.as_str())?;
        self.tokens
            .set_token(&tokens.auth_token, tokens.refresh_token.as_deref())?;

        info!("Logged in to JioTV as {mobile}");
        Ok(())
    }

    pub fn refresh(&mut self) -> Result<()> {
        let Some(refresh_token) = self.tokens.refresh_token().map(str::to_owned) else {
            self.tokens.clear_token()?;
            return Err(Error::SessionExpired.into());
        };

        let response =
            match self.post_json(&otp::refresh_url(), &otp::refresh_body(&refresh_token)) {
                Ok(response) => response,
                //Only a rejected refresh token ends the session
                Err(e) if matches!(StatusError::code(&e), Some(400 | 401 | 403)) => {
                    error!("Token refresh rejected: {e}");
                    self.tokens.clear_token()?;
                    return Err(Error::SessionExpired.into());
                }
                Err(e) => return Err(e),
            };

        let tokens = otp::parse_tokens(&response)?;
        self.tokens
            .set_token(&tokens.auth_token, tokens.refresh_token.as_deref())?;

        info!("JioTV session refreshed");
        Ok(())
    }
}
