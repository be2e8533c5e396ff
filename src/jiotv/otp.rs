use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde_json::json;

use super::Error;
use crate::constants;

//Ten digit subscriber number, without the country code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mobile(String);

impl FromStr for Mobile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 10 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(Error::InvalidMobile)
        }
    }
}

impl Display for Mobile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        //Only the last digits end up in logs
        write!(f, "******{}", &self.0[6..])
    }
}

impl Mobile {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn international(&self) -> String {
        format!("{}{}", constants::COUNTRY_CODE, self.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct Tokens {
    #[serde(rename = "authToken", default)]
    pub auth_token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: Option<String>,
}

pub fn send_otp_url() -> String {
    format!("{}/sendotp", constants::JIOTV_AUTH_BASE)
}

pub fn verify_otp_url() -> String {
    format!("{}/verifyotp", constants::JIOTV_AUTH_BASE)
}

pub fn refresh_url() -> String {
    format!("{}/refreshtoken", constants::JIOTV_AUTH_BASE)
}

pub fn send_otp_body(mobile: &Mobile) -> String {
    json!({ "number": mobile.international() }).to_string()
}

pub fn verify_otp_body(mobile: &Mobile, otp: &str) -> String {
    json!({ "number": mobile.international(), "otp": otp.trim() }).to_string()
}

pub fn refresh_body(refresh_token: &str) -> String {
    json!({ "refreshToken": refresh_token }).to_string()
}

pub fn parse_tokens(response: &str) -> Result<Tokens> {
    let tokens: Tokens =
        serde_json::from_str(response).context("Failed to parse login response")?;
    ensure!(
        !tokens.auth_token.is_empty(),
        "Login response did not contain a token"
    );

    Ok(tokens)
}
