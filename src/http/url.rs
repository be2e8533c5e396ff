use std::{
    fmt::{self, Display, Formatter},
    ops::Deref,
};

use anyhow::{Context, Result, bail};

#[derive(Default, Copy, Clone, PartialEq, Eq, Debug)]
pub enum Scheme {
    Http,
    Https,
    #[default]
    Unknown,
}

impl Display for Scheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Https => f.write_str("https"),
            Self::Unknown => f.write_str("<unknown>"),
        }
    }
}

#[derive(Default, Clone, PartialEq, Eq, Debug)]
pub struct Url {
    pub scheme: Scheme,
    inner: String,
}

impl From<&str> for Url {
    fn from(url: &str) -> Self {
        url.to_owned().into()
    }
}

impl From<String> for Url {
    fn from(url: String) -> Self {
        let scheme = match url.split_once("://").map(|s| s.0) {
            Some(s) if s.eq_ignore_ascii_case("https") => Scheme::Https,
            Some(s) if s.eq_ignore_ascii_case("http") => Scheme::Http,
            _ => Scheme::Unknown,
        };

        Self { scheme, inner: url }
    }
}

impl Deref for Url {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Display for Url {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl Url {
    pub fn host(&self) -> Result<&str> {
        let authority = self.authority()?;
        Ok(authority
            .rsplit_once(':')
            .map_or(authority, |(host, _)| host))
    }

    //Everything after the authority, without the leading slash
    pub fn path(&self) -> Result<&str> {
        let rest = self.after_scheme()?;
        Ok(rest
            .find(['/', '?'])
            .map_or("", |i| rest[i..].trim_start_matches('/')))
    }

    pub fn port(&self) -> Result<u16> {
        if let Some((_, port)) = self.authority()?.rsplit_once(':') {
            return port.parse().context("Failed to parse port in URL");
        }

        match self.scheme {
            Scheme::Http => Ok(80),
            Scheme::Https => Ok(443),
            Scheme::Unknown => bail!("Unsupported scheme in URL: {self}"),
        }
    }

    fn after_scheme(&self) -> Result<&str> {
        self.inner
            .split_once("://")
            .map(|s| s.1)
            .context("Failed to parse scheme in URL")
    }

    fn authority(&self) -> Result<&str> {
        let rest = self.after_scheme()?;
        let authority = rest.split(['/', '?']).next().unwrap_or_default();
        if authority.is_empty() {
            bail!("Failed to parse host in URL: {self}");
        }

        Ok(authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_parts() {
        let url = Url::from("https://jiotvapi.media.jio.com/playback/apis/v1/channels");
        assert_eq!(url.scheme, Scheme::Https);
        assert_eq!(url.host().unwrap(), "jiotvapi.media.jio.com");
        assert_eq!(url.port().unwrap(), 443);
        assert_eq!(url.path().unwrap(), "playback/apis/v1/channels");
    }

    #[test]
    fn parse_port_and_query() {
        let url = Url::from("http://localhost:8080?a=b");
        assert_eq!(url.scheme, Scheme::Http);
        assert_eq!(url.host().unwrap(), "localhost");
        assert_eq!(url.port().unwrap(), 8080);
        assert_eq!(url.path().unwrap(), "?a=b");
    }

    #[test]
    fn parse_bare_host() {
        let url = Url::from("https://example.invalid");
        assert_eq!(url.path().unwrap(), "");
        assert!(Url::from("ftp://example.invalid").port().is_err());
        assert!(Url::from("not a url").host().is_err());
    }
}
