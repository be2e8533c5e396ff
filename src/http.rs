mod decoder;
mod request;
mod socks5;
mod tls_stream;
mod url;

pub use request::TextRequest;
pub use self::url::{Scheme, Url};

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
    time::Duration,
};

use anyhow::{Result, ensure};
use log::{debug, error};
use rustls::{ClientConfig, RootCertStore, crypto::ring};

use crate::{
    args::{Parse, Parser},
    constants,
};

pub type Header<'a> = (&'a str, &'a str);

#[derive(Debug)]
pub struct StatusError(pub u16, pub Url);

impl std::error::Error for StatusError {}

impl Display for StatusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Status code {} on {}", self.0, self.1)
    }
}

impl StatusError {
    pub fn code(error: &anyhow::Error) -> Option<u16> {
        error.downcast_ref::<Self>().map(|e| e.0)
    }

    pub fn is_unauthorized(error: &anyhow::Error) -> bool {
        Self::code(error) == Some(401)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Method {
    Get,
    Post,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Args {
    pub force_https: bool,
    pub force_ipv4: bool,
    pub retries: u64,
    pub timeout: Duration,
    pub user_agent: String,
    pub socks5: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            retries: 3,
            timeout: Duration::from_secs(30),
            user_agent: constants::USER_AGENT.to_owned(),
            force_https: true,
            force_ipv4: bool::default(),
            socks5: Option::default(),
        }
    }
}

impl Parse for Args {
    fn parse(&mut self, parser: &mut Parser) -> Result<()> {
        let mut allow_http = false;
        parser.parse_switch_cfg(&mut allow_http, "--allow-http", "allow-http")?;
        self.force_https = !allow_http;

        parser.parse_switch_cfg(&mut self.force_ipv4, "--force-ipv4", "force-ipv4")?;
        parser.parse_cfg(&mut self.retries, "--http-retries", "http-retries")?;
        parser.parse_fn_cfg(
            &mut self.timeout,
            "--http-timeout",
            "http-timeout",
            Self::parse_duration,
        )?;
        parser.parse_cfg(&mut self.user_agent, "--user-agent", "user-agent")?;
        parser.parse_opt_string_cfg(&mut self.socks5, "--socks5", "socks5")?;

        Ok(())
    }
}

impl Args {
    fn parse_duration(arg: &str) -> Result<Duration> {
        Ok(Duration::try_from_secs_f64(arg.parse()?)?)
    }
}

#[derive(Clone)]
pub struct Agent {
    args: Arc<Args>,
    tls_config: Arc<ClientConfig>,
}

impl Agent {
    pub fn new(args: &Args) -> Result<Self> {
        Ok(Self {
            args: Arc::new(args.to_owned()),
            tls_config: Self::tls_config()?,
        })
    }

    pub fn text(&self) -> TextRequest {
        TextRequest::new(self.clone())
    }

    fn tls_config() -> Result<Arc<ClientConfig>> {
        let native = rustls_native_certs::load_native_certs();
        for e in &native.errors {
            error!("Failed to load native certificate: {e}");
        }

        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        debug!("Loaded {added} native root certificates, ignored {ignored}");
        ensure!(added > 0, "No usable native root certificates found");

        let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Arc::new(config))
    }
}

//Seam between the service code and the network
pub trait Client {
    fn get(&mut self, url: &str, headers: &[Header<'_>]) -> Result<String>;
    fn post(&mut self, url: &str, headers: &[Header<'_>], body: &str) -> Result<String>;
}

impl Client for TextRequest {
    fn get(&mut self, url: &str, headers: &[Header<'_>]) -> Result<String> {
        debug!("GET {url}");
        self.text(Method::Get, &url.into(), headers)?;

        Ok(self.take())
    }

    fn post(&mut self, url: &str, headers: &[Header<'_>], body: &str) -> Result<String> {
        debug!("POST {url}");
        self.text_with_body(Method::Post, &url.into(), headers, body)?;

        Ok(self.take())
    }
}
