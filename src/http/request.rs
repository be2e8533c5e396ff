use std::{
    fmt::Write as _,
    hash::{DefaultHasher, Hasher},
    io::{
        self, BufRead, BufReader,
        ErrorKind::{Other, UnexpectedEof},
        Read, Write,
    },
    mem,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    str,
    time::Duration,
};

use anyhow::{Context, Result, bail, ensure};
use log::{debug, error};

use super::{
    Agent, Header, Method, Scheme, StatusError, Url,
    decoder::{Decoder, ResponseHead},
    socks5,
    tls_stream::{TLS_MAX_FRAG_SIZE, TlsStream},
};

const MAX_HEADERS_SIZE: usize = 64 * 1024;

//Reuses one keep-alive connection per host across calls
pub struct TextRequest {
    stream: Option<BufReader<Transport>>,
    scheme: Scheme,
    hash: u64,

    body: String,
    agent: Agent,
}

impl TextRequest {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent,
            stream: Option::default(),
            scheme: Scheme::default(),
            hash: u64::default(),
            body: String::default(),
        }
    }

    pub fn take(&mut self) -> String {
        mem::take(&mut self.body)
    }

    pub fn text(&mut self, method: Method, url: &Url, headers: &[Header<'_>]) -> Result<&str> {
        self.call(method, url, headers, None)?;
        Ok(&self.body)
    }

    pub fn text_with_body(
        &mut self,
        method: Method,
        url: &Url,
        headers: &[Header<'_>],
        body: &str,
    ) -> Result<&str> {
        self.call(method, url, headers, Some(body))?;
        Ok(&self.body)
    }

    fn call(
        &mut self,
        method: Method,
        url: &Url,
        headers: &[Header<'_>],
        body: Option<&str>,
    ) -> Result<()> {
        let request = self.build(method, url, headers, body)?;

        //A POST is sent exactly once, over a fresh connection
        let replayable = method == Method::Get;
        let host = url.host()?;
        let hash = Self::hash_host(host);
        if !replayable || self.stream.is_none() || self.hash != hash || self.scheme != url.scheme
        {
            self.connect(url, host, hash)?;
        }

        let mut retries = 0;
        loop {
            self.body.clear();
            match self.converse(url, &request) {
                Ok(()) => return Ok(()),
                Err(e) if replayable && retries < self.agent.args.retries => {
                    match e.downcast_ref::<io::Error>() {
                        Some(i) if i.kind() == Other => return Err(e),
                        Some(_) => (),
                        _ => return Err(e),
                    }

                    //Stale keep-alive connections fail once, don't log that
                    if retries > 0 {
                        error!("http: {e}, retrying...");
                    } else {
                        debug!("got {e}");
                    }
                    retries += 1;

                    self.connect(url, host, hash)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn build(
        &self,
        method: Method,
        url: &Url,
        headers: &[Header<'_>],
        body: Option<&str>,
    ) -> Result<String> {
        let path = url.path()?;
        ensure!(
            !path.contains(['\r', '\n', ' ']),
            "Invalid request path: {path:?}"
        );

        let mut request = format!(
            "{method} /{path} HTTP/1.1\r\n\
             Host: {host}\r\n\
             User-Agent: {user_agent}\r\n\
             Accept: */*\r\n\
             Accept-Encoding: gzip\r\n\
             Connection: keep-alive\r\n",
            host = url.host()?,
            user_agent = &self.agent.args.user_agent,
        );

        for (name, value) in headers {
            ensure!(
                !value.contains(['\r', '\n']),
                "Invalid value for header {name}"
            );
            write!(request, "{name}: {value}\r\n")?;
        }

        if let Some(body) = body {
            write!(request, "Content-Length: {}\r\n\r\n{body}", body.len())?;
        } else {
            request.push_str("\r\n");
        }

        Ok(request)
    }

    fn converse(&mut self, url: &Url, request: &str) -> Result<()> {
        let stream = self.stream.as_mut().context("Missing stream")?;
        stream.get_mut().write_all(request.as_bytes())?;
        stream.get_mut().flush()?;

        let mut headers = Vec::new();
        loop {
            let read = stream.read_until(b'\n', &mut headers)?;
            if read == 0 {
                return Err(io::Error::from(UnexpectedEof).into());
            }

            if headers.ends_with(b"\r\n\r\n") {
                break;
            }

            if headers.len() >= MAX_HEADERS_SIZE {
                bail!("HTTP response headers too large");
            }
        }

        let headers = str::from_utf8(&headers)?;
        debug!("Response:\n{headers}");
        let head = headers.parse::<ResponseHead>()?;

        if !head.is_success() {
            //Body is left unread, the connection can't be reused
            self.stream = None;
            return Err(StatusError(head.code, url.clone()).into());
        }

        let mut decoder = Decoder::new(&mut *stream, &head);
        let mut body = Vec::new();
        decoder.read_to_end(&mut body)?;

        let reads_until_close = decoder.reads_until_close();
        drop(decoder);

        if head.close || reads_until_close {
            debug!("Server closed connection");
            self.stream = None;
        }

        self.body = String::from_utf8(body).context("Response body is not valid UTF-8")?;
        Ok(())
    }

    fn connect(&mut self, url: &Url, host: &str, hash: u64) -> Result<()> {
        debug!("Connecting to {host}...");

        self.stream = Some(BufReader::with_capacity(
            TLS_MAX_FRAG_SIZE,
            Transport::new(url, host, &self.agent)?,
        ));
        self.scheme = url.scheme;
        self.hash = hash;

        Ok(())
    }

    fn hash_host(host: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write(host.as_bytes());

        hasher.finish()
    }
}

enum Transport {
    Tls(Box<TlsStream>),
    Unencrypted(TcpStream),
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tls(stream) => stream.read(buf),
            Self::Unencrypted(sock) => sock.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        unreachable!();
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tls(stream) => stream.flush(),
            Self::Unencrypted(sock) => sock.flush(),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Self::Tls(stream) => stream.write_all(buf),
            Self::Unencrypted(sock) => sock.write_all(buf),
        }
    }
}

impl Transport {
    fn new(url: &Url, host: &str, agent: &Agent) -> Result<Self> {
        let args = &agent.args;
        if args.force_https {
            ensure!(
                url.scheme == Scheme::Https,
                "Refusing unencrypted request without --allow-http: {url}",
            );
        }

        let port = url.port()?;
        let sock = if let Some(proxy) = &args.socks5 {
            let addrs = proxy.to_socket_addrs()?;
            let sock = Self::try_connect(addrs, args.force_ipv4, args.timeout)?;
            Self::configure(&sock, args.timeout)?;

            socks5::connect(sock, host, port)?
        } else {
            let addrs = (host, port).to_socket_addrs()?;
            let sock = Self::try_connect(addrs, args.force_ipv4, args.timeout)?;
            Self::configure(&sock, args.timeout)?;

            sock
        };

        match url.scheme {
            Scheme::Http => Ok(Self::Unencrypted(sock)),
            Scheme::Https => Ok(Self::Tls(Box::new(TlsStream::new(
                sock,
                host,
                agent.tls_config.clone(),
            )?))),
            Scheme::Unknown => bail!("Unsupported protocol: {url}"),
        }
    }

    fn configure(sock: &TcpStream, timeout: Duration) -> io::Result<()> {
        sock.set_nodelay(true)?;
        sock.set_read_timeout(Some(timeout))?;
        sock.set_write_timeout(Some(timeout))
    }

    fn try_connect(
        addrs: impl Iterator<Item = SocketAddr>,
        force_ipv4: bool,
        timeout: Duration,
    ) -> Result<TcpStream> {
        let mut io_error = None;
        for addr in addrs.filter(|a| !force_ipv4 || a.is_ipv4()) {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(sock) => return Ok(sock),
                Err(e) => io_error = Some(e),
            }
        }

        match io_error {
            Some(e) => Err(e.into()),
            None => bail!("No usable address to connect to"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::TcpListener,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
    };

    use rustls::{ClientConfig, RootCertStore, crypto::ring};

    use super::*;
    use crate::http::Args;

    fn create_request(retries: u64) -> TextRequest {
        let tls_config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_root_certificates(RootCertStore::empty())
            .with_no_client_auth();

        TextRequest::new(Agent {
            args: Arc::new(Args {
                force_https: false,
                retries,
                timeout: Duration::from_secs(5),
                ..Args::default()
            }),
            tls_config: Arc::new(tls_config),
        })
    }

    //Reads each request head, then hangs up without answering
    fn hang_up_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::default());

        let counter = accepted.clone();
        thread::spawn(move || {
            for sock in listener.incoming() {
                let mut reader = BufReader::new(sock.unwrap());
                let mut head = Vec::new();
                while !head.ends_with(b"\r\n\r\n") {
                    if reader.read_until(b'\n', &mut head).unwrap_or(0) == 0 {
                        break;
                    }
                }

                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        (format!("http://{addr}/api"), accepted)
    }

    #[test]
    fn build_request() {
        let request = create_request(0);
        let url = "https://jiotvapi.media.jio.com/playback/apis/v1/playbackurl/144".into();

        let built = request
            .build(Method::Get, &url, &[("Authorization", "Bearer t")], None)
            .unwrap();
        assert!(built.starts_with(
            "GET /playback/apis/v1/playbackurl/144 HTTP/1.1\r\nHost: jiotvapi.media.jio.com\r\n"
        ));
        assert!(built.ends_with("Authorization: Bearer t\r\n\r\n"));

        let built = request
            .build(Method::Post, &url, &[], Some(r#"{"a":1}"#))
            .unwrap();
        assert!(built.ends_with("Content-Length: 7\r\n\r\n{\"a\":1}"));
    }

    #[test]
    fn build_rejects_injection() {
        let request = create_request(0);

        let url = "https://jiotvapi.media.jio.com/playbackurl/1 HTTP/1.1\r\nX-Injected: yes\r\n".into();
        assert!(request.build(Method::Get, &url, &[], None).is_err());

        let url = "https://jiotvapi.media.jio.com/playbackurl/1 2".into();
        assert!(request.build(Method::Get, &url, &[], None).is_err());

        let url = "https://jiotvapi.media.jio.com/channels".into();
        let headers = [("Authorization", "Bearer t\r\nX-Injected: yes")];
        assert!(request.build(Method::Get, &url, &headers, None).is_err());
    }

    #[test]
    fn get_is_retried() {
        let (url, accepted) = hang_up_server();
        let mut request = create_request(2);

        assert!(request.text(Method::Get, &url.into(), &[]).is_err());
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn post_is_sent_once() {
        let (url, accepted) = hang_up_server();
        let mut request = create_request(2);

        assert!(
            request
                .text_with_body(Method::Post, &url.into(), &[], r#"{"number":"+919876543210"}"#)
                .is_err()
        );
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }
}
