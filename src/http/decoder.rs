use std::{
    io::{self, Read, Take},
    str::FromStr,
};

use anyhow::{Context, Result};
use chunked_transfer::Decoder as ChunkDecoder;
use flate2::read::GzDecoder;
use log::debug;

#[derive(Default, Debug, PartialEq, Eq)]
pub struct ResponseHead {
    pub code: u16,
    pub content_length: Option<u64>,
    pub chunked: bool,
    pub gzipped: bool,
    pub close: bool,
}

impl FromStr for ResponseHead {
    type Err = anyhow::Error;

    fn from_str(headers: &str) -> Result<Self, Self::Err> {
        let mut lines = headers.lines();
        let code = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|c| c.parse().ok())
            .context("Failed to parse HTTP status code")?;

        let mut head = Self {
            code,
            ..Self::default()
        };

        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };

            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => head.content_length = value.parse().ok(),
                "transfer-encoding" => head.chunked = value.eq_ignore_ascii_case("chunked"),
                "content-encoding" => head.gzipped = value.eq_ignore_ascii_case("gzip"),
                "connection" => head.close = value.eq_ignore_ascii_case("close"),
                _ => (),
            }
        }

        Ok(head)
    }
}

impl ResponseHead {
    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }

    const fn has_body(&self) -> bool {
        !matches!(self.code, 100..=199 | 204 | 304)
    }
}

enum Encoding<R: Read> {
    Empty,
    Unencoded(Take<R>),
    UntilClose(R),
    Chunked(ChunkDecoder<R>),
    ChunkedGzip(GzDecoder<ChunkDecoder<R>>),
    Gzip(GzDecoder<Take<R>>),
    GzipUntilClose(GzDecoder<R>),
}

pub struct Decoder<R: Read> {
    kind: Encoding<R>,
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.kind {
            Encoding::Empty => Ok(0),
            Encoding::Unencoded(reader) => reader.read(buf),
            Encoding::UntilClose(reader) => reader.read(buf),
            Encoding::Chunked(reader) => reader.read(buf),
            Encoding::ChunkedGzip(reader) => {
                let consumed = reader.read(buf)?;
                if consumed == 0 {
                    //Gzip decoder doesn't consume trailing bytes in chunk decoder
                    io::copy(reader.get_mut(), &mut io::sink())?;
                }

                Ok(consumed)
            }
            Encoding::Gzip(reader) => reader.read(buf),
            Encoding::GzipUntilClose(reader) => reader.read(buf),
        }
    }
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R, head: &ResponseHead) -> Self {
        if !head.has_body() {
            debug!("Response has no body");
            return Self {
                kind: Encoding::Empty,
            };
        }

        let kind = match (head.chunked, head.gzipped, head.content_length) {
            (true, true, _) => {
                debug!("Body is chunked and gzipped");
                Encoding::ChunkedGzip(GzDecoder::new(ChunkDecoder::new(reader)))
            }
            (true, false, _) => {
                debug!("Body is chunked");
                Encoding::Chunked(ChunkDecoder::new(reader))
            }
            (false, true, Some(length)) => {
                debug!("Body is gzipped, length: {length}");
                Encoding::Gzip(GzDecoder::new(reader.take(length)))
            }
            (false, true, None) => {
                debug!("Body is gzipped, reading until close");
                Encoding::GzipUntilClose(GzDecoder::new(reader))
            }
            (false, false, Some(0)) => Encoding::Empty,
            (false, false, Some(length)) => {
                debug!("Content length: {length}");
                Encoding::Unencoded(reader.take(length))
            }
            (false, false, None) => {
                debug!("No content length, reading until close");
                Encoding::UntilClose(reader)
            }
        };

        Self { kind }
    }

    //The connection can't be reused after a body delimited by EOF
    pub const fn reads_until_close(&self) -> bool {
        matches!(
            self.kind,
            Encoding::UntilClose(_) | Encoding::GzipUntilClose(_)
        )
    }
}
