use std::{
    io::{
        self,
        ErrorKind::{ConnectionReset, InvalidData, OutOfMemory, UnexpectedEof},
        Read, Write,
    },
    net::TcpStream,
    sync::Arc,
};

use anyhow::{Context, Result};
use log::debug;
use rustls::{
    ClientConfig,
    client::{ClientConnectionData, UnbufferedClientConnection},
    pki_types::ServerName,
    unbuffered::{ConnectionState, EncodeTlsData, UnbufferedStatus, WriteTraffic},
};

const OVERHEAD: usize = 22;
pub const TLS_MAX_FRAG_SIZE: usize = 16384 + OVERHEAD;

//Plaintext per record, leaves room for the record overhead in the send buffer
const MAX_PLAINTEXT_CHUNK: usize = 4096;
const SEND_BUFFER_SIZE: usize = 8192;

#[derive(Clone, Copy)]
enum Goal<'a> {
    Send(&'a [u8]),
    Receive,
}

//Blocking TLS over one socket, driven by the unbuffered rustls state machine
pub struct TlsStream {
    conn: UnbufferedClientConnection,
    sock: TcpStream,

    received: Buffer,
    pending: Buffer,
    plaintext: Vec<u8>,

    closed: bool,
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.plaintext.is_empty() && !self.closed {
            self.drive(Goal::Receive)?;
        }

        let len = buf.len().min(self.plaintext.len());
        buf[..len].copy_from_slice(&self.plaintext[..len]);
        self.plaintext.drain(..len);

        Ok(len)
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }

    //Records are written to the socket as soon as they are encrypted
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        if buf.is_empty() {
            return Ok(());
        }

        self.drive(Goal::Send(buf))
    }
}

impl TlsStream {
    pub fn new(sock: TcpStream, host: &str, config: Arc<ClientConfig>) -> Result<Self> {
        let server_name = ServerName::try_from(host.to_owned())
            .with_context(|| format!("Invalid TLS server name: {host}"))?;

        debug!("Starting TLS handshake with {host}");
        Ok(Self {
            conn: UnbufferedClientConnection::new(config, server_name)?,
            sock,
            received: Buffer::new(TLS_MAX_FRAG_SIZE),
            pending: Buffer::new(SEND_BUFFER_SIZE),
            plaintext: Vec::with_capacity(TLS_MAX_FRAG_SIZE),
            closed: bool::default(),
        })
    }

    //Runs the handshake as far as needed, returns once the goal is met
    fn drive(&mut self, goal: Goal<'_>) -> io::Result<()> {
        loop {
            let UnbufferedStatus { mut discard, state } =
                self.conn.process_tls_records(self.received.filled_mut());

            let done = match state.map_err(|e| io::Error::new(InvalidData, e))? {
                ConnectionState::ReadTraffic(mut traffic) => {
                    while let Some(record) = traffic.next_record() {
                        let record = record.map_err(|e| io::Error::new(InvalidData, e))?;
                        self.plaintext.extend_from_slice(record.payload);
                        discard += record.discard;
                    }

                    matches!(goal, Goal::Receive) && !self.plaintext.is_empty()
                }
                ConnectionState::WriteTraffic(may_encrypt) => match goal {
                    Goal::Send(data) => {
                        send_encrypted(&mut self.pending, &mut self.sock, may_encrypt, data)?;
                        true
                    }
                    //Some servers drop the socket without a close_notify
                    Goal::Receive => {
                        let eof = !self.received.fill_from(&mut self.sock)?;
                        self.closed = eof;
                        eof
                    }
                },
                ConnectionState::TransmitTlsData(mut transmit) => {
                    //Application data may ride along with the end of the handshake
                    let mut sent = false;
                    if let (Goal::Send(data), Some(may_encrypt)) =
                        (&goal, transmit.may_encrypt_app_data())
                    {
                        send_encrypted(&mut self.pending, &mut self.sock, may_encrypt, data)?;
                        sent = true;
                    }

                    self.pending.flush_to(&mut self.sock)?;
                    transmit.done();

                    sent
                }
                ConnectionState::EncodeTlsData(encode) => {
                    self.pending.encode(encode)?;
                    false
                }
                ConnectionState::BlockedHandshake => {
                    if !self.received.fill_from(&mut self.sock)? {
                        return Err(io::Error::from(UnexpectedEof));
                    }

                    false
                }
                ConnectionState::Closed => {
                    debug!("TLS connection closed by peer");
                    if matches!(goal, Goal::Send(_)) {
                        return Err(io::Error::from(ConnectionReset));
                    }

                    self.closed = true;
                    true
                }
                _ => return Err(io::Error::other("Unexpected TLS connection state")),
            };

            if discard != 0 {
                self.received.discard(discard);
            }

            if done {
                return Ok(());
            }
        }
    }
}

fn send_encrypted(
    pending: &mut Buffer,
    sock: &mut TcpStream,
    mut may_encrypt: WriteTraffic<'_, ClientConnectionData>,
    data: &[u8],
) -> io::Result<()> {
    for chunk in data.chunks(MAX_PLAINTEXT_CHUNK) {
        let written = may_encrypt
            .encrypt(chunk, pending.spare_mut())
            .map_err(|e| io::Error::new(OutOfMemory, e))?;

        pending.filled += written;
        pending.flush_to(sock)?;
    }

    Ok(())
}

struct Buffer {
    bytes: Box<[u8]>,
    filled: usize,
}

impl Buffer {
    fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size].into_boxed_slice(),
            filled: usize::default(),
        }
    }

    fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[self.filled..]
    }

    fn filled_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.filled]
    }

    fn flush_to(&mut self, sock: &mut TcpStream) -> io::Result<()> {
        if self.filled > 0 {
            sock.write_all(&self.bytes[..self.filled])?;
            self.filled = 0;
        }

        Ok(())
    }

    //False once the peer has closed the socket
    fn fill_from(&mut self, sock: &mut TcpStream) -> io::Result<bool> {
        if self.filled == self.bytes.len() {
            return Err(io::Error::from(OutOfMemory));
        }

        let read = sock.read(self.spare_mut())?;
        self.filled += read;

        Ok(read > 0)
    }

    fn encode(&mut self, mut encode: EncodeTlsData<'_, ClientConnectionData>) -> io::Result<()> {
        self.filled += encode
            .encode(self.spare_mut())
            .map_err(|e| io::Error::new(OutOfMemory, e))?;

        Ok(())
    }

    fn discard(&mut self, size: usize) {
        self.bytes.copy_within(size..self.filled, 0);
        self.filled -= size;
    }
}
