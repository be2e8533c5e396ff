use std::{
    io::{Read, Write},
    net::TcpStream,
};

use anyhow::{Context, Result, ensure};
use log::debug;

const VERSION: u8 = 0x05;
const METHOD_NO_AUTH: u8 = 0x00;
const CMD_CONNECT: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const RESERVED: u8 = 0x00;
const REPLY_SUCCEEDED: u8 = 0x00;

//Proxy resolves the target, so only domain addresses are sent
pub fn connect(mut sock: TcpStream, host: &str, port: u16) -> Result<TcpStream> {
    debug!("Connecting to {host}:{port} through SOCKS5 proxy");

    sock.write_all(&[VERSION, 1, METHOD_NO_AUTH])?;
    let mut greeting = [0u8; 2];
    sock.read_exact(&mut greeting)?;
    ensure!(
        greeting == [VERSION, METHOD_NO_AUTH],
        "SOCKS5 proxy refused unauthenticated access"
    );

    let host_len = u8::try_from(host.len()).context("Host name too long for SOCKS5")?;
    let mut request = Vec::with_capacity(7 + host.len());
    request.extend_from_slice(&[VERSION, CMD_CONNECT, RESERVED, ATYP_DOMAIN, host_len]);
    request.extend_from_slice(host.as_bytes());
    request.extend_from_slice(&port.to_be_bytes());
    sock.write_all(&request)?;

    //Only IPv4 bound addresses are handled
    let mut reply = [0u8; 10];
    sock.read_exact(&mut reply)?;
    ensure!(
        reply[0] == VERSION && reply[1] == REPLY_SUCCEEDED,
        "SOCKS5 connect to {host}:{port} failed: {:#04x}",
        reply[1]
    );

    Ok(sock)
}
