//! Minimal client for the TWS / IB Gateway socket API.
//!
//! Only what is needed to look up contract details is implemented: the
//! version handshake, `START_API`, `REQ_CONTRACT_DATA` and decoding of the
//! handful of messages that can come back.
//!
//! Framing: every message is a 4-byte big-endian length followed by a payload
//! of NUL-terminated ASCII fields.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::SourceError;

pub const MIN_CLIENT_VERSION: i32 = 100;
pub const MAX_CLIENT_VERSION: i32 = 176;

const MIN_SERVER_VER_MD_SIZE_MULTIPLIER: i32 = 110;
const MIN_SERVER_VER_SIZE_RULES: i32 = 164;
const MIN_SERVER_VER_BOND_ISSUERID: i32 = 176;

const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;
const API_PREFIX: &[u8] = b"API\0";

pub mod incoming {
    pub const ERR_MSG: i64 = 4;
    pub const NEXT_VALID_ID: i64 = 9;
    pub const CONTRACT_DATA: i64 = 10;
    pub const CONTRACT_DATA_END: i64 = 52;
}

pub mod outgoing {
    pub const REQ_CONTRACT_DATA: i64 = 9;
    pub const START_API: i64 = 71;
}

/// Contract identity used for a details lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSpec {
    pub symbol: String,
    pub sec_type: String,
    pub exchange: String,
    pub currency: String,
}

impl ContractSpec {
    pub fn stock(symbol: &str, exchange: &str, currency: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            sec_type: "STK".to_string(),
            exchange: exchange.to_string(),
            currency: currency.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    NextValidId(i64),
    ContractData { req_id: i64, long_name: String },
    ContractDataEnd { req_id: i64 },
    Error { req_id: i64, code: i64, message: String },
    Other(i64),
}

pub fn encode_fields<S: AsRef<str>>(fields: &[S]) -> Vec<u8> {
    let mut payload = Vec::new();
    for field in fields {
        payload.extend_from_slice(field.as_ref().as_bytes());
        payload.push(0);
    }
    payload
}

pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 4);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// `API\0` followed by the framed supported version range.
pub fn handshake_bytes() -> Vec<u8> {
    let versions = format!("v{}..{}", MIN_CLIENT_VERSION, MAX_CLIENT_VERSION);
    let mut buf = API_PREFIX.to_vec();
    buf.extend_from_slice(&frame(versions.as_bytes()));
    buf
}

pub fn decode_fields(payload: &[u8]) -> Vec<String> {
    let body = payload.strip_suffix(&[0u8]).unwrap_or(payload);
    if body.is_empty() {
        return Vec::new();
    }
    body.split(|b| *b == 0)
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect()
}

pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, SourceError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(SourceError::malformed(format!("frame of {} bytes", len)));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

pub async fn write_message<W, S>(writer: &mut W, fields: &[S]) -> Result<(), SourceError>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    writer.write_all(&frame(&encode_fields(fields))).await?;
    writer.flush().await?;
    Ok(())
}

struct FieldReader<'a> {
    fields: &'a [String],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a [String]) -> Self {
        Self { fields, pos: 0 }
    }

    fn next_str(&mut self) -> Result<&'a str, SourceError> {
        let field = self
            .fields
            .get(self.pos)
            .ok_or_else(|| SourceError::malformed(format!("message truncated at field {}", self.pos)))?;
        self.pos += 1;
        Ok(field.as_str())
    }

    fn next_int(&mut self) -> Result<i64, SourceError> {
        let raw = self.next_str()?;
        if raw.is_empty() {
            return Ok(0);
        }
        raw.parse()
            .map_err(|_| SourceError::malformed(format!("expected integer, got '{}'", raw)))
    }

    fn skip(&mut self, count: usize) -> Result<(), SourceError> {
        for _ in 0..count {
            self.next_str()?;
        }
        Ok(())
    }
}

pub fn parse_message(fields: &[String], server_version: i32) -> Result<IncomingMessage, SourceError> {
    let mut reader = FieldReader::new(fields);
    let msg_id = reader.next_int()?;

    match msg_id {
        incoming::NEXT_VALID_ID => {
            reader.skip(1)?;
            Ok(IncomingMessage::NextValidId(reader.next_int()?))
        }
        incoming::ERR_MSG => {
            reader.skip(1)?;
            let req_id = reader.next_int()?;
            let code = reader.next_int()?;
            let message = reader.next_str()?.to_string();
            Ok(IncomingMessage::Error {
                req_id,
                code,
                message,
            })
        }
        incoming::CONTRACT_DATA => parse_contract_data(&mut reader, server_version),
        incoming::CONTRACT_DATA_END => {
            reader.skip(1)?;
            Ok(IncomingMessage::ContractDataEnd {
                req_id: reader.next_int()?,
            })
        }
        other => Ok(IncomingMessage::Other(other)),
    }
}

fn parse_contract_data(
    reader: &mut FieldReader<'_>,
    server_version: i32,
) -> Result<IncomingMessage, SourceError> {
    let version = if server_version < MIN_SERVER_VER_SIZE_RULES {
        reader.next_int()?
    } else {
        8
    };
    let req_id = if version >= 3 { reader.next_int()? } else { -1 };

    // symbol .. minTick
    reader.skip(12)?;
    if (MIN_SERVER_VER_MD_SIZE_MULTIPLIER..MIN_SERVER_VER_SIZE_RULES).contains(&server_version) {
        reader.skip(1)?;
    }
    // multiplier, orderTypes, validExchanges, priceMagnifier
    reader.skip(4)?;
    if version >= 4 {
        reader.skip(1)?;
    }
    let long_name = if version >= 5 {
        reader.next_str()?.to_string()
    } else {
        String::new()
    };

    Ok(IncomingMessage::ContractData { req_id, long_name })
}

pub fn contract_details_request(req_id: i64, contract: &ContractSpec, server_version: i32) -> Vec<String> {
    let mut fields = vec![
        outgoing::REQ_CONTRACT_DATA.to_string(),
        "8".to_string(),
        req_id.to_string(),
        "0".to_string(),
        contract.symbol.clone(),
        contract.sec_type.clone(),
        String::new(),
        "0.0".to_string(),
        String::new(),
        String::new(),
        contract.exchange.clone(),
        String::new(),
        contract.currency.clone(),
        String::new(),
        String::new(),
        "0".to_string(),
        String::new(),
        String::new(),
    ];
    if server_version >= MIN_SERVER_VER_BOND_ISSUERID {
        fields.push(String::new());
    }
    fields
}

/// A live API session. Call [`TwsSession::disconnect`] when done.
pub struct TwsSession {
    stream: TcpStream,
    server_version: i32,
    request_timeout: Duration,
    next_req_id: i64,
}

impl TwsSession {
    pub async fn connect(
        host: &str,
        port: u16,
        client_id: i32,
        request_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let stream = timeout(request_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| SourceError::timeout(format!("connecting to {}:{}", host, port)))?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::ConnectionRefused => SourceError::ConnectionRefused {
                    host: host.to_string(),
                    port,
                },
                _ => SourceError::Io(e),
            })?;

        let mut session = Self {
            stream,
            server_version: 0,
            request_timeout,
            next_req_id: 1,
        };

        let started = timeout(request_timeout, session.start(client_id)).await;
        match started {
            Ok(Ok(())) => Ok(session),
            Ok(Err(e)) => {
                session.disconnect().await;
                Err(e)
            }
            Err(_) => {
                session.disconnect().await;
                Err(SourceError::timeout("waiting for the API handshake"))
            }
        }
    }

    pub fn server_version(&self) -> i32 {
        self.server_version
    }

    async fn start(&mut self, client_id: i32) -> Result<(), SourceError> {
        self.stream.write_all(&handshake_bytes()).await?;
        self.stream.flush().await?;

        let reply = decode_fields(&read_frame(&mut self.stream).await?);
        let version_field = reply
            .first()
            .ok_or_else(|| SourceError::malformed("empty handshake reply"))?;
        self.server_version = version_field
            .parse()
            .map_err(|_| SourceError::malformed(format!("bad server version '{}'", version_field)))?;
        debug!(
            "TWS server version {} (connection time {})",
            self.server_version,
            reply.get(1).map(String::as_str).unwrap_or("")
        );

        let client_id = client_id.to_string();
        let start_api = [outgoing::START_API.to_string(), "2".to_string(), client_id, String::new()];
        write_message(&mut self.stream, &start_api).await?;

        loop {
            match self.read_message().await? {
                IncomingMessage::NextValidId(id) => {
                    debug!("API session started, next valid order id {}", id);
                    return Ok(());
                }
                IncomingMessage::Error { code, message, .. } => {
                    debug!("TWS notice {} during startup: {}", code, message);
                }
                _ => {}
            }
        }
    }

    async fn read_message(&mut self) -> Result<IncomingMessage, SourceError> {
        let fields = decode_fields(&read_frame(&mut self.stream).await?);
        parse_message(&fields, self.server_version)
    }

    /// Long name of the first contract matching `contract`.
    pub async fn request_long_name(&mut self, contract: &ContractSpec) -> Result<String, SourceError> {
        let req_id = self.next_req_id;
        self.next_req_id += 1;

        let request = contract_details_request(req_id, contract, self.server_version);
        write_message(&mut self.stream, &request).await?;

        timeout(self.request_timeout, self.await_long_name(req_id, contract))
            .await
            .map_err(|_| SourceError::timeout(format!("waiting for {} contract details", contract.symbol)))?
    }

    async fn await_long_name(&mut self, req_id: i64, contract: &ContractSpec) -> Result<String, SourceError> {
        loop {
            match self.read_message().await? {
                IncomingMessage::ContractData { req_id: id, long_name } if id == req_id => {
                    return Ok(long_name);
                }
                IncomingMessage::ContractDataEnd { req_id: id } if id == req_id => {
                    return Err(SourceError::not_found(format!(
                        "no contract details for {}",
                        contract.symbol
                    )));
                }
                IncomingMessage::Error { req_id: id, code, message } if id == req_id => {
                    return Err(SourceError::provider_error(format!("{}: {}", code, message)));
                }
                IncomingMessage::Error { code, message, .. } => {
                    warn!("TWS notice {}: {}", code, message);
                }
                _ => {}
            }
        }
    }

    pub async fn disconnect(mut self) {
        info!("Disconnecting IBKR session");
        if let Err(e) = self.stream.shutdown().await {
            debug!("Socket shutdown failed: {}", e);
        }
    }
}
