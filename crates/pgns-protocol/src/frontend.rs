use crate::messages::{
    FrontendMessage, StartupRequest, CANCEL_REQUEST_CODE, GSSENC_REQUEST_CODE, MAX_MESSAGE_LEN, MAX_STARTUP_LEN,
    PROTOCOL_VERSION_3, SSL_REQUEST_CODE,
};
use pgns_core::{ProxyError, StartupParameters};
use std::collections::HashMap;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads the untagged first packet of a connection: a 4-byte length that
/// counts itself, then the protocol version and the parameter block.
pub async fn read_startup<S: AsyncRead + Unpin>(stream: &mut S) -> Result<StartupRequest, ProxyError> {
    let len = stream.read_u32().await? as usize;
    if !(8..=MAX_STARTUP_LEN).contains(&len) {
        return Err(ProxyError::Protocol(format!(
            "invalid startup packet length: {len}"
        )));
    }
    let mut buf = vec![0u8; len - 4];
    stream.read_exact(&mut buf).await?;
    let version = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let request = match version {
        PROTOCOL_VERSION_3 => StartupRequest::Startup {
            params: parse_params(&buf[4..]),
        },
        CANCEL_REQUEST_CODE if buf.len() >= 12 => StartupRequest::CancelRequest {
            pid: i32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            secret: i32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
        },
        CANCEL_REQUEST_CODE => {
            return Err(ProxyError::Protocol("truncated cancel request".into()));
        }
        SSL_REQUEST_CODE => StartupRequest::SslRequest,
        GSSENC_REQUEST_CODE => StartupRequest::GssEncRequest,
        version => StartupRequest::UnsupportedVersion { version },
    };
    Ok(request)
}

/// Reads the client's answer to a cleartext password request. Any tag other
/// than `p` fails before the rest of the message is consumed.
pub async fn read_password<S: AsyncRead + Unpin>(stream: &mut S) -> Result<String, ProxyError> {
    let tag = stream.read_u8().await?;
    if tag != b'p' {
        return Err(ProxyError::Protocol(format!(
            "expected password message, got {:?}",
            tag as char
        )));
    }
    let body = read_body(stream).await?;
    let password = body.strip_suffix(&[0]).unwrap_or(&body);
    Ok(String::from_utf8_lossy(password).into_owned())
}

/// Reads one tagged frontend message. EOF before the tag byte counts as
/// a terminate request.
pub async fn read_message<S: AsyncRead + Unpin>(stream: &mut S) -> Result<FrontendMessage, ProxyError> {
    let msg_type = match stream.read_u8().await {
        Ok(v) => v,
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(FrontendMessage::Terminate),
        Err(err) => return Err(err.into()),
    };
    let buf = read_body(stream).await?;
    match msg_type {
        b'Q' => {
            let sql = read_cstring(&buf);
            Ok(FrontendMessage::Query { sql })
        }
        b'p' => {
            let password = read_cstring(&buf);
            Ok(FrontendMessage::Password { password })
        }
        b'X' => Ok(FrontendMessage::Terminate),
        other => Ok(FrontendMessage::Unsupported { code: other }),
    }
}

async fn read_body<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Vec<u8>, ProxyError> {
    let len = stream.read_u32().await? as usize;
    if !(4..=MAX_MESSAGE_LEN).contains(&len) {
        return Err(ProxyError::Protocol(format!("invalid message length: {len}")));
    }
    let mut buf = vec![0u8; len - 4];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Decodes the key/value block of a startup message. Stops at the empty-key
/// terminator or at the first string that is not NUL-terminated, so a
/// truncated packet yields whatever complete pairs preceded the cut.
pub fn parse_params(buf: &[u8]) -> StartupParameters {
    let mut params = HashMap::new();
    let mut rest = buf;
    while rest.first().is_some_and(|b| *b != 0) {
        let Some((key, after_key)) = split_cstring(rest) else {
            break;
        };
        let Some((value, after_value)) = split_cstring(after_key) else {
            break;
        };
        params.insert(
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value).into_owned(),
        );
        rest = after_value;
    }
    StartupParameters::from(params)
}

fn split_cstring(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let end = buf.iter().position(|b| *b == 0)?;
    Some((&buf[..end], &buf[end + 1..]))
}

fn read_cstring(buf: &[u8]) -> String {
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).to_string()
}
