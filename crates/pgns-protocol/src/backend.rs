use crate::messages::BackendMessage;
use bytes::{BufMut, BytesMut};
use pgns_core::ProxyError;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Text type OID; every column is described as text since rows travel as text.
const TEXT_OID: i32 = 25;

pub async fn write_message<S: AsyncWrite + Unpin>(
    stream: &mut S,
    msg: BackendMessage,
) -> Result<(), ProxyError> {
    let buf = encode_message(msg);
    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

pub fn encode_message(msg: BackendMessage) -> BytesMut {
    let mut buf = BytesMut::new();
    match msg {
        BackendMessage::EncryptionRefused => {
            buf.put_u8(b'N');
        }
        BackendMessage::AuthenticationOk => {
            buf.put_u8(b'R');
            buf.put_i32(8);
            buf.put_i32(0);
        }
        BackendMessage::AuthenticationCleartextPassword => {
            buf.put_u8(b'R');
            buf.put_i32(8);
            buf.put_i32(3);
        }
        BackendMessage::ParameterStatus { key, value } => {
            let mut payload = BytesMut::new();
            put_cstring(&mut payload, &key);
            put_cstring(&mut payload, &value);
            put_framed(&mut buf, b'S', &payload);
        }
        BackendMessage::ReadyForQuery { status } => {
            buf.put_u8(b'Z');
            buf.put_i32(5);
            buf.put_u8(status.wire_byte());
        }
        BackendMessage::RowDescription { fields } => {
            let mut payload = BytesMut::new();
            payload.put_i16(fields.len() as i16);
            for field in fields {
                put_cstring(&mut payload, &field);
                payload.put_i32(0);
                payload.put_i16(0);
                payload.put_i32(TEXT_OID);
                payload.put_i16(-1);
                payload.put_i32(-1);
                payload.put_i16(0);
            }
            put_framed(&mut buf, b'T', &payload);
        }
        BackendMessage::DataRow { values } => {
            let mut payload = BytesMut::new();
            payload.put_i16(values.len() as i16);
            for value in values {
                match value {
                    Some(v) => {
                        payload.put_i32(v.len() as i32);
                        payload.extend_from_slice(&v);
                    }
                    None => payload.put_i32(-1),
                }
            }
            put_framed(&mut buf, b'D', &payload);
        }
        BackendMessage::CommandComplete { tag } => {
            let mut payload = BytesMut::new();
            put_cstring(&mut payload, &tag);
            put_framed(&mut buf, b'C', &payload);
        }
        BackendMessage::EmptyQueryResponse => {
            buf.put_u8(b'I');
            buf.put_i32(4);
        }
        BackendMessage::ErrorResponse {
            severity,
            code,
            message,
        } => {
            let mut payload = BytesMut::new();
            payload.put_u8(b'S');
            put_cstring(&mut payload, &severity);
            payload.put_u8(b'V');
            put_cstring(&mut payload, &severity);
            payload.put_u8(b'C');
            put_cstring(&mut payload, &code);
            payload.put_u8(b'M');
            put_cstring(&mut payload, &message);
            payload.put_u8(0);
            put_framed(&mut buf, b'E', &payload);
        }
    }
    buf
}

fn put_framed(buf: &mut BytesMut, tag: u8, payload: &[u8]) {
    buf.put_u8(tag);
    buf.put_i32((payload.len() + 4) as i32);
    buf.extend_from_slice(payload);
}

fn put_cstring(buf: &mut BytesMut, value: &str) {
    buf.extend_from_slice(value.as_bytes());
    buf.put_u8(0);
}
