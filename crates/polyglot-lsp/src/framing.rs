//! Content-Length framing per the LSP base protocol.
use crate::error::LspError;
use crate::transport::Transport;

/// Largest body accepted from a server (64 MiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Frame a JSON-RPC body with its Content-Length header.
pub fn frame_message(body: &str) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut bytes = header.into_bytes();
    bytes.extend_from_slice(body.as_bytes());
    bytes
}

/// Parse the Content-Length value from a block of header lines.
pub fn parse_content_length(header: &str) -> Result<usize, LspError> {
    for line in header.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("Content-Length") {
            let value = value.trim();
            return value
                .parse::<usize>()
                .map_err(|_| LspError::Protocol(format!("invalid Content-Length: {}", value)));
        }
    }
    Err(LspError::Protocol("missing Content-Length header".into()))
}

/// Write one framed body.
pub async fn write_frame(transport: &Transport, body: &str) -> Result<(), LspError> {
    transport.write(&frame_message(body)).await
}

/// Read one framed body.
///
/// Returns `Ok(None)` when the stream ends cleanly between frames. A bad
/// header or a non-UTF-8 body is a `Protocol` error; the stream stays
/// positioned after the offending frame when its length was known. A
/// length over [`MAX_FRAME_SIZE`] is a `Transport` error since the body is
/// never read and the stream cannot resynchronize.
pub async fn read_frame(transport: &Transport) -> Result<Option<String>, LspError> {
    let mut header = String::new();
    loop {
        let mut line = String::new();
        if transport.read_line(&mut line).await? == 0 {
            if header.is_empty() {
                return Ok(None);
            }
            return Err(LspError::Transport("stream ended inside a frame header".into()));
        }
        if line.trim().is_empty() {
            if header.is_empty() {
                continue;
            }
            break;
        }
        header.push_str(&line);
    }

    let length = parse_content_length(&header)?;
    if length > MAX_FRAME_SIZE {
        return Err(LspError::Transport(format!(
            "frame of {} bytes exceeds the {} byte limit",
            length, MAX_FRAME_SIZE
        )));
    }
    let mut body = vec![0u8; length];
    transport.read_exact(&mut body).await?;
    String::from_utf8(body)
        .map(Some)
        .map_err(|e| LspError::Protocol(format!("frame body is not UTF-8: {}", e)))
}
