use std::io::{self, BufRead, Read, Write};

use serde_json::Value;

use super::jsonrpc::{json_rpc_error, INVALID_REQUEST, PARSE_ERROR};
use super::McpServer;
use crate::error::Result;

/// Largest `Content-Length` body accepted from a client
const MAX_CONTENT_LENGTH_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// One JSON message per line
    Lines,
    /// LSP-style `Content-Length` headers
    ContentLength,
}

/// One framed body, or the reason there is none
enum Frame {
    Body(Vec<u8>),
    TooLarge(usize),
    Eof,
}

/// Read requests from `reader` and write replies to `writer` until EOF.
///
/// Newline-delimited JSON is the default; a message that starts with a
/// `Content-Length` header is read and answered with the same framing.
/// Input that is not UTF-8, or a body over the size limit, gets an error
/// reply and the session continues.
pub fn serve<R, W>(server: &mut McpServer, mut reader: R, mut writer: W) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    loop {
        let mut raw = Vec::new();
        if reader.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(err) => {
                let reply = json_rpc_error(None, PARSE_ERROR, &format!("Parse error: {err}"));
                write_message(&mut writer, &reply, Framing::Lines)?;
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Some(length) = content_length(trimmed) else {
            if let Some(response) = server.handle_message(trimmed) {
                write_message(&mut writer, &response, Framing::Lines)?;
            }
            continue;
        };

        let reply = match read_framed(&mut reader, length)? {
            Frame::Eof => break,
            Frame::TooLarge(length) => {
                tracing::warn!(length, "rejected oversized mcp message");
                Some(json_rpc_error(
                    None,
                    INVALID_REQUEST,
                    &format!(
                        "Content-Length {length} exceeds the {MAX_CONTENT_LENGTH_BYTES} byte limit"
                    ),
                ))
            }
            Frame::Body(body) => match String::from_utf8(body) {
                Ok(payload) => server.handle_message(&payload),
                Err(err) => Some(json_rpc_error(
                    None,
                    PARSE_ERROR,
                    &format!("Parse error: {err}"),
                )),
            },
        };
        if let Some(reply) = reply {
            write_message(&mut writer, &reply, Framing::ContentLength)?;
        }
    }
    tracing::info!("mcp input closed");
    Ok(())
}

fn content_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

/// Skip the remaining headers, then read exactly `length` bytes of body.
///
/// An oversized body is drained without being buffered.
fn read_framed<R: BufRead>(reader: &mut R, length: usize) -> Result<Frame> {
    loop {
        let mut header = Vec::new();
        if reader.read_until(b'\n', &mut header)? == 0 {
            return Ok(Frame::Eof);
        }
        if header.iter().all(u8::is_ascii_whitespace) {
            break;
        }
    }

    if length > MAX_CONTENT_LENGTH_BYTES {
        let limit = u64::try_from(length).unwrap_or(u64::MAX);
        io::copy(&mut reader.by_ref().take(limit), &mut io::sink())?;
        return Ok(Frame::TooLarge(length));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    Ok(Frame::Body(body))
}

fn write_message<W: Write>(writer: &mut W, message: &Value, framing: Framing) -> Result<()> {
    let encoded = serde_json::to_string(message)?;
    match framing {
        Framing::Lines => writeln!(writer, "{encoded}")?,
        Framing::ContentLength => {
            write!(writer, "Content-Length: {}\r\n\r\n{encoded}", encoded.len())?
        }
    }
    writer.flush()?;
    Ok(())
}
