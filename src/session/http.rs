//! Just enough blocking HTTP/1.1 to serve one form: a request per connection,
//! `Content-Length` bodies only, capped header and body sizes.

use std::io::{ErrorKind, Read, Write};

const MAX_HEADER_SIZE: usize = 32 * 1024;
const MAX_BODY_SIZE: usize = 1024 * 1024;

#[derive(Debug)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        _ => "Unknown",
    }
}

/// Read one request. `Ok(None)` means the peer closed, or hit the stream's
/// read timeout, without sending anything.
pub fn read_request(stream: &mut impl Read) -> Result<Option<Request>, String> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = match stream.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if is_timeout(&e) && buf.is_empty() => return Ok(None),
            Err(e) => return Err(format!("read error: {e}")),
        };
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err("connection closed mid-request".into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > MAX_HEADER_SIZE {
            return Err("headers too large".into());
        }
    };

    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut parsed = httparse::Request::new(&mut headers);
    match parsed.parse(&buf[..header_end]) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => return Err("incomplete request".into()),
        Err(e) => return Err(format!("malformed request: {e}")),
    }

    let method = parsed.method.unwrap_or_default().to_string();
    let path = parsed.path.unwrap_or("/").to_string();

    let mut content_length = 0usize;
    for header in parsed.headers.iter() {
        if header.name.eq_ignore_ascii_case("Transfer-Encoding") {
            return Err("chunked bodies are not supported".into());
        }
        if header.name.eq_ignore_ascii_case("Content-Length") {
            content_length = std::str::from_utf8(header.value)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .ok_or("invalid Content-Length")?;
        }
    }
    if content_length > MAX_BODY_SIZE {
        return Err("request body too large".into());
    }

    let mut body = buf[header_end..].to_vec();
    body.truncate(content_length);
    if body.len() < content_length {
        let missing = (content_length - body.len()) as u64;
        stream
            .take(missing)
            .read_to_end(&mut body)
            .map_err(|e| format!("read error: {e}"))?;
        if body.len() < content_length {
            return Err("connection closed mid-body".into());
        }
    }

    Ok(Some(Request { method, path, body }))
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

/// Write a response and close the exchange. Errors mean the client went away
/// and are ignored.
pub fn write_response(stream: &mut impl Write, response: &Response) {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        response.status,
        reason(response.status),
        response.content_type,
        response.body.len()
    );
    let _ = stream
        .write_all(head.as_bytes())
        .and_then(|_| stream.write_all(&response.body))
        .and_then(|_| stream.flush());
}
