//! HTTP client support
//!
//! One-shot blocking request over an already-connected stream. The request
//! context owns an exclusive borrow of the caller's receive buffer, so a
//! second outstanding request over the same buffer does not compile.

use core::cmp;

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use ::log::*;

use uncased::UncasedStr;

pub use embedded_svc::http::Method;

use crate::errors::{ErrorCode, NetError};

/// Limit on the response head (status line plus headers).
const MAX_HEAD_LEN: usize = 8 * 1024;

/// Delivery phase of a response handler invocation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Delivery {
    /// The receive buffer filled up and more body is expected.
    Partial,
    /// The body is complete; this is the last invocation.
    Final,
}

/// A single HTTP request over an already-connected stream.
pub struct Request<'a> {
    pub method: Method,
    pub path: &'a str,
    pub host: &'a str,
    pub protocol: &'a str,
    pub timeout: Duration,
    pub recv_buf: &'a mut [u8],
}

/// Response state handed to the response handler.
pub struct Response<'a> {
    /// The full status line, e.g. `HTTP/1.1 200 OK`.
    pub status_line: &'a str,
    /// The receive-buffer window delivered with this invocation.
    pub data: &'a [u8],
    /// Body bytes delivered so far, this window included.
    pub received: usize,
}

impl Response<'_> {
    /// Numeric status code parsed out of the status line.
    pub fn status(&self) -> Option<u16> {
        self.status_line.split_whitespace().nth(1)?.parse().ok()
    }
}

/// The stream a request is issued over.
pub trait ClientStream: Read + Write {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), NetError>;
}

impl ClientStream for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), NetError> {
        TcpStream::set_read_timeout(self, timeout).map_err(Into::into)
    }
}

fn method_name(method: Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Head => "HEAD",
        Method::Post => "POST",
        Method::Put => "PUT",
        Method::Delete => "DELETE",
        method => panic!("Method {:?} is not supported", method),
    }
}

fn find_head_end(head: &[u8]) -> Option<usize> {
    head.windows(4).position(|window| window == b"\r\n\r\n")
}

/// Submits one request and drives the response through `handler`.
///
/// The handler is invoked with [`Delivery::Partial`] each time the receive
/// buffer fills with more body still expected, and exactly once with
/// [`Delivery::Final`] when the body is complete, zero-length bodies
/// included. A `Content-Length` header bounds the body; without one the body
/// runs until the peer closes the stream. The stream's read timeout is set
/// from the request for the whole exchange. Returns the total body byte
/// count.
pub fn request<S, F>(stream: &mut S, req: Request<'_>, mut handler: F) -> Result<usize, NetError>
where
    S: ClientStream,
    F: FnMut(&Response<'_>, Delivery),
{
    let Request {
        method,
        path,
        host,
        protocol,
        timeout,
        recv_buf,
    } = req;

    if recv_buf.is_empty() {
        return Err(ErrorCode::InvalidArg.into());
    }

    stream.set_read_timeout(Some(timeout))?;

    debug!("{} {} {}", method_name(method), path, protocol);

    let head_out = format!(
        "{} {} {}\r\nHost: {}\r\nConnection: close\r\n\r\n",
        method_name(method),
        path,
        protocol,
        host
    );
    stream.write_all(head_out.as_bytes())?;
    stream.flush()?;

    // Response head: read until the blank line; whatever follows it is body.
    let mut head = Vec::new();
    let mut scratch = [0u8; 512];
    let (head_len, stash) = loop {
        if let Some(end) = find_head_end(&head) {
            let stash = head.split_off(end + 4);
            break (end, stash);
        }

        if head.len() > MAX_HEAD_LEN {
            return Err(ErrorCode::BadMessage.into());
        }

        let n = stream.read(&mut scratch)?;
        if n == 0 {
            return Err(ErrorCode::ConnReset.into());
        }
        head.extend_from_slice(&scratch[..n]);
    };

    let head_text = core::str::from_utf8(&head[..head_len])
        .map_err(|_| NetError::from(ErrorCode::BadMessage))?;
    let mut lines = head_text.split("\r\n");

    let status_line = lines.next().unwrap_or_default();
    if !status_line.starts_with("HTTP/") {
        return Err(ErrorCode::BadMessage.into());
    }

    let mut content_length = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if UncasedStr::new(name.trim()) == UncasedStr::new("Content-Length") {
                content_length = value.trim().parse::<usize>().ok();
            }
        }
    }

    debug!("Response head received: {}", status_line);

    let mut total = 0;
    let mut filled = 0;
    let mut stash_pos = 0;
    let mut complete = false;

    while !complete {
        // Fill the receive buffer as far as the body allows.
        loop {
            if let Some(length) = content_length {
                if total + filled == length {
                    complete = true;
                    break;
                }
            }

            if filled == recv_buf.len() {
                break;
            }

            let want = match content_length {
                Some(length) => cmp::min(recv_buf.len() - filled, length - total - filled),
                None => recv_buf.len() - filled,
            };

            let n = if stash_pos < stash.len() {
                let take = cmp::min(want, stash.len() - stash_pos);
                recv_buf[filled..filled + take].copy_from_slice(&stash[stash_pos..stash_pos + take]);
                stash_pos += take;
                take
            } else {
                stream.read(&mut recv_buf[filled..filled + want])?
            };

            if n == 0 {
                if let Some(length) = content_length {
                    warn!(
                        "Connection closed {} bytes short of Content-Length",
                        length - total - filled
                    );
                }
                complete = true;
                break;
            }

            filled += n;
        }

        total += filled;

        if !complete {
            handler(
                &Response {
                    status_line,
                    data: &recv_buf[..filled],
                    received: total,
                },
                Delivery::Partial,
            );
            filled = 0;
        }
    }

    handler(
        &Response {
            status_line,
            data: &recv_buf[..filled],
            received: total,
        },
        Delivery::Final,
    );

    Ok(total)
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    /// A canned-response stream for driving the client without a socket.
    struct StaticStream {
        input: io::Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl StaticStream {
        fn new(response: &[u8]) -> Self {
            Self {
                input: io::Cursor::new(response.to_vec()),
                output: Vec::new(),
            }
        }
    }

    impl Read for StaticStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for StaticStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ClientStream for StaticStream {
        fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> Result<(), NetError> {
            Ok(())
        }
    }

    fn get(stream: &mut StaticStream, recv_buf: &mut [u8]) -> Vec<(Delivery, usize, usize)> {
        let mut calls = Vec::new();

        request(
            stream,
            Request {
                method: Method::Get,
                path: "/",
                host: "192.0.2.1",
                protocol: "HTTP/1.1",
                timeout: Duration::from_secs(1),
                recv_buf,
            },
            |response, delivery| {
                calls.push((delivery, response.received, response.data.len()));
            },
        )
        .unwrap();

        calls
    }

    #[test]
    fn request_line_and_headers_are_sent() {
        let mut stream = StaticStream::new(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
        let mut recv_buf = [0u8; 32];

        get(&mut stream, &mut recv_buf);

        assert_eq!(
            stream.output,
            b"GET / HTTP/1.1\r\nHost: 192.0.2.1\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn body_matching_the_buffer_exactly_is_one_final_call() {
        let mut response = b"HTTP/1.1 200 OK\r\nContent-Length: 32\r\n\r\n".to_vec();
        response.extend_from_slice(&[b'a'; 32]);

        let mut stream = StaticStream::new(&response);
        let mut recv_buf = [0u8; 32];

        let calls = get(&mut stream, &mut recv_buf);

        assert_eq!(calls, [(Delivery::Final, 32, 32)]);
    }

    #[test]
    fn status_line_is_parsed() {
        let response = Response {
            status_line: "HTTP/1.1 404 Not Found",
            data: &[],
            received: 0,
        };

        assert_eq!(response.status(), Some(404));
    }

    #[test]
    fn non_http_status_line_is_rejected() {
        let mut stream = StaticStream::new(b"ICY 200 OK\r\n\r\n");
        let mut recv_buf = [0u8; 32];

        let err = request(
            &mut stream,
            Request {
                method: Method::Get,
                path: "/",
                host: "192.0.2.1",
                protocol: "HTTP/1.1",
                timeout: Duration::from_secs(1),
                recv_buf: &mut recv_buf,
            },
            |_, _| {},
        )
        .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorCode::BadMessage));
    }

    #[test]
    fn head_end_is_found_across_reads() {
        assert_eq!(find_head_end(b"HTTP/1.1 200 OK\r\n\r\nbody"), Some(15));
        assert_eq!(find_head_end(b"HTTP/1.1 200 OK\r\n"), None);
    }

    #[test]
    fn empty_receive_buffer_is_invalid() {
        let mut stream = StaticStream::new(b"");

        let err = request(
            &mut stream,
            Request {
                method: Method::Get,
                path: "/",
                host: "192.0.2.1",
                protocol: "HTTP/1.1",
                timeout: Duration::from_secs(1),
                recv_buf: &mut [],
            },
            |_, _| {},
        )
        .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorCode::InvalidArg));
    }
}
