//! Blocking SMTP session used by the prober.
//!
//! Only the minimal dialogue needed to ask "would you accept this recipient?"
//! is implemented: greeting, HELO, MAIL FROM, RCPT TO, QUIT.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::types::SmtpReply;

pub(crate) struct SmtpSession {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl SmtpSession {
    /// Connects to the first reachable address, applying `timeout` to the
    /// connection attempt and to every subsequent read and write.
    pub(crate) fn connect(addrs: &[SocketAddr], timeout: Option<Duration>) -> io::Result<Self> {
        let mut last_err = None;
        for addr in addrs {
            let attempt = match timeout {
                Some(deadline) => TcpStream::connect_timeout(addr, deadline),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(timeout)?;
                    stream.set_write_timeout(timeout)?;
                    let reader = BufReader::new(stream.try_clone()?);
                    return Ok(Self { stream, reader });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            )
        }))
    }

    pub(crate) fn send_command(&mut self, command: &str) -> io::Result<()> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream.write_all(&line)?;
        self.stream.flush()
    }

    /// Reads one (possibly multi-line) SMTP reply.
    pub(crate) fn read_reply(&mut self) -> io::Result<SmtpReply> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            let mut raw = String::new();
            let bytes = self.reader.read_line(&mut raw)?;
            if bytes == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading reply",
                ));
            }
            if raw.ends_with('\n') {
                raw.pop();
                if raw.ends_with('\r') {
                    raw.pop();
                }
            }

            let (parsed_code, continuation, text) = parse_reply_line(&raw)?;
            if let Some(existing) = code {
                if existing != parsed_code {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("inconsistent SMTP reply codes: {existing} vs {parsed_code}"),
                    ));
                }
            } else {
                code = Some(parsed_code);
            }
            message_lines.push(text);
            if !continuation {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "SMTP reply missing status code")
            })?,
            message: message_lines.join("\n"),
        })
    }

    /// Sends QUIT and drains the goodbye reply; failures past this point are
    /// of no interest to the probe outcome.
    pub(crate) fn quit(&mut self) {
        if self.send_command("QUIT").is_ok() {
            let _ = self.read_reply();
        }
    }
}

/// Parses one raw reply line into `(code, continuation flag, text)`.
///
/// Slicing is boundary-checked: a reply whose status code or separator byte
/// falls inside a multibyte character is a protocol failure reported as
/// `InvalidData`, never a panic, so the caller can fall through to the next
/// MX host.
fn parse_reply_line(raw: &str) -> io::Result<(u16, bool, String)> {
    let code_part = raw.get(..3).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid SMTP reply: '{raw}'"),
        )
    })?;
    let code = code_part.parse::<u16>().map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid SMTP status code: '{code_part}'"),
        )
    })?;
    let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
    let text = if raw.len() < 4 {
        String::new()
    } else {
        raw.get(4..)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid SMTP reply: '{raw}'"),
                )
            })?
            .to_string()
    };
    Ok((code, continuation, text))
}

pub(crate) fn resolve_socket_addrs(exchange: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    format!("{exchange}:{port}")
        .to_socket_addrs()
        .map(|iter| iter.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_and_text() {
        let (code, continuation, text) = parse_reply_line("250 2.1.5 Ok").expect("parse");
        assert_eq!(code, 250);
        assert!(!continuation);
        assert_eq!(text, "2.1.5 Ok");
    }

    #[test]
    fn flags_continuation_lines() {
        let (code, continuation, text) = parse_reply_line("250-mock.example").expect("parse");
        assert_eq!(code, 250);
        assert!(continuation);
        assert_eq!(text, "mock.example");
    }

    #[test]
    fn code_only_reply_has_empty_text() {
        let (code, continuation, text) = parse_reply_line("421").expect("parse");
        assert_eq!(code, 421);
        assert!(!continuation);
        assert_eq!(text, "");
    }

    #[test]
    fn short_reply_is_invalid_data() {
        let err = parse_reply_line("25").expect_err("must fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn non_numeric_code_is_invalid_data() {
        let err = parse_reply_line("abc hello").expect_err("must fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn multibyte_inside_code_is_invalid_data_not_a_panic() {
        let err = parse_reply_line("22\u{e9} mock greeting").expect_err("must fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn multibyte_separator_is_invalid_data_not_a_panic() {
        let err = parse_reply_line("250\u{e9}text").expect_err("must fail");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
