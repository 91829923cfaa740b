//! FTP command/reply codec

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::errors::FtpError;

/// A complete (possibly multi-line) server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpReply {
    pub code: u16,
    pub text: String,
}

impl FtpReply {
    /// 2xx
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl std::fmt::Display for FtpReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// Split a reply line into code, continuation flag and text
pub fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), FtpError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.len() < 3 || !line.is_char_boundary(3) {
        return Err(FtpError::MalformedReply(line.to_string()));
    }

    let code: u16 = line[..3]
        .parse()
        .map_err(|_| FtpError::MalformedReply(line.to_string()))?;

    match line.as_bytes().get(3) {
        None => Ok((code, false, "")),
        Some(b' ') => Ok((code, false, &line[4..])),
        Some(b'-') => Ok((code, true, &line[4..])),
        Some(_) => Err(FtpError::MalformedReply(line.to_string())),
    }
}

/// Read one reply, following `NNN-` continuation lines to the closing `NNN `
pub async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<FtpReply, FtpError> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(FtpError::ConnectionClosed);
    }

    let (code, mut more, text) = parse_reply_line(&line)?;
    let mut lines = vec![text.to_string()];

    while more {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(FtpError::ConnectionClosed);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let closing = format!("{} ", code);
        if let Some(rest) = trimmed.strip_prefix(&closing) {
            lines.push(rest.to_string());
            more = false;
        } else if trimmed == code.to_string() {
            more = false;
        } else {
            lines.push(trimmed.to_string());
        }
    }

    Ok(FtpReply {
        code,
        text: lines.join("\n"),
    })
}

/// Decode `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`
pub fn parse_pasv(text: &str) -> Result<(String, u16), FtpError> {
    let bad = || FtpError::BadPassiveReply(text.to_string());

    let start = text.find('(').ok_or_else(bad)?;
    let end = text[start..].find(')').ok_or_else(bad)? + start;

    let numbers = text[start + 1..end]
        .split(',')
        .map(|n| n.trim().parse::<u8>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| bad())?;

    if numbers.len() != 6 {
        return Err(bad());
    }

    let host = format!(
        "{}.{}.{}.{}",
        numbers[0], numbers[1], numbers[2], numbers[3]
    );
    let port = u16::from(numbers[4]) << 8 | u16::from(numbers[5]);
    Ok((host, port))
}

/// Build a command line; arguments must not smuggle in extra commands
pub fn format_command(verb: &str, arg: Option<&str>) -> Result<String, FtpError> {
    match arg {
        Some(arg) if arg.contains(['\r', '\n']) => Err(FtpError::MalformedReply(format!(
            "refusing to send {} with embedded line break",
            verb
        ))),
        Some(arg) => Ok(format!("{} {}\r\n", verb, arg)),
        None => Ok(format!("{}\r\n", verb)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn test_parse_single_line() {
        let (code, more, text) = parse_reply_line("220 MicroPython FTP Server\r\n").unwrap();
        assert_eq!(code, 220);
        assert!(!more);
        assert_eq!(text, "MicroPython FTP Server");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_reply_line("hello").is_err());
        assert!(parse_reply_line("22").is_err());
        assert!(parse_reply_line("220x").is_err());
    }

    #[tokio::test]
    async fn test_read_multiline_reply() {
        let data = b"230-Welcome\r\n Enjoy your stay\r\n230 Logged in\r\n221 next\r\n";
        let mut reader = BufReader::new(&data[..]);

        let reply = read_reply(&mut reader).await.unwrap();
        assert_eq!(reply.code, 230);
        assert_eq!(reply.text, "Welcome\n Enjoy your stay\nLogged in");

        let next = read_reply(&mut reader).await.unwrap();
        assert_eq!(next.code, 221);
    }

    #[tokio::test]
    async fn test_read_reply_on_closed_stream() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(matches!(
            read_reply(&mut reader).await,
            Err(FtpError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_parse_pasv() {
        let (host, port) =
            parse_pasv("Entering Passive Mode (192,168,4,1,7,232).").unwrap();
        assert_eq!(host, "192.168.4.1");
        assert_eq!(port, 2024);
    }

    #[test]
    fn test_parse_pasv_rejects_short_tuple() {
        assert!(parse_pasv("Entering Passive Mode (192,168,4,1,7)").is_err());
        assert!(parse_pasv("Entering Passive Mode").is_err());
        assert!(parse_pasv("(300,1,1,1,1,1)").is_err());
    }

    #[test]
    fn test_format_command_refuses_injection() {
        assert_eq!(format_command("RETR", Some("main.py")).unwrap(), "RETR main.py\r\n");
        assert_eq!(format_command("QUIT", None).unwrap(), "QUIT\r\n");
        assert!(format_command("STOR", Some("a\r\nDELE boot.py")).is_err());
    }

    #[test]
    fn test_reply_classes() {
        let started = FtpReply {
            code: 150,
            text: String::new(),
        };
        let closing = FtpReply {
            code: 221,
            text: "Goodbye".to_string(),
        };
        assert!(!started.is_completion());
        assert!(closing.is_completion());
    }
}
