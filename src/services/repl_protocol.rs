//! Raw-REPL wire format: control bytes, generated programs and reply parsing
//!
//! A MicroPython-style interpreter in raw mode executes whatever text arrives
//! between Ctrl-A and Ctrl-D and answers `OK<stdout>\x04<stderr>\x04>`.
//! There is no other framing, so downloads are delimited by sentinel lines
//! printed by the generated program itself.

use crate::errors::ProtocolError;

/// Ctrl-A: switch the interpreter to raw mode
pub const ENTER_RAW_REPL: u8 = 0x01;
/// Ctrl-D: end of input, execute the buffered program
pub const EXECUTE: u8 = 0x04;
/// Prompt printed once raw mode is active
pub const RAW_REPL_PROMPT: u8 = b'>';

pub const FILE_START: &str = "FILE_START";
pub const FILE_END: &str = "FILE_END";
pub const FILE_ERROR: &str = "FILE_ERROR";

/// Escape text for embedding in a `'''...'''` literal.
///
/// Backslashes and single quotes are escaped so neither the delimiter nor an
/// escape sequence in the content can change the program. Control characters
/// other than newline and tab are written as `\xNN` so that Ctrl-A..Ctrl-D in
/// a file never reach the interpreter's input handling.
pub fn escape_text(content: &str) -> String {
    let mut escaped = String::with_capacity(content.len());
    for c in content.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\r' => escaped.push_str("\\r"),
            '\n' | '\t' => escaped.push(c),
            c if c.is_ascii_control() => escaped.push_str(&format!("\\x{:02x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Program that writes `content` to `name` on the board
pub fn upload_command(name: &str, content: &str) -> String {
    format!(
        "with open('{}','w') as f:\n    f.write('''{}''')\n",
        name,
        escape_text(content)
    )
}

/// Program that prints `name` between sentinel lines, or `FILE_ERROR`
pub fn download_command(name: &str) -> String {
    format!(
        "try:\n    with open('{name}','r') as f:\n        print('{start}')\n        print(f.read())\n        print('{end}')\nexcept:\n    print('{error}')\n",
        name = name,
        start = FILE_START,
        end = FILE_END,
        error = FILE_ERROR,
    )
}

/// Locate `marker` printed as its own line, starting the search at `from`.
///
/// A printed sentinel is preceded by a line start or by the `OK` the raw REPL
/// emits before program output, and followed by a line break or the `\x04`
/// closing stdout. Echoed source such as `print('FILE_END')` never matches.
/// `allow_eof` also accepts a marker at the very end of `text`.
pub fn find_marker_line(
    text: &str,
    marker: &str,
    from: usize,
    allow_eof: bool,
) -> Option<(usize, usize)> {
    let mut search_from = from;
    while let Some(offset) = text.get(search_from..)?.find(marker) {
        let start = search_from + offset;
        let end = start + marker.len();

        let before = &text[..start];
        let starts_line = before.is_empty() || before.ends_with('\n') || before.ends_with("OK");

        let ends_line = match text.as_bytes().get(end) {
            Some(b'\r' | b'\n' | 0x04) => true,
            None => allow_eof,
            Some(_) => false,
        };

        if starts_line && ends_line {
            return Some((start, end));
        }
        search_from = end;
    }
    None
}

/// Locate the sentinel line that closes the program's stdout.
///
/// A file body may itself contain a `FILE_END` line; only the occurrence
/// followed (after its line break) by the `\x04` stdout terminator counts.
/// `allow_eof` also accepts a marker that ends `text`.
fn find_closing_marker(
    text: &str,
    marker: &str,
    from: usize,
    allow_eof: bool,
) -> Option<(usize, usize)> {
    let mut search_from = from;
    while let Some((start, end)) = find_marker_line(text, marker, search_from, allow_eof) {
        let rest = &text[end..];
        let rest = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
            .unwrap_or(rest);
        if rest.starts_with('\u{4}') || (allow_eof && rest.is_empty()) {
            return Some((start, end));
        }
        search_from = end;
    }
    None
}

/// True once a download reply holds its closing sentinel and the stdout terminator
pub fn download_reply_complete(text: &str) -> bool {
    find_closing_marker(text, FILE_END, 0, false).is_some()
        || find_closing_marker(text, FILE_ERROR, 0, false).is_some()
}

/// Extract the file body from a download reply.
///
/// Returns the text strictly between the `FILE_START` line and the closing
/// `FILE_END` line, with `\r\n` folded to `\n` and surrounding whitespace
/// trimmed.
pub fn parse_download_response(text: &str) -> Result<String, ProtocolError> {
    let Some((_, start_end)) = find_marker_line(text, FILE_START, 0, true) else {
        if find_marker_line(text, FILE_ERROR, 0, true).is_some() {
            return Err(ProtocolError::RemoteFileError);
        }
        return Err(ProtocolError::MissingSentinel(FILE_START));
    };

    let (end_start, _) = find_closing_marker(text, FILE_END, start_end, true)
        .ok_or(ProtocolError::MissingSentinel(FILE_END))?;

    let body = &text[start_end..end_start];
    Ok(body.replace("\r\n", "\n").trim().to_string())
}

/// Output of one raw-REPL execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFrame {
    pub stdout: String,
    pub stderr: String,
}

/// Parse `OK<stdout>\x04<stderr>\x04`; `None` until the frame is complete
pub fn parse_execution_frame(text: &str) -> Option<ExecutionFrame> {
    let ok = text.find("OK")?;
    let body = &text[ok + 2..];
    let first = body.find('\u{4}')?;
    let rest = &body[first + 1..];
    let second = rest.find('\u{4}')?;

    Some(ExecutionFrame {
        stdout: body[..first].to_string(),
        stderr: rest[..second].to_string(),
    })
}

/// Last meaningful line of a traceback, e.g. `OSError: [Errno 28] ENOSPC`
pub fn summarize_traceback(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_command_for_plain_text_is_verbatim() {
        assert_eq!(
            upload_command("hello.py", "print(\"hi\")"),
            "with open('hello.py','w') as f:\n    f.write('''print(\"hi\")''')\n"
        );
    }

    #[test]
    fn test_escape_keeps_delimiter_inside_literal() {
        let escaped = escape_text("doc = '''x'''");
        assert!(!escaped.contains("'''"));
        assert_eq!(escaped, "doc = \\'\\'\\'x\\'\\'\\'");
    }

    #[test]
    fn test_escape_backslash_and_control_bytes() {
        assert_eq!(escape_text("a\\nb"), "a\\\\nb");
        assert_eq!(escape_text("x\u{1}y\u{4}"), "x\\x01y\\x04");
        assert_eq!(escape_text("line\r\n\tok"), "line\\r\n\tok");
    }

    #[test]
    fn test_download_command_shape() {
        let cmd = download_command("main.py");
        assert!(cmd.starts_with("try:\n    with open('main.py','r') as f:\n"));
        assert!(cmd.contains("        print('FILE_START')\n"));
        assert!(cmd.ends_with("except:\n    print('FILE_ERROR')\n"));
    }

    #[test]
    fn test_parse_raw_repl_reply() {
        let reply = "OKFILE_START\r\nprint('hi')\r\nx = 1\r\n\r\nFILE_END\r\n\u{4}\u{4}>";
        assert_eq!(
            parse_download_response(reply).unwrap(),
            "print('hi')\nx = 1"
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let reply = "raw REPL; CTRL-B to exit\r\n>OKFILE_START\r\nabc\r\nFILE_END\r\n";
        let first = parse_download_response(reply).unwrap();
        let second = parse_download_response(reply).unwrap();
        assert_eq!(first, "abc");
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_error_is_not_empty_content() {
        let reply = "OKFILE_ERROR\r\n\u{4}\u{4}>";
        assert_eq!(
            parse_download_response(reply),
            Err(ProtocolError::RemoteFileError)
        );
        assert!(download_reply_complete(reply));
    }

    #[test]
    fn test_missing_end_sentinel() {
        assert_eq!(
            parse_download_response("OKFILE_START\r\npartial conte"),
            Err(ProtocolError::MissingSentinel(FILE_END))
        );
        assert_eq!(
            parse_download_response("garbage"),
            Err(ProtocolError::MissingSentinel(FILE_START))
        );
    }

    #[test]
    fn test_echoed_source_does_not_match() {
        let echo = "        print('FILE_START')\r\n        print(f.read())\r\n        print('FILE_END')\r\n";
        assert!(!download_reply_complete(echo));
        assert!(parse_download_response(echo).is_err());
    }

    #[test]
    fn test_reply_waits_for_stdout_terminator() {
        assert!(!download_reply_complete("OKFILE_START\r\nx\r\nFILE_EN"));
        assert!(!download_reply_complete("OKFILE_START\r\nx\r\nFILE_END"));
        assert!(!download_reply_complete("OKFILE_START\r\nx\r\nFILE_END\r\n"));
        assert!(download_reply_complete("OKFILE_START\r\nx\r\nFILE_END\r\n\u{4}"));
    }

    #[test]
    fn test_body_lines_matching_sentinels_are_content() {
        let partial = "OKFILE_START\r\na\r\nFILE_END\r\nb\r\n";
        assert!(!download_reply_complete(partial));

        let reply = "OKFILE_START\r\na\r\nFILE_END\r\nFILE_ERROR\r\nb\r\nFILE_END\r\n\u{4}\u{4}>";
        assert!(download_reply_complete(reply));
        assert_eq!(
            parse_download_response(reply).unwrap(),
            "a\nFILE_END\nFILE_ERROR\nb"
        );
    }

    #[test]
    fn test_body_ending_in_sentinel_line() {
        let reply = "OKFILE_START\r\nnotes\r\nFILE_END\r\nFILE_END\r\n\u{4}\u{4}>";
        assert_eq!(parse_download_response(reply).unwrap(), "notes\nFILE_END");
    }

    #[test]
    fn test_execution_frame() {
        assert_eq!(parse_execution_frame("OK\u{4}"), None);

        let frame = parse_execution_frame(">OK\u{4}\u{4}>").unwrap();
        assert_eq!(frame.stdout, "");
        assert_eq!(frame.stderr, "");

        let failing = "OK\u{4}Traceback (most recent call last):\r\n  File \"<stdin>\", line 2\r\nOSError: [Errno 28] ENOSPC\r\n\u{4}>";
        let frame = parse_execution_frame(failing).unwrap();
        assert_eq!(summarize_traceback(&frame.stderr), "OSError: [Errno 28] ENOSPC");
    }
}
