//! STOMP 1.2 frame codec
//!
//! The messaging endpoint speaks STOMP text frames over a WebSocket. Only the
//! client side of the protocol is covered: the frames we send (CONNECT,
//! SUBSCRIBE, UNSUBSCRIBE, SEND, DISCONNECT) and the frames the broker sends
//! back (CONNECTED, MESSAGE, RECEIPT, ERROR).
//!
//! Wire format:
//!
//! ```text
//! COMMAND\n
//! header:value\n
//! \n
//! body\0
//! ```
//!
//! Heart-beats are bare EOLs between frames and are skipped by [`parse_frames`].

use std::time::Duration;

/// Errors produced while decoding STOMP frames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StompError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    #[error("invalid escape sequence in header: {0}")]
    InvalidEscape(String),
    #[error("frame is not NUL-terminated")]
    MissingTerminator,
    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),
    #[error("invalid heart-beat header: {0}")]
    InvalidHeartBeat(String),
}

/// STOMP frame commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Client frames
    Connect,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,

    // Server frames
    Connected,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Connected => "CONNECTED",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// CONNECT and CONNECTED headers are never escaped (STOMP 1.2)
    fn escapes_headers(&self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Command {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "SEND" => Ok(Self::Send),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "DISCONNECT" => Ok(Self::Disconnect),
            "CONNECTED" => Ok(Self::Connected),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            other => Err(StompError::UnknownCommand(other.to_string())),
        }
    }
}

/// A single STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Look up a header; repeated headers resolve to the first occurrence
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    // -------------------------------------------------------------------------
    // Client frame constructors
    // -------------------------------------------------------------------------

    pub fn connect(host: &str, heart_beat: HeartBeat) -> Self {
        Self::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", host)
            .header("heart-beat", heart_beat.to_string())
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
            .header("receipt", id)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(Command::Unsubscribe).header("id", id)
    }

    pub fn send_json(destination: &str, body: String) -> Self {
        Self::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .with_body(body)
    }

    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Serialize to wire text, NUL terminator included
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str("content-length:");
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Decode every frame contained in one transport message
///
/// Fails on the first malformed frame. A message containing only heart-beat
/// EOLs yields an empty vector.
pub fn parse_frames(input: &str) -> Result<Vec<Frame>, StompError> {
    frames(input).collect()
}

/// Iterate the frames of one transport message, one result per frame
///
/// After a malformed frame decoding resumes past its NUL terminator, so the
/// frames that follow it in the same message are still yielded.
pub fn frames(input: &str) -> Frames<'_> {
    Frames { rest: input }
}

/// Iterator returned by [`frames`]
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    rest: &'a str,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame, StompError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rest = self.rest.trim_start_matches(&['\r', '\n'][..]);
        if self.rest.is_empty() {
            return None;
        }
        match parse_one(self.rest) {
            Ok((frame, consumed)) => {
                self.rest = &self.rest[consumed..];
                Some(Ok(frame))
            }
            Err(e) => {
                self.rest = match self.rest.find('\0') {
                    Some(nul) => &self.rest[nul + 1..],
                    None => "",
                };
                Some(Err(e))
            }
        }
    }
}

/// Returns true if the message is nothing but heart-beat EOLs
pub fn is_heartbeat(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c == '\n' || c == '\r')
}

fn parse_one(input: &str) -> Result<(Frame, usize), StompError> {
    let mut pos = 0;

    let command_line = next_line(input, &mut pos).ok_or(StompError::MissingTerminator)?;
    let command: Command = command_line.parse()?;
    let escaped = command.escapes_headers();

    let mut frame = Frame::new(command);
    loop {
        let line = next_line(input, &mut pos).ok_or(StompError::MissingTerminator)?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
        if escaped {
            frame
                .headers
                .push((unescape_header(name)?, unescape_header(value)?));
        } else {
            frame.headers.push((name.to_string(), value.to_string()));
        }
    }

    let body_end = match frame.get("content-length") {
        Some(raw) => {
            let len: usize = raw
                .trim()
                .parse()
                .map_err(|_| StompError::InvalidContentLength(raw.to_string()))?;
            let end = pos
                .checked_add(len)
                .ok_or_else(|| StompError::InvalidContentLength(raw.to_string()))?;
            if end >= input.len() || !input.is_char_boundary(end) {
                return Err(StompError::InvalidContentLength(raw.to_string()));
            }
            if input.as_bytes()[end] != 0 {
                return Err(StompError::MissingTerminator);
            }
            end
        }
        None => input[pos..]
            .find('\0')
            .map(|offset| pos + offset)
            .ok_or(StompError::MissingTerminator)?,
    };

    frame.body = input[pos..body_end].to_string();
    Ok((frame, body_end + 1))
}

/// Read one line starting at `pos`, tolerating CRLF; `None` if no EOL remains
fn next_line<'a>(input: &'a str, pos: &mut usize) -> Option<&'a str> {
    let rest = &input[*pos..];
    let eol = rest.find('\n')?;
    *pos += eol + 1;
    let line = &rest[..eol];
    Some(line.strip_suffix('\r').unwrap_or(line))
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}

// =============================================================================
// Heart-beating
// =============================================================================

/// The `heart-beat` header: `<outgoing ms>,<incoming ms>` from the sender's view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    pub outgoing_ms: u64,
    pub incoming_ms: u64,
}

impl HeartBeat {
    pub fn new(outgoing_ms: u64, incoming_ms: u64) -> Self {
        Self {
            outgoing_ms,
            incoming_ms,
        }
    }
}

impl std::fmt::Display for HeartBeat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.outgoing_ms, self.incoming_ms)
    }
}

impl std::str::FromStr for HeartBeat {
    type Err = StompError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StompError::InvalidHeartBeat(s.to_string());
        let (out, inc) = s.split_once(',').ok_or_else(invalid)?;
        Ok(Self {
            outgoing_ms: out.trim().parse().map_err(|_| invalid())?,
            incoming_ms: inc.trim().parse().map_err(|_| invalid())?,
        })
    }
}

/// Heart-beat timings agreed between client and broker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeatPlan {
    /// How often we must emit a heart-beat
    pub send_every: Option<Duration>,
    /// Silence from the broker longer than this means the link is dead
    pub expect_within: Option<Duration>,
}

impl HeartBeatPlan {
    /// Negotiate per STOMP 1.2: each direction is disabled when either side offers 0
    ///
    /// The receive window is doubled to tolerate network jitter.
    pub fn negotiate(client: HeartBeat, server: HeartBeat) -> Self {
        let send_every = (client.outgoing_ms != 0 && server.incoming_ms != 0)
            .then(|| Duration::from_millis(client.outgoing_ms.max(server.incoming_ms)));
        let expect_within = (client.incoming_ms != 0 && server.outgoing_ms != 0)
            .then(|| Duration::from_millis(client.incoming_ms.max(server.outgoing_ms) * 2));
        Self {
            send_every,
            expect_within,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_send_frame_adds_content_length() {
        let frame = Frame::send_json("/app/grievance/1/typing", r#"{"a":1}"#.to_string());
        assert_eq!(
            frame.encode(),
            "SEND\ndestination:/app/grievance/1/typing\ncontent-type:application/json\ncontent-length:7\n\n{\"a\":1}\0"
        );
    }

    #[test]
    fn test_connect_frame_is_not_escaped() {
        let frame = Frame::connect("localhost:8080", HeartBeat::new(4000, 4000));
        let encoded = frame.encode();
        assert!(encoded.starts_with("CONNECT\naccept-version:1.2\nhost:localhost:8080\n"));
        assert!(encoded.contains("heart-beat:4000,4000\n"));
        assert!(encoded.ends_with("\n\n\0"));
    }

    #[test]
    fn test_subscribe_frame_escapes_values() {
        let frame = Frame::new(Command::Subscribe).header("id", "a:b\nc");
        assert_eq!(frame.encode(), "SUBSCRIBE\nid:a\\cb\\nc\n\n\0");
    }

    #[test]
    fn test_parse_message_frame() {
        let raw = "MESSAGE\ndestination:/topic/grievance/1\nsubscription:sub-grievance-1\nmessage-id:9\n\n{\"type\":\"NEW_ITEM\"}\0";
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.get("subscription"), Some("sub-grievance-1"));
        assert_eq!(frame.body, "{\"type\":\"NEW_ITEM\"}");
    }

    #[test]
    fn test_parse_multiple_frames_with_heartbeats() {
        let raw = "\nRECEIPT\nreceipt-id:r1\n\n\0\r\nMESSAGE\nsubscription:s\n\nhi\0\n";
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, Command::Receipt);
        assert_eq!(frames[1].body, "hi");
    }

    #[test]
    fn test_parse_heartbeat_only() {
        assert!(parse_frames("\n").unwrap().is_empty());
        assert!(is_heartbeat("\r\n"));
        assert!(!is_heartbeat(""));
    }

    #[test]
    fn test_parse_crlf_headers() {
        let raw = "CONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0";
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames[0].command, Command::Connected);
        assert_eq!(frames[0].get("heart-beat"), Some("0,0"));
    }

    #[test]
    fn test_content_length_allows_embedded_nul() {
        let raw = "MESSAGE\ncontent-length:3\n\na\0b\0";
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames[0].body, "a\0b");
    }

    #[test]
    fn test_repeated_header_first_wins() {
        let raw = "MESSAGE\nfoo:first\nfoo:second\n\n\0";
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames[0].get("foo"), Some("first"));
    }

    #[test]
    fn test_unescape_headers() {
        let raw = "ERROR\nmessage:bad\\cthing\\nhere\n\n\0";
        let frames = parse_frames(raw).unwrap();
        assert_eq!(frames[0].get("message"), Some("bad:thing\nhere"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_frames("NOPE\n\n\0"),
            Err(StompError::UnknownCommand("NOPE".to_string()))
        );
        assert_eq!(
            parse_frames("MESSAGE\nbroken\n\n\0"),
            Err(StompError::MalformedHeader("broken".to_string()))
        );
        assert_eq!(
            parse_frames("MESSAGE\nk:\\t\n\n\0"),
            Err(StompError::InvalidEscape("\\t".to_string()))
        );
        assert_eq!(
            parse_frames("MESSAGE\n\nno terminator"),
            Err(StompError::MissingTerminator)
        );
        assert_eq!(
            parse_frames("MESSAGE\ncontent-length:99\n\nshort\0"),
            Err(StompError::InvalidContentLength("99".to_string()))
        );
    }

    #[test]
    fn test_oversized_content_length_is_rejected() {
        let raw = "MESSAGE\ncontent-length:18446744073709551615\n\nx\0";
        assert_eq!(
            parse_frames(raw),
            Err(StompError::InvalidContentLength(
                "18446744073709551615".to_string()
            ))
        );
    }

    #[test]
    fn test_frames_skips_malformed_frame() {
        let raw = "MESSAGE\nsubscription:s\n\nfirst\0NOPE\n\n\0MESSAGE\nbroken\n\n\0MESSAGE\nsubscription:s\n\nlast\0";
        let results: Vec<_> = frames(raw).collect();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().body, "first");
        assert_eq!(
            results[1],
            Err(StompError::UnknownCommand("NOPE".to_string()))
        );
        assert!(results[2].is_err());
        assert_eq!(results[3].as_ref().unwrap().body, "last");
    }

    #[test]
    fn test_frames_stops_when_no_terminator_remains() {
        let results: Vec<_> = frames("MESSAGE\n\nok\0NOPE\n\ntrailing").collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(StompError::UnknownCommand("NOPE".to_string())));
    }

    #[test]
    fn test_heartbeat_header_parse() {
        assert_eq!(
            "10000, 0".parse::<HeartBeat>().unwrap(),
            HeartBeat::new(10000, 0)
        );
        assert!("abc".parse::<HeartBeat>().is_err());
    }

    #[test]
    fn test_heartbeat_negotiation() {
        let plan = HeartBeatPlan::negotiate(HeartBeat::new(4000, 4000), HeartBeat::new(10000, 10000));
        assert_eq!(plan.send_every, Some(Duration::from_millis(10000)));
        assert_eq!(plan.expect_within, Some(Duration::from_millis(20000)));

        let plan = HeartBeatPlan::negotiate(HeartBeat::new(4000, 4000), HeartBeat::new(0, 0));
        assert_eq!(plan, HeartBeatPlan::default());

        let plan = HeartBeatPlan::negotiate(HeartBeat::new(0, 4000), HeartBeat::new(1000, 1000));
        assert_eq!(plan.send_every, None);
        assert_eq!(plan.expect_within, Some(Duration::from_millis(8000)));
    }
}
