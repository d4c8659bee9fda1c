//! Minimal SDP model (RFC 8866) as used by WebRTC offer/answer
//!
//! Lines the negotiation does not look at (`i=`, `u=`, `b=`, ...) are
//! dropped on parse. Writing always uses CRLF line endings.

use std::fmt;

mod parser;

pub use parser::{parse_media_line, parse_sdp, parse_sdp_line};

/// `a=` line, either a flag (`a=rtcp-mux`) or `name:value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "a={}:{}", self.name, value),
            None => write!(f, "a={}", self.name),
        }
    }
}

/// Media direction attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl Direction {
    pub fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "sendrecv" => Some(Direction::SendRecv),
            "sendonly" => Some(Direction::SendOnly),
            "recvonly" => Some(Direction::RecvOnly),
            "inactive" => Some(Direction::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::SendRecv => "sendrecv",
            Direction::SendOnly => "sendonly",
            Direction::RecvOnly => "recvonly",
            Direction::Inactive => "inactive",
        }
    }

    /// Whether the side announcing this direction sends media
    pub fn sends(&self) -> bool {
        matches!(self, Direction::SendRecv | Direction::SendOnly)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `m=` section with its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSection {
    pub media: String,
    pub port: u16,
    pub protocol: String,
    pub formats: Vec<String>,
    pub connection: Option<String>,
    pub attributes: Vec<Attribute>,
}

impl MediaSection {
    pub fn new(media: impl Into<String>, port: u16, protocol: impl Into<String>, formats: Vec<String>) -> Self {
        Self {
            media: media.into(),
            port,
            protocol: protocol.into(),
            formats,
            connection: None,
            attributes: Vec::new(),
        }
    }

    /// Value of the first attribute called `name`
    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.attributes, name)
    }

    /// Values of every attribute called `name`
    pub fn attribute_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attributes
            .iter()
            .filter(move |a| a.name == name)
            .filter_map(|a| a.value.as_deref())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn mid(&self) -> Option<&str> {
        self.attribute("mid")
    }

    /// Direction declared on the section, if any
    pub fn direction(&self) -> Option<Direction> {
        self.attributes
            .iter()
            .filter(|a| a.value.is_none())
            .find_map(|a| Direction::from_attribute(&a.name))
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// RTP payload types whose `a=<name>:<pt> ...` line starts with `pt`
    pub fn format_attribute(&self, name: &str, pt: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|a| a.name == name)
            .filter_map(|a| a.value.as_deref())
            .find_map(|value| {
                let (format, rest) = value.split_once(' ')?;
                (format == pt).then_some(rest)
            })
    }
}

/// Parsed session description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub origin: String,
    pub session_name: String,
    pub timing: String,
    pub connection: Option<String>,
    pub attributes: Vec<Attribute>,
    pub media: Vec<MediaSection>,
}

impl SessionDescription {
    /// Empty description with the given origin line value
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            session_name: "-".to_string(),
            timing: "0 0".to_string(),
            connection: None,
            attributes: Vec::new(),
            media: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.attributes, name)
    }

    /// Session level direction, defaulting to `sendrecv`
    pub fn direction(&self) -> Direction {
        self.attributes
            .iter()
            .filter(|a| a.value.is_none())
            .find_map(|a| Direction::from_attribute(&a.name))
            .unwrap_or(Direction::SendRecv)
    }

    /// Media ids listed in `a=group:BUNDLE`
    pub fn bundle_group(&self) -> Option<Vec<&str>> {
        self.attributes
            .iter()
            .filter(|a| a.name == "group")
            .filter_map(|a| a.value.as_deref())
            .find_map(|value| {
                let mut parts = value.split_whitespace();
                (parts.next() == Some("BUNDLE")).then(|| parts.collect())
            })
    }
}

fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|a| a.name == name)
        .and_then(|a| a.value.as_deref())
}

impl fmt::Display for MediaSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={} {} {}", self.media, self.port, self.protocol)?;
        for format in &self.formats {
            write!(f, " {}", format)?;
        }
        f.write_str("\r\n")?;
        if let Some(connection) = &self.connection {
            write!(f, "c={}\r\n", connection)?;
        }
        for attribute in &self.attributes {
            write!(f, "{}\r\n", attribute)?;
        }
        Ok(())
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("v=0\r\n")?;
        write!(f, "o={}\r\n", self.origin)?;
        write!(f, "s={}\r\n", self.session_name)?;
        if let Some(connection) = &self.connection {
            write!(f, "c={}\r\n", connection)?;
        }
        write!(f, "t={}\r\n", self.timing)?;
        for attribute in &self.attributes {
            write!(f, "{}\r\n", attribute)?;
        }
        for section in &self.media {
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}
