//! SDP text parsing built on `nom`
//!
//! Each SDP line has the form `<type>=<value>`. The parser accepts CRLF and
//! bare LF line endings and requires the `v=`, `o=`, `s=`, `t=` lines plus
//! at least one `m=` section.

use nom::{
    bytes::complete::take_till1,
    character::complete::{alpha1, anychar, char, digit1, not_line_ending, space1},
    combinator::{map_res, opt},
    multi::many0,
    sequence::preceded,
    IResult,
};

use super::{Attribute, MediaSection, SessionDescription};
use crate::error::{Error, Result};

/// Parse an SDP line into its type character and trimmed value
///
/// ```
/// use doorbell_negotiation::sdp::parse_sdp_line;
///
/// let (_, (key, value)) = parse_sdp_line("a=rtpmap:96 VP8/90000").unwrap();
/// assert_eq!(key, 'a');
/// assert_eq!(value, "rtpmap:96 VP8/90000");
/// ```
pub fn parse_sdp_line(input: &str) -> IResult<&str, (char, &str)> {
    let (input, key) = anychar(input)?;
    let (input, _) = char('=')(input)?;
    let (input, value) = not_line_ending(input)?;

    let input = input.trim_start_matches(['\r', '\n']);

    Ok((input, (key, value.trim())))
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ' ' || c == '\t')(input)
}

/// Parse the value of an `m=` line: `<media> <port>[/<n>] <proto> <fmt> ...`
pub fn parse_media_line(input: &str) -> IResult<&str, MediaSection> {
    let (input, media) = alpha1(input)?;
    let (input, _) = space1(input)?;
    let (input, port) = map_res(digit1, str::parse::<u16>)(input)?;
    let (input, _) = opt(preceded(char('/'), digit1))(input)?;
    let (input, _) = space1(input)?;
    let (input, protocol) = token(input)?;
    let (input, formats) = many0(preceded(space1, token))(input)?;

    Ok((
        input,
        MediaSection::new(
            media,
            port,
            protocol,
            formats.into_iter().map(str::to_string).collect(),
        ),
    ))
}

fn parse_attribute(value: &str) -> Attribute {
    match value.split_once(':') {
        Some((name, rest)) => Attribute::new(name.trim(), rest.trim()),
        None => Attribute::flag(value),
    }
}

/// Parse a complete session description
pub fn parse_sdp(text: &str) -> Result<SessionDescription> {
    let mut lines = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    let first = lines.next().ok_or_else(|| Error::malformed("empty description"))?;
    match parse_sdp_line(first) {
        Ok((_, ('v', "0"))) => {}
        _ => return Err(Error::malformed(format!("expected 'v=0', found '{}'", first))),
    }

    let mut origin = None;
    let mut session_name = None;
    let mut timing = None;
    let mut connection = None;
    let mut attributes = Vec::new();
    let mut media: Vec<MediaSection> = Vec::new();

    for line in lines {
        let (_, (key, value)) =
            parse_sdp_line(line).map_err(|_| Error::malformed(format!("invalid line '{}'", line)))?;

        match (key, media.last_mut()) {
            ('m', _) => {
                let (_, section) = parse_media_line(value)
                    .map_err(|_| Error::malformed(format!("invalid media line '{}'", value)))?;
                media.push(section);
            }
            ('a', Some(section)) => section.attributes.push(parse_attribute(value)),
            ('a', None) => attributes.push(parse_attribute(value)),
            ('c', Some(section)) => section.connection = Some(value.to_string()),
            ('c', None) => connection = Some(value.to_string()),
            ('o', None) => origin = Some(value.to_string()),
            ('s', None) => session_name = Some(value.to_string()),
            ('t', None) => timing = timing.or_else(|| Some(value.to_string())),
            ('v', _) => return Err(Error::malformed("duplicate 'v=' line")),
            _ => {}
        }
    }

    if media.is_empty() {
        return Err(Error::malformed("no media sections"));
    }

    Ok(SessionDescription {
        origin: origin.ok_or_else(|| Error::malformed("missing 'o=' line"))?,
        session_name: session_name.ok_or_else(|| Error::malformed("missing 's=' line"))?,
        timing: timing.ok_or_else(|| Error::malformed("missing 't=' line"))?,
        connection,
        attributes,
        media,
    })
}
