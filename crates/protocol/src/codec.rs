//! XML codec.
//!
//! Converts frames into [`ProtocolMessage`] values and back. Decoding is
//! strict about message shape (the top-level element must be known, required
//! attributes must be present) and lenient about everything else: unknown
//! attributes and unknown child elements are skipped, and room data of an
//! unknown class decodes to [`ProtocolMessage::RoomMessage`].

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::framing::Frame;
use crate::message::{ErrorContext, ProtocolMessage};
use crate::types::{JoinTarget, Move, Outcome, RoomId, Snapshot};

/// Opening of the client's XML stream.
pub const PREAMBLE: &[u8] = b"<protocol>";

/// Closing of the client's XML stream.
pub const EPILOGUE: &[u8] = b"</protocol>";

const PREVIEW_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedMessageError {
    #[error("frame is not valid UTF-8")]
    NotUtf8,
    #[error("frame does not start with an element: {0:?}")]
    NotMarkup(String),
    #[error("frame contains no element")]
    Empty,
    #[error("xml error: {0}")]
    Xml(String),
    #[error("unknown element <{0}>")]
    UnknownElement(String),
    #[error("<{element}> is missing attribute {attribute}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("<{0}> carries no data element")]
    MissingData(&'static str),
}

impl From<quick_xml::Error> for MalformedMessageError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Xml(value.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for MalformedMessageError {
    fn from(value: quick_xml::events::attributes::AttrError) -> Self {
        Self::Xml(value.to_string())
    }
}

// ============== Decoding ==============

/// Decode one frame.
pub fn decode(frame: &Frame) -> Result<ProtocolMessage, MalformedMessageError> {
    let text = std::str::from_utf8(frame.as_bytes()).map_err(|_| MalformedMessageError::NotUtf8)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MalformedMessageError::Empty);
    }
    if !trimmed.starts_with('<') {
        return Err(MalformedMessageError::NotMarkup(
            trimmed.chars().take(PREVIEW_CHARS).collect(),
        ));
    }

    let mut reader = Reader::from_str(trimmed);
    let Some((root, empty)) = next_element(&mut reader)? else {
        return Err(MalformedMessageError::Empty);
    };

    match root.name().as_ref() {
        b"join" => Ok(ProtocolMessage::JoinRequest(JoinTarget::Any)),
        b"joinPrepared" => {
            let code = required(&root, "joinPrepared", "reservationCode")?;
            Ok(ProtocolMessage::JoinRequest(JoinTarget::Reservation(code)))
        }
        b"joinRoom" => {
            let room = required(&root, "joinRoom", "roomId")?;
            Ok(ProtocolMessage::JoinRequest(JoinTarget::Room(RoomId::new(room))))
        }
        b"joined" => Ok(ProtocolMessage::JoinedRoom {
            room_id: RoomId::new(required(&root, "joined", "roomId")?),
        }),
        b"left" => Ok(ProtocolMessage::Left {
            room_id: RoomId::new(required(&root, "left", "roomId")?),
        }),
        b"errorpacket" => decode_error_packet(&mut reader, &root, empty),
        b"room" => decode_room(&mut reader, &root, empty),
        other => Err(MalformedMessageError::UnknownElement(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// Convenience wrapper for text input.
pub fn decode_str(text: &str) -> Result<ProtocolMessage, MalformedMessageError> {
    decode(&Frame::from(text))
}

/// Next child element at the reader's level; `None` at the enclosing end tag.
fn next_element<'a>(
    reader: &mut Reader<&'a [u8]>,
) -> Result<Option<(BytesStart<'a>, bool)>, MalformedMessageError> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => return Ok(Some((e, false))),
            Event::Empty(e) => return Ok(Some((e, true))),
            Event::End(_) | Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, MalformedMessageError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required(
    e: &BytesStart<'_>,
    element: &'static str,
    key: &'static str,
) -> Result<String, MalformedMessageError> {
    attribute(e, key)?.ok_or(MalformedMessageError::MissingAttribute {
        element,
        attribute: key,
    })
}

fn decode_room<'a>(
    reader: &mut Reader<&'a [u8]>,
    root: &BytesStart<'a>,
    empty: bool,
) -> Result<ProtocolMessage, MalformedMessageError> {
    let room_id = RoomId::new(required(root, "room", "roomId")?);
    if empty {
        return Err(MalformedMessageError::MissingData("room"));
    }

    while let Some((child, child_empty)) = next_element(reader)? {
        if child.name().as_ref() != b"data" {
            if !child_empty {
                reader.read_to_end(child.name())?;
            }
            continue;
        }

        let class = required(&child, "data", "class")?;
        let inner = if child_empty {
            String::new()
        } else {
            reader.read_text(child.name())?.into_owned()
        };
        return decode_data(room_id, &class, &child, inner);
    }

    Err(MalformedMessageError::MissingData("room"))
}

fn decode_data(
    room_id: RoomId,
    class: &str,
    data: &BytesStart<'_>,
    inner: String,
) -> Result<ProtocolMessage, MalformedMessageError> {
    match class {
        "welcomeMessage" => {
            let team = match attribute(data, "team")? {
                Some(team) => Some(team),
                None => attribute(data, "color")?,
            };
            Ok(ProtocolMessage::MemberJoined { room_id, team })
        }
        "memento" => Ok(ProtocolMessage::StateUpdate {
            room_id,
            snapshot: Snapshot::new(inner),
        }),
        "moveRequest" => Ok(ProtocolMessage::MoveRequest { room_id }),
        "result" => Ok(ProtocolMessage::GameResult {
            room_id,
            outcome: Outcome::new(inner),
        }),
        "move" => Ok(ProtocolMessage::MoveSubmission {
            room_id,
            mv: Move::new(inner),
        }),
        "error" => Ok(ProtocolMessage::Error {
            context: ErrorContext::Room(room_id),
            message: attribute(data, "message")?.unwrap_or_default(),
        }),
        other => Ok(ProtocolMessage::RoomMessage {
            room_id,
            class: other.to_string(),
            payload: inner,
        }),
    }
}

fn decode_error_packet<'a>(
    reader: &mut Reader<&'a [u8]>,
    root: &BytesStart<'a>,
    empty: bool,
) -> Result<ProtocolMessage, MalformedMessageError> {
    let message = attribute(root, "message")?.unwrap_or_default();
    let mut context = ErrorContext::Protocol;

    if !empty {
        while let Some((child, child_empty)) = next_element(reader)? {
            if child.name().as_ref() == b"originalRequest" {
                if let Some(class) = attribute(&child, "class")? {
                    context = ErrorContext::Request(class);
                }
            }
            if !child_empty {
                reader.read_to_end(child.name())?;
            }
        }
    }

    Ok(ProtocolMessage::Error { context, message })
}

/// Winning team named in a result payload, if any.
pub fn winner(outcome: &Outcome) -> Option<String> {
    let mut reader = Reader::from_str(outcome.as_str());
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"winner" => {
                return attribute(&e, "team").ok().flatten();
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

// ============== Encoding ==============

/// Encode a message as one frame.
pub fn encode(msg: &ProtocolMessage) -> Vec<u8> {
    let mut out = String::with_capacity(64);
    match msg {
        ProtocolMessage::JoinRequest(JoinTarget::Any) => empty_element(&mut out, "join", &[]),
        ProtocolMessage::JoinRequest(JoinTarget::Reservation(code)) => {
            empty_element(&mut out, "joinPrepared", &[("reservationCode", code.as_str())])
        }
        ProtocolMessage::JoinRequest(JoinTarget::Room(room)) => {
            empty_element(&mut out, "joinRoom", &[("roomId", room.as_str())])
        }
        ProtocolMessage::JoinedRoom { room_id } => {
            empty_element(&mut out, "joined", &[("roomId", room_id.as_str())])
        }
        ProtocolMessage::Left { room_id } => {
            empty_element(&mut out, "left", &[("roomId", room_id.as_str())])
        }
        ProtocolMessage::MemberJoined { room_id, team } => {
            let attrs: Vec<(&str, &str)> = team.iter().map(|t| ("team", t.as_str())).collect();
            room_data(&mut out, room_id, "welcomeMessage", &attrs, "");
        }
        ProtocolMessage::StateUpdate { room_id, snapshot } => {
            room_data(&mut out, room_id, "memento", &[], snapshot.as_str())
        }
        ProtocolMessage::MoveRequest { room_id } => {
            room_data(&mut out, room_id, "moveRequest", &[], "")
        }
        ProtocolMessage::MoveSubmission { room_id, mv } => {
            room_data(&mut out, room_id, "move", &[], mv.as_str())
        }
        ProtocolMessage::GameResult { room_id, outcome } => {
            room_data(&mut out, room_id, "result", &[], outcome.as_str())
        }
        ProtocolMessage::RoomMessage {
            room_id,
            class,
            payload,
        } => room_data(&mut out, room_id, class, &[], payload),
        ProtocolMessage::Error { context, message } => match context {
            ErrorContext::Room(room_id) => {
                room_data(&mut out, room_id, "error", &[("message", message.as_str())], "")
            }
            ErrorContext::Request(class) => {
                open_tag(&mut out, "errorpacket", &[("message", message.as_str())]);
                empty_element(&mut out, "originalRequest", &[("class", class.as_str())]);
                out.push_str("</errorpacket>");
            }
            ErrorContext::Protocol => {
                empty_element(&mut out, "errorpacket", &[("message", message.as_str())])
            }
        },
    }
    out.into_bytes()
}

fn push_attrs(out: &mut String, attrs: &[(&str, &str)]) {
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(*value));
        out.push('"');
    }
}

fn empty_element(out: &mut String, name: &str, attrs: &[(&str, &str)]) {
    out.push('<');
    out.push_str(name);
    push_attrs(out, attrs);
    out.push_str("/>");
}

fn open_tag(out: &mut String, name: &str, attrs: &[(&str, &str)]) {
    out.push('<');
    out.push_str(name);
    push_attrs(out, attrs);
    out.push('>');
}

fn room_data(out: &mut String, room_id: &RoomId, class: &str, attrs: &[(&str, &str)], body: &str) {
    open_tag(out, "room", &[("roomId", room_id.as_str())]);
    let mut data_attrs = Vec::with_capacity(attrs.len() + 1);
    data_attrs.push(("class", class));
    data_attrs.extend_from_slice(attrs);
    if body.is_empty() {
        empty_element(out, "data", &data_attrs);
    } else {
        open_tag(out, "data", &data_attrs);
        out.push_str(body);
        out.push_str("</data>");
    }
    out.push_str("</room>");
}
