//! Stream framing.
//!
//! The server writes one unbroken XML stream. [`FrameBuffer`] accumulates bytes
//! as the transport delivers them and cuts the stream into complete top-level
//! elements, independent of how the bytes were chunked on the wire.
//!
//! Rules:
//!
//! - whitespace between frames is skipped
//! - `<?xml …?>`, comments and the opening `<protocol>` are consumed silently
//! - `</protocol>` ends the stream
//! - a self-closing tag is one frame
//! - an open tag runs until its matching close tag (same-name nesting counted)
//! - stray text before the next `<` becomes its own frame so the codec can
//!   reject it

use thiserror::Error;

/// Default upper bound for a single frame (4 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

const STREAM_ELEMENT: &[u8] = b"protocol";

/// One complete top-level element, as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Frame {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("incomplete frame exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Reassembles frames from arbitrarily chunked input.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_frame_bytes: usize,
    ended: bool,
    /// Element opened at `buf[0]` whose close tag has not arrived yet.
    open: Option<OpenElement>,
}

/// Scan state of an incomplete frame, kept across pushes so each byte is
/// looked at once.
#[derive(Debug)]
struct OpenElement {
    name: Vec<u8>,
    depth: usize,
    /// Offset where scanning continues.
    resume: usize,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl FrameBuffer {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(16 * 1024),
            max_frame_bytes: max_frame_bytes.max(1),
            ended: false,
            open: None,
        }
    }

    /// Append bytes read from the transport.
    pub fn push(&mut self, chunk: &[u8]) {
        if !self.ended {
            self.buf.extend_from_slice(chunk);
        }
    }

    /// True once the peer closed the XML stream with `</protocol>`.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Bytes buffered but not yet framed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Cut the next complete frame, if one is buffered.
    ///
    /// `Ok(None)` means more input is needed (or the stream has ended).
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        loop {
            if self.ended {
                return Ok(None);
            }
            if let Some(open) = self.open.take() {
                return self.close_element(open);
            }

            let Some(start) = self.buf.iter().position(|b| !b.is_ascii_whitespace()) else {
                self.buf.clear();
                return Ok(None);
            };
            if start > 0 {
                self.buf.drain(..start);
            }

            if self.buf[0] != b'<' {
                return match self.buf.iter().position(|&b| b == b'<') {
                    Some(end) => Ok(Some(self.take(end))),
                    None => self.check_limit().map(|()| None),
                };
            }

            let Some(tag_end) = markup_end(&self.buf, 0) else {
                return self.check_limit().map(|()| None);
            };

            // Declarations, comments and processing instructions.
            if self.buf.starts_with(b"<?") || self.buf.starts_with(b"<!") {
                self.buf.drain(..=tag_end);
                continue;
            }

            let tag = &self.buf[..=tag_end];
            let closing = tag.starts_with(b"</");
            let self_closing = tag.ends_with(b"/>");
            let name = tag_name(tag).to_vec();

            if name == STREAM_ELEMENT {
                self.buf.drain(..=tag_end);
                if closing {
                    self.ended = true;
                    self.buf.clear();
                    return Ok(None);
                }
                continue;
            }

            if self_closing || closing {
                return Ok(Some(self.take(tag_end + 1)));
            }

            self.open = Some(OpenElement {
                name,
                depth: 1,
                resume: tag_end + 1,
            });
        }
    }

    /// Continue looking for the close tag balancing `open`.
    fn close_element(&mut self, mut open: OpenElement) -> Result<Option<Frame>, FrameError> {
        loop {
            let Some(lt) = find(&self.buf, b"<", open.resume) else {
                open.resume = self.buf.len();
                break;
            };
            let Some(gt) = markup_end(&self.buf, lt) else {
                open.resume = lt;
                break;
            };

            let tag = &self.buf[lt..=gt];
            let markup = tag.starts_with(b"<!") || tag.starts_with(b"<?");
            if !markup && tag_name(tag) == open.name.as_slice() {
                if tag.starts_with(b"</") {
                    open.depth -= 1;
                    if open.depth == 0 {
                        return Ok(Some(self.take(gt + 1)));
                    }
                } else if !tag.ends_with(b"/>") {
                    open.depth += 1;
                }
            }
            open.resume = gt + 1;
        }

        self.open = Some(open);
        self.check_limit().map(|()| None)
    }

    fn take(&mut self, end: usize) -> Frame {
        let rest = self.buf.split_off(end);
        Frame(std::mem::replace(&mut self.buf, rest))
    }

    fn check_limit(&self) -> Result<(), FrameError> {
        if self.buf.len() > self.max_frame_bytes {
            Err(FrameError::TooLarge {
                limit: self.max_frame_bytes,
            })
        } else {
            Ok(())
        }
    }
}

/// Offset of the `>` ending the markup that starts at `lt`.
///
/// Quoted attribute values may contain `>`. Comments, CDATA sections and
/// processing instructions run to their own terminators. `None` while the
/// markup is still incomplete.
fn markup_end(buf: &[u8], lt: usize) -> Option<usize> {
    let rest = &buf[lt..];
    if rest.starts_with(b"<!--") {
        return find(buf, b"-->", lt + 4).map(|p| p + 2);
    }
    if rest.starts_with(b"<![CDATA[") {
        return find(buf, b"]]>", lt + 9).map(|p| p + 2);
    }
    if rest.starts_with(b"<?") {
        return find(buf, b"?>", lt + 2).map(|p| p + 1);
    }

    let mut quote = None;
    for (i, &b) in rest.iter().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(lt + i),
            None => {}
        }
    }
    None
}

/// Element name of a tag (`<name …>`, `</name>`, `<name/>`).
fn tag_name(tag: &[u8]) -> &[u8] {
    let start = if tag.starts_with(b"</") { 2 } else { 1 };
    let rest = &tag[start..];
    let end = rest
        .iter()
        .position(|&b| b.is_ascii_whitespace() || b == b'/' || b == b'>')
        .unwrap_or(rest.len());
    &rest[..end]
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
