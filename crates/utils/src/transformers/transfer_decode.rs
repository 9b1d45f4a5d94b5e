use tracing::{debug, warn};

use crate::{EmailMessage, MessageTransformer};

/// Quoted-printable escapes whose presence marks a body as encoded, for
/// carriage return, line feed and the equals sign.
pub const QUOTED_PRINTABLE_MARKERS: [&str; 3] = ["=0D", "=0A", "=3D"];

/// Returns whether the body looks quoted-printable encoded.
///
/// Any single marker of [`QUOTED_PRINTABLE_MARKERS`] is enough. This is a
/// heuristic and plain text that happens to contain one of the markers is
/// treated as encoded too.
pub fn is_quoted_printable(body: &str) -> bool {
    QUOTED_PRINTABLE_MARKERS
        .iter()
        .any(|marker| body.contains(marker))
}

/// Reverses quoted-printable escapes (RFC 2045), returning the raw bytes.
///
/// Trailing spaces and tabs are dropped from every line, soft line breaks
/// (`=` at the end of a line) are removed and `=XX` hex escapes become the
/// byte they encode. Anything else, including malformed escapes and
/// non-ASCII text, is copied through untouched.
pub fn decode_quoted_printable(text: &str) -> Vec<u8> {
    let text = strip_trailing_whitespace(text);
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte != b'=' {
            result.push(byte);
            index += 1;
            continue;
        }

        match bytes.get(index + 1..index + 3) {
            Some([b'\r', b'\n']) => index += 3,
            Some([b'\n', _]) | Some([b'\r', _]) => index += 2,
            Some([high, low]) if high.is_ascii_hexdigit() && low.is_ascii_hexdigit() => {
                result.push(hex_value(*high) << 4 | hex_value(*low));
                index += 3;
            }
            _ => match bytes.get(index + 1) {
                // soft line break at the very end of the input
                Some(b'\n') | Some(b'\r') => index += 2,
                None => index += 1,
                Some(_) => {
                    result.push(byte);
                    index += 1;
                }
            },
        }
    }

    result
}

/// Removes the spaces and tabs ending each line, keeping the line breaks.
///
/// Encoded lines never end in whitespace, any found there was added in
/// transit (RFC 2045, section 6.7).
fn strip_trailing_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (content, ending) = match line.strip_suffix("\r\n") {
            Some(content) => (content, "\r\n"),
            None => match line.strip_suffix('\n') {
                Some(content) => (content, "\n"),
                None => (line, ""),
            },
        };
        result.push_str(content.trim_end_matches([' ', '\t']));
        result.push_str(ending);
    }
    result
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Decodes a quoted-printable body and interprets the result as UTF-8.
///
/// Byte sequences that are not valid UTF-8 are replaced with `U+FFFD`, so
/// decoding never fails.
pub fn decode_transfer_encoding(body: &str) -> String {
    match String::from_utf8(decode_quoted_printable(body)) {
        Ok(text) => text,
        Err(error) => {
            warn!(error = %error, "Decoded body is not valid UTF-8, replacing invalid sequences");
            String::from_utf8_lossy(error.as_bytes()).into_owned()
        }
    }
}

/// Transformer that reverses quoted-printable transfer encoding left in the
/// body by the submitting program.
///
/// Some senders transfer-encode the content before handing it over, so the
/// escapes arrive as literal text. Bodies without any marker pass through
/// unchanged.
#[derive(Debug, Default)]
pub struct TransferDecodeTransformer;

impl TransferDecodeTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl MessageTransformer for TransferDecodeTransformer {
    fn transform(&self, message: &mut EmailMessage) {
        if !is_quoted_printable(message.html()) {
            return;
        }
        debug!(
            message_id = %message.message_id,
            "Decoding quoted-printable body"
        );
        let decoded = decode_transfer_encoding(message.html());
        message.set_html(decoded);
    }

    fn name(&self) -> &str {
        "transfer_decode"
    }
}
