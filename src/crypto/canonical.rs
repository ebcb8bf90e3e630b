//! Canonical payload reconstruction.
//!
//! The validation server signs the response JSON *without* its trailing
//! `signature` member. To verify, the client must reconstruct that exact byte
//! sequence from the received body: strip the `,"signature":"..."` member
//! (whitespace-tolerant) and keep the closing brace.

/// Strip the trailing signature member from a raw JSON response.
///
/// Returns the canonical form the signature was computed over. If the body
/// does not end with a signature member, the input is returned unchanged and
/// verification against it will simply fail.
pub fn strip_signature_field(raw: &str) -> String {
    match signature_start(raw) {
        Some(cut) => {
            // Everything before the comma is kept verbatim; the server signs
            // the body it built, not a re-serialized form.
            let mut canonical = raw[..cut].to_string();
            canonical.push('}');
            canonical
        }
        None => raw.to_string(),
    }
}

/// Find the byte offset of the comma opening a trailing
/// `,"signature":"<value>"}` sequence, scanning backwards from the end.
fn signature_start(raw: &str) -> Option<usize> {
    let bytes = raw.trim_end().as_bytes();

    // ...}  closing brace
    let mut i = bytes.len().checked_sub(1)?;
    if bytes[i] != b'}' {
        return None;
    }
    i = skip_ws_back(bytes, i)?;

    // "..."  the signature value (no escaped quotes in base64)
    if bytes[i] != b'"' {
        return None;
    }
    i = i.checked_sub(1)?;
    while bytes[i] != b'"' {
        i = i.checked_sub(1)?;
    }
    i = skip_ws_back(bytes, i)?;

    // :
    if bytes[i] != b':' {
        return None;
    }
    i = skip_ws_back(bytes, i)?;

    // "signature"
    let name = b"\"signature\"";
    let end = i + 1;
    let start = end.checked_sub(name.len())?;
    if &bytes[start..end] != name {
        return None;
    }
    i = skip_ws_back(bytes, start)?;

    // ,
    if bytes[i] != b',' {
        return None;
    }
    Some(i)
}

/// Step left from `idx` past any whitespace; returns the next index to
/// inspect, or `None` if the buffer is exhausted.
fn skip_ws_back(bytes: &[u8], idx: usize) -> Option<usize> {
    let mut i = idx.checked_sub(1)?;
    while (bytes[i] as char).is_ascii_whitespace() {
        i = i.checked_sub(1)?;
    }
    Some(i)
}
