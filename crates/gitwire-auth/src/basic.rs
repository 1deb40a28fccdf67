//! Decoding of HTTP Basic-auth `Authorization` headers.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Decode an `Authorization: Basic <base64>` header value into `(login, password)`.
///
/// The decoded text is split at the **first** `:`; the password may itself
/// contain colons. Returns `None` if the scheme isn't `Basic`, the payload
/// isn't valid base64, the decoded bytes aren't UTF-8, or there is no `:`.
pub fn decode_basic_auth(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (login, password) = text.split_once(':')?;
    Some((login.to_string(), password.to_string()))
}
