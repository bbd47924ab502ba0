//! String encodings for taxon info values stored in snapshot columns.
//!
//! A codec must be injective: `decode(encode(x)) == x` for every value the
//! manager can hold.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

/// Converts info values to and from snapshot cells.
pub trait InfoCodec<I> {
    fn encode(&self, info: &I) -> String;

    fn decode(&self, cell: &str) -> Result<I, String>;
}

/// Uses `Display` to encode and `FromStr` to decode.
#[derive(Debug, Clone, Copy)]
pub struct DisplayCodec<I>(PhantomData<fn() -> I>);

impl<I> DisplayCodec<I> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<I> Default for DisplayCodec<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> InfoCodec<I> for DisplayCodec<I>
where
    I: Display + FromStr,
    I::Err: Display,
{
    fn encode(&self, info: &I) -> String {
        info.to_string()
    }

    fn decode(&self, cell: &str) -> Result<I, String> {
        cell.parse::<I>().map_err(|e| e.to_string())
    }
}

/// Like [`DisplayCodec`], but percent-encodes everything except ASCII
/// alphanumerics and `-_.~[]{}"'`, so whitespace and separators survive any
/// downstream tooling.
#[derive(Debug, Clone, Copy)]
pub struct UrlCodec<I>(PhantomData<fn() -> I>);

impl<I> UrlCodec<I> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<I> Default for UrlCodec<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> InfoCodec<I> for UrlCodec<I>
where
    I: Display + FromStr,
    I::Err: Display,
{
    fn encode(&self, info: &I) -> String {
        partial_url_encode(&info.to_string())
    }

    fn decode(&self, cell: &str) -> Result<I, String> {
        url_decode(cell)?.parse::<I>().map_err(|e| e.to_string())
    }
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"-_.~[]{}\"'".contains(&byte)
}

/// Percent-encodes every byte outside the unreserved set.
pub fn partial_url_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for &byte in text.as_bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Inverse of [`partial_url_encode`].
pub fn url_decode(text: &str) -> Result<String, String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| format!("invalid percent escape at byte {i} in {text:?}"))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|e| e.to_string())
}
