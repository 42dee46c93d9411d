//! Font-aware decoding of show-text operands
//!
//! Show-text strings hold character codes. Codes are mapped to Unicode
//! through the font's `/ToUnicode` CMap when it has one. Simple fonts
//! without a map fall back to one character per byte. Composite (Type0)
//! fonts without a map have no recoverable text and decode to nothing.

use std::collections::HashMap;

use lazy_static::lazy_static;
use lopdf::{Dictionary, Document, Object};
use regex::Regex;
use tracing::{trace, warn};

use super::extract::stream_bytes;
use crate::text::decode_pdf_string;

/// Largest `bfrange` expanded; wider ranges in a broken CMap are clipped
const MAX_RANGE_LEN: u32 = 0xFFFF;

lazy_static! {
    static ref TOKEN: Regex =
        Regex::new(r"<([0-9A-Fa-f]+)>|\[|\]").expect("CMap token pattern is valid");
}

/// Character code to Unicode text
pub type CMap = HashMap<u32, String>;

/// Decodes show-text strings for one font
#[derive(Debug, Clone, PartialEq)]
pub struct FontDecoder {
    /// Bytes per character code: 1 for simple fonts, 2 for Type0
    code_width: usize,
    to_unicode: Option<CMap>,
}

impl Default for FontDecoder {
    fn default() -> Self {
        Self::simple()
    }
}

impl FontDecoder {
    /// Byte-per-char decoding, used when the font is unknown
    pub fn simple() -> Self {
        Self {
            code_width: 1,
            to_unicode: None,
        }
    }

    /// Build the decoder for a font dictionary
    pub fn from_font(doc: &Document, font: &Dictionary) -> Self {
        let composite = matches!(font.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Type0");
        let to_unicode = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|obj| match obj {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            })
            .and_then(|obj| obj.as_stream().ok())
            .and_then(|stream| match stream_bytes(stream) {
                Ok(bytes) => Some(parse_to_unicode(&bytes)),
                Err(e) => {
                    warn!(error = %e, "unreadable /ToUnicode stream");
                    None
                }
            })
            .filter(|cmap| !cmap.is_empty());

        if composite && to_unicode.is_none() {
            warn!("Type0 font without /ToUnicode; its text cannot be recovered");
        }
        Self {
            code_width: if composite { 2 } else { 1 },
            to_unicode,
        }
    }

    /// Decode one show-text string
    pub fn decode(&self, bytes: &[u8]) -> String {
        let Some(cmap) = &self.to_unicode else {
            return if self.code_width == 1 {
                decode_pdf_string(bytes)
            } else {
                String::new()
            };
        };

        let mut text = String::new();
        for chunk in bytes.chunks(self.code_width) {
            let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
            match cmap.get(&code) {
                Some(mapped) => text.push_str(mapped),
                None if self.code_width == 1 => text.push(char::from(chunk[0])),
                None => trace!(code, "unmapped character code"),
            }
        }
        text
    }
}

// ============================================================
// ToUnicode CMap parsing
// ============================================================

enum Token<'a> {
    Hex(&'a str),
    Open,
    Close,
}

fn tokens(section: &str) -> Vec<Token<'_>> {
    TOKEN
        .captures_iter(section)
        .map(|caps| match caps.get(1) {
            Some(hex) => Token::Hex(hex.as_str()),
            None if &caps[0] == "[" => Token::Open,
            None => Token::Close,
        })
        .collect()
}

/// Bodies between each `begin` marker and the following `end` marker
fn sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut rest = content;
    while let Some(start) = rest.find(begin) {
        let body = &rest[start + begin.len()..];
        let Some(stop) = body.find(end) else {
            break;
        };
        found.push(&body[..stop]);
        rest = &body[stop + end.len()..];
    }
    found
}

fn code(hex: &str) -> Option<u32> {
    if hex.len() > 8 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// Destination strings are UTF-16BE; short forms are a single code point
fn utf16_units(hex: &str) -> Option<Vec<u16>> {
    if hex.len() % 4 != 0 {
        let value = u16::try_from(u32::from_str_radix(hex, 16).ok()?).ok()?;
        return Some(vec![value]);
    }
    (0..hex.len())
        .step_by(4)
        .map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
        .collect()
}

fn destination(hex: &str) -> Option<String> {
    utf16_units(hex).map(|units| String::from_utf16_lossy(&units))
}

/// Parse `bfchar` and `bfrange` mappings out of a ToUnicode CMap stream
pub fn parse_to_unicode(data: &[u8]) -> CMap {
    let content = String::from_utf8_lossy(data);
    let mut cmap = CMap::new();

    for section in sections(&content, "beginbfchar", "endbfchar") {
        let hexes: Vec<&str> = tokens(section)
            .into_iter()
            .filter_map(|token| match token {
                Token::Hex(hex) => Some(hex),
                _ => None,
            })
            .collect();
        for pair in hexes.chunks_exact(2) {
            if let (Some(src), Some(dst)) = (code(pair[0]), destination(pair[1])) {
                cmap.insert(src, dst);
            }
        }
    }

    for section in sections(&content, "beginbfrange", "endbfrange") {
        let mut iter = tokens(section).into_iter();
        while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (iter.next(), iter.next()) {
            let (Some(lo), Some(hi)) = (code(lo), code(hi)) else {
                break;
            };
            let len = hi.saturating_sub(lo).min(MAX_RANGE_LEN);
            match iter.next() {
                Some(Token::Hex(dst)) => {
                    let Some(units) = utf16_units(dst) else {
                        continue;
                    };
                    for offset in 0..=len {
                        let mut shifted = units.clone();
                        if let Some(last) = shifted.last_mut() {
                            *last = last.wrapping_add(offset as u16);
                        }
                        cmap.insert(lo + offset, String::from_utf16_lossy(&shifted));
                    }
                }
                Some(Token::Open) => {
                    let mut offset = 0;
                    for token in iter.by_ref() {
                        match token {
                            Token::Hex(dst) => {
                                if let Some(text) = destination(dst) {
                                    if offset <= len {
                                        cmap.insert(lo + offset, text);
                                    }
                                }
                                offset += 1;
                            }
                            Token::Close => break,
                            Token::Open => {}
                        }
                    }
                }
                _ => break,
            }
        }
    }

    trace!(entries = cmap.len(), "parsed ToUnicode CMap");
    cmap
}

// ============================================================
// Tests
// ============================================================
