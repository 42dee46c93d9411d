//! PDF text string helpers

use lopdf::{Object, StringFormat};

/// Decode a PDF string: UTF-16BE when it carries a BOM, otherwise one char per byte
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode a text string object: literal for ASCII, UTF-16BE with BOM otherwise
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_latin1_and_utf16() {
        assert_eq!(decode_pdf_string(b"plain"), "plain");
        assert_eq!(decode_pdf_string(&[0xE9]), "\u{e9}");
        assert_eq!(
            decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x41, 0x20, 0x22]),
            "A\u{2022}"
        );
    }

    #[test]
    fn test_text_string_ascii_is_literal() {
        match text_string("Quarterly Report") {
            Object::String(bytes, StringFormat::Literal) => assert_eq!(bytes, b"Quarterly Report"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_text_string_unicode_round_trips() {
        let title = "Rapport annuel \u{2013} \u{e9}t\u{e9}";
        match text_string(title) {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
                assert_eq!(decode_pdf_string(&bytes), title);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
