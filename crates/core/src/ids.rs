use std::fmt::Write;

pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Hex form of an OTLP id field; all-empty ids are treated as absent.
pub fn id_to_hex(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        None
    } else {
        Some(to_hex(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_lowercase_hex() {
        assert_eq!(to_hex(&[0x0a, 0xff, 0x00]), "0aff00");
        assert_eq!(id_to_hex(&[]), None);
        assert_eq!(id_to_hex(&[0xab]), Some("ab".to_string()));
    }
}
