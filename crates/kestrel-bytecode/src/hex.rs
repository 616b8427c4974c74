//! Hex text input
//!
//! Accepts the forms bytecode usually shows up in when pasted from a listing:
//! `"0b 02 05 02 03"`, `"0x0b,0x02"`, or one unbroken run like `"0b020502"`.

use crate::error::{BytecodeError, Result};

/// Parse hex text into bytes
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let tokens = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());

    for (position, token) in tokens.enumerate() {
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);

        if digits.is_empty() {
            return Err(BytecodeError::InvalidHex {
                token: token.to_string(),
                position,
            });
        }

        let decoded = ::hex::decode(digits).map_err(|_| BytecodeError::InvalidHex {
            token: token.to_string(),
            position,
        })?;
        bytes.extend_from_slice(&decoded);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaced_bytes() {
        assert_eq!(parse_hex("05 02 03").unwrap(), vec![0x05, 0x02, 0x03]);
    }

    #[test]
    fn test_prefixed_and_commas() {
        assert_eq!(parse_hex("0x00,0x09, 0XFF").unwrap(), vec![0x00, 0x09, 0xFF]);
    }

    #[test]
    fn test_unbroken_run() {
        assert_eq!(parse_hex("0b020502\n03").unwrap(), vec![0x0b, 0x02, 0x05, 0x02, 0x03]);
    }

    #[test]
    fn test_empty() {
        assert!(parse_hex("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_invalid() {
        match parse_hex("05 zz") {
            Err(BytecodeError::InvalidHex { token, position }) => {
                assert_eq!(token, "zz");
                assert_eq!(position, 1);
            }
            other => panic!("expected InvalidHex, got {other:?}"),
        }
        assert!(parse_hex("123").is_err());
        assert!(parse_hex("0x").is_err());
    }

    #[test]
    fn test_rejects_signs() {
        assert!(parse_hex("+f+f").is_err());
        assert!(parse_hex("0b -1").is_err());
    }
}
