//! PMT control record codec.
//!
//! The PTT daemon publishes short binary "PMT" records over ZeroMQ: one type
//! byte, a big-endian u16 payload length, then an ASCII payload. The known
//! payloads are `"SOT"` (start of transmission), `"EOT"` (end of
//! transmission) and `"SUST<integer>"` (set the TX sustain time).

/// PMT type byte for a string record. Fixed by the wire contract.
pub const PMT_TYPE_STRING: u8 = 2;

/// Header size: type byte + u16 length.
const HEADER_LEN: usize = 3;

/// Decoded control record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRecord {
    /// "SOT": PTT pressed, switch to transmit.
    Start,
    /// "EOT": PTT released, switch back to receive.
    Stop,
    /// "SUST<n>" and friends: update a named parameter, no state change.
    SetParameter { name: String, value: String },
    /// A well-formed record whose payload matches no known literal.
    Unrecognized,
}

/// Encode a record into its wire form. Returns `None` for records that have
/// no wire representation (`Unrecognized`).
pub fn encode(record: &ControlRecord) -> Option<Vec<u8>> {
    let payload = match record {
        ControlRecord::Start => "SOT".to_string(),
        ControlRecord::Stop => "EOT".to_string(),
        ControlRecord::SetParameter { name, value } => format!("{}{}", name, value),
        ControlRecord::Unrecognized => return None,
    };

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(PMT_TYPE_STRING);
    out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    out.extend_from_slice(payload.as_bytes());
    Some(out)
}

/// Decode a received buffer.
///
/// Returns `None` for an empty or truncated buffer (the caller simply has no
/// record this iteration); `Some(Unrecognized)` for anything well-formed that
/// does not match a known payload. Never fails.
pub fn decode(buf: &[u8]) -> Option<ControlRecord> {
    if buf.len() < HEADER_LEN {
        return None;
    }

    let declared = u16::from_be_bytes([buf[1], buf[2]]) as usize;
    if buf.len() < HEADER_LEN + declared {
        // Truncated receive, not an error
        return None;
    }

    if buf[0] != PMT_TYPE_STRING || buf.len() != HEADER_LEN + declared {
        // Unknown type, or length field not matching the payload
        return Some(ControlRecord::Unrecognized);
    }

    let payload = &buf[HEADER_LEN..];
    if payload == b"SOT" {
        return Some(ControlRecord::Start);
    }
    if payload == b"EOT" {
        return Some(ControlRecord::Stop);
    }
    if let Some(rest) = payload.strip_prefix(b"SUST") {
        if !rest.is_empty() && rest.iter().all(|b| b.is_ascii_digit()) {
            return Some(ControlRecord::SetParameter {
                name: "SUST".to_string(),
                // digits only, checked above
                value: String::from_utf8_lossy(rest).into_owned(),
            });
        }
    }

    Some(ControlRecord::Unrecognized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sot_wire_bytes() {
        let bytes = encode(&ControlRecord::Start).unwrap();
        assert_eq!(bytes, vec![2, 0, 3, b'S', b'O', b'T']);
        assert_eq!(decode(&bytes), Some(ControlRecord::Start));
    }

    #[test]
    fn test_eot_wire_bytes() {
        let bytes = encode(&ControlRecord::Stop).unwrap();
        assert_eq!(bytes, vec![2, 0, 3, b'E', b'O', b'T']);
        assert_eq!(decode(&bytes), Some(ControlRecord::Stop));
    }

    #[test]
    fn test_round_trip_all_encodable() {
        let records = [
            ControlRecord::Start,
            ControlRecord::Stop,
            ControlRecord::SetParameter {
                name: "SUST".to_string(),
                value: "1000".to_string(),
            },
        ];
        for record in &records {
            let bytes = encode(record).unwrap();
            assert_eq!(decode(&bytes).as_ref(), Some(record), "{:?}", record);
        }
    }

    #[test]
    fn test_unrecognized_has_no_encoding() {
        assert_eq!(encode(&ControlRecord::Unrecognized), None);
    }

    #[test]
    fn test_empty_and_truncated_yield_no_record() {
        assert_eq!(decode(&[]), None);
        assert_eq!(decode(&[2]), None);
        assert_eq!(decode(&[2, 0]), None);
        // Declared length 3 but only 2 payload bytes present
        assert_eq!(decode(&[2, 0, 3, b'S', b'O']), None);
    }

    #[test]
    fn test_unknown_payload_is_unrecognized() {
        let bytes = encode(&ControlRecord::SetParameter {
            name: "BOGUS".to_string(),
            value: "".to_string(),
        })
        .unwrap();
        assert_eq!(decode(&bytes), Some(ControlRecord::Unrecognized));

        // Arbitrary garbage with a valid header
        assert_eq!(
            decode(&[2, 0, 2, 0xff, 0xfe]),
            Some(ControlRecord::Unrecognized)
        );
    }

    #[test]
    fn test_unknown_type_byte_is_unrecognized() {
        assert_eq!(
            decode(&[7, 0, 3, b'S', b'O', b'T']),
            Some(ControlRecord::Unrecognized)
        );
    }

    #[test]
    fn test_length_field_must_match_payload() {
        // Trailing junk past the declared length
        assert_eq!(
            decode(&[2, 0, 3, b'S', b'O', b'T', 0]),
            Some(ControlRecord::Unrecognized)
        );
    }

    #[test]
    fn test_sust_requires_integer_suffix() {
        let make = |payload: &[u8]| {
            let mut buf = vec![2];
            buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
            buf.extend_from_slice(payload);
            buf
        };
        assert_eq!(
            decode(&make(b"SUST250")),
            Some(ControlRecord::SetParameter {
                name: "SUST".to_string(),
                value: "250".to_string(),
            })
        );
        assert_eq!(decode(&make(b"SUST")), Some(ControlRecord::Unrecognized));
        assert_eq!(decode(&make(b"SUSTx5")), Some(ControlRecord::Unrecognized));
    }
}
