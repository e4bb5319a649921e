// crates/daemon/src/codec.rs
use bytes::{Buf, BytesMut};
use serde_json::Value;
use tokio_util::codec::Decoder;

/// Decodes a byte stream of concatenated JSON objects with no delimiter
/// between records. Each call attempts to parse one value starting at the
/// front of the buffer; on success it consumes exactly the bytes that value
/// occupied, leaving any trailing bytes (the start of the next record) in
/// place for the following call.
///
/// `max_record_bytes` bounds how large an unterminated buffer is allowed to
/// grow while waiting for a record to complete, so a producer that never
/// closes its JSON object cannot grow the connection's buffer unbounded.
#[derive(Debug)]
pub struct JsonRecordCodec {
    max_record_bytes: usize,
}

impl Default for JsonRecordCodec {
    fn default() -> Self {
        Self { max_record_bytes: 1024 * 1024 }
    }
}

impl JsonRecordCodec {
    pub fn with_max_record_bytes(max_record_bytes: usize) -> Self {
        Self { max_record_bytes }
    }
}

impl Decoder for JsonRecordCodec {
    type Item = Value;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut stream = serde_json::Deserializer::from_slice(src).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                let consumed = stream.byte_offset();
                src.advance(consumed);
                Ok(Some(value))
            }
            Some(Err(err)) if err.is_eof() => {
                if src.len() > self.max_record_bytes {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("record exceeds {} bytes without completing", self.max_record_bytes),
                    ));
                }
                Ok(None)
            }
            Some(Err(err)) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, err)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_one_record_at_a_time_with_no_delimiter() {
        let mut codec = JsonRecordCodec::default();
        let mut buf = BytesMut::from(r#"{"a":1}{"b":2}"#);

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first, serde_json::json!({"a": 1}));

        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second, serde_json::json!({"b": 2}));

        assert!(buf.is_empty());
    }

    #[test]
    fn awaits_more_bytes_on_a_truncated_record() {
        let mut codec = JsonRecordCodec::default();
        let mut buf = BytesMut::from(r#"{"a":"#);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"1}");
        let value = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let mut codec = JsonRecordCodec::default();
        let mut buf = BytesMut::from(r#"{"a": }"#);
        assert!(codec.decode(&mut buf).is_err());
    }
}
