//! Request/reply envelope
//!
//! The envelope is a two-field protobuf message: field 1 carries the XML
//! document, field 2 the storage name (omitted when empty). On framed
//! transports the encoded envelope is the frame payload.

use crate::error::{CodecResult, ProtocolError};
use crate::frame;
use crate::protobuf::{Field, Message};

/// Field number of the XML payload
pub const XML_FIELD: u32 = 1;

/// Field number of the storage name
pub const STORAGE_FIELD: u32 = 2;

/// XML document plus target storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Request or reply XML
    pub xml: String,
    /// Storage name, if any
    pub storage: Option<String>,
}

impl Envelope {
    /// Create an envelope; an empty storage name is treated as absent
    pub fn new(xml: impl Into<String>, storage: &str) -> Self {
        Self {
            xml: xml.into(),
            storage: (!storage.is_empty()).then(|| storage.to_string()),
        }
    }

    /// Convert to a protobuf message
    pub fn to_message(&self) -> Message {
        let mut message = Message::new();
        message.push(Field::string(XML_FIELD, &self.xml));
        if let Some(storage) = self.storage.as_deref().filter(|s| !s.is_empty()) {
            message.push(Field::string(STORAGE_FIELD, storage));
        }
        message
    }

    /// Build from a protobuf message; field 1 is required
    pub fn from_message(message: &Message) -> CodecResult<Self> {
        let xml = message
            .get_field(XML_FIELD)
            .ok_or(ProtocolError::MissingField(XML_FIELD))?
            .as_str()
            .ok_or(ProtocolError::InvalidUtf8(XML_FIELD))?
            .to_string();

        let storage = match message.get_field(STORAGE_FIELD) {
            Some(field) => Some(
                field
                    .as_str()
                    .ok_or(ProtocolError::InvalidUtf8(STORAGE_FIELD))?
                    .to_string(),
            ),
            None => None,
        };

        Ok(Self { xml, storage })
    }

    /// Encode as protobuf bytes
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        self.to_message().encode()
    }

    /// Encode and prefix with a frame header
    pub fn encode_framed(&self) -> CodecResult<Vec<u8>> {
        frame::frame(&self.encode()?)
    }

    /// Decode from protobuf bytes (a frame payload)
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        Self::from_message(&Message::decode(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_bytes() {
        let envelope = Envelope::new("<a/>", "db");
        let framed = envelope.encode_framed().unwrap();

        let expected_payload = [
            0x0A, 0x04, b'<', b'a', b'/', b'>', 0x12, 0x02, b'd', b'b',
        ];
        assert_eq!(&framed[..4], &[0x09, 0x09, 0x00, 0x00]);
        assert_eq!(&framed[4..8], &(expected_payload.len() as u32).to_le_bytes());
        assert_eq!(&framed[8..], &expected_payload);

        let decoded = Envelope::decode(frame::payload(&framed).unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_empty_storage_is_omitted() {
        let envelope = Envelope::new("<a/>", "");
        assert_eq!(envelope.storage, None);
        assert_eq!(envelope.to_message().fields().len(), 1);

        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded.storage, None);
    }

    #[test]
    fn test_missing_xml_field() {
        let mut message = Message::new();
        message.push(Field::string(STORAGE_FIELD, "db"));
        assert_eq!(
            Envelope::decode(&message.encode().unwrap()),
            Err(ProtocolError::MissingField(XML_FIELD))
        );
    }

    #[test]
    fn test_invalid_utf8() {
        let mut message = Message::new();
        message.push(Field::bytes(XML_FIELD, &[0xFF, 0xFE]));
        assert_eq!(
            Envelope::decode(&message.encode().unwrap()),
            Err(ProtocolError::InvalidUtf8(XML_FIELD))
        );
    }
}
