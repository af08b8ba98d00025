//! cps-client: client library for the Clusterpoint document database
//!
//! Requests are XML documents wrapped in a small protocol buffer envelope and
//! sent behind an 8-byte frame header. Replies come back the same way and are
//! parsed into an arena DOM that supports a restricted XPath dialect.
//!
//! # Frame Format
//!
//! ```text
//! +-----------+--------------+----------------+
//! | 09 09     | 00 00        | Len u32 (LE)   |
//! +-----------+--------------+----------------+
//! | Envelope (Len bytes)                      |
//! |   field 1: request/reply XML              |
//! |   field 2: storage name (optional)        |
//! +-------------------------------------------+
//! ```
//!
//! # Layers
//!
//! - [`varint`], [`encoder`], [`decoder`], [`protobuf`]: minimal protocol buffer codec
//! - [`frame`], [`envelope`]: wire framing
//! - [`xml`]: arena document, parser, writer, FindFast matcher and path builder
//! - [`request`], [`commands`], [`ordering`]: request construction
//! - [`response`]: typed access to replies
//! - [`config`], [`transport`], [`connection`]: talking to a server
//!
//! # Example
//!
//! ```rust
//! use cps_client::*;
//!
//! let envelope = Envelope::new("<cps:request/>", "products");
//! let framed = envelope.encode_framed()?;
//! assert_eq!(&framed[..4], &[0x09, 0x09, 0x00, 0x00]);
//!
//! let decoded = Envelope::decode(frame::payload(&framed)?)?;
//! assert_eq!(decoded, envelope);
//!
//! let doc = Document::parse("<results><doc><id>1</id></doc><doc><id>2</id></doc></results>")?;
//! let ids: Vec<_> = doc
//!     .find_fast("results/doc/id", true)
//!     .into_iter()
//!     .map(|n| doc.content(n).to_string())
//!     .collect();
//! assert_eq!(ids, ["1", "2"]);
//! # Ok::<(), cps_client::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod connection;
pub mod decoder;
pub mod encoder;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod ordering;
pub mod protobuf;
pub mod request;
pub mod response;
pub mod transport;
pub mod varint;
pub mod xml;

// Re-export main types
pub use config::{ConnectionConfig, Endpoint, Timeouts};
pub use connection::Connection;
pub use decoder::FieldCursor;
pub use encoder::MessageEncoder;
pub use envelope::Envelope;
pub use error::{Error, Operation, ProtocolError, Result, ServerError};
pub use frame::FrameHeader;
pub use protobuf::{Field, Message, WireType};
pub use request::Request;
pub use response::{ReplyError, Response};
pub use transport::Transport;
pub use xml::{Document, Node, NodeId};

/// Frame magic bytes
pub const FRAME_MAGIC: [u8; 2] = [0x09, 0x09];

/// Default upper bound on a reply payload (64 MiB)
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Namespace URI bound to the `cps` prefix
pub const CPS_NAMESPACE: &str = "www.clusterpoint.com";

/// Port used when a `tcp://` connection string has none
pub const DEFAULT_TCP_PORT: u16 = 5550;

/// Port used when an `http://` connection string has none
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default value of the `application` envelope parameter
pub const DEFAULT_APPLICATION_ID: &str = "CPS_RUST_API";
