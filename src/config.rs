//! Connection configuration
//!
//! [`ConnectionConfig`] can be built in code or loaded from TOML:
//!
//! ```toml
//! connection_string = "tcp://db.example.com:5550"
//! storage = "products"
//! username = "root"
//! password = "secret"
//!
//! [envelope_params]
//! routing = "eu"
//!
//! [timeouts]
//! receive_secs = 120
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{DEFAULT_APPLICATION_ID, DEFAULT_HTTP_PORT, DEFAULT_TCP_PORT, MAX_FRAME_SIZE};

/// Directory holding local storage sockets
pub const STORAGE_SOCKET_DIR: &str = "/usr/local/cps2/storages";

/// Network timeouts in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Connection establishment
    pub connect_secs: u64,
    /// Writing a request
    pub send_secs: u64,
    /// Waiting for and reading a reply
    pub receive_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            send_secs: 30,
            receive_secs: 60,
        }
    }
}

impl Timeouts {
    /// Connect timeout
    #[inline]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    /// Send timeout
    #[inline]
    pub fn send(&self) -> Duration {
        Duration::from_secs(self.send_secs)
    }

    /// Receive timeout
    #[inline]
    pub fn receive(&self) -> Duration {
        Duration::from_secs(self.receive_secs)
    }
}

/// Settings of a [`Connection`](crate::Connection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// `tcp://host[:port]`, `unix://path`, `http://host[:port][/path]`,
    /// or empty for the local storage socket
    pub connection_string: String,
    /// Storage name
    pub storage: String,
    /// Account name
    pub username: String,
    /// Account password
    pub password: String,
    /// Path of the document root element
    pub document_root_xpath: String,
    /// Path of the document id element, below the root
    pub document_id_xpath: String,
    /// Sent as the `application` envelope parameter
    pub application_id: String,
    /// Extra envelope parameters sent with every request
    pub envelope_params: BTreeMap<String, String>,
    /// Build requests through the document model so malformed fragments fail early
    pub validate_requests: bool,
    /// Network timeouts
    pub timeouts: Timeouts,
    /// Largest accepted reply payload in bytes
    pub max_frame_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            storage: String::new(),
            username: String::new(),
            password: String::new(),
            document_root_xpath: "document".to_string(),
            document_id_xpath: "document/id".to_string(),
            application_id: DEFAULT_APPLICATION_ID.to_string(),
            envelope_params: BTreeMap::new(),
            validate_requests: false,
            timeouts: Timeouts::default(),
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl ConnectionConfig {
    /// Settings with default xpaths and timeouts
    pub fn new(
        connection_string: impl Into<String>,
        storage: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            connection_string: connection_string.into(),
            storage: storage.into(),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Load settings from TOML text; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::Usage(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Root xpath without surrounding slashes
    pub fn root_xpath(&self) -> &str {
        self.document_root_xpath.trim_matches('/')
    }

    /// Id xpath without surrounding slashes
    pub fn id_xpath(&self) -> &str {
        self.document_id_xpath.trim_matches('/')
    }

    /// Check the xpaths and the frame limit
    pub fn validate_settings(&self) -> Result<()> {
        id_path_below_root(&self.document_root_xpath, &self.document_id_xpath)?;
        if self.max_frame_size == 0 {
            return Err(Error::Usage("max_frame_size must be positive".into()));
        }
        Ok(())
    }

    /// Check the settings and resolve the endpoint
    pub fn validate(&self) -> Result<Endpoint> {
        self.validate_settings()?;
        Endpoint::parse(&self.connection_string, &self.storage)
    }
}

/// Path of the document id relative to the document root
///
/// Both xpaths are compared step by step with surrounding slashes ignored,
/// so `document/id` is below `document` but not below `doc`.
pub fn id_path_below_root<'a>(root: &str, id: &'a str) -> Result<&'a str> {
    let root = root.trim_matches('/');
    if root.is_empty() {
        return Err(Error::Usage("document root xpath is empty".into()));
    }
    let id = id.trim_matches('/');

    root.split('/')
        .try_fold(id, |rest, step| match rest.strip_prefix(step)? {
            "" => Some(""),
            tail => tail.strip_prefix('/'),
        })
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| {
            Error::Usage(format!("document id xpath '{id}' must be below root '{root}'"))
        })
}

/// Resolved server address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Local socket path
    Unix(PathBuf),
    /// Framed binary protocol over TCP
    #[allow(missing_docs)]
    Tcp { host: String, port: u16 },
    /// Raw XML over HTTP POST
    #[allow(missing_docs)]
    Http { host: String, port: u16, path: String },
}

impl Endpoint {
    /// Parse a connection string
    ///
    /// An empty string or bare `unix://` selects the storage's local socket.
    pub fn parse(connection_string: &str, storage: &str) -> Result<Self> {
        let conn = connection_string.trim();
        if conn.is_empty() || conn == "unix://" {
            return Ok(Endpoint::Unix(default_socket_path(storage)));
        }
        if let Some(path) = conn.strip_prefix("unix://") {
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if let Some(rest) = conn.strip_prefix("tcp://") {
            let (host, port) = split_host_port(rest.trim_end_matches('/'), DEFAULT_TCP_PORT)?;
            return Ok(Endpoint::Tcp { host, port });
        }
        if let Some(rest) = conn.strip_prefix("http://") {
            let (authority, path) = match rest.find('/') {
                Some(i) => (&rest[..i], &rest[i..]),
                None => (rest, "/"),
            };
            let (host, port) = split_host_port(authority, DEFAULT_HTTP_PORT)?;
            return Ok(Endpoint::Http {
                host,
                port,
                path: path.to_string(),
            });
        }
        Err(Error::Usage(format!(
            "unsupported connection string '{connection_string}'"
        )))
    }
}

fn default_socket_path(storage: &str) -> PathBuf {
    PathBuf::from(format!(
        "{STORAGE_SOCKET_DIR}/{}/storage.sock",
        storage.replace('/', "_")
    ))
}

fn split_host_port(authority: &str, default_port: u16) -> Result<(String, u16)> {
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| Error::Usage(format!("invalid port in '{authority}'")))?;
            (host, port)
        }
        None => (authority, default_port),
    };
    if host.is_empty() {
        return Err(Error::Usage(format!("missing host in '{authority}'")));
    }
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        assert_eq!(
            Endpoint::parse("tcp://db.local", "").unwrap(),
            Endpoint::Tcp { host: "db.local".into(), port: 5550 }
        );
        assert_eq!(
            Endpoint::parse("tcp://10.0.0.1:9000", "").unwrap(),
            Endpoint::Tcp { host: "10.0.0.1".into(), port: 9000 }
        );
        assert_eq!(
            Endpoint::parse("http://db.local:8080/cgi-bin/cps2", "").unwrap(),
            Endpoint::Http {
                host: "db.local".into(),
                port: 8080,
                path: "/cgi-bin/cps2".into()
            }
        );
        assert_eq!(
            Endpoint::parse("http://db.local", "").unwrap(),
            Endpoint::Http { host: "db.local".into(), port: 80, path: "/".into() }
        );
        assert_eq!(
            Endpoint::parse("unix:///tmp/cps.sock", "").unwrap(),
            Endpoint::Unix(PathBuf::from("/tmp/cps.sock"))
        );
    }

    #[test]
    fn test_default_socket() {
        assert_eq!(
            Endpoint::parse("", "shop/items").unwrap(),
            Endpoint::Unix(PathBuf::from("/usr/local/cps2/storages/shop_items/storage.sock"))
        );
        assert_eq!(
            Endpoint::parse("unix://", "db").unwrap(),
            Endpoint::Unix(PathBuf::from("/usr/local/cps2/storages/db/storage.sock"))
        );
    }

    #[test]
    fn test_endpoint_errors() {
        assert!(matches!(Endpoint::parse("ftp://x", ""), Err(Error::Usage(_))));
        assert!(matches!(Endpoint::parse("tcp://host:port", ""), Err(Error::Usage(_))));
        assert!(matches!(Endpoint::parse("tcp://:5550", ""), Err(Error::Usage(_))));
    }

    #[test]
    fn test_from_toml() {
        let config = ConnectionConfig::from_toml_str(
            r#"
            connection_string = "tcp://db:5550"
            storage = "products"
            document_root_xpath = "/item/"

            [envelope_params]
            routing = "eu"

            [timeouts]
            receive_secs = 120
            "#,
        );
        // id xpath default does not sit under the custom root
        assert!(matches!(config, Err(Error::Usage(_))));

        let config = ConnectionConfig::from_toml_str(
            r#"
            connection_string = "tcp://db:5550"
            storage = "products"
            document_root_xpath = "/item/"
            document_id_xpath = "item/key"

            [envelope_params]
            routing = "eu"

            [timeouts]
            receive_secs = 120
            "#,
        )
        .unwrap();
        assert_eq!(config.root_xpath(), "item");
        assert_eq!(config.id_xpath(), "item/key");
        assert_eq!(config.envelope_params["routing"], "eu");
        assert_eq!(config.timeouts.receive(), Duration::from_secs(120));
        assert_eq!(config.timeouts.connect(), Duration::from_secs(5));
        assert_eq!(config.application_id, DEFAULT_APPLICATION_ID);
    }

    #[test]
    fn test_id_path_below_root() {
        assert_eq!(id_path_below_root("document", "document/id").unwrap(), "id");
        assert_eq!(id_path_below_root("/a/b/", "a/b/meta/key/").unwrap(), "meta/key");
        for (root, id) in [
            ("doc", "document/id"),
            ("document", "document"),
            ("document", "document/"),
            ("/", "id"),
        ] {
            assert!(matches!(id_path_below_root(root, id), Err(Error::Usage(_))));
        }
    }

    #[test]
    fn test_prefix_root_rejected() {
        let mut config = ConnectionConfig::new("tcp://db", "products", "", "");
        config.document_root_xpath = "doc".into();
        assert!(matches!(config.validate(), Err(Error::Usage(_))));
        config.max_frame_size = 0;
        config.document_root_xpath = "document".into();
        assert!(matches!(config.validate_settings(), Err(Error::Usage(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            ConnectionConfig::from_toml_str("storage = 3"),
            Err(Error::Usage(_))
        ));
    }
}
