//! Client connection
//!
//! A [`Connection`] renders requests with its configured document paths and
//! envelope parameters, ships them through a [`Transport`] and parses the
//! reply. It also tracks the active transaction id.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::{ConnectionConfig, Endpoint};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::request::{RenderContext, Request};
use crate::response::Response;
use crate::transport::{HttpTransport, TcpTransport, Transport};

/// Connection to one storage
pub struct Connection {
    config: ConnectionConfig,
    transport: Box<dyn Transport>,
    transaction_id: Option<i64>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connection_string", &self.config.connection_string)
            .field("storage", &self.config.storage)
            .field("connected", &self.transport.is_connected())
            .field("transaction_id", &self.transaction_id)
            .finish()
    }
}

impl Connection {
    /// Validate `config` and pick the transport its connection string names
    ///
    /// No socket is opened until [`connect`](Self::connect) or the first request.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let max = config.max_frame_size;
        let transport: Box<dyn Transport> = match config.validate()? {
            Endpoint::Tcp { host, port } => Box::new(TcpTransport::new(host, port, max)),
            Endpoint::Http { host, port, path } => {
                Box::new(HttpTransport::new(host, port, path, max))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => Box::new(crate::transport::UnixTransport::new(path, max)),
            #[cfg(not(unix))]
            Endpoint::Unix(path) => {
                return Err(Error::Usage(format!(
                    "unix sockets are not available on this platform: {}",
                    path.display()
                )))
            }
        };
        Self::with_transport(config, transport)
    }

    /// Use a caller-supplied transport
    ///
    /// The connection string is ignored. The other settings are checked as in
    /// [`new`](Self::new).
    pub fn with_transport(config: ConnectionConfig, transport: Box<dyn Transport>) -> Result<Self> {
        config.validate_settings()?;
        Ok(Self {
            config,
            transport,
            transaction_id: None,
        })
    }

    /// Connection settings
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open the transport now instead of on first use
    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect(self.config.timeouts.connect()).await
    }

    /// Drop the underlying socket
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Active transaction, if any
    pub fn transaction_id(&self) -> Option<i64> {
        self.transaction_id
    }

    /// Forget the active transaction without contacting the server
    pub fn clear_transaction_id(&mut self) {
        self.transaction_id = None;
    }

    fn envelope_params(&self, request: &Request) -> BTreeMap<String, Vec<String>> {
        let mut params: BTreeMap<String, Vec<String>> = self
            .config
            .envelope_params
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect();

        let mut set = |name: &str, value: &str| {
            params.insert(name.to_string(), vec![value.to_string()]);
        };
        set("storage", &self.config.storage);
        set("user", &self.config.username);
        set("password", &self.config.password);
        if !self.config.application_id.is_empty() {
            set("application", &self.config.application_id);
        }
        for (name, value) in request.envelope_params() {
            set(name, &value);
        }
        params
    }

    /// Render the XML that `request` would be sent as
    pub fn render(&self, request: &Request) -> Result<String> {
        let envelope = self.envelope_params(request);
        let ctx = RenderContext {
            document_root_xpath: self.config.root_xpath(),
            document_id_xpath: self.config.id_xpath(),
            envelope: &envelope,
            transaction_id: self.transaction_id,
        };
        if self.config.validate_requests {
            Ok(request.render_document(&ctx)?.to_xml_string(false))
        } else {
            Ok(request.render_xml(&ctx))
        }
    }

    /// Send a request and return the parsed reply
    ///
    /// Replies carrying an error of severity `REJECTED`, `FAILED`, `ERROR` or
    /// `FATAL` become [`Error::Server`].
    pub async fn send_request(&mut self, request: &Request) -> Result<Response> {
        let xml = self.render(request)?;
        debug!(command = request.command(), storage = %self.config.storage, "sending request");

        let reply = self.send_raw(&xml).await?;
        let response =
            Response::parse(&reply, self.config.root_xpath(), self.config.id_xpath())?
                .into_result()?;
        debug!(
            command = request.command(),
            seconds = response.seconds(),
            "received reply"
        );

        match request.command() {
            "begin-transaction" => {
                self.transaction_id = response.param_as("transaction_id");
                debug!(transaction_id = ?self.transaction_id, "transaction started");
            }
            "commit-transaction" | "rollback-transaction" => {
                debug!(transaction_id = ?self.transaction_id, "transaction finished");
                self.transaction_id = None;
            }
            _ => {}
        }
        Ok(response)
    }

    /// Send request XML as is and return the reply XML
    pub async fn send_raw(&mut self, xml: &str) -> Result<String> {
        trace!(request = xml, "request xml");
        if !self.transport.is_connected() {
            self.connect().await?;
        }
        let timeouts = self.config.timeouts;
        let reply = if self.transport.is_framed() {
            let bytes = Envelope::new(xml, &self.config.storage).encode_framed()?;
            let payload = self
                .transport
                .send_and_receive(&bytes, timeouts.send(), timeouts.receive())
                .await?;
            Envelope::decode(&payload)?.xml
        } else {
            let body = self
                .transport
                .send_and_receive(xml.as_bytes(), timeouts.send(), timeouts.receive())
                .await?;
            String::from_utf8(body)
                .map_err(|e| Error::Parse(format!("reply is not valid utf-8: {e}")))?
        };
        trace!(reply = %reply, "reply xml");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Transport answering every request with a fixed reply
    struct Canned {
        reply: String,
        sent: Arc<Mutex<Vec<String>>>,
        connected: bool,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn connect(&mut self, _timeout: Duration) -> Result<()> {
            self.connected = true;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn is_framed(&self) -> bool {
            false
        }

        async fn send_and_receive(
            &mut self,
            request: &[u8],
            _send_timeout: Duration,
            _receive_timeout: Duration,
        ) -> Result<Vec<u8>> {
            assert!(self.connected);
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8(request.to_vec()).unwrap());
            Ok(self.reply.clone().into_bytes())
        }

        fn close(&mut self) {}
    }

    fn connection(reply: &str) -> (Connection, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = Canned {
            reply: reply.to_string(),
            sent: sent.clone(),
            connected: false,
        };
        let config = ConnectionConfig::new("tcp://localhost", "db", "root", "pw");
        (Connection::with_transport(config, Box::new(transport)).unwrap(), sent)
    }

    #[test]
    fn test_with_transport_checks_xpaths() {
        let mut config = ConnectionConfig::new("tcp://localhost", "db", "", "");
        config.document_root_xpath = "doc".into();
        let transport = Canned {
            reply: String::new(),
            sent: Arc::default(),
            connected: false,
        };
        assert!(matches!(
            Connection::with_transport(config, Box::new(transport)),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_new_picks_transport() {
        assert!(Connection::new(ConnectionConfig::new("tcp://db", "s", "", "")).is_ok());
        assert!(Connection::new(ConnectionConfig::new("http://db/cps", "s", "", "")).is_ok());
        assert!(matches!(
            Connection::new(ConnectionConfig::new("gopher://db", "s", "", "")),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_render_envelope() {
        let (mut conn, _) = connection("");
        conn.config.envelope_params.insert("routing".into(), "eu".into());
        let xml = conn.render(&Request::new("search")).unwrap();
        assert!(xml.starts_with(r#"<cps:request xmlns:cps="www.clusterpoint.com">"#));
        assert!(xml.contains("<cps:application>CPS_RUST_API</cps:application>"));
        assert!(xml.contains("<cps:command>search</cps:command>"));
        assert!(xml.contains("<cps:password>pw</cps:password>"));
        assert!(xml.contains("<cps:routing>eu</cps:routing>"));
        assert!(xml.contains("<cps:storage>db</cps:storage>"));
        assert!(xml.contains("<cps:user>root</cps:user>"));
    }

    #[test]
    fn test_render_validated_matches_plain() {
        let (mut conn, _) = connection("");
        let mut request = Request::new("insert");
        request.set_document_with_id("1", "<title>a &amp; b</title>");
        let plain = conn.render(&request).unwrap();
        conn.config.validate_requests = true;
        assert_eq!(conn.render(&request).unwrap(), plain);
    }

    #[tokio::test]
    async fn test_transaction_tracking() {
        let (mut conn, sent) = connection(concat!(
            r#"<cps:reply xmlns:cps="www.clusterpoint.com"><cps:command>begin-transaction</cps:command>"#,
            "<cps:content><transaction_id>42</transaction_id></cps:content></cps:reply>"
        ));
        conn.send_request(&Request::new("begin-transaction")).await.unwrap();
        assert_eq!(conn.transaction_id(), Some(42));

        conn.send_request(&Request::new("search")).await.unwrap();
        assert!(sent.lock().unwrap()[1].contains("<transaction_id>42</transaction_id>"));

        conn.send_request(&Request::new("commit-transaction")).await.unwrap();
        assert_eq!(conn.transaction_id(), None);
    }

    #[tokio::test]
    async fn test_failed_reply() {
        let (mut conn, _) = connection(concat!(
            r#"<cps:reply xmlns:cps="www.clusterpoint.com"><cps:error><code>2824</code>"#,
            "<message>exists</message><level>REJECTED</level></cps:error></cps:reply>"
        ));
        match conn.send_request(&Request::new("insert")).await {
            Err(Error::Server(err)) => assert_eq!(err.code, "2824"),
            other => panic!("expected server error, got {other:?}"),
        }
    }
}
