//! Byte transports
//!
//! TCP and Unix sockets carry framed envelopes: the request bytes are written
//! as given and the reply is read as an 8-byte [`FrameHeader`] followed by its
//! payload. The HTTP transport posts raw request XML and returns the body.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{Error, Operation, ProtocolError, Result};
use crate::frame::FrameHeader;

/// Request/reply channel to a server
#[async_trait]
pub trait Transport: Send {
    /// Open the underlying connection within `timeout`
    async fn connect(&mut self, timeout: Duration) -> Result<()>;

    /// Whether a connection is currently open
    fn is_connected(&self) -> bool;

    /// Whether requests must be wrapped in a framed envelope
    fn is_framed(&self) -> bool {
        true
    }

    /// Send request bytes and return the reply payload
    ///
    /// Any failure closes the connection.
    async fn send_and_receive(
        &mut self,
        request: &[u8],
        send_timeout: Duration,
        receive_timeout: Duration,
    ) -> Result<Vec<u8>>;

    /// Drop the connection
    fn close(&mut self);
}

async fn with_timeout<T, F>(op: Operation, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::Timeout(op))?
}

fn read_error(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::Protocol(ProtocolError::UnexpectedEof)
    } else {
        Error::Io(e)
    }
}

/// Write a request and read one framed reply
///
/// The header and payload share a single receive deadline.
pub async fn exchange_framed<S>(
    stream: &mut S,
    request: &[u8],
    send_timeout: Duration,
    receive_timeout: Duration,
    max_frame_size: usize,
) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    with_timeout(Operation::Send, send_timeout, async {
        stream.write_all(request).await?;
        stream.flush().await?;
        Ok::<_, Error>(())
    })
    .await?;

    with_timeout(Operation::Receive, receive_timeout, async {
        let mut header = [0u8; FrameHeader::SIZE];
        stream.read_exact(&mut header).await.map_err(read_error)?;
        let header = FrameHeader::decode(&header)?;
        debug!(len = header.len, "reply frame");

        let len = header.len as usize;
        if len > max_frame_size {
            return Err(ProtocolError::FrameTooLarge(len).into());
        }
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await.map_err(read_error)?;
        Ok::<_, Error>(payload)
    })
    .await
}

async fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    with_timeout(Operation::Connect, timeout, async {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::Connect(format!("failed to connect to {host}:{port}: {e}")))?;
        stream.set_nodelay(true)?;
        Ok::<_, Error>(stream)
    })
    .await
}

/// Framed transport over TCP
pub struct TcpTransport {
    host: String,
    port: u16,
    max_frame_size: usize,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Transport for `host:port`; nothing is opened until `connect`
    pub fn new(host: impl Into<String>, port: u16, max_frame_size: usize) -> Self {
        Self {
            host: host.into(),
            port,
            max_frame_size,
            stream: None,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self, timeout: Duration) -> Result<()> {
        debug!(host = %self.host, port = self.port, "connecting");
        self.stream = Some(connect_tcp(&self.host, self.port, timeout).await?);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send_and_receive(
        &mut self,
        request: &[u8],
        send_timeout: Duration,
        receive_timeout: Duration,
    ) -> Result<Vec<u8>> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::Connect("not connected".into()));
        };
        debug!(len = request.len(), "sending frame");
        let result =
            exchange_framed(stream, request, send_timeout, receive_timeout, self.max_frame_size)
                .await;
        if result.is_err() {
            self.close();
        }
        result
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(host = %self.host, port = self.port, "connection closed");
        }
    }
}

/// Framed transport over a Unix domain socket
#[cfg(unix)]
pub struct UnixTransport {
    path: std::path::PathBuf,
    max_frame_size: usize,
    stream: Option<tokio::net::UnixStream>,
}

#[cfg(unix)]
impl UnixTransport {
    /// Transport for the socket at `path`
    pub fn new(path: impl Into<std::path::PathBuf>, max_frame_size: usize) -> Self {
        Self {
            path: path.into(),
            max_frame_size,
            stream: None,
        }
    }
}

#[cfg(unix)]
#[async_trait]
impl Transport for UnixTransport {
    async fn connect(&mut self, timeout: Duration) -> Result<()> {
        debug!(path = %self.path.display(), "connecting");
        let path = &self.path;
        let stream = with_timeout(Operation::Connect, timeout, async {
            tokio::net::UnixStream::connect(path).await.map_err(|e| {
                Error::Connect(format!("failed to connect to {}: {e}", path.display()))
            })
        })
        .await?;
        self.stream = Some(stream);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send_and_receive(
        &mut self,
        request: &[u8],
        send_timeout: Duration,
        receive_timeout: Duration,
    ) -> Result<Vec<u8>> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::Connect("not connected".into()));
        };
        debug!(len = request.len(), "sending frame");
        let result =
            exchange_framed(stream, request, send_timeout, receive_timeout, self.max_frame_size)
                .await;
        if result.is_err() {
            self.close();
        }
        result
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!(path = %self.path.display(), "connection closed");
        }
    }
}

/// Unframed transport posting request XML over HTTP/1.0
///
/// Every exchange opens a fresh socket; `connect` only records the timeout.
pub struct HttpTransport {
    host: String,
    port: u16,
    path: String,
    max_frame_size: usize,
    connect_timeout: Option<Duration>,
}

impl HttpTransport {
    /// Transport posting to `http://host:port<path>`
    pub fn new(
        host: impl Into<String>,
        port: u16,
        path: impl Into<String>,
        max_frame_size: usize,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            path: path.into(),
            max_frame_size,
            connect_timeout: None,
        }
    }

    fn request_head(&self, content_length: usize) -> String {
        format!(
            concat!(
                "POST {} HTTP/1.0\r\nHost: {}:{}\r\nContent-Type: text/xml\r\n",
                "Content-Length: {}\r\nConnection: close\r\n\r\n"
            ),
            self.path, self.host, self.port, content_length
        )
    }
}

/// Body of a raw HTTP reply
pub fn http_body(reply: &[u8]) -> Result<&[u8]> {
    reply
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| &reply[i + 4..])
        .ok_or(Error::Protocol(ProtocolError::MalformedHttpReply))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&mut self, timeout: Duration) -> Result<()> {
        self.connect_timeout = Some(timeout);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connect_timeout.is_some()
    }

    fn is_framed(&self) -> bool {
        false
    }

    async fn send_and_receive(
        &mut self,
        request: &[u8],
        send_timeout: Duration,
        receive_timeout: Duration,
    ) -> Result<Vec<u8>> {
        let Some(connect_timeout) = self.connect_timeout else {
            return Err(Error::Connect("not connected".into()));
        };
        debug!(host = %self.host, port = self.port, path = %self.path, "posting request");
        let mut stream = connect_tcp(&self.host, self.port, connect_timeout).await?;

        let head = self.request_head(request.len());
        with_timeout(Operation::Send, send_timeout, async {
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(request).await?;
            stream.flush().await?;
            Ok::<_, Error>(())
        })
        .await?;

        let limit = self.max_frame_size;
        let reply = with_timeout(Operation::Receive, receive_timeout, async {
            let mut reply = Vec::new();
            (&mut stream)
                .take(limit as u64 + 1)
                .read_to_end(&mut reply)
                .await?;
            Ok::<_, Error>(reply)
        })
        .await?;
        if reply.len() > limit {
            return Err(ProtocolError::FrameTooLarge(reply.len()).into());
        }
        Ok(http_body(&reply)?.to_vec())
    }

    fn close(&mut self) {
        self.connect_timeout = None;
    }
}
