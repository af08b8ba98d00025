//! Integration tests for cps-client
//!
//! These tests drive requests through the full stack against an in-process
//! server speaking the framed envelope protocol.

use cps_client::commands::query;
use cps_client::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const SEARCH_REPLY: &str = concat!(
    r#"<cps:reply xmlns:cps="www.clusterpoint.com">"#,
    "<cps:command>search</cps:command><cps:seconds>0.012</cps:seconds><cps:storage>products</cps:storage>",
    "<cps:content><hits>2</hits><from>0</from><to>2</to><results>",
    "<document><id>1</id><title>Laptop</title><price>999</price></document>",
    "<document><id>2</id><title>Lamp &amp; shade</title><price>25</price></document>",
    r#"</results><facet path="category"><term hits="2">home</term></facet></cps:content></cps:reply>"#
);

/// Read one framed request, hand its XML to `reply`, write back a framed reply
async fn serve_one<F>(listener: TcpListener, reply: F) -> Envelope
where
    F: FnOnce(&Envelope) -> Option<String>,
{
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut header = [0u8; FrameHeader::SIZE];
    socket.read_exact(&mut header).await.unwrap();
    let len = frame::unframe(&header).unwrap() as usize;
    let mut payload = vec![0u8; len];
    socket.read_exact(&mut payload).await.unwrap();
    let request = Envelope::decode(&payload).unwrap();

    if let Some(xml) = reply(&request) {
        let bytes = Envelope::new(xml, "").encode_framed().unwrap();
        socket.write_all(&bytes).await.unwrap();
    } else {
        // Hold the socket open without answering
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    }
    request
}

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("tcp://{addr}"))
}

#[tokio::test]
async fn test_search_roundtrip() {
    let (listener, conn_str) = listener().await;
    let server = tokio::spawn(serve_one(listener, |_| Some(SEARCH_REPLY.to_string())));

    let config = ConnectionConfig::new(conn_str, "products", "root", "secret");
    let mut conn = Connection::new(config).unwrap();
    let mut request = Request::search(&query("lap*", "title"));
    request.set_docs(10).set_facets(["category"]);
    let response = conn.send_request(&request).await.unwrap();

    assert_eq!(response.command(), "search");
    assert_eq!(response.hits(), 2);
    assert_eq!(response.documents(false).len(), 2);
    let titles: Vec<String> = response
        .documents_xml()
        .iter()
        .filter_map(|d| d.find_content("document/title").map(str::to_string))
        .collect();
    assert_eq!(titles, ["Laptop", "Lamp & shade"]);
    assert_eq!(response.facets()["category"].terms[0].hits, Some(2));

    let sent = server.await.unwrap();
    assert_eq!(sent.storage.as_deref(), Some("products"));
    let sent = Document::parse(&sent.xml).unwrap();
    assert_eq!(sent.find_content("cps:request/cps:command"), Some("search"));
    assert_eq!(sent.find_content("cps:request/cps:user"), Some("root"));
    assert_eq!(sent.find_content("cps:request/cps:content/docs"), Some("10"));
    assert_eq!(
        sent.find_content("cps:request/cps:content/query/title"),
        Some("lap*")
    );
}

#[tokio::test]
async fn test_insert_rejected() {
    let (listener, conn_str) = listener().await;
    tokio::spawn(serve_one(listener, |_| {
        Some(
            concat!(
                r#"<cps:reply xmlns:cps="www.clusterpoint.com"><cps:command>insert</cps:command>"#,
                "<cps:error><code>2824</code><message>Document already exists</message>",
                "<level>REJECTED</level><source>storage</source><document_id>1</document_id></cps:error>",
                "</cps:reply>"
            )
            .to_string(),
        )
    }));

    let mut conn = Connection::new(ConnectionConfig::new(conn_str, "products", "", "")).unwrap();
    let request = Request::insert([("1", "<title>Laptop</title>")]);
    match conn.send_request(&request).await {
        Err(Error::Server(err)) => {
            assert_eq!(err.code, "2824");
            assert_eq!(err.level, "REJECTED");
            assert_eq!(err.document_ids, ["1"]);
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_warning_passes_through() {
    let (listener, conn_str) = listener().await;
    tokio::spawn(serve_one(listener, |_| {
        Some(
            concat!(
                r#"<cps:reply xmlns:cps="www.clusterpoint.com"><cps:command>delete</cps:command>"#,
                "<cps:error><code>2558</code><message>Document not found</message><level>WARNING</level></cps:error>",
                "<cps:content><document><id>9</id></document></cps:content></cps:reply>"
            )
            .to_string(),
        )
    }));

    let mut conn = Connection::new(ConnectionConfig::new(conn_str, "products", "", "")).unwrap();
    let response = conn.send_request(&Request::delete(["9"])).await.unwrap();
    assert_eq!(response.errors().len(), 1);
    assert_eq!(response.modified_ids(), ["9"]);
}

#[tokio::test]
async fn test_receive_timeout() {
    let (listener, conn_str) = listener().await;
    tokio::spawn(serve_one(listener, |_| None));

    let mut config = ConnectionConfig::new(conn_str, "products", "", "");
    config.timeouts.receive_secs = 1;
    let mut conn = Connection::new(config).unwrap();
    let err = conn.send_request(&Request::status()).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(Operation::Receive)));
}

#[tokio::test]
async fn test_connect_refused() {
    let (listener, conn_str) = listener().await;
    drop(listener);

    let mut conn = Connection::new(ConnectionConfig::new(conn_str, "products", "", "")).unwrap();
    assert!(matches!(conn.connect().await, Err(Error::Connect(_))));
}

#[test]
fn test_request_xml_queries() {
    let config = ConnectionConfig::new("tcp://localhost", "products", "root", "pw");
    let conn = Connection::with_transport(
        config,
        Box::new(transport::HttpTransport::new("localhost", 80, "/", 1024)),
    )
    .unwrap();
    let mut request = Request::update([("7", "<title>Desk</title><price>120</price>")]);
    request.set_request_id("req-1");
    let xml = conn.render(&request).unwrap();

    let doc = Document::parse(&xml).unwrap();
    assert_eq!(doc.find_content("cps:request/cps:requestid"), Some("req-1"));
    assert_eq!(doc.find_content("cps:request/cps:type"), Some("auto"));
    assert_eq!(doc.find_content("cps:request/cps:content/document/id"), Some("7"));
    assert_eq!(doc.find_content("cps:request/cps:content/document/price"), Some("120"));
    assert_eq!(doc.find_fast("cps:request/cps:*", true).len(), 8);
}

#[test]
fn test_framed_envelope_bytes() {
    let bytes = Envelope::new("<x/>", "db").encode_framed().unwrap();
    assert_eq!(
        bytes,
        [
            0x09, 0x09, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, // header, len 10
            0x0A, 0x04, b'<', b'x', b'/', b'>', // field 1
            0x12, 0x02, b'd', b'b', // field 2
        ]
    );
}
