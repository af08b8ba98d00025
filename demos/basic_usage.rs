//! Basic usage example for cps-client
//!
//! Works offline: builds a request, frames it, and picks values out of a
//! canned reply.
//!
//! Run with: cargo run --example basic_usage

use std::collections::BTreeMap;

use cps_client::commands::query;
use cps_client::request::RenderContext;
use cps_client::*;

fn main() -> Result<()> {
    println!("cps-client Basic Usage Example");
    println!("==============================");

    // Example 1: Render a search request
    println!("\n1. Search Request:");
    let mut request = Request::search(&query("lap*", "title"));
    request
        .set_docs(5)
        .set_ordering([ordering::numeric("price", ordering::ASCENDING)]);

    let envelope = BTreeMap::from([
        ("command".to_string(), vec!["search".to_string()]),
        ("storage".to_string(), vec!["products".to_string()]),
    ]);
    let ctx = RenderContext {
        document_root_xpath: "document",
        document_id_xpath: "document/id",
        envelope: &envelope,
        transaction_id: None,
    };
    let xml = request.render_document(&ctx)?.to_xml_string(true);
    println!("{xml}");

    // Example 2: Frame it for the wire
    println!("2. Framed Envelope:");
    let framed = Envelope::new(xml, "products").encode_framed()?;
    let header = FrameHeader::decode(&framed)?;
    println!("  {} bytes total, payload {} bytes", framed.len(), header.len);
    println!("  header: {:02x?}", &framed[..FrameHeader::SIZE]);

    // Example 3: Read a reply
    println!("\n3. Reply:");
    let reply = concat!(
        r#"<cps:reply xmlns:cps="www.clusterpoint.com"><cps:command>search</cps:command>"#,
        "<cps:seconds>0.004</cps:seconds><cps:content><hits>2</hits><results>",
        "<document><id>1</id><title>Laptop</title><price>999</price></document>",
        "<document><id>3</id><title>Laptop bag</title><price>49</price></document>",
        "</results></cps:content></cps:reply>"
    );
    let response = Response::parse(reply, "document", "document/id")?.into_result()?;
    println!("  hits={} seconds={}", response.hits(), response.seconds());
    for (id, doc) in response.documents_by_id() {
        println!(
            "  {id}: {} ({})",
            doc.find_content("document/title").unwrap_or("?"),
            doc.find_content("document/price").unwrap_or("?")
        );
    }

    // Example 4: Build XML from paths
    println!("\n4. Path Builder:");
    let mut doc = Document::new();
    let root = doc.create_root_node("document", "", None);
    let id = doc.add_child(root, "id", None)?;
    doc.add_child_text(id, "42")?;
    doc.create_node("document", "meta")?;
    doc.create_node_text("document/meta", "author", "jane")?;
    doc.create_attribute("document/meta", "lang", "en")?;
    println!("{}", doc.to_xml_string(true));

    Ok(())
}
