//! Text extraction from fetched file bytes.
//!
//! Sources hand over raw bytes plus the MIME type they report; this module
//! returns UTF-8 text or an error, never a lossy decode. Word documents are
//! read from the `word/document.xml` entry of the OOXML archive.

use anyhow::{anyhow, bail, Context, Result};
use std::io::Read;

pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Maximum decompressed bytes read from one ZIP entry (zip-bomb bound).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Whether `mime_type` is stored as plain UTF-8 text.
pub fn is_text_mime(mime_type: &str) -> bool {
    mime_type.starts_with("text/") || mime_type == "application/json"
}

/// Extract plain text from `bytes` of type `mime_type`.
pub fn extract_text(bytes: &[u8], mime_type: &str) -> Result<String> {
    match mime_type {
        MIME_DOCX => extract_docx(bytes),
        m if is_text_mime(m) => {
            String::from_utf8(bytes.to_vec()).context("file is not valid UTF-8 text")
        }
        other => bail!("unsupported content type: {}", other),
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| anyhow!("invalid docx archive: {}", e))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| anyhow!("word/document.xml not found"))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .context("failed to read word/document.xml")?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        bail!("word/document.xml exceeds size limit");
    }

    paragraph_text(&xml)
}

/// Concatenate `<w:t>` runs, one line per `<w:p>` paragraph.
fn paragraph_text(xml: &[u8]) -> Result<String> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if !out.is_empty() && !out.ends_with('\n') => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| anyhow!("invalid docx text: {}", e))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("invalid docx xml: {}", e),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}
