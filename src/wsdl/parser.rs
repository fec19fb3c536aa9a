// Extract published services from a WSDL document

use crate::core::models::DEFAULT_SERVICE_TIMEOUT;
use crate::wsdl::NormalizedService;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

#[derive(Default)]
struct PendingOperation {
    name: String,
    version: Option<String>,
    title: Option<String>,
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.local_name().into_inner() == name.as_bytes() {
            attr.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

/// Parse binding operations (`xroad:version`, `xroad:title`) and the first `soap:address`.
///
/// Services are returned in document order with duplicates collapsed. The
/// error is the reason the document was rejected.
pub fn parse_wsdl(xml: &str) -> Result<Vec<NormalizedService>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_binding = false;
    let mut pending: Option<PendingOperation> = None;
    let mut operations: Vec<PendingOperation> = Vec::new();
    let mut address: Option<String> = None;
    let mut current_element = String::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                match local.as_str() {
                    "binding" => in_binding = true,
                    "operation" if in_binding && pending.is_none() => {
                        pending = attribute(e, "name").map(|name| PendingOperation {
                            name,
                            ..Default::default()
                        });
                    }
                    "address" if address.is_none() => address = attribute(e, "location"),
                    _ => {}
                }
                current_element = local;
            }
            Ok(Event::Empty(ref e)) => {
                let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                match local.as_str() {
                    "operation" if in_binding && pending.is_none() => {
                        if let Some(name) = attribute(e, "name") {
                            operations.push(PendingOperation {
                                name,
                                ..Default::default()
                            });
                        }
                    }
                    "address" if address.is_none() => address = attribute(e, "location"),
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                if let Some(op) = pending.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| format!("XML parse error: {}", e))?
                        .trim()
                        .to_string();
                    match current_element.as_str() {
                        "version" if !text.is_empty() => op.version = Some(text),
                        "title" if !text.is_empty() => op.title = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                match e.local_name().into_inner() {
                    b"binding" => in_binding = false,
                    b"operation" if in_binding => {
                        if let Some(op) = pending.take() {
                            operations.push(op);
                        }
                    }
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if operations.is_empty() {
        return Err("WSDL does not contain any binding operations".to_string());
    }

    let url = address.unwrap_or_default();
    let ssl_auth = url.starts_with("https");

    let mut services: Vec<NormalizedService> = Vec::new();
    for op in operations {
        let service = NormalizedService {
            service_code: op.name,
            service_version: op.version,
            title: op.title,
            url: url.clone(),
            timeout: DEFAULT_SERVICE_TIMEOUT,
            ssl_auth,
        };
        if !services.iter().any(|s| s.full_service_code() == service.full_service_code()) {
            services.push(service);
        }
    }

    Ok(services)
}
