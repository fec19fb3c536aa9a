// Content-negotiated fault envelopes for the client proxy

use crate::core::fault::CodedFault;
use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use std::io::Cursor;
use tracing::error;

pub const X_ROAD_ERROR_HEADER: &str = "X-Road-Error";

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Envelope format, chosen once per request from `Accept`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSerializer {
    Xml,
    Json,
}

#[derive(Serialize)]
struct JsonFault<'a> {
    #[serde(rename = "type")]
    fault_type: &'a str,
    message: &'a str,
    detail: &'a str,
}

impl FaultSerializer {
    /// XML when `Accept` mentions `text/xml` or `application/xml`, JSON otherwise
    pub fn from_accept(accept: Option<&str>) -> Self {
        let wants_xml = accept
            .map(|value| {
                let lower = value.to_ascii_lowercase();
                lower.contains("text/xml") || lower.contains("application/xml")
            })
            .unwrap_or(false);
        if wants_xml {
            Self::Xml
        } else {
            Self::Json
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_accept(headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()))
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Xml => XML_CONTENT_TYPE,
            Self::Json => JSON_CONTENT_TYPE,
        }
    }

    pub fn to_json(fault: &CodedFault) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&JsonFault {
            fault_type: &fault.code,
            message: &fault.summary,
            detail: &fault.detail,
        })
    }

    /// `<error><type/><message/><detail/></error>`
    pub fn to_xml(fault: &CodedFault) -> Result<Vec<u8>, String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| e.to_string())?;
        writer
            .write_event(Event::Start(BytesStart::new("error")))
            .map_err(|e| e.to_string())?;
        for (name, value) in [
            ("type", fault.code.as_str()),
            ("message", fault.summary.as_str()),
            ("detail", fault.detail.as_str()),
        ] {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(|e| e.to_string())?;
            writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(|e| e.to_string())?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| e.to_string())?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("error")))
            .map_err(|e| e.to_string())?;
        Ok(writer.into_inner().into_inner())
    }
}

/// 500 for `Server.*` faults, 400 for everything else
pub fn fault_status(fault: &CodedFault) -> StatusCode {
    if fault.is_server_fault() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// Render a fault.
///
/// An XML serialization failure is logged and the response goes out with an
/// empty body; a JSON serialization failure is returned to the caller.
pub fn send_error_response(fault: &CodedFault, serializer: FaultSerializer) -> Result<Response, serde_json::Error> {
    let body = match serializer {
        FaultSerializer::Json => FaultSerializer::to_json(fault)?,
        FaultSerializer::Xml => FaultSerializer::to_xml(fault).unwrap_or_else(|e| {
            error!(fault_code = %fault.code, error = %e, "Failed to serialize XML fault");
            Vec::new()
        }),
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = fault_status(fault);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(serializer.content_type()));
    match HeaderValue::from_str(&fault.code) {
        Ok(value) => {
            headers.insert(X_ROAD_ERROR_HEADER, value);
        }
        Err(e) => error!(fault_code = %fault.code, error = %e, "Fault code is not a valid header value"),
    }

    Ok(response)
}
