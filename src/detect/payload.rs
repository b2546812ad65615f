use crate::registry::descriptor::ResourceKind;

#[derive(Debug, PartialEq)]
pub enum PayloadKind {
    Script,
    Stylesheet,
    /// An HTML document, typically a CDN or captive-portal error page served with 200.
    Html,
    Unknown,
}

/// Classify a fetched body from its `Content-Type` and first bytes.
pub fn detect_payload(content_type: Option<&str>, body: &[u8]) -> PayloadKind {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match mime.as_str() {
        "text/html" | "application/xhtml+xml" => return PayloadKind::Html,
        "text/css" => return PayloadKind::Stylesheet,
        "application/javascript" | "text/javascript" | "application/ecmascript"
        | "text/ecmascript" | "application/x-javascript" => return PayloadKind::Script,
        _ => {}
    }

    // No usable header: sniff the leading bytes.
    if looks_like_html(body) {
        return PayloadKind::Html;
    }

    PayloadKind::Unknown
}

/// Whether a payload of `payload` kind may be injected as `kind`.
pub fn accepts(kind: ResourceKind, payload: &PayloadKind) -> bool {
    match payload {
        PayloadKind::Html => false,
        PayloadKind::Unknown => true,
        PayloadKind::Script => kind == ResourceKind::Executable,
        PayloadKind::Stylesheet => kind == ResourceKind::Stylesheet,
    }
}

fn looks_like_html(body: &[u8]) -> bool {
    // Skip UTF-8 BOM and leading whitespace.
    let body = body.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(body);
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    let head = &body[start..body.len().min(start + 16)];
    let head = head.to_ascii_lowercase();
    head.starts_with(b"<!doctype html") || head.starts_with(b"<html") || head.starts_with(b"<head")
}
