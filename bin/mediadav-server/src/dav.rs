//! Minimal read-only WebDAV surface
//!
//! OPTIONS, PROPFIND (Depth 0/1), GET and HEAD, plus an HTML index for
//! collection GETs. Everything else answers 405: the filesystem is
//! read-only and locking/ACL extensions are deliberately not spoken here.

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use mediadav_vfs::{AssetNode, MediaDavProvider, Node, VfsError};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Build the WebDAV router over a started provider
pub fn router(provider: Arc<MediaDavProvider>) -> Router {
    Router::new().fallback(handle).with_state(provider)
}

async fn handle(State(provider): State<Arc<MediaDavProvider>>, req: Request) -> Response {
    let raw_path = req.uri().path().to_string();
    let path = match urlencoding::decode(&raw_path) {
        Ok(p) => p.into_owned(),
        Err(_) => return status_response(StatusCode::BAD_REQUEST),
    };

    debug!(method = %req.method(), path = %path, "webdav request");

    match req.method().as_str() {
        "OPTIONS" => options_response(),
        "GET" => serve(&provider, &path, false).await,
        "HEAD" => serve(&provider, &path, true).await,
        "PROPFIND" => propfind(&provider, &path, depth(req.headers())).await,
        // Read-only tree: no PUT/DELETE/MKCOL/LOCK and friends
        _ => status_response(StatusCode::METHOD_NOT_ALLOWED),
    }
}

/// Depth header: 0 stays 0, everything else (1, infinity, absent) lists one
/// level, which is as deep as this server goes
fn depth(headers: &HeaderMap) -> u8 {
    match headers.get("Depth").and_then(|v| v.to_str().ok()) {
        Some("0") => 0,
        _ => 1,
    }
}

fn options_response() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header("DAV", "1")
        .header(header::ALLOW, "OPTIONS, GET, HEAD, PROPFIND")
        .body(Body::empty())
        .unwrap()
}

fn status_response(status: StatusCode) -> Response {
    Response::builder().status(status).body(Body::empty()).unwrap()
}

/// Resolve a path, mapping core errors to protocol outcomes
fn resolve(provider: &MediaDavProvider, path: &str) -> Result<Node, Response> {
    match provider.resolve(path) {
        Ok(node) => Ok(node),
        Err(e) if e.is_not_found() => Err(status_response(StatusCode::NOT_FOUND)),
        Err(e @ VfsError::UnsupportedGroup { .. }) => {
            // Diagnosable misuse of the tree shape, but still 404 to clients
            warn!(path = %path, error = %e, "unsupported group lookup");
            Err(status_response(StatusCode::NOT_FOUND))
        }
        Err(e) => {
            error!(path = %path, error = %e, "resolution failed");
            Err(status_response(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}

// ---------------------------------------------------------------------------
// GET / HEAD

async fn serve(provider: &MediaDavProvider, path: &str, head_only: bool) -> Response {
    let node = match resolve(provider, path) {
        Ok(node) => node,
        Err(resp) => return resp,
    };

    match node {
        Node::Asset(asset) => serve_asset(&asset, head_only).await,
        collection => serve_index(&collection),
    }
}

async fn serve_asset(asset: &AssetNode, head_only: bool) -> Response {
    let file = match asset.open().await {
        Ok(file) => file,
        Err(e) => {
            error!(path = %asset.path(), error = %e, "asset content unavailable");
            return status_response(StatusCode::SERVICE_UNAVAILABLE);
        }
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, asset.mime_type());

    if let Some(length) = asset.content_length().await {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }
    if let Ok(etag) = asset.etag().await {
        builder = builder.header(header::ETAG, format!("\"{etag}\""));
    }
    if let Ok(modified) = asset.modified_at() {
        builder = builder.header(
            header::LAST_MODIFIED,
            modified.format(HTTP_DATE_FORMAT).to_string(),
        );
    }

    let body = if head_only {
        Body::empty()
    } else {
        Body::from_stream(ReaderStream::new(file))
    };
    builder.body(body).unwrap()
}

/// Plain HTML directory index for collection GETs
fn serve_index(node: &Node) -> Response {
    let children = match node.list_children() {
        Ok(children) => children,
        Err(e) => {
            error!(path = %node.path(), error = %e, "listing failed");
            return status_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let title = html_escape(node.path());
    let mut body = format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head><body><h1>{title}</h1><ul>"
    );
    for name in children {
        let is_dir = node
            .resolve_child(&name)
            .map(|c| c.is_collection())
            .unwrap_or(false);
        let suffix = if is_dir { "/" } else { "" };
        body.push_str(&format!(
            "<li><a href=\"{href}{suffix}\">{label}{suffix}</a></li>",
            href = href_for(node.path(), Some(&name), false),
            label = html_escape(&name),
        ));
    }
    body.push_str("</ul></body></html>");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .body(Body::from(body))
        .unwrap()
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// PROPFIND

#[derive(Serialize)]
#[serde(rename = "D:multistatus")]
struct Multistatus {
    #[serde(rename = "@xmlns:D")]
    xmlns: &'static str,
    #[serde(rename = "D:response")]
    responses: Vec<DavResponse>,
}

#[derive(Serialize)]
struct DavResponse {
    #[serde(rename = "D:href")]
    href: String,
    #[serde(rename = "D:propstat")]
    propstat: Propstat,
}

#[derive(Serialize)]
struct Propstat {
    #[serde(rename = "D:prop")]
    prop: Prop,
    #[serde(rename = "D:status")]
    status: &'static str,
}

#[derive(Serialize, Default)]
struct Prop {
    #[serde(rename = "D:displayname")]
    displayname: String,
    #[serde(rename = "D:resourcetype")]
    resourcetype: ResourceType,
    #[serde(rename = "D:getcontentlength", skip_serializing_if = "Option::is_none")]
    getcontentlength: Option<u64>,
    #[serde(rename = "D:getcontenttype", skip_serializing_if = "Option::is_none")]
    getcontenttype: Option<String>,
    #[serde(rename = "D:getetag", skip_serializing_if = "Option::is_none")]
    getetag: Option<String>,
    #[serde(rename = "D:getlastmodified", skip_serializing_if = "Option::is_none")]
    getlastmodified: Option<String>,
    #[serde(rename = "D:creationdate", skip_serializing_if = "Option::is_none")]
    creationdate: Option<String>,
}

#[derive(Serialize, Default)]
struct ResourceType {
    #[serde(rename = "D:collection", skip_serializing_if = "Option::is_none")]
    collection: Option<()>,
}

/// Percent-encoded href for a node path, with the WebDAV trailing slash on
/// collections
fn href_for(path: &str, child: Option<&str>, collection: bool) -> String {
    let mut href = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        href.push('/');
        href.push_str(&urlencoding::encode(segment));
    }
    if let Some(name) = child {
        href.push('/');
        href.push_str(&urlencoding::encode(name));
    }
    if href.is_empty() {
        href.push('/');
    } else if collection {
        href.push('/');
    }
    href
}

async fn propfind(provider: &MediaDavProvider, path: &str, depth: u8) -> Response {
    let node = match resolve(provider, path) {
        Ok(node) => node,
        Err(resp) => return resp,
    };

    let mut responses = vec![node_response(&node).await];

    if depth > 0 && node.is_collection() {
        let children = match node.list_children() {
            Ok(children) => children,
            Err(e) => {
                error!(path = %path, error = %e, "listing failed");
                return status_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };
        for name in children {
            match node.resolve_child(&name) {
                Ok(child) => responses.push(node_response(&child).await),
                // A listed name should always resolve within one snapshot
                Err(e) => warn!(path = %path, child = %name, error = %e, "listed child did not resolve"),
            }
        }
    }

    let multistatus = Multistatus {
        xmlns: "DAV:",
        responses,
    };
    let xml = match quick_xml::se::to_string(&multistatus) {
        Ok(xml) => xml,
        Err(e) => {
            error!(error = %e, "multistatus serialization failed");
            return status_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Response::builder()
        .status(StatusCode::MULTI_STATUS)
        .header(header::CONTENT_TYPE, "application/xml; charset=utf-8")
        .body(Body::from(format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>{xml}"
        )))
        .unwrap()
}

async fn node_response(node: &Node) -> DavResponse {
    let displayname = node.display_name().to_string();

    if let Node::Asset(asset) = node {
        let mut prop = Prop {
            displayname,
            getcontenttype: Some(asset.mime_type().to_string()),
            getcontentlength: asset.content_length().await,
            ..Prop::default()
        };
        let mut status = "HTTP/1.1 200 OK";

        match asset.modified_at() {
            Ok(modified) => {
                prop.getlastmodified = Some(modified.format(HTTP_DATE_FORMAT).to_string());
            }
            Err(e) => {
                warn!(path = %node.path(), error = %e, "asset metadata incomplete");
                status = "HTTP/1.1 500 Internal Server Error";
            }
        }
        match asset.created_at() {
            Ok(created) => prop.creationdate = Some(created.to_rfc3339()),
            Err(_) => status = "HTTP/1.1 500 Internal Server Error",
        }
        if let Ok(etag) = asset.etag().await {
            prop.getetag = Some(format!("\"{etag}\""));
        }

        DavResponse {
            href: href_for(node.path(), None, false),
            propstat: Propstat { prop, status },
        }
    } else {
        DavResponse {
            href: href_for(node.path(), None, true),
            propstat: Propstat {
                prop: Prop {
                    displayname,
                    resourcetype: ResourceType { collection: Some(()) },
                    ..Prop::default()
                },
                status: "HTTP/1.1 200 OK",
            },
        }
    }
}
