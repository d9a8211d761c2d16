//! Debug HTTP server that prints every request it receives
//!
//! Each request is written to the sink in HTTP/1.x wire form followed by a
//! blank line and answered with an empty `200 OK`.

use std::convert::Infallible;
use std::io;
use std::io::Write;
use std::sync::Arc;

use http_body_util::BodyExt;
use http_body_util::Full;
use hyper::Request;
use hyper::Response;
use hyper::StatusCode;
use hyper::body::Bytes;
use hyper::body::Incoming;
use hyper::header;
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Request in wire form: request line, `Host` first, the other headers in
/// arrival order, a blank line, then the decoded body
///
/// Framing headers are left out since the body is already de-chunked.
pub fn dump_request(parts: &Parts, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + body.len());

    let target = parts.uri.path_and_query().map_or("/", |path| path.as_str());
    out.extend_from_slice(format!("{} {} {:?}\r\n", parts.method, target, parts.version).as_bytes());

    let host = parts.headers.get(header::HOST).map(|value| value.as_bytes()).or_else(|| parts.uri.authority().map(|authority| authority.as_str().as_bytes()));
    if let Some(host) = host {
        out.extend_from_slice(b"Host: ");
        out.extend_from_slice(host);
        out.extend_from_slice(b"\r\n");
    }

    for (name, value) in &parts.headers {
        if *name == header::HOST || *name == header::TRANSFER_ENCODING || *name == header::TRAILER {
            continue;
        }
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

fn write_dump<W: Write>(sink: &mut W, dump: &[u8]) -> io::Result<()> {
    sink.write_all(dump)?;
    sink.write_all(b"\n\n")?;
    sink.flush()
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"internal error\n")));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

async fn handle<W: Write + Send + 'static>(request: Request<Incoming>, sink: Arc<Mutex<W>>) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = request.into_parts();

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            warn!("error: {err}");
            return Ok(internal_error());
        }
    };

    let dump = dump_request(&parts, &body);
    if let Err(err) = write_dump(&mut *sink.lock(), &dump) {
        warn!("failed to write request dump: {err}");
    }

    Ok(Response::new(Full::default()))
}

/// Accept connections on `listener` until `shutdown` is notified
///
/// Connections already accepted are left to finish on their own.
pub async fn serve<W: Write + Send + 'static>(listener: TcpListener, sink: Arc<Mutex<W>>, shutdown: Arc<Notify>) -> io::Result<()> {
    info!("listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            () = shutdown.notified() => {
                info!("stopped accepting connections");
                return Ok(());
            }
        };
        debug!(%peer, "accepted");

        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            let service = service_fn(move |request| handle(request, Arc::clone(&sink)));
            if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                debug!(%peer, "connection error: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(request: hyper::http::request::Builder) -> Parts {
        request.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_dump_get() {
        let parts = parts(Request::get("/a/b?c=d").header("user-agent", "test").header("host", "example.com:8080"));

        let dump = dump_request(&parts, b"");
        assert_eq!(dump, b"GET /a/b?c=d HTTP/1.1\r\nHost: example.com:8080\r\nuser-agent: test\r\n\r\n");
    }

    #[test]
    fn test_dump_post_with_body() {
        let parts = parts(Request::post("/submit").header("host", "h").header("content-length", "5").header("transfer-encoding", "chunked"));

        let dump = String::from_utf8(dump_request(&parts, b"hello")).unwrap();
        assert_eq!(dump, "POST /submit HTTP/1.1\r\nHost: h\r\ncontent-length: 5\r\n\r\nhello");
    }

    #[test]
    fn test_dump_without_host_header_uses_uri() {
        let parts = parts(Request::get("http://example.com/x"));

        let dump = String::from_utf8(dump_request(&parts, b"")).unwrap();
        assert!(dump.starts_with("GET /x HTTP/1.1\r\nHost: example.com\r\n"));
    }

    #[test]
    fn test_dump_keeps_repeated_headers() {
        let parts = parts(Request::get("/").header("host", "h").header("accept", "a").header("accept", "b"));

        let dump = String::from_utf8(dump_request(&parts, b"")).unwrap();
        assert_eq!(dump, "GET / HTTP/1.1\r\nHost: h\r\naccept: a\r\naccept: b\r\n\r\n");
    }
}
