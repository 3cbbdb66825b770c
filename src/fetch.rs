//! Source page retrieval.
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use ureq::Agent;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("GET {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Produces the raw markup of the monitored page.
pub trait Fetcher {
    /// Human-readable source description for logs and the report.
    fn source(&self) -> String;
    fn fetch(&self) -> Result<String, FetchError>;
}

/// Blocking HTTP GET with a global timeout covering connect and body read.
pub struct HttpFetcher {
    agent: Agent,
    url: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(concat!("pagewatch/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent: Agent::new_with_config(config),
            url: url.into(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn source(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport {
            url: self.url.clone(),
            source,
        };
        let mut response = self.agent.get(&self.url).call().map_err(|err| match err {
            ureq::Error::StatusCode(status) => FetchError::Status {
                url: self.url.clone(),
                status,
            },
            other => transport(other),
        })?;
        let body = response.body_mut().read_to_string().map_err(transport)?;
        tracing::debug!(url = %self.url, bytes = body.len(), "page fetched");
        Ok(body)
    }
}

/// Reads markup from a local file; used for offline replays.
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Fetcher for FileFetcher {
    fn source(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<String, FetchError> {
        let bytes = fs::read(&self.path).map_err(|source| FetchError::File {
            path: self.path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve exactly one canned HTTP response on a loopback port.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).expect("read request");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream
                .write_all(response.as_bytes())
                .expect("write response");
        });
        format!("http://{addr}/events")
    }

    #[test]
    fn http_fetch_returns_body_on_success() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 12\r\nConnection: close\r\n\r\n<p>Hello</p>",
        );
        let body = HttpFetcher::new(url, Duration::from_secs(5))
            .fetch()
            .expect("fetch page");
        assert_eq!(body, "<p>Hello</p>");
    }

    #[test]
    fn http_fetch_rejects_non_success_status() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let err = HttpFetcher::new(url, Duration::from_secs(5))
            .fetch()
            .expect_err("503 must fail");
        assert!(matches!(err, FetchError::Status { status: 503, .. }), "{err}");
    }

    #[test]
    fn http_fetch_reports_transport_errors() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
            listener.local_addr().expect("local addr").port()
        };
        let err = HttpFetcher::new(format!("http://127.0.0.1:{port}/"), Duration::from_secs(5))
            .fetch()
            .expect_err("closed port must fail");
        assert!(matches!(err, FetchError::Transport { .. }), "{err}");
    }

    #[test]
    fn file_fetch_reads_markup_and_reports_missing_files() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<h1>Events</h1>").expect("write page");
        assert_eq!(
            FileFetcher::new(&path).fetch().expect("read page"),
            "<h1>Events</h1>"
        );
        let err = FileFetcher::new(dir.path().join("missing.html"))
            .fetch()
            .expect_err("missing file must fail");
        assert!(matches!(err, FetchError::File { .. }), "{err}");
    }

    #[test]
    fn file_fetch_decodes_non_utf8_markup_lossily() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("latin1.html");
        std::fs::write(&path, b"<p>Caf\xe9 events</p>").expect("write page");
        let body = FileFetcher::new(&path).fetch().expect("lossy read");
        assert_eq!(body, "<p>Caf\u{fffd} events</p>");
    }
}
