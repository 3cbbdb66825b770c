//! Issue-tracker tickets through the GitHub REST API.
use super::{
    EnvReader, MissingCredentials, Notification, Notifier, NotifyError, ISSUE_REPOSITORY_VAR,
    ISSUE_TOKEN_VAR,
};
use crate::util::truncate_string;
use serde::Serialize;
use std::time::Duration;
use ureq::Agent;

const GITHUB_API: &str = "https://api.github.com";
/// GitHub rejects issue bodies above this size.
const MAX_ISSUE_BODY_BYTES: usize = 65_536;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, PartialEq, Eq)]
pub struct IssueCredentials {
    /// `owner/name` of the repository receiving tickets.
    pub repository: String,
    pub token: String,
}

impl std::fmt::Debug for IssueCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueCredentials")
            .field("repository", &self.repository)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl IssueCredentials {
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(
        lookup: F,
    ) -> Result<Self, MissingCredentials> {
        let mut env = EnvReader::new(lookup);
        let credentials = Self {
            repository: env.take(ISSUE_REPOSITORY_VAR),
            token: env.take(ISSUE_TOKEN_VAR),
        };
        env.finish(credentials)
    }
}

#[derive(Serialize)]
struct IssuePayload<'a> {
    title: &'a str,
    body: String,
}

pub struct IssueNotifier {
    agent: Agent,
    api_base: String,
    credentials: IssueCredentials,
}

impl IssueNotifier {
    pub fn new(credentials: IssueCredentials) -> Self {
        Self::with_api_base(credentials, GITHUB_API)
    }

    pub fn with_api_base(credentials: IssueCredentials, api_base: &str) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .user_agent(concat!("pagewatch/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent: Agent::new_with_config(config),
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
        }
    }
}

impl Notifier for IssueNotifier {
    fn name(&self) -> &'static str {
        "issue"
    }

    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let url = format!(
            "{}/repos/{}/issues",
            self.api_base, self.credentials.repository
        );
        let payload = IssuePayload {
            title: &notification.subject,
            body: truncate_string(&notification.body, MAX_ISSUE_BODY_BYTES),
        };
        let mut response = self
            .agent
            .post(&url)
            .header("Authorization", format!("token {}", self.credentials.token))
            .header("Accept", "application/vnd.github+json")
            .send_json(&payload)
            .map_err(|source| NotifyError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        if status != 201 {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(NotifyError::Rejected {
                status,
                body: truncate_string(body.trim(), 512),
            });
        }
        tracing::info!(repository = %self.credentials.repository, "issue created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Answer one request with `status_line`, handing back the request text.
    fn serve_once(status_line: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream);
            let mut request = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header line");
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("content length");
                    }
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("read body");
            request.push_str(&String::from_utf8_lossy(&body));

            let reply = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}"
            );
            let mut stream = reader.into_inner();
            stream.write_all(reply.as_bytes()).expect("write response");
            tx.send(request).expect("send request");
        });
        (format!("http://{addr}"), rx)
    }

    fn credentials() -> IssueCredentials {
        IssueCredentials {
            repository: "octo/watch".to_string(),
            token: "t0ken".to_string(),
        }
    }

    fn note() -> Notification {
        Notification {
            subject: "Monitored page updated".to_string(),
            body: "New text:\nC".to_string(),
        }
    }

    #[test]
    fn created_response_is_success_and_request_is_authenticated() {
        let (base, requests) = serve_once("201 Created");
        IssueNotifier::with_api_base(credentials(), &base)
            .notify(&note())
            .expect("issue created");
        let request = requests.recv().expect("captured request");
        assert!(request.starts_with("POST /repos/octo/watch/issues "));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: token t0ken"));
        let (_, body) = request.split_once("\r\n\r\n").expect("request body");
        let payload: serde_json::Value = serde_json::from_str(body).expect("json payload");
        assert_eq!(payload["title"], "Monitored page updated");
        assert_eq!(payload["body"], "New text:\nC");
    }

    #[test]
    fn non_created_response_is_rejected() {
        let (base, _requests) = serve_once("422 Unprocessable Entity");
        let err = IssueNotifier::with_api_base(credentials(), &base)
            .notify(&note())
            .expect_err("422 must be reported");
        assert!(
            matches!(err, NotifyError::Rejected { status: 422, .. }),
            "{err}"
        );
    }
}
