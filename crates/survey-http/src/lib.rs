//! HTTP adapter for the survey backend.
//!
//! One endpoint, two modes: `GET ?mode=check&tg_id=…` and a multipart `POST`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Url,
};
use tracing::{debug, info};

use survey_core::{
    domain::UserIdentifier,
    errors::Error,
    ports::{BackendResponse, SurveyBackend},
    submission::SubmissionRequest,
    Result,
};

#[derive(Clone, Debug)]
pub struct HttpSurveyBackend {
    endpoint: Url,
    http: reqwest::Client,
}

impl HttpSurveyBackend {
    /// `timeout: None` keeps the transport default (no overall deadline).
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid backend url {endpoint:?}: {e}")))?;

        let mut builder = reqwest::Client::builder().user_agent("survey-rust/0.1");
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| Error::External(format!("http client build error: {e}")))?;

        Ok(Self { endpoint, http })
    }

    /// Endpoint with `mode` and `tg_id` set, replacing any existing values.
    pub fn check_url(&self, user: &UserIdentifier) -> Url {
        let mut url = self.endpoint.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "mode" && k != "tg_id")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut q = url.query_pairs_mut();
            q.clear();
            for (k, v) in &kept {
                q.append_pair(k, v);
            }
            q.append_pair("mode", "check");
            q.append_pair("tg_id", user.as_str());
        }
        url
    }
}

#[async_trait]
impl SurveyBackend for HttpSurveyBackend {
    async fn check(&self, user: &UserIdentifier) -> Result<BackendResponse> {
        let url = self.check_url(user);
        debug!(user_id = %user, "sending existence check");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::External(format!("check request error: {e}")))?;

        Ok(into_backend_response(resp).await)
    }

    async fn submit(&self, req: SubmissionRequest) -> Result<BackendResponse> {
        let user_id = req.user_id.to_string();
        let size = req.resume.size();
        let form = build_form(req)?;

        info!(user_id = %user_id, resume_bytes = size, "sending submission");

        let resp = self
            .http
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::External(format!("submit request error: {e}")))?;

        Ok(into_backend_response(resp).await)
    }
}

/// Multipart body in wire order: `tg_id`, answers, `resume`, `tg_init_data`.
fn build_form(req: SubmissionRequest) -> Result<Form> {
    let mut form = Form::new().text("tg_id", req.user_id.to_string());

    for (name, value) in req.fields {
        form = form.text(name, value);
    }

    let mime = mime_for(&req.resume.file_name);
    let resume = Part::bytes(req.resume.bytes)
        .file_name(req.resume.file_name)
        .mime_str(mime)
        .map_err(|e| Error::External(format!("multipart error: {e}")))?;
    form = form.part("resume", resume);

    if let Some(init_data) = req.init_data {
        form = form.text("tg_init_data", init_data);
    }

    Ok(form)
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "rtf" => "application/rtf",
        "txt" => "text/plain",
        "odt" => "application/vnd.oasis.opendocument.text",
        _ => "application/octet-stream",
    }
}

/// An unreadable body is treated like an empty one.
async fn into_backend_response(resp: reqwest::Response) -> BackendResponse {
    let status = resp.status().as_u16();
    let body = match resp.bytes().await {
        Ok(b) => b.to_vec(),
        Err(e) => {
            debug!(status, "failed to read response body: {e}");
            Vec::new()
        }
    };
    BackendResponse { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::submission::ResumeFile;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    /// Serve exactly one canned response and hand back the raw request.
    async fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let raw = read_request(&mut sock).await;
            sock.write_all(response.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            raw
        });

        (format!("http://{addr}/fn"), handle)
    }

    async fn read_request(sock: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let head = text[..head_end].to_ascii_lowercase();
            let body_len = buf.len() - (head_end + 4);

            if let Some(len) = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
            {
                if body_len >= len {
                    break;
                }
            } else if head.contains("transfer-encoding: chunked") {
                if text.ends_with("0\r\n\r\n") {
                    break;
                }
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn user() -> UserIdentifier {
        UserIdentifier::vk(42).unwrap()
    }

    #[test]
    fn check_url_replaces_mode_and_id() {
        let backend =
            HttpSurveyBackend::new("https://backend.example/fn?mode=x&key=1", None).unwrap();
        let url = backend.check_url(&user());
        assert_eq!(url.as_str(), "https://backend.example/fn?key=1&mode=check&tg_id=42_VK");
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        assert!(matches!(
            HttpSurveyBackend::new("not a url", None),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn resume_mime_types() {
        assert_eq!(mime_for("CV.PDF"), "application/pdf");
        assert_eq!(mime_for("cv"), "application/octet-stream");
    }

    #[tokio::test]
    async fn check_sends_get_with_query() {
        let (url, server) = serve_once("200 OK", r#"{"exists":true}"#).await;
        let backend = HttpSurveyBackend::new(&url, None).unwrap();

        let resp = backend.check(&user()).await.unwrap();
        let raw = server.await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, br#"{"exists":true}"#.to_vec());
        assert!(raw.starts_with("GET /fn?mode=check&tg_id=42_VK HTTP/1.1"));
    }

    #[tokio::test]
    async fn check_passes_error_status_through() {
        let (url, server) = serve_once("503 Service Unavailable", "").await;
        let backend = HttpSurveyBackend::new(&url, None).unwrap();

        let resp = backend.check(&user()).await.unwrap();
        server.await.unwrap();

        assert_eq!(resp.status, 503);
        assert!(resp.body.is_empty());
    }

    #[tokio::test]
    async fn submit_posts_multipart_in_order() {
        let (url, server) = serve_once("409 Conflict", r#"{"message":"dup"}"#).await;
        let backend = HttpSurveyBackend::new(&url, Some(Duration::from_secs(5))).unwrap();

        let req = SubmissionRequest {
            user_id: user(),
            fields: vec![("salary".to_string(), "100k".to_string())],
            resume: ResumeFile::new("cv.pdf", b"%PDF-1.4".to_vec()),
            init_data: Some("auth_date=1".to_string()),
        };
        let resp = backend.submit(req).await.unwrap();
        let raw = server.await.unwrap();

        assert_eq!(resp.status, 409);
        assert!(raw.starts_with("POST /fn HTTP/1.1"));
        assert!(raw.to_ascii_lowercase().contains("multipart/form-data; boundary="));

        let tg = raw.find("name=\"tg_id\"").unwrap();
        let salary = raw.find("name=\"salary\"").unwrap();
        let resume = raw.find("name=\"resume\"; filename=\"cv.pdf\"").unwrap();
        let init = raw.find("name=\"tg_init_data\"").unwrap();
        assert!(tg < salary && salary < resume && resume < init);
        assert!(raw.contains("42_VK"));
        assert!(raw.contains("%PDF-1.4"));
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpSurveyBackend::new(&format!("http://{addr}/fn"), None).unwrap();
        assert!(matches!(
            backend.check(&user()).await,
            Err(Error::External(_))
        ));
    }
}
