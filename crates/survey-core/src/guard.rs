//! Duplicate-submission guard.
//!
//! One `mode=check` request per page load. Any failure is fatal for the page:
//! if we cannot confirm the user has not submitted yet, the form stays closed.

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    domain::{SubmissionCheckResult, UserIdentifier},
    errors::Error,
    messages,
    ports::{BackendResponse, SurveyBackend},
    Result,
};

pub struct SubmissionGuard<'a> {
    backend: &'a dyn SurveyBackend,
}

impl<'a> SubmissionGuard<'a> {
    pub fn new(backend: &'a dyn SurveyBackend) -> Self {
        Self { backend }
    }

    /// Single best-effort attempt; errors are always `Error::CheckFailed`.
    pub async fn check(&self, user: &UserIdentifier) -> Result<SubmissionCheckResult> {
        let resp = match self.backend.check(user).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(user_id = %user, "existence check transport failure: {e}");
                return Err(Error::CheckFailed(messages::CHECK_UNAVAILABLE.to_string()));
            }
        };

        let result = interpret_check(&resp)?;
        info!(user_id = %user, exists = result.exists, "existence check done");
        Ok(result)
    }
}

/// Map a raw `mode=check` reply to a result.
pub fn interpret_check(resp: &BackendResponse) -> Result<SubmissionCheckResult> {
    let data = parse_body(&resp.body);

    if !resp.is_success() {
        let msg = message_of(&data).unwrap_or_else(|| messages::check_failed(resp.status));
        warn!(status = resp.status, "existence check rejected: {msg}");
        return Err(Error::CheckFailed(msg));
    }

    Ok(SubmissionCheckResult {
        exists: data.get("exists").map(is_truthy).unwrap_or(false),
        message: message_of(&data),
    })
}

/// Parse a reply body; a missing or broken body reads as `{}`.
pub(crate) fn parse_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Default::default()))
}

/// The optional `message` field, rendered as text when it carries anything.
pub(crate) fn message_of(data: &Value) -> Option<String> {
    let v = data.get("message")?;
    if !is_truthy(v) {
        return None;
    }
    match v {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Loose truthiness: `false`, `0`, `""` and `null` are false, the rest true.
pub(crate) fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SubmissionRequest;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeBackend {
        reply: Mutex<Option<Result<BackendResponse>>>,
        checked: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn replying(reply: Result<BackendResponse>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                checked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SurveyBackend for FakeBackend {
        async fn check(&self, user: &UserIdentifier) -> Result<BackendResponse> {
            self.checked.lock().unwrap().push(user.to_string());
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Error::External("no reply".to_string())))
        }

        async fn submit(&self, _req: SubmissionRequest) -> Result<BackendResponse> {
            Err(Error::External("not used".to_string()))
        }
    }

    fn user() -> UserIdentifier {
        UserIdentifier::new("77").unwrap()
    }

    #[test]
    fn exists_is_coerced_loosely() {
        for (v, want) in [
            (json!(true), true),
            (json!(1), true),
            (json!("yes"), true),
            (json!({}), true),
            (json!(false), false),
            (json!(0), false),
            (json!(""), false),
            (json!(null), false),
        ] {
            let body = json!({ "exists": v }).to_string();
            let got = interpret_check(&BackendResponse::new(200, body)).unwrap();
            assert_eq!(got.exists, want, "exists = {v}");
        }
    }

    #[test]
    fn exists_with_message_is_passed_through() {
        let body = json!({ "exists": true, "message": "X" }).to_string();
        let got = interpret_check(&BackendResponse::new(200, body)).unwrap();
        assert_eq!(
            got,
            SubmissionCheckResult {
                exists: true,
                message: Some("X".to_string())
            }
        );
    }

    #[test]
    fn unparseable_success_body_is_empty_object() {
        let got = interpret_check(&BackendResponse::new(200, "<html>")).unwrap();
        assert_eq!(got, SubmissionCheckResult::default());

        let got = interpret_check(&BackendResponse::new(200, "")).unwrap();
        assert!(!got.exists);
    }

    #[test]
    fn failure_uses_server_message_or_status() {
        let body = json!({ "message": "check not implemented" }).to_string();
        match interpret_check(&BackendResponse::new(501, body)) {
            Err(Error::CheckFailed(msg)) => assert_eq!(msg, "check not implemented"),
            other => panic!("unexpected: {other:?}"),
        }

        match interpret_check(&BackendResponse::new(502, "")) {
            Err(Error::CheckFailed(msg)) => assert_eq!(msg, "Check failed: 502"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn guard_sends_identifier_once() {
        let backend = FakeBackend::replying(Ok(BackendResponse::new(200, r#"{"exists":false}"#)));
        let got = SubmissionGuard::new(&backend).check(&user()).await.unwrap();

        assert!(!got.exists);
        assert_eq!(*backend.checked.lock().unwrap(), vec!["77".to_string()]);
    }

    #[tokio::test]
    async fn transport_failure_fails_closed() {
        let backend = FakeBackend::replying(Err(Error::External("connection refused".into())));
        match SubmissionGuard::new(&backend).check(&user()).await {
            Err(Error::CheckFailed(msg)) => assert_eq!(msg, messages::CHECK_UNAVAILABLE),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
