use async_trait::async_trait;

use crate::{domain::UserIdentifier, submission::SubmissionRequest, Result};

/// Telegram web-app host object (the `Telegram.WebApp` equivalent).
///
/// All calls are synchronous; the lifecycle hooks are best-effort.
pub trait TelegramHost: Send + Sync {
    /// `initDataUnsafe.user.id`, if the host knows the user.
    fn user_id(&self) -> Option<i64>;

    /// Raw signed init data, forwarded to the backend as `tg_init_data`.
    fn init_data(&self) -> Option<String>;

    fn ready(&self) -> Result<()> {
        Ok(())
    }

    fn expand(&self) -> Result<()> {
        Ok(())
    }

    /// Haptic "success" notification after a submission went through.
    fn notify_success(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VkUserInfo {
    pub id: Option<i64>,
}

/// VK bridge. `init` must complete before `user_info` is issued.
#[async_trait]
pub trait VkBridge: Send + Sync {
    async fn init(&self) -> Result<()>;
    async fn user_info(&self) -> Result<VkUserInfo>;
}

/// Raw backend reply. Interpretation lives in the guard/submission modules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl BackendResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The single remote endpoint, in its two modes.
///
/// `Err` means the request never produced an HTTP response.
#[async_trait]
pub trait SurveyBackend: Send + Sync {
    async fn check(&self, user: &UserIdentifier) -> Result<BackendResponse>;
    async fn submit(&self, req: SubmissionRequest) -> Result<BackendResponse>;
}

/// UI collaborator that renders page state.
pub trait FormView {
    /// Toggle every control of the form at once.
    fn set_form_enabled(&self, enabled: bool);
    /// Toggle only the submit trigger.
    fn set_submit_enabled(&self, enabled: bool);
    fn set_submit_label(&self, label: &str);
    fn show_error(&self, msg: &str);
    fn clear_error(&self);
    fn show_result(&self, msg: &str);
    fn hide_result(&self);
}
