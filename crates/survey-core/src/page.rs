//! Page controller: drives identity resolution, the duplicate check and the
//! single submission, and keeps the [`FormView`] in step with [`PageState`].

use tracing::{debug, info, warn};

use crate::{
    domain::{ResolvedUser, UserIdentifier},
    errors::Error,
    guard::SubmissionGuard,
    identity::IdentityResolver,
    messages,
    ports::{FormView, SurveyBackend, TelegramHost},
    submission::{build_request, check_resume_size, interpret_submit, FieldSet, SurveyForm},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageState {
    Loading,
    UserUnresolved,
    CheckFailed(String),
    AlreadySubmitted(String),
    Ready,
    Submitting,
    Submitted(String),
}

impl PageState {
    pub fn form_enabled(&self) -> bool {
        matches!(self, PageState::Ready)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PageState::UserUnresolved
                | PageState::CheckFailed(_)
                | PageState::AlreadySubmitted(_)
                | PageState::Submitted(_)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageSettings {
    pub fields: FieldSet,
    pub max_file_bytes: u64,
}

pub struct SurveyPage<'a> {
    view: &'a dyn FormView,
    backend: &'a dyn SurveyBackend,
    telegram: Option<&'a dyn TelegramHost>,
    settings: PageSettings,
    state: PageState,
}

impl<'a> SurveyPage<'a> {
    pub fn new(
        view: &'a dyn FormView,
        backend: &'a dyn SurveyBackend,
        telegram: Option<&'a dyn TelegramHost>,
        settings: PageSettings,
    ) -> Self {
        Self {
            view,
            backend,
            telegram,
            settings,
            state: PageState::Loading,
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Run once per page load. Returns the resolved user, if any; the caller
    /// hands it back to [`SurveyPage::submit`].
    pub async fn load(&mut self, resolver: &IdentityResolver<'_>) -> Option<ResolvedUser> {
        self.announce_host();

        self.view.clear_error();
        self.view.hide_result();
        self.view.set_form_enabled(false);
        self.view.set_submit_label(messages::LOADING_LABEL);
        self.state = PageState::Loading;

        let Some(user) = resolver.resolve().await else {
            self.view.show_error(messages::USER_UNRESOLVED);
            self.view.set_submit_label(messages::SUBMIT_LABEL);
            self.transition(PageState::UserUnresolved);
            return None;
        };

        match SubmissionGuard::new(self.backend).check(&user.id).await {
            Ok(check) if check.exists => {
                let msg = check
                    .message
                    .unwrap_or_else(|| messages::ALREADY_SUBMITTED.to_string());
                self.view.show_result(&msg);
                self.view.set_form_enabled(false);
                self.transition(PageState::AlreadySubmitted(msg));
            }
            Ok(_) => {
                self.view.set_form_enabled(true);
                self.transition(PageState::Ready);
            }
            Err(e) => {
                let msg = describe(&e, self.settings.max_file_bytes);
                self.view.show_error(&msg);
                self.view.set_form_enabled(false);
                self.transition(PageState::CheckFailed(msg));
            }
        }
        self.view.set_submit_label(messages::SUBMIT_LABEL);

        Some(user)
    }

    /// Pre-check a freshly selected resume. `false` means the selection must
    /// be discarded by the view.
    pub fn on_resume_selected(&self, size: Option<u64>) -> bool {
        self.view.clear_error();
        let Some(size) = size else {
            return true;
        };

        match check_resume_size(size, self.settings.max_file_bytes) {
            Ok(()) => true,
            Err(e) => {
                self.view
                    .show_error(&describe(&e, self.settings.max_file_bytes));
                false
            }
        }
    }

    /// One submission attempt. Local validation failures leave the state
    /// untouched; a remote failure returns to `Ready` so the user can retry.
    pub async fn submit(&mut self, user: Option<&UserIdentifier>, form: &SurveyForm) -> &PageState {
        if self.state != PageState::Ready {
            debug!(state = ?self.state, "submit ignored, form is not ready");
            return &self.state;
        }

        self.view.clear_error();
        self.view.hide_result();

        let init_data = self.telegram.and_then(|t| t.init_data());
        let req = match build_request(
            user,
            form,
            &self.settings.fields,
            self.settings.max_file_bytes,
            init_data,
        ) {
            Ok(req) => req,
            Err(e) => {
                let msg = match e {
                    Error::UnresolvedIdentity => messages::USER_UNRESOLVED_SHORT.to_string(),
                    other => describe(&other, self.settings.max_file_bytes),
                };
                self.view.show_error(&msg);
                return &self.state;
            }
        };

        let resume_size = req.resume.size();
        self.view.set_submit_enabled(false);
        self.view.set_submit_label(messages::SUBMITTING_LABEL);
        self.transition(PageState::Submitting);

        let outcome = match self.backend.submit(req).await {
            Ok(resp) => interpret_submit(&resp, resume_size, self.settings.max_file_bytes),
            Err(e) => {
                warn!("submission transport failure: {e}");
                Err(Error::SubmitFailed(messages::SUBMIT_UNKNOWN_ERROR.to_string()))
            }
        };

        match outcome {
            Ok(msg) => {
                self.view.show_result(&msg);
                self.view.set_form_enabled(false);
                self.transition(PageState::Submitted(msg));
                if let Some(host) = self.telegram {
                    if let Err(e) = host.notify_success() {
                        debug!("haptic feedback failed: {e}");
                    }
                }
            }
            Err(e) => {
                self.view
                    .show_error(&describe(&e, self.settings.max_file_bytes));
                self.view.set_submit_enabled(true);
                self.transition(PageState::Ready);
            }
        }
        self.view.set_submit_label(messages::SUBMIT_LABEL);

        &self.state
    }

    fn announce_host(&self) {
        let Some(host) = self.telegram else {
            return;
        };
        if let Err(e) = host.ready().and_then(|_| host.expand()) {
            debug!("telegram host lifecycle call failed: {e}");
        }
    }

    fn transition(&mut self, next: PageState) {
        info!(from = ?self.state, to = ?next, "page state");
        self.state = next;
    }
}

/// Turn an error into the text shown to the user.
pub fn describe(e: &Error, max_file_bytes: u64) -> String {
    match e {
        Error::FileTooLarge { .. } => messages::file_too_large(max_file_bytes),
        Error::MissingResume => messages::RESUME_REQUIRED.to_string(),
        Error::MissingField(name) => messages::field_required(name),
        Error::UnresolvedIdentity => messages::USER_UNRESOLVED.to_string(),
        Error::CheckFailed(msg) | Error::SubmitFailed(msg) => msg.clone(),
        other => other.to_string(),
    }
}
