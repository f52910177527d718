//! Terminal host: renders the form on stdout/stderr and feeds it from env.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

use survey_core::{
    config::Config,
    errors::Error,
    identity::{IdentityResolver, LaunchParams},
    init_data::TelegramInitData,
    page::{PageState, SurveyPage},
    ports::{FormView, TelegramHost, VkBridge, VkUserInfo},
    submission::{ResumeFile, SurveyForm},
    Result,
};
use survey_http::HttpSurveyBackend;

#[derive(Default)]
pub struct TerminalView;

impl FormView for TerminalView {
    fn set_form_enabled(&self, enabled: bool) {
        debug!(enabled, "form controls");
    }

    fn set_submit_enabled(&self, enabled: bool) {
        debug!(enabled, "submit control");
    }

    fn set_submit_label(&self, label: &str) {
        debug!(label, "submit label");
    }

    fn show_error(&self, msg: &str) {
        eprintln!("error: {msg}");
    }

    fn clear_error(&self) {}

    fn show_result(&self, msg: &str) {
        println!("{msg}");
    }

    fn hide_result(&self) {}
}

/// VK bridge backed by the signed launch parameters VK appends to the app
/// URL (`vk_app_id`, `vk_user_id`, ...).
pub struct LaunchParamsBridge {
    app_id: Option<String>,
    user_id: Option<String>,
}

impl LaunchParamsBridge {
    /// The bridge only exists when the app was launched from VK.
    pub fn detect(params: &LaunchParams) -> Option<Self> {
        let app_id = params.get("vk_app_id").map(str::to_string);
        let user_id = params.get("vk_user_id").map(str::to_string);
        if app_id.is_none() && user_id.is_none() {
            return None;
        }
        Some(Self { app_id, user_id })
    }
}

#[async_trait]
impl VkBridge for LaunchParamsBridge {
    async fn init(&self) -> Result<()> {
        match &self.app_id {
            Some(id) if !id.trim().is_empty() => Ok(()),
            _ => Err(Error::External("VKWebAppInit: missing vk_app_id".to_string())),
        }
    }

    async fn user_info(&self) -> Result<VkUserInfo> {
        let id = self
            .user_id
            .as_deref()
            .map(|s| {
                s.trim()
                    .parse::<i64>()
                    .map_err(|_| Error::External(format!("VKWebAppGetUserInfo: bad id {s:?}")))
            })
            .transpose()?;
        Ok(VkUserInfo { id })
    }
}

/// Drive one page session to its final state.
pub async fn run(cfg: &Config) -> anyhow::Result<PageState> {
    let backend = HttpSurveyBackend::new(&cfg.backend_url, cfg.http_timeout)?;

    let telegram = match cfg.tg_init_data.as_deref().map(TelegramInitData::parse) {
        Some(Ok(data)) => Some(data),
        Some(Err(e)) => {
            warn!("ignoring malformed TG_INIT_DATA: {e}");
            None
        }
        None => None,
    };
    let telegram: Option<&dyn TelegramHost> = telegram.as_ref().map(|t| t as &dyn TelegramHost);

    let vk = LaunchParamsBridge::detect(&cfg.launch_params);
    let vk: Option<&dyn VkBridge> = vk.as_ref().map(|b| b as &dyn VkBridge);

    let view = TerminalView;
    let mut page = SurveyPage::new(&view, &backend, telegram, cfg.page_settings());
    let resolver = IdentityResolver::new(telegram, vk, &cfg.launch_params);

    let user = page.load(&resolver).await;
    if !page.state().form_enabled() {
        return Ok(page.state().clone());
    }

    let mut form = SurveyForm::default();
    for (field, value) in &cfg.answers {
        form.set(field.clone(), value.clone());
    }
    if let Some(path) = &cfg.resume_path {
        match select_resume(&page, &view, path, cfg.max_file_bytes).await {
            ResumeSelection::Selected(resume) => form.resume = Some(resume),
            ResumeSelection::Discarded => {}
            ResumeSelection::Unreadable => return Ok(page.state().clone()),
        }
    }

    let user_id = user.as_ref().map(|u| &u.id);
    Ok(page.submit(user_id, &form).await.clone())
}

#[derive(Debug)]
enum ResumeSelection {
    Selected(ResumeFile),
    /// Over the size limit; the page already shows why.
    Discarded,
    Unreadable,
}

/// Mirror of a file picker: oversize selections are discarded, unreadable
/// files are reported on the view.
async fn select_resume(
    page: &SurveyPage<'_>,
    view: &dyn FormView,
    path: &Path,
    limit: u64,
) -> ResumeSelection {
    let size = match tokio::fs::metadata(path).await {
        Ok(md) => md.len(),
        Err(e) => {
            warn!("cannot stat resume {}: {e}", path.display());
            view.show_error(&format!("Cannot open resume file {}.", path.display()));
            return ResumeSelection::Unreadable;
        }
    };

    if !page.on_resume_selected(Some(size)) {
        return ResumeSelection::Discarded;
    }

    match ResumeFile::read(path, limit).await {
        Ok(resume) => ResumeSelection::Selected(resume),
        Err(e) => {
            warn!("cannot read resume {}: {e}", path.display());
            view.show_error(&format!("Cannot read resume file {}.", path.display()));
            ResumeSelection::Unreadable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use survey_core::{page::PageSettings, submission::FieldSet};

    #[derive(Default)]
    struct RecordingView {
        error: Mutex<Option<String>>,
    }

    impl FormView for RecordingView {
        fn set_form_enabled(&self, _enabled: bool) {}
        fn set_submit_enabled(&self, _enabled: bool) {}
        fn set_submit_label(&self, _label: &str) {}

        fn show_error(&self, msg: &str) {
            *self.error.lock().unwrap() = Some(msg.to_string());
        }

        fn clear_error(&self) {
            *self.error.lock().unwrap() = None;
        }

        fn show_result(&self, _msg: &str) {}
        fn hide_result(&self) {}
    }

    #[tokio::test]
    async fn resume_selection_reports_through_the_view() {
        let view = RecordingView::default();
        let backend = HttpSurveyBackend::new("http://127.0.0.1:9/fn", None).unwrap();
        let settings = PageSettings {
            fields: FieldSet::default(),
            max_file_bytes: 4,
        };
        let page = SurveyPage::new(&view, &backend, None, settings);

        let missing = std::env::temp_dir().join("survey-no-such-resume.pdf");
        let got = select_resume(&page, &view, &missing, 4).await;
        assert!(matches!(got, ResumeSelection::Unreadable));
        assert!(view
            .error
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|e| e.contains("survey-no-such-resume.pdf")));

        let path = std::env::temp_dir().join(format!("survey-cv-{}.txt", std::process::id()));
        tokio::fs::write(&path, b"cv").await.unwrap();
        let got = select_resume(&page, &view, &path, 4).await;
        assert!(matches!(got, ResumeSelection::Selected(ref r) if r.size() == 2));
        assert!(view.error.lock().unwrap().is_none());

        tokio::fs::write(&path, b"too long").await.unwrap();
        let got = select_resume(&page, &view, &path, 4).await;
        assert!(matches!(got, ResumeSelection::Discarded));
        assert!(view.error.lock().unwrap().is_some());

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn bridge_requires_vk_launch() {
        assert!(LaunchParamsBridge::detect(&LaunchParams::from_query("tg_id=1")).is_none());

        let bridge =
            LaunchParamsBridge::detect(&LaunchParams::from_query("vk_app_id=9&vk_user_id=77"))
                .unwrap();
        bridge.init().await.unwrap();
        assert_eq!(bridge.user_info().await.unwrap().id, Some(77));
    }

    #[tokio::test]
    async fn bridge_without_app_id_fails_init() {
        let bridge = LaunchParamsBridge::detect(&LaunchParams::from_query("vk_user_id=77")).unwrap();
        assert!(bridge.init().await.is_err());
    }

    #[tokio::test]
    async fn resolver_falls_back_to_vk_id_when_bridge_is_broken() {
        let params = LaunchParams::from_query("vk_user_id=77&vk_id=5");
        let bridge = LaunchParamsBridge::detect(&params).unwrap();

        let user = IdentityResolver::new(None, Some(&bridge), &params)
            .resolve()
            .await
            .unwrap();
        assert_eq!(user.id.as_str(), "5_VK");
    }
}
