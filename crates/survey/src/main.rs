use std::process::ExitCode;

use survey_core::{config::Config, page::PageState};

mod terminal;

#[tokio::main]
async fn main() -> Result<ExitCode, survey_core::Error> {
    survey_core::logging::init("survey")?;

    let cfg = Config::load()?;

    let state = terminal::run(&cfg)
        .await
        .map_err(|e| survey_core::Error::External(format!("survey run failed: {e:#}")))?;

    Ok(match state {
        PageState::Submitted(_) | PageState::AlreadySubmitted(_) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}
