//! User-facing texts shown by the page.

pub const SUBMIT_LABEL: &str = "Submit";
pub const LOADING_LABEL: &str = "Loading…";
pub const SUBMITTING_LABEL: &str = "Sending…";

pub const USER_UNRESOLVED: &str =
    "Could not identify the user. Open the mini app inside Telegram or VK.";
pub const USER_UNRESOLVED_SHORT: &str = "Could not identify the user.";
pub const CHECK_UNAVAILABLE: &str = "Could not check whether you have already submitted the survey.";
pub const ALREADY_SUBMITTED: &str =
    "You have already submitted this survey. Resubmission is not available.";

pub const RESUME_REQUIRED: &str = "Attach a resume (the file is required).";
pub const SUBMIT_DONE: &str = "Done!";
pub const SUBMIT_UNKNOWN_ERROR: &str = "Unknown error while sending.";

pub fn file_too_large(limit_bytes: u64) -> String {
    format!(
        "The resume file must not exceed {} MB.",
        limit_bytes / (1024 * 1024)
    )
}

pub fn field_required(name: &str) -> String {
    format!("Please fill in the \"{name}\" field.")
}

pub fn check_failed(status: u16) -> String {
    format!("Check failed: {status}")
}

pub fn submit_failed(status: u16) -> String {
    format!("Error: {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_is_rendered_in_megabytes() {
        assert_eq!(
            file_too_large(15 * 1024 * 1024),
            "The resume file must not exceed 15 MB."
        );
    }
}
