use std::fmt;

/// Marker appended to every VK-origin id so the backend can tell the two
/// id namespaces apart by string shape alone.
pub const VK_SUFFIX: &str = "_VK";

/// Opaque platform user identifier sent to the backend as `tg_id`.
///
/// Never empty. "No identifier" is `Option::None`, never `""`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserIdentifier(String);

impl UserIdentifier {
    /// Unmarked identifier (Telegram id or generic fallback value).
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// VK-origin identifier: always carries [`VK_SUFFIX`].
    pub fn vk(raw: impl fmt::Display) -> Option<Self> {
        let raw = raw.to_string();
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(format!("{raw}{VK_SUFFIX}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> Namespace {
        if self.0.ends_with(VK_SUFFIX) {
            Namespace::Vk
        } else {
            Namespace::Telegram
        }
    }
}

impl fmt::Display for UserIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity namespace, derived from the identifier's shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    Telegram,
    Vk,
}

/// Where a resolved identifier came from (for logs only).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    TelegramHost,
    TelegramQuery,
    VkBridge,
    VkQuery,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedUser {
    pub id: UserIdentifier,
    pub source: IdentitySource,
}

/// Answer of the backend's `mode=check` query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmissionCheckResult {
    pub exists: bool,
    pub message: Option<String>,
}
