//! Telegram web-app init data.
//!
//! Telegram hands web apps a signed, url-encoded payload (`initData`); the
//! `user` field is a JSON object. We only read it. Signature checks belong to
//! the backend, which receives the raw string as `tg_init_data`.

use serde::Deserialize;

use crate::{ports::TelegramHost, Result};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelegramInitData {
    raw: String,
    pub query_id: Option<String>,
    pub user: Option<WebAppUser>,
    pub auth_date: Option<i64>,
    pub hash: Option<String>,
}

impl TelegramInitData {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut out = Self {
            raw: raw.to_string(),
            query_id: None,
            user: None,
            auth_date: None,
            hash: None,
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "query_id" => out.query_id = Some(value.into_owned()),
                "user" => out.user = Some(serde_json::from_str(&value)?),
                "auth_date" => out.auth_date = value.trim().parse().ok(),
                "hash" => out.hash = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(out)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// A host built from raw init data behaves like `Telegram.WebApp` with no
/// visual side effects.
impl TelegramHost for TelegramInitData {
    fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }

    fn init_data(&self) -> Option<String> {
        if self.raw.trim().is_empty() {
            None
        } else {
            Some(self.raw.clone())
        }
    }
}
