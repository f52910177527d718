//! User identity resolution.
//!
//! Sources are tried strictly in order, first hit wins:
//! 1. Telegram host (`initDataUnsafe.user.id`)
//! 2. `tg_id` launch query parameter
//! 3. VK bridge (`init` then `user_info`), falling back to `vk_id`
//!
//! Every VK-origin id carries the `_VK` suffix, nothing else does.

use tracing::{debug, info};

use crate::{
    domain::{IdentitySource, ResolvedUser, UserIdentifier},
    errors::Error,
    ports::{TelegramHost, VkBridge},
    Result,
};

pub const TG_QUERY_PARAM: &str = "tg_id";
pub const VK_QUERY_PARAM: &str = "vk_id";

/// Query parameters the mini-app was launched with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pairs: Vec<(String, String)>,
}

impl LaunchParams {
    /// Parse a raw query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self { pairs }
    }

    /// Parse the query part of a full launch URL.
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = url::Url::parse(raw)
            .map_err(|e| Error::Config(format!("invalid launch url {raw:?}: {e}")))?;
        Ok(Self::from_query(url.query().unwrap_or("")))
    }

    /// First value for `key` (`URLSearchParams.get` semantics).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolves the one identifier used for the whole page session.
pub struct IdentityResolver<'a> {
    telegram: Option<&'a dyn TelegramHost>,
    vk: Option<&'a dyn VkBridge>,
    params: &'a LaunchParams,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(
        telegram: Option<&'a dyn TelegramHost>,
        vk: Option<&'a dyn VkBridge>,
        params: &'a LaunchParams,
    ) -> Self {
        Self {
            telegram,
            vk,
            params,
        }
    }

    /// Never fails: `None` is the unresolved value.
    pub async fn resolve(&self) -> Option<ResolvedUser> {
        let resolved = match self.resolve_telegram() {
            Some(user) => Some(user),
            None => self.resolve_vk().await,
        };

        match &resolved {
            Some(user) => info!(
                user_id = %user.id,
                source = ?user.source,
                namespace = ?user.id.namespace(),
                "user resolved"
            ),
            None => info!("no user identity available"),
        }
        resolved
    }

    fn resolve_telegram(&self) -> Option<ResolvedUser> {
        if let Some(host) = self.telegram {
            let id = host
                .user_id()
                .filter(|id| *id != 0)
                .and_then(|id| UserIdentifier::new(id.to_string()));
            if let Some(id) = id {
                return Some(ResolvedUser {
                    id,
                    source: IdentitySource::TelegramHost,
                });
            }
        }

        // Plain-browser fallback, checked with or without a host.
        self.params
            .get(TG_QUERY_PARAM)
            .and_then(UserIdentifier::new)
            .map(|id| ResolvedUser {
                id,
                source: IdentitySource::TelegramQuery,
            })
    }

    async fn resolve_vk(&self) -> Option<ResolvedUser> {
        match self.vk_bridge_id().await {
            Ok(id) => {
                return Some(ResolvedUser {
                    id,
                    source: IdentitySource::VkBridge,
                })
            }
            Err(e) => debug!("vk bridge lookup failed: {e}"),
        }

        self.params
            .get(VK_QUERY_PARAM)
            .and_then(UserIdentifier::vk)
            .map(|id| ResolvedUser {
                id,
                source: IdentitySource::VkQuery,
            })
    }

    async fn vk_bridge_id(&self) -> Result<UserIdentifier> {
        let bridge = self
            .vk
            .ok_or_else(|| Error::External("vk bridge is not available".to_string()))?;

        bridge.init().await?;
        let info = bridge.user_info().await?;

        info.id
            .filter(|id| *id != 0)
            .and_then(UserIdentifier::vk)
            .ok_or_else(|| Error::External("vk user info has no id".to_string()))
    }
}
