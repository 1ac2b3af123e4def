//! CORS relay strategies for stream and playlist URLs

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Rewrites a URL before it is requested
pub trait UrlRewriter {
    fn rewrite(&self, url: &str) -> String;
}

/// Public relay services a request can be routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RelayStrategy {
    #[default]
    Direct,
    CorsProxyIo,
    AllOrigins,
    CodeTabs,
}

impl RelayStrategy {
    pub const ALL: [RelayStrategy; 4] = [
        RelayStrategy::Direct,
        RelayStrategy::CorsProxyIo,
        RelayStrategy::AllOrigins,
        RelayStrategy::CodeTabs,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RelayStrategy::Direct => "Direct",
            RelayStrategy::CorsProxyIo => "corsproxy.io",
            RelayStrategy::AllOrigins => "AllOrigins",
            RelayStrategy::CodeTabs => "CodeTabs",
        }
    }

    fn prefix(&self) -> Option<&'static str> {
        match self {
            RelayStrategy::Direct => None,
            RelayStrategy::CorsProxyIo => Some("https://corsproxy.io/?url="),
            RelayStrategy::AllOrigins => Some("https://api.allorigins.win/raw?url="),
            RelayStrategy::CodeTabs => Some("https://api.codetabs.com/v1/proxy?quest="),
        }
    }
}

impl UrlRewriter for RelayStrategy {
    fn rewrite(&self, url: &str) -> String {
        match self.prefix() {
            Some(prefix) => {
                let relayed = format!("{}{}", prefix, urlencoding::encode(url));
                debug!(relay = self.label(), %url, "rewrote url through relay");
                relayed
            }
            None => url.to_string(),
        }
    }
}

/// Relay choice plus the on/off toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelaySettings {
    pub enabled: bool,
    pub strategy: RelayStrategy,
}

impl UrlRewriter for RelaySettings {
    fn rewrite(&self, url: &str) -> String {
        if self.enabled {
            self.strategy.rewrite(url)
        } else {
            url.to_string()
        }
    }
}
