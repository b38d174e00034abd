//! Client-safe projection of resolved services.
//!
//! Only the URL of each service leaves the process; file paths, ports and
//! build configuration stay behind.

use super::resolved::{ResolvedMap, ResolvedService};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Sanitized services keyed by name.
pub type SanitizedMap = BTreeMap<String, SanitizedService>;

/// The only field exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedService {
    pub url: String,
}

impl From<SanitizedService> for ResolvedService {
    fn from(service: SanitizedService) -> Self {
        ResolvedService::Remote { url: service.url }
    }
}

/// Project resolved services to `{ url }`, dropping entries without a usable
/// URL and rewriting a `0.0.0.0` host to `localhost`.
pub fn sanitize(services: &ResolvedMap) -> SanitizedMap {
    services
        .iter()
        .filter_map(|(name, service)| {
            sanitize_url(service.url()).map(|url| (name.clone(), SanitizedService { url }))
        })
        .collect()
}

fn sanitize_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok().filter(|url| url.has_host())?;
    if parsed.host_str() == Some("0.0.0.0") {
        Some(raw.replacen("0.0.0.0", "localhost", 1))
    } else {
        Some(raw.to_string())
    }
}
