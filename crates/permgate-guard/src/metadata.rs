//! Client metadata extracted from request headers.

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;

/// Client IP and user agent, as far as the headers tell.
///
/// Absent values stay `None` rather than being replaced by a placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMetadata {
    /// Extract from raw `(name, value)` header pairs.
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::from_context(&RequestContext::from_headers(headers))
    }

    /// Extract from a request context.
    ///
    /// IP: first entry of `x-forwarded-for`, then `x-real-ip`. Empty values
    /// count as absent.
    pub fn from_context(ctx: &RequestContext) -> Self {
        let forwarded = ctx
            .header("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        let ip_address = forwarded
            .or_else(|| {
                ctx.header("x-real-ip")
                    .map(str::trim)
                    .filter(|ip| !ip.is_empty())
            })
            .map(str::to_string);

        let user_agent = ctx
            .header("user-agent")
            .filter(|ua| !ua.is_empty())
            .map(str::to_string);

        Self {
            ip_address,
            user_agent,
        }
    }
}
