//! Pure URL normalization rules.
//!
//! The canonical operation edits the raw request string, because the WHATWG
//! parser lower-cases the host at parse time and canonical output must keep
//! scheme, host, and path case exactly as submitted. The redirection and all
//! operations lower-case the whole string anyway, so they work on the parsed
//! `Url`.

use url::Url;

use super::models::UrlOperation;

/// Hosts must contain this substring. Deliberately a loose containment
/// check, not a domain-suffix check: `notbyfood.com.evil.com` also passes.
pub const REQUIRED_HOST_FRAGMENT: &str = "byfood.com";

const REDIRECTION_HOST: &str = "www.byfood.com";

/// Containment check on the parsed host.
pub fn host_is_allowed(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host.contains(REQUIRED_HOST_FRAGMENT))
}

/// Apply `operation` to a validated URL and return the processed string.
/// `raw` is the string as submitted; `url` is its parse. The only failure
/// mode is a URL whose host cannot be rewritten.
pub fn normalize(raw: &str, url: &Url, operation: UrlOperation) -> Result<String, url::ParseError> {
    match operation {
        UrlOperation::Canonical => Ok(canonicalize(raw, url)),
        UrlOperation::Redirection => {
            let mut url = url.clone();
            redirect(&mut url)?;
            Ok(url.to_string().to_lowercase())
        }
        UrlOperation::All => {
            let mut url = url.clone();
            redirect(&mut url)?;
            let redirected = url.to_string();
            Ok(canonicalize(&redirected, &url).to_lowercase())
        }
    }
}

/// Strip query and fragment; strip a single trailing slash unless the path
/// is exactly `/`. String-level edits so the rest of the URL is untouched.
fn canonicalize(raw: &str, url: &Url) -> String {
    let mut out = raw;

    if let Some(idx) = out.find('#') {
        out = &out[..idx];
    }
    if let Some(idx) = out.find('?') {
        out = &out[..idx];
    }

    if url.path() != "/" && out.ends_with('/') {
        out = &out[..out.len() - 1];
    }

    out.to_string()
}

/// Rewrite the host to the canonical www host.
fn redirect(url: &mut Url) -> Result<(), url::ParseError> {
    url.set_host(Some(REDIRECTION_HOST))
}
