//! Redirect-URL parsing for the interactive sign-in round trip.
//!
//! The terminal redirect of a first sign-in carries the account and
//! service metadata as query parameters. This module extracts them with
//! form-encoding semantics (`+` is a space after percent-decoding) and
//! never fails: absent parameters, or a URL without a query component,
//! produce empty fields.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Characters left verbatim by [`encode_component`].
///
/// Matches the unreserved set of a JavaScript `encodeURIComponent`, which
/// is what the discovery service expects for the `redirect_uri` parameter.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a value for embedding as a URI query component.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Extract one query parameter from `url` by exact name.
///
/// Returns the decoded value, with `+` treated as a space. Returns an
/// empty string when the URL has no query component, when the parameter
/// is absent, or when the URL *starts* with `?`.
pub fn query_parameter(url: &str, name: &str) -> String {
    let Some(qmark) = url.find('?') else {
        return String::new();
    };
    if qmark == 0 {
        return String::new();
    }

    // Values stop at the fragment, like the rest of the query string.
    let query = url[qmark + 1..].split('#').next().unwrap_or("");

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

/// Kind of account that completed the sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    /// A personal (consumer) account.
    Personal,
    /// An organizational (directory) account.
    Organizational,
}

impl AccountType {
    /// Interpret the numeric `account_type` redirect parameter.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Personal),
            2 => Some(Self::Organizational),
            _ => None,
        }
    }
}

/// Account and service metadata harvested from the terminal redirect of a
/// first sign-in.
///
/// Built once per successful round trip; every field defaults to empty
/// (`account_type` to `0`) when the redirect did not carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRedirectPayload {
    /// Email address of the signed-in account.
    pub user_email: String,

    /// Numeric account-type code; interpret with [`AccountType::from_code`].
    pub account_type: i32,

    /// Authorization endpoint to use for this account.
    pub authorization_service_uri: String,

    /// Token endpoint to use for this account.
    pub token_service_uri: String,

    /// Scopes granted.
    pub scope: String,

    /// Requested scopes the service does not support for this account.
    pub unsupported_scope: String,

    /// Discovery endpoint for this account.
    pub discovery_service_uri: String,

    /// Resource id of the discovery service itself.
    pub discovery_resource_id: String,
}

impl AuthRedirectPayload {
    /// Parse the payload out of a terminal redirect URL's query string.
    pub fn from_redirect_url(url: &str) -> Self {
        Self {
            user_email: query_parameter(url, "user_email"),
            account_type: query_parameter(url, "account_type").parse().unwrap_or(0),
            authorization_service_uri: query_parameter(url, "authorization_service"),
            token_service_uri: query_parameter(url, "token_service"),
            scope: query_parameter(url, "scope"),
            unsupported_scope: query_parameter(url, "unsupported_scope"),
            discovery_service_uri: query_parameter(url, "discovery_service"),
            discovery_resource_id: query_parameter(url, "discovery_resource"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_decoded_parameters() {
        let url = "http://test.com?user_email=a%40b.com&account_type=2";
        let payload = AuthRedirectPayload::from_redirect_url(url);

        assert_eq!(payload.user_email, "a@b.com");
        assert_eq!(payload.account_type, 2);
        assert_eq!(payload.authorization_service_uri, "");
        assert_eq!(payload.token_service_uri, "");
        assert_eq!(payload.scope, "");
        assert_eq!(payload.unsupported_scope, "");
        assert_eq!(payload.discovery_service_uri, "");
        assert_eq!(payload.discovery_resource_id, "");
    }

    #[test]
    fn no_query_string_yields_empty_payload() {
        let payload = AuthRedirectPayload::from_redirect_url("http://test.com/landing");

        assert_eq!(payload.user_email, "");
        assert_eq!(payload.account_type, 0);
        assert_eq!(payload.scope, "");
    }

    #[test]
    fn plus_decodes_to_space() {
        let url = "http://test.com?scope=Files.Read+Files.Write";
        assert_eq!(query_parameter(url, "scope"), "Files.Read Files.Write");
    }

    #[test]
    fn value_stops_at_fragment() {
        let url = "http://test.com?scope=read#account_type=2";
        assert_eq!(query_parameter(url, "scope"), "read");
        assert_eq!(query_parameter(url, "account_type"), "");
    }

    #[test]
    fn leading_question_mark_yields_nothing() {
        assert_eq!(query_parameter("?user_email=a%40b.com", "user_email"), "");
    }

    #[test]
    fn non_numeric_account_type_becomes_zero() {
        let payload =
            AuthRedirectPayload::from_redirect_url("http://test.com?account_type=abc");
        assert_eq!(payload.account_type, 0);
        assert_eq!(AccountType::from_code(payload.account_type), None);
    }

    #[test]
    fn account_type_codes() {
        assert_eq!(AccountType::from_code(1), Some(AccountType::Personal));
        assert_eq!(AccountType::from_code(2), Some(AccountType::Organizational));
        assert_eq!(AccountType::from_code(3), None);
    }

    #[test]
    fn encode_component_matches_uri_component_rules() {
        assert_eq!(
            encode_component("http://localhost/landing page"),
            "http%3A%2F%2Flocalhost%2Flanding%20page"
        );
        assert_eq!(encode_component("a-b_c.d!e~f*g'h(i)j"), "a-b_c.d!e~f*g'h(i)j");
    }
}
