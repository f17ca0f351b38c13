use ::cookie::{time::Duration, Cookie};
use axum::http::{header, header::InvalidHeaderValue, HeaderMap, HeaderValue};

use crate::id::SessionId;

/// Pending change to the session cookie, applied to the response once the
/// handler returns. A later change replaces an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    Set(SessionId),
    Removed,
}

impl CookieChange {
    pub fn to_cookie(&self, name: &str, max_age: Option<u64>) -> Cookie<'static> {
        match self {
            CookieChange::Set(id) => {
                let builder = Cookie::build((name.to_string(), id.to_string())).path("/");
                match max_age {
                    Some(age) => builder.max_age(Duration::seconds(age as i64)).build(),
                    None => builder.build(),
                }
            }
            CookieChange::Removed => {
                let mut cookie = Cookie::build((name.to_string(), "")).path("/").build();
                cookie.make_removal();
                cookie
            }
        }
    }

    /// Render as a `Set-Cookie` value
    pub fn header_value(
        &self,
        name: &str,
        max_age: Option<u64>,
    ) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_cookie(name, max_age).encoded().to_string())
    }
}

/// Cookie names must be an RFC 6265 token
pub fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b))
}

/// Read a cookie value from every `Cookie` header on the request
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse_encoded(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value_trimmed().to_string())
}
