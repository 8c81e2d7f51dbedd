use axum::async_trait;
use axum::extract::FromRequestParts;
use http::request::Parts;
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// The caller's web session, identified by the `sid` cookie. A request
/// without one gets a fresh id; handlers re-issue the cookie on their
/// responses so the id sticks.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub is_new: bool,
}

impl Session {
    /// The Set-Cookie value re-issuing this session's cookie.
    pub fn cookie(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE, self.id
        )
    }
}

/// Extractor implementation: resolves the session from the Cookie header,
/// minting a new session id when none is present.
#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let existing = parts
            .headers
            .get(http::header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_session_cookie);

        Ok(match existing {
            Some(id) => Session { id, is_new: false },
            None => Session {
                id: Uuid::new_v4().to_string(),
                is_new: true,
            },
        })
    }
}

fn parse_session_cookie(header: &str) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(prefix.as_str()))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_session_cookie() {
        assert_eq!(
            parse_session_cookie("sid=abc-123; theme=dark"),
            Some("abc-123".to_string())
        );
        assert_eq!(
            parse_session_cookie("theme=dark; sid=abc-123"),
            Some("abc-123".to_string())
        );
        assert_eq!(parse_session_cookie("theme=dark"), None);
        assert_eq!(parse_session_cookie("sid="), None);
    }
}
