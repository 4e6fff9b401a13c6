use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{errors::AppError, AppState};

/// Origins permitted to call the server. Requests without an Origin header are
/// always allowed; `*` allows every origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedOrigins {
    origins: Arc<[String]>,
}

impl AllowedOrigins {
    /// Parses a comma-separated list, ignoring blanks and trailing slashes.
    pub fn parse(list: &str) -> Self {
        let origins: Vec<String> = list
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            origins: Arc::from(origins),
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        let origin = origin.trim().trim_end_matches('/');
        self.origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

pub async fn enforce_origin_allowlist(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(value) = request.headers().get(header::ORIGIN) {
        let origin = value
            .to_str()
            .map_err(|_| AppError::forbidden("origin header is not valid text"))?
            .trim();

        if !origin.is_empty() && !state.allowed_origins.allows(origin) {
            return Err(AppError::forbidden(format!("origin {origin} is not allowed")));
        }
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_origins_are_allowed() {
        let origins = AllowedOrigins::parse("http://localhost:3000, https://app.example.com/");

        assert!(origins.allows("http://localhost:3000"));
        assert!(origins.allows("https://app.example.com"));
        assert!(!origins.allows("https://evil.example.com"));
    }

    #[test]
    fn empty_list_allows_nothing() {
        let origins = AllowedOrigins::parse(" , ");

        assert!(origins.is_empty());
        assert!(!origins.allows("http://localhost:3000"));
    }

    #[test]
    fn wildcard_allows_everything() {
        assert!(AllowedOrigins::parse("*").allows("https://anything.test"));
    }
}
