//! Bearer-token identity resolution.

use axum::http::{header, HeaderMap};
use schemaforge_model::{AuthError, Identity, IdentityResolver};
use std::collections::HashMap;

use crate::config::TokenConfig;

/// Resolves bearer tokens against a fixed table from the configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenResolver {
    pub fn new(tokens: &[TokenConfig]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|t| (t.token.clone(), Identity::new(&t.subject, &t.role)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl IdentityResolver for StaticTokenResolver {
    fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)
    }
}

/// Extracts the token of an `Authorization: Bearer <token>` header.
///
/// `Ok(None)` when the header is absent; a header in any other form is
/// invalid credentials.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidCredentials)?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::InvalidCredentials)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(Some(token))
}

/// Resolves the caller of a request.
///
/// No credentials is anonymous unless `require_auth` is set.
pub fn authenticate(
    resolver: &dyn IdentityResolver,
    headers: &HeaderMap,
    require_auth: bool,
) -> Result<Option<Identity>, AuthError> {
    match bearer_token(headers)? {
        Some(token) => resolver.resolve(token).map(Some),
        None if require_auth => Err(AuthError::MissingCredentials),
        None => Ok(None),
    }
}
