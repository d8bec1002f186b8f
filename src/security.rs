//! Security scheme injection.
//!
//! Authentication schemes configured for the application are described in
//! `components.securitySchemes`. Entries already present in the document are never
//! replaced, and missing OAuth endpoints are simply left out.

use crate::document::{ApiDocument, ParameterLocation};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An authentication scheme registered with the application.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuthScheme {
    /// Cookie-based session authentication
    Cookie {
        name: String,
        /// Cookie carrying the session, defaults to the scheme name
        #[serde(default)]
        cookie_name: Option<String>,
    },
    /// OAuth 2.0 authorization-code login
    #[serde(rename = "oauth")]
    OAuth {
        name: String,
        #[serde(default)]
        authorization_url: Option<String>,
        #[serde(default)]
        token_url: Option<String>,
        #[serde(default)]
        scopes: Vec<String>,
    },
    /// Bearer token in the `Authorization` header
    Bearer {
        name: String,
        #[serde(default)]
        bearer_format: Option<String>,
    },
}

impl AuthScheme {
    pub fn name(&self) -> &str {
        match self {
            AuthScheme::Cookie { name, .. }
            | AuthScheme::OAuth { name, .. }
            | AuthScheme::Bearer { name, .. } => name,
        }
    }

    /// The document entry describing this scheme.
    pub fn to_security_scheme(&self) -> SecurityScheme {
        match self {
            AuthScheme::Cookie { name, cookie_name } => SecurityScheme {
                name: Some(cookie_name.clone().unwrap_or_else(|| name.clone())),
                location: Some(ParameterLocation::Cookie),
                ..SecurityScheme::new(SecuritySchemeType::ApiKey)
            },
            AuthScheme::OAuth {
                name,
                authorization_url,
                token_url,
                scopes,
            } => {
                if authorization_url.is_none() || token_url.is_none() {
                    warn!("OAuth scheme {} is missing an endpoint URL", name);
                }
                let mut extensions = BTreeMap::new();
                extensions.insert("x-tokenName".to_string(), Value::from("id_token"));
                SecurityScheme {
                    flows: Some(OAuthFlows {
                        authorization_code: Some(OAuthFlow {
                            authorization_url: authorization_url.clone(),
                            token_url: token_url.clone(),
                            scopes: scopes.iter().map(|s| (s.clone(), s.clone())).collect(),
                        }),
                    }),
                    extensions,
                    ..SecurityScheme::new(SecuritySchemeType::OAuth2)
                }
            }
            AuthScheme::Bearer { bearer_format, .. } => SecurityScheme {
                scheme: Some("bearer".to_string()),
                bearer_format: bearer_format.clone(),
                ..SecurityScheme::new(SecuritySchemeType::Http)
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecuritySchemeType {
    #[serde(rename = "apiKey")]
    ApiKey,
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "openIdConnect")]
    OpenIdConnect,
}

/// OpenAPI Security Scheme object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: SecuritySchemeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Header, query or cookie name for `apiKey` schemes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ParameterLocation>,
    /// HTTP auth scheme for `http` schemes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,
    /// `x-` extension fields
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl SecurityScheme {
    pub fn new(scheme_type: SecuritySchemeType) -> Self {
        Self {
            scheme_type,
            description: None,
            name: None,
            location: None,
            scheme: None,
            bearer_format: None,
            flows: None,
            extensions: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlows {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default)]
    pub scopes: BTreeMap<String, String>,
}

/// Adds an entry per scheme to `components.securitySchemes`, keeping existing entries.
/// Returns the number of entries added.
pub fn inject_security_schemes(document: &mut ApiDocument, schemes: &[AuthScheme]) -> usize {
    let mut added = 0;
    for scheme in schemes {
        let entries = &mut document.components.security_schemes;
        if entries.contains_key(scheme.name()) {
            debug!("Security scheme {} already present", scheme.name());
            continue;
        }
        debug!("Adding security scheme: {}", scheme.name());
        entries.insert(scheme.name().to_string(), scheme.to_security_scheme());
        added += 1;
    }
    added
}
