//! Common test utilities for integration tests
//!
//! Provides a mock identity provider serving a JWKS document and RSA signing
//! keys for minting tokens it would have issued.

#![allow(dead_code)]

use std::sync::{Arc, LazyLock};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use gatehouse_auth::{AuthorizationConfig, Authorizer, jwt::KeyResolver};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const ISSUER: &str = "https://tenant.example.com/";
pub const AUDIENCE: &str = "https://api.example.com";
pub const SCOPE: &str = "read:messages";

/// RSA signing key; the public half is published as a JWK
pub struct TestKey {
    encoding: EncodingKey,
    n: String,
    e: String,
}

impl TestKey {
    pub fn generate() -> Self {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let pem = private_key.to_pkcs1_pem(LineEnding::LF).unwrap();
        Self {
            encoding: EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
            n: URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be()),
        }
    }

    /// Public JWK for this key under `kid`
    pub fn jwk(&self, kid: &str) -> Value {
        json!({
            "kty": "RSA",
            "kid": kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.n,
            "e": self.e,
        })
    }

    /// Sign `claims` with RS256, announcing `kid` in the header
    pub fn sign(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding).unwrap()
    }
}

/// Key generation is slow, so each test binary makes two keys once
pub static PRIMARY_KEY: LazyLock<TestKey> = LazyLock::new(TestKey::generate);
pub static SECONDARY_KEY: LazyLock<TestKey> = LazyLock::new(TestKey::generate);

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Claims that pass every check for the default configuration
pub fn valid_claims() -> Value {
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "auth0|user-123",
        "exp": current_timestamp() + 3600,
        "iat": current_timestamp(),
        "scope": format!("openid {SCOPE} profile"),
    })
}

/// Identity provider stand-in serving `/jwks`
pub struct MockIdentityProvider {
    pub server: MockServer,
    pub jwks_endpoint: String,
}

impl MockIdentityProvider {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let jwks_endpoint = format!("{}/jwks", server.uri());
        Self {
            server,
            jwks_endpoint,
        }
    }

    /// Serve `keys` from now on
    ///
    /// Replaces earlier mocks and clears the recorded request log.
    pub async fn serve_keys(&self, keys: Vec<Value>) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.server)
            .await;
    }

    /// Answer every JWKS request with `status`, clearing the request log
    pub async fn fail_with(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Number of JWKS requests since the last `serve_keys`/`fail_with`
    pub async fn jwks_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| {
                requests.iter().filter(|r| r.url.path() == "/jwks").count()
            })
    }

    /// Configuration pointing at this provider
    pub fn config(&self) -> AuthorizationConfig {
        AuthorizationConfig::new(
            self.jwks_endpoint.clone(),
            ISSUER,
            vec![AUDIENCE.to_string()],
            SCOPE,
        )
    }

    /// Resolver over this provider with refresh rate limiting disabled
    pub fn resolver(&self) -> Arc<KeyResolver> {
        let config = self.config().with_min_refresh_interval(std::time::Duration::ZERO);
        Arc::new(KeyResolver::from_config(&config).unwrap())
    }

    pub fn authorizer(&self) -> Authorizer {
        Authorizer::new(self.config(), self.resolver()).unwrap()
    }
}

pub fn bearer(token: &str) -> http::HeaderMap {
    let mut headers = http::HeaderMap::new();
    headers.insert(
        http::header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    headers
}
