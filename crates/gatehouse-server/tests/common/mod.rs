//! Shared fixtures for router tests

#![allow(dead_code)]

use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Router, body::Body};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use gatehouse_auth::{AuthorizationConfig, Authorizer};
use gatehouse_server::{Messages, MessageResponse, app};
use http::{Request, StatusCode};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const ISSUER: &str = "https://tenant.example.com/";
pub const AUDIENCE: &str = "https://api.example.com";

pub struct SigningKey {
    encoding: EncodingKey,
    n: String,
    e: String,
}

impl SigningKey {
    fn generate() -> Self {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
        let pem = private_key.to_pkcs1_pem(LineEnding::LF).unwrap();
        Self {
            encoding: EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap(),
            n: URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be()),
        }
    }

    pub fn jwk(&self, kid: &str) -> Value {
        json!({ "kty": "RSA", "kid": kid, "use": "sig", "alg": "RS256", "n": self.n, "e": self.e })
    }

    pub fn sign(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, claims, &self.encoding).unwrap()
    }
}

pub static OLD_KEY: LazyLock<SigningKey> = LazyLock::new(SigningKey::generate);
pub static NEW_KEY: LazyLock<SigningKey> = LazyLock::new(SigningKey::generate);

pub fn claims_with_scope(scope: &str) -> Value {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    json!({
        "iss": ISSUER,
        "aud": AUDIENCE,
        "sub": "auth0|user-123",
        "exp": now + 3600,
        "scope": scope,
    })
}

/// JWKS endpoint plus the router under test
pub struct TestApp {
    pub idp: MockServer,
    pub router: Router,
}

impl TestApp {
    /// Router whose JWKS endpoint publishes `keys`
    pub async fn with_keys(keys: Vec<Value>) -> Self {
        let idp = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&idp)
            .await;

        let config = AuthorizationConfig::new(
            format!("{}/.well-known/jwks.json", idp.uri()),
            ISSUER,
            vec![AUDIENCE.to_string()],
            "read:messages",
        )
        .with_min_refresh_interval(std::time::Duration::ZERO);

        let router = app(Messages::default(), Authorizer::from_config(config).unwrap());
        Self { idp, router }
    }

    /// Publish a different key set from now on
    pub async fn publish(&self, keys: Vec<Value>) {
        self.idp.reset().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
            .mount(&self.idp)
            .await;
    }

    /// Send a GET, optionally with an `Authorization` header value
    pub async fn get(&self, uri: &str, authorization: Option<&str>) -> (StatusCode, MessageResponse) {
        let mut request = Request::builder().uri(uri);
        if let Some(value) = authorization {
            request = request.header(http::header::AUTHORIZATION, value);
        }
        let response = self
            .router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
