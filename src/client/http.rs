//! Reqwest-based client for the license validation endpoint.
//!
//! One POST per attempt, bounded by connect/read timeouts, with the outcome
//! classified into [`ValidationOutcome`]. Every failure is recovered here;
//! this module never returns an error to the caller.

use crate::config::LicenseConfig;
use crate::crypto::canonical::strip_signature_field;
use crate::crypto::verify::SignatureVerifier;
use crate::protocol::models::{
    LicenseSummary, ValidationOutcome, ValidationRequest, ValidationResponse,
};
use crate::LicenseError;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

/// Connect timeout for the validation request.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout for the validation request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Cap on logged error-body length.
const BODY_LOG_CAP: usize = 300;

/// Client for the validation endpoint.
pub struct ValidationClient {
    client: Client,
    url: String,
    user_agent: String,
    verifier: SignatureVerifier,
}

impl ValidationClient {
    /// Build a client from config. The embedded public key is decoded here,
    /// once; a broken key leaves the verifier fail-closed (logged by the
    /// verifier itself).
    pub fn new(config: &LicenseConfig) -> Result<Self, LicenseError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .map_err(|e| LicenseError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.validation_url.clone(),
            user_agent: config.user_agent.to_string(),
            verifier: SignatureVerifier::from_base64_der(&config.public_key_b64),
        })
    }

    /// Whether the embedded public key loaded at startup.
    pub fn key_available(&self) -> bool {
        self.verifier.key_available()
    }

    /// Perform one validation round trip and classify the outcome.
    ///
    /// Every fault is recovered here: the internal [`LicenseError`] taxonomy
    /// is folded into a [`ValidationOutcome`] before reaching the caller.
    pub async fn validate(&self, request: &ValidationRequest) -> ValidationOutcome {
        match self.try_validate(request).await {
            Ok(summary) => ValidationOutcome::Success(summary),
            Err(e) => fold_error(e),
        }
    }

    async fn try_validate(
        &self,
        request: &ValidationRequest,
    ) -> Result<LicenseSummary, LicenseError> {
        // Local precheck: never touch the network with a malformed key.
        if !looks_like_key(&request.license_key) {
            return Err(LicenseError::InvalidKeyFormat);
        }

        let body = serde_json::to_vec(request)
            .map_err(|e| LicenseError::Transport(format!("serialize request: {}", e)))?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json; charset=UTF-8")
            .header(USER_AGENT, &self.user_agent)
            .body(body)
            .send()
            .await
            .map_err(|e| LicenseError::Transport(format!("send: {}", e)))?;

        let status = response.status();

        // The body is read regardless of status bucket: error responses can
        // still carry a useful message for the log.
        let raw = response.text().await.map_err(|e| {
            LicenseError::Transport(format!("read body (status {}): {}", status.as_u16(), e))
        })?;

        if status.as_u16() >= 400 {
            return Err(LicenseError::Transport(format!(
                "status {}: {}",
                status.as_u16(),
                trim_body(&raw)
            )));
        }

        self.classify_body(&raw)
    }

    /// Parse, verify, and classify a 2xx response body.
    fn classify_body(&self, raw: &str) -> Result<LicenseSummary, LicenseError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| LicenseError::MalformedResponse(e.to_string()))?;

        if !self.verifier.key_available() {
            return Err(LicenseError::KeyUnavailable(
                "embedded public key failed to decode at startup".to_string(),
            ));
        }

        let signature = value
            .get("signature")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let canonical = strip_signature_field(raw);

        if !self.verifier.verify(canonical.as_bytes(), signature) {
            return Err(LicenseError::SignatureInvalid);
        }

        let response = ValidationResponse::from_value(&value);
        if response.is_ok() {
            info!(
                plan = response.plan.as_deref().unwrap_or("-"),
                servers = response.bound_servers,
                ips = response.bound_ips,
                "license OK"
            );
            Ok((&response).into())
        } else {
            Err(LicenseError::Rejected {
                reason: response.rejection_reason(),
            })
        }
    }
}

/// Fold an internal error into the outcome the state machine consumes,
/// logging at the severity the failure class warrants. Signature and key
/// failures collapse into the same hard rejection: both mean the response
/// cannot be trusted.
fn fold_error(error: LicenseError) -> ValidationOutcome {
    match error {
        LicenseError::InvalidKeyFormat => {
            error!("invalid or missing license key");
            ValidationOutcome::Rejected("missing/invalid key".to_string())
        }
        LicenseError::KeyUnavailable(reason) => {
            error!(%reason, "cannot verify validation response");
            ValidationOutcome::Rejected("signature verification failed".to_string())
        }
        LicenseError::SignatureInvalid => {
            error!("signature verification FAILED (Ed25519)");
            ValidationOutcome::Rejected("signature verification failed".to_string())
        }
        LicenseError::Rejected { reason } => {
            error!(reason = %reason, "license NOT valid");
            ValidationOutcome::Rejected(reason)
        }
        LicenseError::Transport(detail) => {
            warn!(detail = %detail, "validation transport failure");
            ValidationOutcome::TransportFailure
        }
        LicenseError::MalformedResponse(detail) => {
            warn!(detail = %detail, "validation response is not valid JSON");
            ValidationOutcome::MalformedResponse
        }
        // Startup-class errors never originate from a round trip.
        LicenseError::ConfigError(_)
        | LicenseError::IdentityIo(_)
        | LicenseError::SettingsError(_) => ValidationOutcome::TransportFailure,
    }
}

/// Whether a key matches the `XXXX-XXXX-XXXX-XXXX-XXXX` shape: five
/// hyphen-separated groups of four alphanumerics.
pub fn looks_like_key(key: &str) -> bool {
    let groups: Vec<&str> = key.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .all(|g| g.len() == 4 && g.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Collapse whitespace and cap length for error-body logging.
fn trim_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() > BODY_LOG_CAP {
        let cut = collapsed
            .char_indices()
            .take_while(|(i, _)| *i < BODY_LOG_CAP)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(BODY_LOG_CAP);
        format!("{}...", &collapsed[..cut])
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config(url: &str) -> LicenseConfig {
        LicenseConfig {
            plugin_id: "giftcode-plugin",
            validation_url: url.to_string(),
            public_key_b64: "MCowBQYDK2VwAyEAWWWZJVjAlGM1v3KV2VJb6lXEzsrHt9S2ZRTnNi7m+eA="
                .to_string(),
            user_agent: "giftcode-plugin/1.0.0",
            data_namespace: "gracelock-test",
            check_interval: Duration::from_secs(3600),
            grace_window: Duration::from_secs(86400),
        }
    }

    fn test_request(key: &str) -> ValidationRequest {
        ValidationRequest {
            license_key: key.to_string(),
            plugin_id: "giftcode-plugin".to_string(),
            server_id: "srv-1".to_string(),
            ip: None,
            mc_username: None,
        }
    }

    #[test]
    fn key_format_accepts_valid() {
        assert!(looks_like_key("AAAA-BBBB-CCCC-DDDD-EEEE"));
        assert!(looks_like_key("1234-abcd-EF56-gh78-9999"));
    }

    #[test]
    fn key_format_rejects_malformed() {
        assert!(!looks_like_key(""));
        assert!(!looks_like_key("xxxx-xxxx-xxxx-xxxx"));
        assert!(!looks_like_key("xxxxx-xxxx-xxxx-xxxx-xxxx"));
        assert!(!looks_like_key("xxxx-xxxx-xxxx-xxxx-xxxx-xxxx"));
        assert!(!looks_like_key("xx!x-xxxx-xxxx-xxxx-xxxx"));
        assert!(!looks_like_key("AAAA BBBB CCCC DDDD EEEE"));
    }

    #[test]
    fn error_taxonomy_folds_to_outcomes() {
        assert_eq!(
            fold_error(LicenseError::InvalidKeyFormat),
            ValidationOutcome::Rejected("missing/invalid key".to_string())
        );
        assert_eq!(
            fold_error(LicenseError::KeyUnavailable("bad der".to_string())),
            ValidationOutcome::Rejected("signature verification failed".to_string())
        );
        assert_eq!(
            fold_error(LicenseError::SignatureInvalid),
            ValidationOutcome::Rejected("signature verification failed".to_string())
        );
        assert_eq!(
            fold_error(LicenseError::Rejected {
                reason: "suspended".to_string()
            }),
            ValidationOutcome::Rejected("suspended".to_string())
        );
        assert_eq!(
            fold_error(LicenseError::Transport("timeout".to_string())),
            ValidationOutcome::TransportFailure
        );
        assert_eq!(
            fold_error(LicenseError::MalformedResponse("eof".to_string())),
            ValidationOutcome::MalformedResponse
        );
    }

    #[test]
    fn trim_body_collapses_and_caps() {
        assert_eq!(trim_body("a  b\n\tc"), "a b c");

        let long = "x".repeat(400);
        let trimmed = trim_body(&long);
        assert_eq!(trimmed.len(), BODY_LOG_CAP + 3);
        assert!(trimmed.ends_with("..."));
    }

    #[tokio::test]
    async fn malformed_key_skips_network() {
        // Points at a closed port; a network attempt would yield
        // TransportFailure, so Rejected proves the precheck short-circuits.
        let client = ValidationClient::new(&test_config("http://127.0.0.1:9/validate")).unwrap();
        let outcome = client.validate(&test_request("not-a-key")).await;
        assert_eq!(
            outcome,
            ValidationOutcome::Rejected("missing/invalid key".to_string())
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_failure() {
        let client = ValidationClient::new(&test_config("http://127.0.0.1:9/validate")).unwrap();
        let outcome = client
            .validate(&test_request("AAAA-BBBB-CCCC-DDDD-EEEE"))
            .await;
        assert_eq!(outcome, ValidationOutcome::TransportFailure);
    }

    mod wire {
        use super::*;
        use crate::protocol::models::LicenseSummary;
        use base64::{engine::general_purpose::STANDARD, Engine};
        use ed25519_dalek::pkcs8::EncodePublicKey;
        use ed25519_dalek::{Signer, SigningKey};
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        // Well-known Ed25519 test vector seed (DO NOT USE IN PRODUCTION).
        const TEST_SIGNING_SEED: [u8; 32] = [
            0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec,
            0x2c, 0xc4, 0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03,
            0x1c, 0xae, 0x7f, 0x60,
        ];

        fn signing_key() -> SigningKey {
            SigningKey::from_bytes(&TEST_SIGNING_SEED)
        }

        fn public_key_b64(key: &SigningKey) -> String {
            let der = key.verifying_key().to_public_key_der().unwrap();
            STANDARD.encode(der.as_bytes())
        }

        /// Append a signature member over `canonical` the way the server does:
        /// sign everything before the closing brace, then splice the
        /// signature in as the final field.
        fn signed_body(key: &SigningKey, canonical: &str) -> String {
            let sig = STANDARD.encode(key.sign(canonical.as_bytes()).to_bytes());
            format!(
                "{},\"signature\":\"{}\"}}",
                &canonical[..canonical.len() - 1],
                sig
            )
        }

        async fn client_against(server: &MockServer, key: &SigningKey) -> ValidationClient {
            let mut config = test_config(&format!("{}/license/validate", server.uri()));
            config.public_key_b64 = public_key_b64(key);
            ValidationClient::new(&config).unwrap()
        }

        #[tokio::test]
        async fn signed_success_roundtrip() {
            let server = MockServer::start().await;
            let key = signing_key();
            let body = signed_body(
                &key,
                r#"{"valid":true,"active":true,"expired":false,"plan":"premium","boundServers":2,"boundIps":1}"#,
            );

            Mock::given(method("POST"))
                .and(path("/license/validate"))
                .and(header("content-type", "application/json; charset=UTF-8"))
                .and(body_partial_json(serde_json::json!({
                    "licenseKey": "AAAA-BBBB-CCCC-DDDD-EEEE",
                    "pluginId": "giftcode-plugin",
                    "serverId": "srv-1",
                })))
                .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_against(&server, &key).await;
            let outcome = client
                .validate(&test_request("AAAA-BBBB-CCCC-DDDD-EEEE"))
                .await;

            assert_eq!(
                outcome,
                ValidationOutcome::Success(LicenseSummary {
                    plan: Some("premium".to_string()),
                    bound_servers: 2,
                    bound_ips: 1,
                })
            );
        }

        #[tokio::test]
        async fn tampered_body_is_hard_rejection() {
            let server = MockServer::start().await;
            let key = signing_key();
            let mut body = signed_body(
                &key,
                r#"{"valid":false,"active":false,"expired":true,"reason":"expired"}"#,
            );
            // An attacker flips the flags but cannot re-sign.
            body = body
                .replace(r#""valid":false"#, r#""valid":true"#)
                .replace(r#""active":false"#, r#""active":true"#)
                .replace(r#""expired":true,"#, r#""expired":false,"#);

            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
                .mount(&server)
                .await;

            let client = client_against(&server, &key).await;
            let outcome = client
                .validate(&test_request("AAAA-BBBB-CCCC-DDDD-EEEE"))
                .await;
            assert_eq!(
                outcome,
                ValidationOutcome::Rejected("signature verification failed".to_string())
            );
        }

        #[tokio::test]
        async fn missing_signature_is_hard_rejection() {
            let server = MockServer::start().await;
            let key = signing_key();

            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_raw(
                    r#"{"valid":true,"active":true,"expired":false}"#,
                    "application/json",
                ))
                .mount(&server)
                .await;

            let client = client_against(&server, &key).await;
            let outcome = client
                .validate(&test_request("AAAA-BBBB-CCCC-DDDD-EEEE"))
                .await;
            assert_eq!(
                outcome,
                ValidationOutcome::Rejected("signature verification failed".to_string())
            );
        }

        #[tokio::test]
        async fn broken_embedded_key_rejects_signed_body() {
            let server = MockServer::start().await;
            let key = signing_key();
            let body = signed_body(&key, r#"{"valid":true,"active":true,"expired":false}"#);

            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
                .mount(&server)
                .await;

            // The add-on shipped with a corrupt public key: even a correctly
            // signed, all-green body must be rejected.
            let mut config = test_config(&format!("{}/license/validate", server.uri()));
            config.public_key_b64 = "definitely-not-a-key".to_string();
            let client = ValidationClient::new(&config).unwrap();

            let outcome = client
                .validate(&test_request("AAAA-BBBB-CCCC-DDDD-EEEE"))
                .await;
            assert_eq!(
                outcome,
                ValidationOutcome::Rejected("signature verification failed".to_string())
            );
        }

        #[tokio::test]
        async fn signed_rejection_reports_reason() {
            let server = MockServer::start().await;
            let key = signing_key();
            let body = signed_body(
                &key,
                r#"{"valid":true,"active":false,"expired":false,"reason":"suspended"}"#,
            );

            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
                .mount(&server)
                .await;

            let client = client_against(&server, &key).await;
            let outcome = client
                .validate(&test_request("AAAA-BBBB-CCCC-DDDD-EEEE"))
                .await;
            assert_eq!(outcome, ValidationOutcome::Rejected("suspended".to_string()));
        }

        #[tokio::test]
        async fn http_error_is_transport_failure() {
            let server = MockServer::start().await;
            let key = signing_key();

            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(503).set_body_string("upstream database unavailable"),
                )
                .mount(&server)
                .await;

            let client = client_against(&server, &key).await;
            let outcome = client
                .validate(&test_request("AAAA-BBBB-CCCC-DDDD-EEEE"))
                .await;
            assert_eq!(outcome, ValidationOutcome::TransportFailure);
        }

        #[tokio::test]
        async fn unparseable_body_is_malformed() {
            let server = MockServer::start().await;
            let key = signing_key();

            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_string("<html>definitely not json</html>"),
                )
                .mount(&server)
                .await;

            let client = client_against(&server, &key).await;
            let outcome = client
                .validate(&test_request("AAAA-BBBB-CCCC-DDDD-EEEE"))
                .await;
            assert_eq!(outcome, ValidationOutcome::MalformedResponse);
        }
    }
}
