//! AWS Signature Version 4 request signing for Bedrock runtime calls.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::{Result, SvarError};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Some(Self {
            access_key_id: non_empty("AWS_ACCESS_KEY_ID")?,
            secret_access_key: non_empty("AWS_SECRET_ACCESS_KEY")?,
            session_token: non_empty("AWS_SESSION_TOKEN"),
        })
    }
}

/// How requests to Bedrock are authenticated.
#[derive(Debug, Clone)]
pub enum BedrockAuth {
    /// Signed with AWS SigV4.
    SigV4(AwsCredentials),
    /// Bedrock API key sent as a bearer token.
    ApiKey(String),
}

impl BedrockAuth {
    /// Prefer a Bedrock API key (`AWS_BEARER_TOKEN_BEDROCK`), then static
    /// AWS credentials.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(token) = lookup("AWS_BEARER_TOKEN_BEDROCK").filter(|t| !t.trim().is_empty()) {
            return Ok(BedrockAuth::ApiKey(token));
        }
        AwsCredentials::from_lookup(lookup).map(BedrockAuth::SigV4).ok_or_else(|| {
            SvarError::Config(
                "No AWS credentials found. Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, \
                 or AWS_BEARER_TOKEN_BEDROCK."
                    .to_string(),
            )
        })
    }

    pub fn describe(&self) -> &'static str {
        match self {
            BedrockAuth::SigV4(_) => "AWS SigV4",
            BedrockAuth::ApiKey(_) => "Bedrock API key",
        }
    }
}

/// Headers to attach to a signed request.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub security_token: Option<String>,
}

/// The parts of an HTTP request that go into the signature.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub method: &'a str,
    /// Host header value, including a non-default port.
    pub host: &'a str,
    /// Request path as sent on the wire (already percent-encoded once).
    pub path: &'a str,
    pub payload: &'a [u8],
}

/// Sign a request without a query string.
pub fn sign(
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    request: RequestParts<'_>,
    timestamp: DateTime<Utc>,
) -> Result<SignedHeaders> {
    let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    let date = timestamp.format("%Y%m%d").to_string();
    let scope = format!("{}/{}/{}/aws4_request", date, region, service);

    let mut canonical_headers = format!("host:{}\nx-amz-date:{}\n", request.host.trim(), amz_date);
    let mut signed_headers = "host;x-amz-date".to_string();
    if let Some(token) = &credentials.session_token {
        canonical_headers.push_str(&format!("x-amz-security-token:{}\n", token.trim()));
        signed_headers.push_str(";x-amz-security-token");
    }

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        request.method,
        canonical_uri(request.path),
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(request.payload))
    );

    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let key = signing_key(&credentials.secret_access_key, &date, region, service)?;
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

    Ok(SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.access_key_id, scope, signed_headers, signature
        ),
        amz_date,
        security_token: credentials.session_token.clone(),
    })
}

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| SvarError::Config(format!("HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Each path segment is encoded again, so an on-the-wire `%3A` becomes `%253A`.
fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// RFC 3986 encoding: everything but unreserved characters, uppercase hex.
pub fn uri_encode(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    #[test]
    fn test_signing_key_vector() {
        let key = signing_key(SECRET, "20120215", "us-east-1", "iam").unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_get_vanilla_vector() {
        let credentials = AwsCredentials::new("AKIDEXAMPLE", SECRET);
        let timestamp = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let request = RequestParts {
            method: "GET",
            host: "example.amazonaws.com",
            path: "/",
            payload: b"",
        };

        let signed = sign(&credentials, "us-east-1", "service", request, timestamp).unwrap();
        assert_eq!(signed.amz_date, "20150830T123600Z");
        assert_eq!(
            signed.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn test_session_token_is_signed() {
        let mut credentials = AwsCredentials::new("AKID", SECRET);
        credentials.session_token = Some("token".to_string());
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let request = RequestParts {
            method: "POST",
            host: "bedrock-runtime.us-east-2.amazonaws.com",
            path: "/model/m/invoke",
            payload: b"{}",
        };

        let signed = sign(&credentials, "us-east-2", "bedrock", request, timestamp).unwrap();
        assert!(signed
            .authorization
            .contains("SignedHeaders=host;x-amz-date;x-amz-security-token"));
        assert_eq!(signed.security_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_canonical_uri_double_encodes() {
        assert_eq!(canonical_uri("/"), "/");
        assert_eq!(
            canonical_uri("/model/us.meta.llama3-1-405b-instruct-v1%3A0/invoke"),
            "/model/us.meta.llama3-1-405b-instruct-v1%253A0/invoke"
        );
        assert_eq!(uri_encode("a:b c"), "a%3Ab%20c");
    }

    #[test]
    fn test_auth_from_lookup() {
        let env = |pairs: &'static [(&'static str, &'static str)]| {
            move |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
        };

        let auth = BedrockAuth::from_lookup(env(&[("AWS_BEARER_TOKEN_BEDROCK", "abc")])).unwrap();
        assert!(matches!(auth, BedrockAuth::ApiKey(ref t) if t == "abc"));

        let auth = BedrockAuth::from_lookup(env(&[
            ("AWS_ACCESS_KEY_ID", "AKID"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]))
        .unwrap();
        match auth {
            BedrockAuth::SigV4(creds) => {
                assert_eq!(creds.access_key_id, "AKID");
                assert!(creds.session_token.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = BedrockAuth::from_lookup(env(&[("AWS_ACCESS_KEY_ID", "AKID")])).unwrap_err();
        assert!(matches!(err, SvarError::Config(_)));
    }
}
