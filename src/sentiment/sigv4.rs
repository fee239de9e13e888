// AWS Signature Version 4 for JSON-protocol POST requests.
//
// Only what Comprehend needs: a single POST to "/" with no query string and
// a JSON body. The signature covers content-type, host, x-amz-date,
// x-amz-target and (when present) x-amz-security-token.
//
// Reference: https://docs.aws.amazon.com/IAM/latest/UserGuide/create-signed-request.html

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Where and what is being signed.
pub struct SigningParams<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
    pub host: &'a str,
    pub content_type: &'a str,
    pub target: &'a str,
    pub now: DateTime<Utc>,
}

/// Headers to attach to the outgoing request, lowercase names.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
    pub security_token: Option<String>,
}

/// Sign a POST to "/" carrying `payload`.
pub fn sign_post(params: &SigningParams<'_>, payload: &[u8]) -> Result<SignedHeaders> {
    let amz_date = params.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = params.now.format("%Y%m%d").to_string();

    let mut headers: Vec<(&str, &str)> = vec![
        ("content-type", params.content_type),
        ("host", params.host),
        ("x-amz-date", amz_date.as_str()),
        ("x-amz-target", params.target),
    ];
    if let Some(token) = params.credentials.session_token.as_deref() {
        headers.push(("x-amz-security-token", token));
    }
    headers.sort_by(|a, b| a.0.cmp(b.0));

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "POST\n/\n\n{canonical_headers}\n{signed_headers}\n{}",
        sha256_hex(payload)
    );

    let scope = format!(
        "{date_stamp}/{}/{}/aws4_request",
        params.region, params.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(
        &params.credentials.secret_access_key,
        &date_stamp,
        params.region,
        params.service,
    )?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        params.credentials.access_key_id
    );

    Ok(SignedHeaders {
        amz_date,
        authorization,
        security_token: params.credentials.session_token.clone(),
    })
}

/// Derive the per-day, per-region, per-service signing key.
pub fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).context("Invalid HMAC key")?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn creds(token: Option<&str>) -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: token.map(str::to_string),
        }
    }

    #[test]
    fn signing_key_matches_aws_documentation_vector() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn authorization_header_has_expected_shape() {
        let credentials = creds(None);
        let params = SigningParams {
            credentials: &credentials,
            region: "eu-west-1",
            service: "comprehend",
            host: "comprehend.eu-west-1.amazonaws.com",
            content_type: "application/x-amz-json-1.1",
            target: "Comprehend_20171127.DetectSentiment",
            now: Utc.with_ymd_and_hms(2024, 2, 17, 12, 30, 5).unwrap(),
        };
        let signed = sign_post(&params, b"{}").unwrap();

        assert_eq!(signed.amz_date, "20240217T123005Z");
        assert!(signed.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240217/eu-west-1/comprehend/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature="
        ));
        let signature = signed.authorization.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signed.security_token.is_none());
    }

    #[test]
    fn session_token_is_signed() {
        let credentials = creds(Some("session-token"));
        let params = SigningParams {
            credentials: &credentials,
            region: "us-east-1",
            service: "comprehend",
            host: "comprehend.us-east-1.amazonaws.com",
            content_type: "application/x-amz-json-1.1",
            target: "Comprehend_20171127.DetectSentiment",
            now: Utc.with_ymd_and_hms(2024, 2, 17, 0, 0, 0).unwrap(),
        };
        let signed = sign_post(&params, b"{}").unwrap();
        assert!(signed
            .authorization
            .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target"));
        assert_eq!(signed.security_token.as_deref(), Some("session-token"));
    }

    #[test]
    fn signature_depends_on_payload() {
        let credentials = creds(None);
        let params = SigningParams {
            credentials: &credentials,
            region: "us-east-1",
            service: "comprehend",
            host: "comprehend.us-east-1.amazonaws.com",
            content_type: "application/x-amz-json-1.1",
            target: "Comprehend_20171127.DetectSentiment",
            now: Utc.with_ymd_and_hms(2024, 2, 17, 0, 0, 0).unwrap(),
        };
        let a = sign_post(&params, br#"{"Text":"a"}"#).unwrap();
        let b = sign_post(&params, br#"{"Text":"b"}"#).unwrap();
        assert_ne!(a.authorization, b.authorization);
    }
}
