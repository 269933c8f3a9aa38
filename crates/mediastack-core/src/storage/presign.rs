//! AWS Signature Version 4 query-string presigning.
//!
//! Produces path-style presigned URLs of the form
//! `{endpoint}/{bucket}/{key}?X-Amz-...&X-Amz-Signature=...`. Only the `host`
//! header is signed and the payload is always `UNSIGNED-PAYLOAD`, so any
//! S3-compatible verifier accepts the URL for its lifetime.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::{Digest, Sha256};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";
const SERVICE: &str = "s3";

/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) stay as-is, everything else
/// is percent-encoded.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha256 = Hmac<Sha256>;

/// Signs URLs with a fixed credential, region and lifetime.
#[derive(Clone)]
pub struct Presigner {
    endpoint: String,
    region: String,
    access_key: String,
    secret_key: String,
    expires: Duration,
}

impl std::fmt::Debug for Presigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presigner")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("expires", &self.expires)
            .finish_non_exhaustive()
    }
}

impl Presigner {
    /// Create a presigner. `endpoint` is a base URL such as
    /// `http://localhost:9000`; a trailing slash is ignored.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        expires: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_owned(),
            region: region.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            expires,
        }
    }

    /// The base URL objects are addressed under.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Public, unsigned URL of an object.
    #[must_use]
    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}{}", self.endpoint, object_path(bucket, key))
    }

    /// Presign `method` on `bucket/key` as of now.
    #[must_use]
    pub fn presign(&self, method: &str, bucket: &str, key: &str, query: &[(&str, String)]) -> String {
        self.presign_at(method, bucket, key, query, Utc::now())
    }

    /// Presign `method` on `bucket/key` as of `now`.
    #[must_use]
    pub fn presign_at(
        &self,
        method: &str,
        bucket: &str,
        key: &str,
        query: &[(&str, String)],
        now: DateTime<Utc>,
    ) -> String {
        let (scheme, host) = split_endpoint(&self.endpoint);
        let path = object_path(bucket, key);
        let signed_query = self.signed_query(method, host, &path, query, now);
        format!("{scheme}://{host}{path}?{signed_query}")
    }

    /// Build the full signed query string, signature last.
    fn signed_query(
        &self,
        method: &str,
        host: &str,
        canonical_path: &str,
        query: &[(&str, String)],
        now: DateTime<Utc>,
    ) -> String {
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/{SERVICE}/aws4_request", self.region);

        let mut params: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".to_owned(), ALGORITHM.to_owned()),
            (
                "X-Amz-Credential".to_owned(),
                format!("{}/{scope}", self.access_key),
            ),
            ("X-Amz-Date".to_owned(), timestamp.clone()),
            ("X-Amz-Expires".to_owned(), self.expires.as_secs().to_string()),
            ("X-Amz-SignedHeaders".to_owned(), "host".to_owned()),
        ];
        params.extend(query.iter().map(|(k, v)| ((*k).to_owned(), v.clone())));

        let mut encoded: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| (uri_encode(k), uri_encode(v)))
            .collect();
        encoded.sort_unstable();
        let canonical_query = encoded
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{method}\n{canonical_path}\n{canonical_query}\nhost:{host}\n\nhost\n{UNSIGNED_PAYLOAD}"
        );
        let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
        let string_to_sign = format!("{ALGORITHM}\n{timestamp}\n{scope}\n{canonical_hash}");

        let signing_key = derive_signing_key(&self.secret_key, &date, &self.region, SERVICE);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        format!("{canonical_query}&X-Amz-Signature={signature}")
    }
}

/// `/{bucket}/{key}`, each key segment encoded, slashes kept.
fn object_path(bucket: &str, key: &str) -> String {
    let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
    format!("/{}/{encoded_key}", uri_encode(bucket))
}

/// Split `scheme://host[:port][/...]` into scheme and authority.
fn split_endpoint(endpoint: &str) -> (&str, &str) {
    let (scheme, rest) = endpoint.split_once("://").unwrap_or(("http", endpoint));
    let host = rest.split('/').next().unwrap_or(rest);
    (scheme, host)
}

fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
