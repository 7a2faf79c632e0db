//! MinIO/S3-compatible storage client
//!
//! Product images live under a single public prefix and are served straight from
//! the bucket, so the client grants anonymous read on that prefix at startup.
//!
//! Uses rust-s3 crate for lightweight S3 operations.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::AssetStorage;
use crate::core::config::MinIOConfig;
use crate::core::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    public_endpoint: String,
    public_prefix: String,
    /// Access key for AWS Signature v4 signing
    access_key: String,
    /// Secret key for AWS Signature v4 signing
    secret_key: String,
    /// Region name for AWS Signature v4 signing
    region_name: String,
    /// HTTP client for bucket policy operations
    http_client: Client,
}

impl MinIOClient {
    /// Create a new MinIO client, creating the bucket and the public read
    /// policy when they are missing.
    pub async fn new(config: MinIOConfig) -> Result<Self, AppError> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| AppError::Internal(format!("Failed to create MinIO bucket: {}", e)))?;

        // Path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        let http_client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let client = Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            public_endpoint: config.public_endpoint.trim_end_matches('/').to_string(),
            public_prefix: config.public_prefix.trim_matches('/').to_string(),
            access_key: config.access_key,
            secret_key: config.secret_key,
            region_name: config.region,
            http_client,
        };

        client.ensure_bucket_exists().await?;
        client.set_public_read_policy().await?;

        info!(
            "MinIO client initialized for endpoint: {}, bucket: {}, public_prefix: {}",
            client.endpoint,
            client.bucket.name(),
            client.public_prefix
        );

        Ok(client)
    }

    pub fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    /// Ensure the bucket exists, create if not
    async fn ensure_bucket_exists(&self) -> Result<(), AppError> {
        let result = Bucket::create_with_path_style(
            &self.bucket.name(),
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await;

        match result {
            Ok(_) => {
                info!("Bucket '{}' created successfully", self.bucket.name());
                Ok(())
            }
            Err(e) => {
                let error_str = e.to_string();
                if error_str.contains("BucketAlreadyOwnedByYou")
                    || error_str.contains("BucketAlreadyExists")
                    || error_str.contains("already own it")
                {
                    debug!("Bucket '{}' already exists", self.bucket.name());
                } else {
                    warn!(
                        "Could not create bucket '{}': {}. Assuming it exists.",
                        self.bucket.name(),
                        e
                    );
                }
                Ok(())
            }
        }
    }

    /// Allow anonymous `s3:GetObject` on `{bucket}/{public_prefix}/*`
    async fn set_public_read_policy(&self) -> Result<(), AppError> {
        let bucket_name = self.bucket.name();
        let public_prefix = &self.public_prefix;

        let policy = json!({
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Principal": {"AWS": "*"},
                    "Action": ["s3:GetObject"],
                    "Resource": [format!("arn:aws:s3:::{bucket_name}/{public_prefix}/*")]
                }
            ]
        });

        match self
            .put_bucket_policy_with_sigv4(&bucket_name, &policy.to_string())
            .await
        {
            Ok(_) => info!(
                "Set public read policy for {}/{}/*",
                bucket_name, public_prefix
            ),
            // Startup continues; the policy can be applied by hand with `mc anonymous set download`
            Err(e) => warn!(
                "Failed to set bucket policy for '{}': {}. Product images will not be publicly readable until it is set.",
                bucket_name, e
            ),
        }
        Ok(())
    }

    /// Put bucket policy using AWS Signature v4
    async fn put_bucket_policy_with_sigv4(
        &self,
        bucket_name: &str,
        policy: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let endpoint_url = Url::parse(&self.endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid endpoint URL: {}", e)))?;
        let host = endpoint_url
            .host_str()
            .ok_or_else(|| AppError::Internal("Endpoint URL has no host".to_string()))?;
        let host_header = match endpoint_url.port() {
            Some(p) => format!("{}:{}", host, p),
            None => host.to_string(),
        };

        let url = format!("{}/{}?policy", self.endpoint, bucket_name);
        let payload_hash = hex::encode(Sha256::digest(policy.as_bytes()));

        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host_header, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_request = format!(
            "PUT\n/{}\npolicy=\n{}\n{}\n{}",
            bucket_name, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region_name);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = sign_v4(&self.secret_key, &date_stamp, &self.region_name, &string_to_sign)?;
        let authorization_header = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key, credential_scope, signed_headers, signature
        );

        let response = self
            .http_client
            .put(&url)
            .header("Host", &host_header)
            .header("x-amz-date", &amz_date)
            .header("x-amz-content-sha256", &payload_hash)
            .header("Authorization", &authorization_header)
            .header("Content-Type", "application/json")
            .body(policy.to_string())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send policy request: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(AppError::Internal(format!(
            "Failed to set bucket policy: {} - {}",
            status, body
        )))
    }
}

impl MinIOClient {
    /// Object key for a catalog path, under the public prefix
    fn object_key(&self, path: &str) -> String {
        format!("{}/{}", self.public_prefix, path)
    }
}

#[async_trait]
impl AssetStorage for MinIOClient {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let object_key = self.object_key(path);

        let response = self
            .bucket
            .put_object_with_content_type(&object_key, &data, content_type)
            .await
            .map_err(|e| {
                AppError::Internal(format!("Failed to upload file '{}': {}", object_key, e))
            })?;
        ensure_success(response.status_code(), "upload", &object_key, &[])?;

        debug!(
            "Uploaded '{}' ({} bytes) to bucket '{}'",
            object_key,
            data.len(),
            self.bucket.name()
        );
        Ok(path.to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let object_key = self.object_key(key);

        let response = self.bucket.delete_object(&object_key).await.map_err(|e| {
            AppError::Internal(format!("Failed to delete file '{}': {}", object_key, e))
        })?;
        // A missing object is already deleted
        ensure_success(response.status_code(), "delete", &object_key, &[404])?;

        debug!("Deleted '{}' from bucket '{}'", object_key, self.bucket.name());
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        public_url(&self.public_endpoint, &self.bucket.name(), &self.object_key(key))
    }
}

/// Map a non-2xx S3 status to an error; `tolerated` statuses count as success
fn ensure_success(
    status: u16,
    action: &str,
    object_key: &str,
    tolerated: &[u16],
) -> Result<(), AppError> {
    if (200..300).contains(&status) || tolerated.contains(&status) {
        return Ok(());
    }
    Err(AppError::Internal(format!(
        "Failed to {} file '{}': storage responded with status {}",
        action, object_key, status
    )))
}

/// Direct URL of an object, percent-encoding each key segment
fn public_url(endpoint: &str, bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}/{}", endpoint, bucket, encoded.join("/"))
}

/// AWS Signature v4 signature for an S3 request
fn sign_v4(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    string_to_sign: &str,
) -> Result<String, AppError> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    )?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, b"s3")?;
    let k_signing = hmac_sha256(&k_service, b"aws4_request")?;

    Ok(hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(format!("HMAC key error: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_encodes_segments() {
        assert_eq!(
            public_url(
                "http://localhost:9000",
                "catalog-media",
                "public/blue-shirt/product/front view.JPG"
            ),
            "http://localhost:9000/catalog-media/public/blue-shirt/product/front%20view.JPG"
        );
    }

    #[test]
    fn test_ensure_success() {
        assert!(ensure_success(200, "upload", "public/a.png", &[]).is_ok());
        assert!(ensure_success(204, "delete", "public/a.png", &[]).is_ok());
        assert!(ensure_success(404, "delete", "public/a.png", &[404]).is_ok());

        for status in [301, 403, 404, 500, 503] {
            let err = ensure_success(status, "upload", "public/a.png", &[]).unwrap_err();
            assert!(
                matches!(err, AppError::Internal(ref msg) if msg.contains(&status.to_string())),
                "status {} should fail",
                status
            );
        }
    }

    #[test]
    fn test_sign_v4_is_deterministic_hex() {
        let first = sign_v4("secret", "20250101", "us-east-1", "payload").unwrap();
        let second = sign_v4("secret", "20250101", "us-east-1", "payload").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(
            first,
            sign_v4("other", "20250101", "us-east-1", "payload").unwrap()
        );
    }
}
