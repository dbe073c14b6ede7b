//! Copying single objects from a donor into the target.

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use thiserror::Error;

use crate::backend::{BackendClient, BackendError, BackendResponse};
use crate::observability::metrics;

/// Why a single-key migration did not complete.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("target read failed: {0}")]
    TargetRead(#[source] BackendError),

    #[error("donor read failed: {0}")]
    DonorRead(#[source] BackendError),

    #[error("donor answered {0}")]
    DonorStatus(StatusCode),

    #[error("target write failed: {0}")]
    TargetWrite(#[source] BackendError),
}

/// What [`retrieve_key`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMigration {
    /// The object was written into the target.
    Stored,
    /// The target reported the key as missing; nothing was copied.
    Missing,
}

/// Make sure the object at `key_path` lives in the target.
///
/// The target is read first. Only when it answers something other than
/// 200 or 404 is the donor consulted, and then it must answer 200. Any
/// 200 answer is written back to the target under the same path.
pub async fn retrieve_key(
    donor: &BackendClient,
    target: &BackendClient,
    key_path: &str,
) -> Result<KeyMigration, MigrationError> {
    let mut source = target.get(key_path).await.map_err(MigrationError::TargetRead)?;

    if source.status != StatusCode::OK && source.status != StatusCode::NOT_FOUND {
        tracing::debug!(path = %key_path, status = %source.status, donor = %donor.name(), "Target unsure, asking donor");
        source = donor.get(key_path).await.map_err(MigrationError::DonorRead)?;
        if source.status != StatusCode::OK {
            metrics::record_migration("donor_miss");
            return Err(MigrationError::DonorStatus(source.status));
        }
    }

    if source.status != StatusCode::OK {
        tracing::debug!(path = %key_path, "Key missing on target, nothing to migrate");
        metrics::record_migration("missing");
        return Ok(KeyMigration::Missing);
    }

    let BackendResponse { headers, body, .. } = source;
    store_response(target, key_path, &headers, body)
        .await
        .map_err(MigrationError::TargetWrite)?;
    Ok(KeyMigration::Stored)
}

/// POST `body` into the target under `path`, reusing the donor's headers.
///
/// Any HTTP answer counts as stored; only transport failures are errors.
pub async fn store_response(
    target: &BackendClient,
    path: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<StatusCode, BackendError> {
    let bytes = body.len();
    match target.post(path, headers, body).await {
        Ok(response) => {
            if response.status.is_success() {
                tracing::info!(path = %path, bytes, status = %response.status, "Stored object in target");
                metrics::record_migration("stored");
            } else {
                tracing::warn!(path = %path, bytes, status = %response.status, "Target rejected stored object");
                metrics::record_migration("rejected");
            }
            Ok(response.status)
        }
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to store object in target");
            metrics::record_migration("failed");
            Err(e)
        }
    }
}
