//! 桌台二维码令牌服务
//!
//! A printed QR code carries an HS256 token `{table_id, v, restaurant_id}`.
//! It stays valid until staff rotate the table's `qr_token_version`.

use crate::db::repository::DiningTableRepository;
use crate::utils::{AppError, AppResult, ErrorCode};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shared::TenantContext;
use shared::models::{DiningTable, TableStatus};
use thiserror::Error;

/// 二维码配置
#[derive(Debug, Clone)]
pub struct QrTokenConfig {
    /// HMAC 密钥
    pub secret: String,
}

impl QrTokenConfig {
    pub fn from_env() -> Self {
        let secret = std::env::var("QR_TOKEN_SECRET").unwrap_or_else(|_| {
            tracing::warn!("QR_TOKEN_SECRET not set, using development secret");
            "dev_qr_secret".to_string()
        });
        Self { secret }
    }
}

/// Claims printed into a table QR code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrClaims {
    pub table_id: i64,
    /// Table's `qr_token_version` at issue time
    pub v: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_id: Option<String>,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// 二维码令牌错误
#[derive(Error, Debug)]
pub enum QrError {
    #[error("Invalid QR token")]
    Invalid,

    #[error("QR token does not match table")]
    TableMismatch,

    #[error("QR is expired")]
    Rotated,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

impl From<QrError> for AppError {
    fn from(err: QrError) -> Self {
        let code = match err {
            QrError::Invalid => ErrorCode::TokenInvalid,
            QrError::TableMismatch => ErrorCode::QrTableMismatch,
            QrError::Rotated => ErrorCode::QrTokenExpired,
            QrError::GenerationFailed(_) => ErrorCode::InternalError,
        };
        AppError::with_message(code, err.to_string())
    }
}

/// 二维码令牌服务
#[derive(Clone)]
pub struct QrTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    tables: DiningTableRepository,
}

impl std::fmt::Debug for QrTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrTokenService").finish_non_exhaustive()
    }
}

impl QrTokenService {
    pub fn new(config: &QrTokenConfig, tables: DiningTableRepository) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            tables,
        }
    }

    /// Sign a token for the table's current version
    pub fn issue(&self, table: &DiningTable) -> Result<String, QrError> {
        let claims = QrClaims {
            table_id: table.id,
            v: table.qr_token_version,
            restaurant_id: Some(table.restaurant_id.clone()),
            iat: Utc::now().timestamp(),
            exp: None,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| QrError::GenerationFailed(e.to_string()))
    }

    /// Decode and check signature and tenant; no table lookup
    pub fn decode(&self, ctx: &TenantContext, token: &str) -> Result<QrClaims, QrError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims::<&str>(&[]);

        let claims = decode::<QrClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                if matches!(e.kind(), ErrorKind::InvalidSignature) {
                    tracing::warn!("QR token signature mismatch");
                }
                QrError::Invalid
            })?
            .claims;

        match &claims.restaurant_id {
            Some(rid) if !ctx.owns(rid) => Err(QrError::Invalid),
            _ => Ok(claims),
        }
    }

    /// Verify a scanned token against a table
    ///
    /// Order of checks: signature, claimed table, table exists, table
    /// enabled, version current.
    pub fn verify(&self, ctx: &TenantContext, table_id: i64, token: &str) -> AppResult<DiningTable> {
        let claims = self.decode(ctx, token)?;
        if claims.table_id != table_id {
            return Err(QrError::TableMismatch.into());
        }

        let table = self
            .tables
            .find_by_id(ctx, table_id)?
            .ok_or_else(|| AppError::with_message(ErrorCode::TableNotFound, "Cannot find table"))?;

        if table.status == TableStatus::Inactive {
            return Err(AppError::new(ErrorCode::TableInactive));
        }
        if table.qr_token_version != claims.v {
            return Err(QrError::Rotated.into());
        }
        Ok(table)
    }

    /// Rotate a table's QR code and return a fresh token
    pub fn rotate(&self, ctx: &TenantContext, table_id: i64) -> AppResult<String> {
        let table = self
            .tables
            .rotate_qr(ctx, table_id)?
            .ok_or_else(|| AppError::new(ErrorCode::TableNotFound))?;
        tracing::info!(table_id, version = table.qr_token_version, "QR token rotated");
        Ok(self.issue(&table)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Storage;
    use shared::models::DiningTableCreate;
    use shared::ErrorKind as Kind;

    fn setup() -> (QrTokenService, DiningTableRepository, TenantContext) {
        let storage = Storage::open_in_memory().unwrap();
        let tables = DiningTableRepository::new(storage);
        let service = QrTokenService::new(
            &QrTokenConfig {
                secret: "test-secret".into(),
            },
            tables.clone(),
        );
        (service, tables, TenantContext::new("r1"))
    }

    fn table(tables: &DiningTableRepository, ctx: &TenantContext) -> DiningTable {
        tables
            .create(
                ctx,
                DiningTableCreate {
                    table_number: "A1".into(),
                    capacity: 4,
                    location: None,
                },
            )
            .unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let (service, tables, ctx) = setup();
        let t = table(&tables, &ctx);
        let token = service.issue(&t).unwrap();
        let verified = service.verify(&ctx, t.id, &token).unwrap();
        assert_eq!(verified.id, t.id);
    }

    #[test]
    fn test_garbage_and_foreign_tokens_are_unauthorized() {
        let (service, tables, ctx) = setup();
        let t = table(&tables, &ctx);

        let err = service.verify(&ctx, t.id, "not-a-token").unwrap_err();
        assert_eq!(err.kind(), Kind::Unauthorized);

        let other = QrTokenService::new(
            &QrTokenConfig {
                secret: "another-secret".into(),
            },
            tables.clone(),
        );
        let forged = other.issue(&t).unwrap();
        assert_eq!(service.verify(&ctx, t.id, &forged).unwrap_err().kind(), Kind::Unauthorized);

        let token = service.issue(&t).unwrap();
        let foreign = TenantContext::new("r2");
        assert_eq!(service.verify(&foreign, t.id, &token).unwrap_err().code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_table_mismatch_missing_and_inactive() {
        let (service, tables, ctx) = setup();
        let t = table(&tables, &ctx);
        let token = service.issue(&t).unwrap();

        let err = service.verify(&ctx, t.id + 1, &token).unwrap_err();
        assert_eq!(err.code, ErrorCode::QrTableMismatch);

        let mut ghost = t.clone();
        ghost.id = 77;
        let ghost_token = service.issue(&ghost).unwrap();
        assert_eq!(service.verify(&ctx, 77, &ghost_token).unwrap_err().kind(), Kind::NotFound);

        tables.set_status(&ctx, t.id, TableStatus::Inactive).unwrap();
        assert_eq!(service.verify(&ctx, t.id, &token).unwrap_err().kind(), Kind::Forbidden);
    }

    #[test]
    fn test_rotation_expires_old_codes() {
        let (service, tables, ctx) = setup();
        let t = table(&tables, &ctx);
        let old = service.issue(&t).unwrap();

        let fresh = service.rotate(&ctx, t.id).unwrap();
        let err = service.verify(&ctx, t.id, &old).unwrap_err();
        assert_eq!(err.code, ErrorCode::QrTokenExpired);
        assert_eq!(err.message, "QR is expired");
        assert!(service.verify(&ctx, t.id, &fresh).is_ok());
    }
}
