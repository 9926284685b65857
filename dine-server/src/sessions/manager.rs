//! Table Session Manager
//!
//! # 流程
//!
//! ```text
//! scan QR ──▶ verify token ──▶ active session? ──yes──▶ return it
//!                                   │
//!                                   no ──▶ open (OPEN, fresh key) ──▶ table occupied
//! ```
//!
//! The table's occupancy flag only changes through a guarded write, so the
//! `table.status_changed` event fires once per real transition.

use crate::auth::QrTokenService;
use crate::db::Guarded;
use crate::db::repository::{DiningTableRepository, TableSessionRepository};
use crate::message::Notifier;
use crate::utils::error::status_conflict;
use crate::utils::{AppError, AppResult, ErrorCode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use shared::message::{RealtimeEvent, SessionClosedPayload, TableStatusPayload};
use shared::models::{DiningTable, SessionStatus, TableSession, TableStatus};
use shared::util::now_millis;
use shared::TenantContext;

/// Result of `close_session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseSessionResult {
    pub ok: bool,
    pub session_id: i64,
    pub status: SessionStatus,
}

/// 生成会话密钥 (16 字节随机数, 小写 hex)
pub fn generate_session_key() -> AppResult<String> {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::internal("Failed to generate session key"))?;
    Ok(hex::encode(bytes))
}

#[derive(Debug, Clone)]
pub struct TableSessionManager {
    tables: DiningTableRepository,
    sessions: TableSessionRepository,
    qr: QrTokenService,
    notifier: Notifier,
}

impl TableSessionManager {
    pub fn new(
        tables: DiningTableRepository,
        sessions: TableSessionRepository,
        qr: QrTokenService,
        notifier: Notifier,
    ) -> Self {
        Self {
            tables,
            sessions,
            qr,
            notifier,
        }
    }

    /// Open the table's session, or return the one already active
    pub fn open_or_get_active(
        &self,
        ctx: &TenantContext,
        table_id: i64,
        token: &str,
    ) -> AppResult<TableSession> {
        let table = self.qr.verify(ctx, table_id, token)?;

        if let Some(active) = self.sessions.find_active_for_table(ctx, table_id)? {
            self.mark_occupied(ctx, &table, active.id)?;
            return Ok(active);
        }

        let session = TableSession {
            id: 0,
            restaurant_id: ctx.restaurant_id.clone(),
            table_id,
            table_number_snapshot: table.table_number.clone(),
            session_key: generate_session_key()?,
            status: SessionStatus::Open,
            opened_at: now_millis(),
            bill_requested_at: None,
            paid_at: None,
            closed_at: None,
            active_bill_id: None,
        };

        let session = match self.sessions.open(session.clone())? {
            Some(created) => created,
            None => match self.sessions.find_active_for_table(ctx, table_id)? {
                // 并发扫码: 另一个请求已经抢先创建
                Some(existing) => {
                    self.mark_occupied(ctx, &table, existing.id)?;
                    return Ok(existing);
                }
                // 槽位的会话已不再活跃 (关台时未释放)
                None => {
                    tracing::warn!(table_id, "stale active-session slot, reclaiming");
                    self.sessions.release(ctx, table_id)?;
                    self.sessions.open(session)?.ok_or_else(|| {
                        AppError::conflict(ErrorCode::SessionStatusConflict, "Session open in progress")
                    })?
                }
            },
        };
        tracing::info!(table_id, session_id = session.id, "table session opened");

        self.mark_occupied(ctx, &table, session.id)?;
        Ok(session)
    }

    /// Staff read of a table's current session
    pub fn get_active_for_table(
        &self,
        ctx: &TenantContext,
        table_id: i64,
    ) -> AppResult<Option<TableSession>> {
        if self.tables.find_by_id(ctx, table_id)?.is_none() {
            return Err(AppError::new(ErrorCode::TableNotFound));
        }
        Ok(self.sessions.find_active_for_table(ctx, table_id)?)
    }

    /// Close a session and free its table
    ///
    /// Idempotent: closing a CLOSED session succeeds without side effects.
    pub fn close_session(&self, ctx: &TenantContext, session_id: i64) -> AppResult<CloseSessionResult> {
        let closed_at = now_millis();
        let session = match self.sessions.update_if(
            ctx,
            session_id,
            |s| s.status.is_active(),
            |s| {
                s.status = SessionStatus::Closed;
                s.closed_at = Some(closed_at);
            },
        )? {
            Guarded::Applied(s) => s,
            Guarded::Rejected(s) if s.status == SessionStatus::Closed => {
                tracing::debug!(session_id, "session already closed");
                return Ok(CloseSessionResult {
                    ok: true,
                    session_id,
                    status: s.status,
                });
            }
            Guarded::Rejected(s) => {
                return Err(status_conflict(
                    ErrorCode::SessionStatusConflict,
                    "Cannot close session",
                    s.status,
                ));
            }
            Guarded::Missing => return Err(AppError::new(ErrorCode::SessionNotFound)),
        };

        self.sessions.release(ctx, session.table_id)?;

        // 关台后桌台一律恢复为 active
        if let Guarded::Applied(table) =
            self.tables
                .transition(ctx, session.table_id, TableStatus::Active, &[])?
        {
            self.notifier
                .broadcast(RealtimeEvent::TableStatusChanged(TableStatusPayload {
                    table_id: table.id,
                    table_number: table.table_number,
                    status: TableStatus::Active,
                    session_id: None,
                }));
        }

        tracing::info!(session_id, table_id = session.table_id, "table session closed");

        let payload = SessionClosedPayload {
            session_id: session.id,
            table_number: session.table_number_snapshot.clone(),
            status: SessionStatus::Closed,
            closed_at,
        };
        self.notifier
            .session(&session.session_key, RealtimeEvent::SessionClosed(payload.clone()));
        self.notifier.waiter(RealtimeEvent::SessionClosed(payload));

        Ok(CloseSessionResult {
            ok: true,
            session_id: session.id,
            status: session.status,
        })
    }

    /// Flip the table to occupied; emits only when the flag actually changed
    fn mark_occupied(&self, ctx: &TenantContext, table: &DiningTable, session_id: i64) -> AppResult<()> {
        if let Guarded::Applied(updated) =
            self.tables
                .transition(ctx, table.id, TableStatus::Occupied, &[TableStatus::Inactive])?
        {
            self.notifier
                .broadcast(RealtimeEvent::TableStatusChanged(TableStatusPayload {
                    table_id: updated.id,
                    table_number: updated.table_number,
                    status: TableStatus::Occupied,
                    session_id: Some(session_id),
                }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_is_32_hex_chars() {
        let a = generate_session_key().unwrap();
        let b = generate_session_key().unwrap();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }
}
