//! 账单结算
//!
//! # 状态流转
//!
//! ```text
//! REQUESTED ──▶ PAYMENT_PENDING ──▶ PAID ──accept──▶ SETTLED
//!     │               │
//!     └──── reject ───┴──▶ REJECTED
//! ```
//!
//! The bill document is always written first with a guarded update. Orders
//! and the session follow as separate single-document updates, and events go
//! out last.

use crate::db::Guarded;
use crate::db::repository::{BillRepository, OrderRepository, TableSessionRepository};
use crate::message::Notifier;
use crate::sessions::{CloseSessionResult, TableSessionManager};
use crate::utils::error::status_conflict;
use crate::utils::{AppError, AppResult, ErrorCode};
use serde::{Deserialize, Serialize};
use shared::message::{
    BillAcceptedPayload, BillPaidPayload, BillRejectedPayload, BillRequestedPayload, RealtimeEvent,
};
use shared::models::{
    Bill, BillStatus, LineStatus, OrderStatus, PaymentMethod, SessionStatus, TableSession,
};
use shared::util::now_millis;
use shared::{Actor, TenantContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBillResult {
    pub ok: bool,
    pub bill_id: i64,
    pub status: BillStatus,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidBillResult {
    pub ok: bool,
    pub bill_id: i64,
    pub session_id: i64,
    pub status: BillStatus,
    pub method: PaymentMethod,
    pub total_cents: i64,
    pub paid_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptBillResult {
    pub ok: bool,
    pub bill_id: i64,
    pub status: BillStatus,
    pub total_cents: i64,
    pub method: Option<PaymentMethod>,
    pub paid_at: Option<i64>,
    pub settled_at: i64,
    pub session: CloseSessionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectBillResult {
    pub ok: bool,
    pub bill_id: i64,
    pub status: BillStatus,
    pub rejected_at: i64,
}

/// Bill part of the customer receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptBill {
    pub bill_id: i64,
    pub status: BillStatus,
    pub total_cents: i64,
    pub note: String,
    pub method: Option<PaymentMethod>,
    pub requested_at: i64,
    pub paid_at: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServedLine {
    pub order_id: i64,
    pub line_id: u32,
    pub name_snapshot: String,
    pub qty: u32,
    pub line_total_cents: i64,
}

/// Customer receipt: the session's current bill and what was served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveBillView {
    pub ok: bool,
    pub session_id: i64,
    pub session_key: String,
    pub table_number: String,
    pub bill: ReceiptBill,
    pub served_lines: Vec<ServedLine>,
}

#[derive(Debug, Clone)]
pub struct BillService {
    session_manager: TableSessionManager,
    sessions: TableSessionRepository,
    orders: OrderRepository,
    bills: BillRepository,
    notifier: Notifier,
}

impl BillService {
    pub fn new(
        session_manager: TableSessionManager,
        sessions: TableSessionRepository,
        orders: OrderRepository,
        bills: BillRepository,
        notifier: Notifier,
    ) -> Self {
        Self {
            session_manager,
            sessions,
            orders,
            bills,
            notifier,
        }
    }

    /// Request the bill for a session
    ///
    /// Re-requesting while a REQUESTED/PAYMENT_PENDING bill exists returns
    /// that bill unchanged.
    pub fn request_bill(
        &self,
        ctx: &TenantContext,
        session_id: i64,
        note: Option<String>,
        actor: Option<&Actor>,
    ) -> AppResult<RequestBillResult> {
        let session = self.load_session(ctx, session_id)?;
        if !session.status.accepts_bill_request() {
            return Err(status_conflict(
                ErrorCode::SessionStatusConflict,
                "Cannot request bill",
                session.status,
            ));
        }

        // 厨房队列未清空时不允许结账
        let orders = self.orders.list_by_session(ctx, session_id)?;
        if let Some(busy) = orders.iter().find(|o| o.status.is_kitchen_active()) {
            return Err(AppError::with_message(
                ErrorCode::KitchenQueueBusy,
                "Cannot request bill: there are unfinished orders. Please wait until all orders are served.",
            )
            .with_detail("order_id", busy.id));
        }

        if let Some(existing) = self.bills.find_open_for_session(ctx, session_id)? {
            return self.re_request(ctx, &session, existing, actor);
        }

        let billable: Vec<_> = orders.iter().filter(|o| o.is_billable()).collect();
        let total_cents: i64 = billable.iter().map(|o| o.total_cents).sum();
        if total_cents <= 0 {
            return Err(AppError::new(ErrorCode::NothingToBill));
        }

        let now = now_millis();
        let bill = Bill {
            id: 0,
            restaurant_id: ctx.restaurant_id.clone(),
            session_id,
            session_key: session.session_key.clone(),
            table_id: session.table_id,
            table_number_snapshot: session.table_number_snapshot.clone(),
            order_ids: billable.iter().map(|o| o.id).collect(),
            status: BillStatus::Requested,
            total_cents,
            method: None,
            note: note.map(|n| n.trim().to_string()).unwrap_or_default(),
            customer_subject_type: actor.map(|a| a.subject_type),
            customer_subject_id: actor.map(|a| a.subject_id.clone()),
            requested_at: now,
            paid_at: None,
            settled_at: None,
            rejected_at: None,
            reject_reason: None,
            created_at: now,
            updated_at: now,
        };

        let bill = match self.bills.create_open(bill.clone())? {
            Some(created) => created,
            None => match self.bills.find_open_for_session(ctx, session_id)? {
                // 并发请求: 另一个请求已创建账单
                Some(existing) => return self.re_request(ctx, &session, existing, actor),
                None => {
                    tracing::warn!(session_id, "stale open-bill slot, reclaiming");
                    self.bills.release_open(ctx, session_id)?;
                    self.bills.create_open(bill)?.ok_or_else(|| {
                        AppError::conflict(ErrorCode::BillStatusConflict, "Bill request in progress")
                    })?
                }
            },
        };

        self.sessions.update_if(
            ctx,
            session_id,
            |s| s.status.accepts_bill_request(),
            |s| {
                s.status = SessionStatus::BillRequested;
                s.bill_requested_at = Some(now);
                s.active_bill_id = Some(bill.id);
            },
        )?;

        tracing::info!(bill_id = bill.id, session_id, total_cents, "bill requested");

        let payload = BillRequestedPayload {
            bill_id: bill.id,
            session_id,
            table_id: bill.table_id,
            table_number: bill.table_number_snapshot.clone(),
            status: bill.status,
            total_cents,
            note: bill.note.clone(),
        };
        self.notifier.waiter(RealtimeEvent::BillRequested(payload.clone()));
        self.notifier
            .session(&bill.session_key, RealtimeEvent::BillRequested(payload));

        Ok(RequestBillResult {
            ok: true,
            bill_id: bill.id,
            status: bill.status,
            total_cents,
        })
    }

    fn re_request(
        &self,
        ctx: &TenantContext,
        session: &TableSession,
        existing: Bill,
        actor: Option<&Actor>,
    ) -> AppResult<RequestBillResult> {
        let now = now_millis();
        let bill_id = existing.id;
        self.sessions.update_if(
            ctx,
            session.id,
            |s| {
                s.status == SessionStatus::Open
                    || s.bill_requested_at.is_none()
                    || s.active_bill_id.is_none()
            },
            |s| {
                if s.status == SessionStatus::Open {
                    s.status = SessionStatus::BillRequested;
                }
                s.bill_requested_at.get_or_insert(now);
                s.active_bill_id.get_or_insert(bill_id);
            },
        )?;

        if let Some(actor) = actor {
            self.bills.update_if(
                ctx,
                bill_id,
                |b| b.customer_subject_id.is_none() || b.customer_subject_type.is_none(),
                |b| {
                    b.customer_subject_type = Some(actor.subject_type);
                    b.customer_subject_id = Some(actor.subject_id.clone());
                },
            )?;
        }

        tracing::debug!(bill_id, session_id = session.id, "bill re-requested");
        Ok(RequestBillResult {
            ok: true,
            bill_id,
            status: existing.status,
            total_cents: existing.total_cents,
        })
    }

    /// Staff records a cash payment
    pub fn mark_cash_paid(&self, ctx: &TenantContext, bill_id: i64) -> AppResult<PaidBillResult> {
        self.settle(ctx, bill_id, PaymentMethod::Cash, None)
    }

    /// Customer declares a cash payment from the table
    pub fn pay_cash(
        &self,
        ctx: &TenantContext,
        bill_id: i64,
        table_id: i64,
        token: &str,
    ) -> AppResult<PaidBillResult> {
        let session = self.session_manager.open_or_get_active(ctx, table_id, token)?;
        self.settle(ctx, bill_id, PaymentMethod::Cash, Some(session.id))
    }

    /// Customer-confirmed online payment
    pub fn pay_online(
        &self,
        ctx: &TenantContext,
        bill_id: i64,
        table_id: i64,
        token: &str,
    ) -> AppResult<PaidBillResult> {
        let session = self.session_manager.open_or_get_active(ctx, table_id, token)?;
        self.settle(ctx, bill_id, PaymentMethod::Online, Some(session.id))
    }

    /// Online payment confirmed out of band
    pub fn pay_online_by_bill_id(&self, ctx: &TenantContext, bill_id: i64) -> AppResult<PaidBillResult> {
        self.settle(ctx, bill_id, PaymentMethod::Online, None)
    }

    /// Mark a bill PAID and apply the downstream effects
    ///
    /// The bill update is guarded on REQUESTED/PAYMENT_PENDING, so exactly
    /// one caller wins; every other caller gets a conflict naming the
    /// current status. `scope` restricts the bill to one session.
    pub(crate) fn settle(
        &self,
        ctx: &TenantContext,
        bill_id: i64,
        method: PaymentMethod,
        scope: Option<i64>,
    ) -> AppResult<PaidBillResult> {
        let current = self
            .bills
            .find_by_id(ctx, bill_id)?
            .filter(|b| scope.is_none_or(|sid| b.session_id == sid))
            .ok_or_else(|| AppError::new(ErrorCode::BillNotFound))?;
        let session = self.load_session(ctx, current.session_id)?;
        if session.status == SessionStatus::Closed {
            return Err(AppError::conflict(ErrorCode::SessionClosed, "Session already closed"));
        }

        let now = now_millis();
        let bill = match self.bills.update_if(
            ctx,
            bill_id,
            |b| b.status.is_open(),
            |b| {
                b.status = BillStatus::Paid;
                b.method = Some(method);
                b.paid_at = Some(now);
                b.updated_at = now;
            },
        )? {
            Guarded::Applied(bill) => bill,
            Guarded::Rejected(b) if b.status == BillStatus::Paid => {
                return Err(status_conflict(ErrorCode::BillAlreadyPaid, "Bill cannot be paid", b.status));
            }
            Guarded::Rejected(b) => {
                return Err(status_conflict(ErrorCode::BillStatusConflict, "Bill cannot be paid", b.status));
            }
            Guarded::Missing => return Err(AppError::new(ErrorCode::BillNotFound)),
        };

        self.apply_paid(ctx, &bill, method, now)?;

        Ok(PaidBillResult {
            ok: true,
            bill_id: bill.id,
            session_id: bill.session_id,
            status: bill.status,
            method,
            total_cents: bill.total_cents,
            paid_at: now,
        })
    }

    /// Effects that follow a bill becoming PAID: orders billed, session
    /// PAID, `bill.paid` to staff and customer
    pub(crate) fn apply_paid(
        &self,
        ctx: &TenantContext,
        bill: &Bill,
        method: PaymentMethod,
        paid_at: i64,
    ) -> AppResult<()> {
        self.bills.release_open(ctx, bill.session_id)?;

        let stamped = self
            .orders
            .mark_billed(ctx, bill.session_id, &bill.order_ids, bill.id, paid_at)?;
        if stamped.len() != bill.order_ids.len() {
            tracing::warn!(
                bill_id = bill.id,
                expected = bill.order_ids.len(),
                stamped = stamped.len(),
                "some orders were already billed"
            );
        }

        self.sessions.update_if(
            ctx,
            bill.session_id,
            |s| s.status != SessionStatus::Closed,
            |s| {
                s.status = SessionStatus::Paid;
                s.paid_at = Some(paid_at);
                s.active_bill_id = Some(bill.id);
            },
        )?;

        tracing::info!(bill_id = bill.id, method = %method, total_cents = bill.total_cents, "bill paid");

        let payload = BillPaidPayload {
            bill_id: bill.id,
            session_id: bill.session_id,
            table_number: bill.table_number_snapshot.clone(),
            status: BillStatus::Paid,
            method,
            total_cents: bill.total_cents,
            paid_at,
        };
        self.notifier
            .session(&bill.session_key, RealtimeEvent::BillPaid(payload.clone()));
        self.notifier.waiter(RealtimeEvent::BillPaid(payload));
        Ok(())
    }

    /// Customer receipt for the table's current bill
    pub fn get_active_bill_for_table(
        &self,
        ctx: &TenantContext,
        table_id: i64,
        token: &str,
    ) -> AppResult<ActiveBillView> {
        let session = self.session_manager.open_or_get_active(ctx, table_id, token)?;
        let bill = self
            .bills
            .find_latest_for_session(
                ctx,
                session.id,
                &[BillStatus::Requested, BillStatus::PaymentPending, BillStatus::Paid],
            )?
            .ok_or_else(|| AppError::new(ErrorCode::BillNotFound))?;

        let mut orders: Vec<_> = self
            .orders
            .find_many(ctx, &bill.order_ids)?
            .into_iter()
            .filter(|o| {
                o.session_id == session.id
                    && !matches!(o.status, OrderStatus::Draft | OrderStatus::Cancelled)
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let served_lines = orders
            .iter()
            .flat_map(|o| {
                o.items
                    .iter()
                    .filter(|l| l.status == LineStatus::Served)
                    .map(move |l| ServedLine {
                        order_id: o.id,
                        line_id: l.id,
                        name_snapshot: l.name_snapshot.clone(),
                        qty: l.qty,
                        line_total_cents: l.line_total_cents,
                    })
            })
            .collect();

        Ok(ActiveBillView {
            ok: true,
            session_id: session.id,
            session_key: session.session_key,
            table_number: session.table_number_snapshot,
            bill: ReceiptBill {
                bill_id: bill.id,
                status: bill.status,
                total_cents: bill.total_cents,
                note: bill.note,
                method: bill.method,
                requested_at: bill.requested_at,
                paid_at: bill.paid_at,
                created_at: bill.created_at,
            },
            served_lines,
        })
    }

    /// Staff accepts a PAID bill: closes the session and archives the bill
    pub fn accept_paid_bill(&self, ctx: &TenantContext, bill_id: i64) -> AppResult<AcceptBillResult> {
        let bill = self
            .bills
            .find_by_id(ctx, bill_id)?
            .ok_or_else(|| AppError::new(ErrorCode::BillNotFound))?;
        if bill.status != BillStatus::Paid {
            return Err(status_conflict(
                ErrorCode::BillStatusConflict,
                "Bill must be PAID to accept",
                bill.status,
            ));
        }

        let session = self.load_session(ctx, bill.session_id)?;
        if !session.status.is_active() {
            return Err(status_conflict(
                ErrorCode::SessionStatusConflict,
                "Session cannot be closed",
                session.status,
            ));
        }

        // 关台 (同时把桌台恢复为 active)
        let closed = self.session_manager.close_session(ctx, session.id)?;

        let settled_at = now_millis();
        let bill = match self.bills.update_if(
            ctx,
            bill_id,
            |b| b.status == BillStatus::Paid,
            |b| {
                b.status = BillStatus::Settled;
                b.settled_at = Some(settled_at);
                b.updated_at = settled_at;
            },
        )? {
            Guarded::Applied(bill) => bill,
            Guarded::Rejected(b) => {
                return Err(status_conflict(
                    ErrorCode::BillStatusConflict,
                    "Bill must be PAID to accept",
                    b.status,
                ));
            }
            Guarded::Missing => return Err(AppError::new(ErrorCode::BillNotFound)),
        };

        tracing::info!(bill_id, session_id = bill.session_id, "bill accepted and settled");

        self.notifier
            .waiter(RealtimeEvent::BillAccepted(BillAcceptedPayload {
                bill_id: bill.id,
                session_id: bill.session_id,
                table_id: bill.table_id,
                table_number: bill.table_number_snapshot.clone(),
                total_cents: bill.total_cents,
                method: bill.method,
                settled_at,
            }));

        Ok(AcceptBillResult {
            ok: true,
            bill_id: bill.id,
            status: bill.status,
            total_cents: bill.total_cents,
            method: bill.method,
            paid_at: bill.paid_at,
            settled_at,
            session: closed,
        })
    }

    /// Staff refuses an open bill; its orders stay unbilled
    pub fn reject_bill(
        &self,
        ctx: &TenantContext,
        bill_id: i64,
        reason: Option<String>,
    ) -> AppResult<RejectBillResult> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let now = now_millis();

        let bill = match self.bills.update_if(
            ctx,
            bill_id,
            |b| b.status.is_open(),
            |b| {
                b.status = BillStatus::Rejected;
                b.rejected_at = Some(now);
                b.reject_reason = reason.clone();
                b.updated_at = now;
            },
        )? {
            Guarded::Applied(bill) => bill,
            Guarded::Rejected(b) => {
                return Err(status_conflict(
                    ErrorCode::BillStatusConflict,
                    "Only an open bill can be rejected",
                    b.status,
                ));
            }
            Guarded::Missing => return Err(AppError::new(ErrorCode::BillNotFound)),
        };

        self.bills.release_open(ctx, bill.session_id)?;
        self.sessions.update_if(
            ctx,
            bill.session_id,
            |s| {
                s.active_bill_id == Some(bill_id)
                    && matches!(s.status, SessionStatus::BillRequested | SessionStatus::PaymentPending)
            },
            |s| {
                s.status = SessionStatus::Open;
                s.active_bill_id = None;
            },
        )?;

        tracing::info!(bill_id, session_id = bill.session_id, "bill rejected");

        let payload = BillRejectedPayload {
            bill_id,
            session_id: bill.session_id,
            table_number: bill.table_number_snapshot.clone(),
            reason,
            rejected_at: now,
        };
        self.notifier.waiter(RealtimeEvent::BillRejected(payload.clone()));
        self.notifier
            .session(&bill.session_key, RealtimeEvent::BillRejected(payload));

        Ok(RejectBillResult {
            ok: true,
            bill_id,
            status: bill.status,
            rejected_at: now,
        })
    }

    fn load_session(&self, ctx: &TenantContext, session_id: i64) -> AppResult<TableSession> {
        self.sessions
            .find_by_id(ctx, session_id)?
            .ok_or_else(|| AppError::new(ErrorCode::SessionNotFound))
    }
}
