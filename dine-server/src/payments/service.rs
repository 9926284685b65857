//! VNPay 支付对账
//!
//! The browser return only records what it saw. The IPN webhook is the
//! trusted channel and the only one that settles a bill. Every payment
//! transition is guarded on `PENDING`, so duplicate or concurrent deliveries
//! apply their effects at most once.

use super::vnpay::{self, VnpayConfig};
use crate::bills::BillService;
use crate::db::Guarded;
use crate::db::repository::{BillRepository, PaymentRepository, TableSessionRepository};
use crate::message::Notifier;
use crate::utils::error::status_conflict;
use crate::utils::time::gateway_timestamp;
use crate::utils::{AppError, AppResult, ErrorCode};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::TenantContext;
use shared::message::{BillPaymentPendingPayload, RealtimeEvent};
use shared::models::{
    BillStatus, Payment, PaymentMethod, PaymentProvider, PaymentStatus, RawParams, SessionStatus,
};
use shared::util::now_millis;
use tracing::{debug, info, warn};

/// Same-millisecond collisions bump the suffix this many times at most
const MAX_TXN_REF_ATTEMPTS: i64 = 16;

/// Redirect data for a new online payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VnpayCheckout {
    pub bill_id: i64,
    pub session_id: i64,
    pub table_id: i64,
    pub txn_ref: String,
    pub amount_vnd: i64,
    pub payment_url: String,
}

/// Browser return outcome; the client polls for the real result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VnpayReturnResult {
    pub ok: bool,
    pub verified: bool,
    pub txn_ref: String,
    pub response_code: String,
    pub transaction_no: String,
    pub should_poll: bool,
}

/// Acknowledgement body expected by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpnAck {
    #[serde(rename = "RspCode")]
    pub rsp_code: String,
    #[serde(rename = "Message")]
    pub message: String,
}

impl IpnAck {
    fn new(code: &str, message: &str) -> Self {
        Self {
            rsp_code: code.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.rsp_code == "00"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentBillView {
    pub bill_id: i64,
    pub status: BillStatus,
    pub method: Option<PaymentMethod>,
    pub paid_at: Option<i64>,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VnpayStatusView {
    pub txn_ref: String,
    pub payment_status: PaymentStatus,
    pub response_code: Option<String>,
    pub transaction_no: Option<String>,
    pub bill: Option<PaymentBillView>,
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[derive(Debug, Clone)]
pub struct PaymentService {
    config: VnpayConfig,
    timezone: Tz,
    bills: BillRepository,
    sessions: TableSessionRepository,
    payments: PaymentRepository,
    billing: BillService,
    notifier: Notifier,
}

impl PaymentService {
    pub fn new(
        config: VnpayConfig,
        timezone: Tz,
        bills: BillRepository,
        sessions: TableSessionRepository,
        payments: PaymentRepository,
        billing: BillService,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            timezone,
            bills,
            sessions,
            payments,
            billing,
            notifier,
        }
    }

    /// Start an online payment for an open bill
    pub fn create_vnpay_payment(
        &self,
        ctx: &TenantContext,
        bill_id: i64,
        ip_addr: &str,
    ) -> AppResult<VnpayCheckout> {
        if !self.config.is_configured() {
            return Err(AppError::with_message(
                ErrorCode::ConfigError,
                "VNPay terminal code or hash secret is not configured",
            ));
        }

        let bill = self
            .bills
            .find_by_id(ctx, bill_id)?
            .ok_or_else(|| AppError::new(ErrorCode::BillNotFound))?;
        check_payable(bill.status)?;
        if bill.total_cents <= 0 {
            return Err(AppError::with_message(ErrorCode::PaymentAmountInvalid, "Bill total is invalid"));
        }

        let now = now_millis();
        let bill = match self.bills.update_if(
            ctx,
            bill_id,
            |b| b.status.is_open(),
            |b| {
                if b.status != BillStatus::PaymentPending || b.method != Some(PaymentMethod::Online) {
                    b.status = BillStatus::PaymentPending;
                    b.method = Some(PaymentMethod::Online);
                    b.updated_at = now;
                }
            },
        )? {
            Guarded::Applied(b) => b,
            Guarded::Rejected(b) => return Err(check_payable(b.status).err().unwrap_or_else(|| {
                status_conflict(ErrorCode::BillStatusConflict, "Bill cannot be paid", b.status)
            })),
            Guarded::Missing => return Err(AppError::new(ErrorCode::BillNotFound)),
        };

        self.sessions.update_if(
            ctx,
            bill.session_id,
            |s| s.status != SessionStatus::Closed,
            |s| {
                s.status = SessionStatus::PaymentPending;
                s.active_bill_id = Some(bill.id);
                s.bill_requested_at.get_or_insert(now);
            },
        )?;

        self.notifier
            .waiter(RealtimeEvent::BillPaymentPending(BillPaymentPendingPayload {
                bill_id: bill.id,
                session_id: bill.session_id,
                table_id: bill.table_id,
                table_number: bill.table_number_snapshot.clone(),
                total_cents: bill.total_cents,
                method: PaymentMethod::Online,
            }));

        let amount_vnd = bill.total_cents;
        let order_info = format!("Thanh toan bill {} - Ban {}", bill.id, bill.table_number_snapshot);
        let create_date = gateway_timestamp(now, self.timezone);

        let mut created = None;
        for bump in 0..MAX_TXN_REF_ATTEMPTS {
            let txn_ref = format!("{}_{}", bill.id, now + bump);
            let params = self.request_params(&txn_ref, amount_vnd, &order_info, ip_addr, &create_date);
            let (url, secure_hash) = vnpay::payment_url(&self.config, &params)?;

            let mut raw_create_params = params;
            raw_create_params.insert("vnp_SecureHash".into(), secure_hash);
            let payment = Payment {
                id: 0,
                restaurant_id: ctx.restaurant_id.clone(),
                bill_id: bill.id,
                session_id: bill.session_id,
                table_id: bill.table_id,
                provider: PaymentProvider::Vnpay,
                txn_ref,
                amount_vnd,
                status: PaymentStatus::Pending,
                provider_transaction_id: None,
                response_code: None,
                raw_create_params,
                raw_return_params: None,
                raw_ipn_params: None,
                created_at: now,
                updated_at: now,
            };
            if let Some(p) = self.payments.create(payment)? {
                created = Some((p, url));
                break;
            }
            debug!(bill_id = bill.id, bump, "txn_ref taken, bumping");
        }
        let (payment, payment_url) = created
            .ok_or_else(|| AppError::internal("Could not allocate a unique transaction reference"))?;

        info!(bill_id = bill.id, txn_ref = %payment.txn_ref, amount_vnd, "vnpay payment created");

        Ok(VnpayCheckout {
            bill_id: bill.id,
            session_id: bill.session_id,
            table_id: bill.table_id,
            txn_ref: payment.txn_ref,
            amount_vnd,
            payment_url,
        })
    }

    fn request_params(
        &self,
        txn_ref: &str,
        amount_vnd: i64,
        order_info: &str,
        ip_addr: &str,
        create_date: &str,
    ) -> RawParams {
        [
            ("vnp_Version", "2.1.0".to_string()),
            ("vnp_Command", "pay".to_string()),
            ("vnp_TmnCode", self.config.tmn_code.clone()),
            ("vnp_Locale", "vn".to_string()),
            ("vnp_CurrCode", "VND".to_string()),
            ("vnp_TxnRef", txn_ref.to_string()),
            ("vnp_OrderInfo", order_info.to_string()),
            ("vnp_OrderType", "other".to_string()),
            ("vnp_Amount", (amount_vnd * 100).to_string()),
            ("vnp_ReturnUrl", self.config.return_url.clone()),
            ("vnp_IpAddr", ip_addr.to_string()),
            ("vnp_CreateDate", create_date.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    /// Browser return: verify and record, never settle
    pub fn handle_vnpay_return(
        &self,
        ctx: &TenantContext,
        query: &RawParams,
    ) -> AppResult<VnpayReturnResult> {
        let vnp = vnpay::pick_vnp_params(query);
        let verified = vnpay::verify(&vnp, &self.config.hash_secret);

        let txn_ref = vnp.get("vnp_TxnRef").cloned().unwrap_or_default();
        let response_code = vnp.get("vnp_ResponseCode").cloned().unwrap_or_default();
        let transaction_no = vnp.get("vnp_TransactionNo").cloned().unwrap_or_default();

        let payment = if txn_ref.is_empty() {
            None
        } else {
            self.payments.find_by_txn_ref(ctx, &txn_ref)?
        };
        if let Some(payment) = payment {
            let now = now_millis();
            self.payments.update_if(
                ctx,
                payment.id,
                |_| true,
                |p| {
                    p.raw_return_params = Some(vnp.clone());
                    if let Some(code) = non_empty(&response_code) {
                        p.response_code = Some(code);
                    }
                    if let Some(no) = non_empty(&transaction_no) {
                        p.provider_transaction_id = Some(no);
                    }
                    p.updated_at = now;
                },
            )?;
        }

        debug!(txn_ref = %txn_ref, verified, response_code = %response_code, "vnpay return recorded");

        Ok(VnpayReturnResult {
            ok: true,
            verified,
            txn_ref,
            response_code,
            transaction_no,
            should_poll: true,
        })
    }

    /// Trusted webhook; failures are answered with gateway codes, not errors
    pub fn handle_vnpay_ipn(&self, ctx: &TenantContext, query: &RawParams) -> AppResult<IpnAck> {
        let vnp = vnpay::pick_vnp_params(query);
        if !vnpay::verify(&vnp, &self.config.hash_secret) {
            warn!("vnpay ipn rejected: invalid signature");
            return Ok(IpnAck::new("97", "Invalid signature"));
        }

        let field = |k: &str| vnp.get(k).map(String::as_str).unwrap_or_default();
        let txn_ref = field("vnp_TxnRef");
        let response_code = field("vnp_ResponseCode");
        let transaction_status = field("vnp_TransactionStatus");
        let transaction_no = field("vnp_TransactionNo");

        if txn_ref.is_empty() {
            return Ok(IpnAck::new("01", "Missing TxnRef"));
        }
        let Some(payment) = self.payments.find_by_txn_ref(ctx, txn_ref)? else {
            warn!(txn_ref, "vnpay ipn for unknown payment");
            return Ok(IpnAck::new("01", "Payment not found"));
        };
        if let Some(ack) = already_final(payment.status) {
            debug!(txn_ref, status = %payment.status, "vnpay ipn repeated");
            return Ok(ack);
        }

        let succeeded =
            response_code == "00" && (transaction_status.is_empty() || transaction_status == "00");

        let now = now_millis();
        let record = self.payments.update_if(
            ctx,
            payment.id,
            |p| p.status == PaymentStatus::Pending,
            |p| {
                p.raw_ipn_params = Some(vnp.clone());
                p.response_code = non_empty(response_code).or(p.response_code.take());
                p.provider_transaction_id =
                    non_empty(transaction_no).or(p.provider_transaction_id.take());
                p.updated_at = now;
            },
        )?;
        if let Guarded::Rejected(p) = &record {
            if let Some(ack) = already_final(p.status) {
                return Ok(ack);
            }
        }

        let Some(bill) = self.bills.find_by_id(ctx, payment.bill_id)? else {
            return Ok(IpnAck::new("01", "Bill not found"));
        };
        if self.sessions.find_by_id(ctx, payment.session_id)?.is_none() {
            return Ok(IpnAck::new("01", "Session not found"));
        }

        let outcome = if succeeded {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        };
        match self.payments.update_if(
            ctx,
            payment.id,
            |p| p.status == PaymentStatus::Pending,
            |p| {
                p.status = outcome;
                p.updated_at = now;
            },
        )? {
            Guarded::Applied(_) => {}
            // a concurrent delivery finished first and owns the effects
            Guarded::Rejected(p) => {
                return Ok(already_final(p.status).unwrap_or_else(|| IpnAck::new("00", "Already confirmed")));
            }
            Guarded::Missing => return Ok(IpnAck::new("01", "Payment not found")),
        }

        if !succeeded {
            info!(txn_ref, response_code, "vnpay payment failed");
            return Ok(IpnAck::new("00", "Confirm Failed"));
        }

        if bill.status == BillStatus::Paid {
            debug!(bill_id = bill.id, "bill already paid, skipping settlement");
        } else {
            match self.bills.update_if(
                ctx,
                bill.id,
                |b| b.status.is_open(),
                |b| {
                    b.status = BillStatus::Paid;
                    b.method = Some(PaymentMethod::Online);
                    b.paid_at = Some(now);
                    b.updated_at = now;
                },
            )? {
                Guarded::Applied(paid) => {
                    self.billing.apply_paid(ctx, &paid, PaymentMethod::Online, now)?;
                }
                Guarded::Rejected(b) => {
                    warn!(bill_id = b.id, status = %b.status, txn_ref, "online payment succeeded for a bill that is no longer open");
                }
                Guarded::Missing => return Ok(IpnAck::new("01", "Bill not found")),
            }
        }

        info!(txn_ref, bill_id = bill.id, "vnpay payment confirmed");
        Ok(IpnAck::new("00", "Confirm Success"))
    }

    /// Status poll for the payment result page
    pub fn get_vnpay_status(&self, ctx: &TenantContext, txn_ref: &str) -> AppResult<VnpayStatusView> {
        if txn_ref.is_empty() {
            return Err(AppError::invalid_request("Missing txnRef"));
        }
        let payment = self
            .payments
            .find_by_txn_ref(ctx, txn_ref)?
            .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;
        let bill = self.bills.find_by_id(ctx, payment.bill_id)?.map(|b| PaymentBillView {
            bill_id: b.id,
            status: b.status,
            method: b.method,
            paid_at: b.paid_at,
            total_cents: b.total_cents,
        });

        Ok(VnpayStatusView {
            txn_ref: payment.txn_ref,
            payment_status: payment.status,
            response_code: payment.response_code,
            transaction_no: payment.provider_transaction_id,
            bill,
        })
    }
}

fn check_payable(status: BillStatus) -> AppResult<()> {
    match status {
        BillStatus::Paid => Err(AppError::conflict(ErrorCode::BillAlreadyPaid, "Bill already paid")),
        s if s.is_terminal() => Err(status_conflict(
            ErrorCode::BillStatusConflict,
            "Bill cannot be paid",
            s,
        )),
        _ => Ok(()),
    }
}

fn already_final(status: PaymentStatus) -> Option<IpnAck> {
    match status {
        PaymentStatus::Success => Some(IpnAck::new("00", "Already confirmed")),
        PaymentStatus::Failed => Some(IpnAck::new("00", "Already failed")),
        PaymentStatus::Pending => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorKind;

    #[test]
    fn test_check_payable() {
        assert!(check_payable(BillStatus::Requested).is_ok());
        assert!(check_payable(BillStatus::PaymentPending).is_ok());

        let paid = check_payable(BillStatus::Paid).unwrap_err();
        assert_eq!(paid.message, "Bill already paid");
        assert_eq!(paid.kind(), ErrorKind::Conflict);

        let settled = check_payable(BillStatus::Settled).unwrap_err();
        assert_eq!(settled.code, ErrorCode::BillStatusConflict);
    }

    #[test]
    fn test_already_final_acks() {
        assert_eq!(already_final(PaymentStatus::Success).unwrap().message, "Already confirmed");
        assert_eq!(already_final(PaymentStatus::Failed).unwrap().message, "Already failed");
        assert!(already_final(PaymentStatus::Pending).is_none());
    }

    #[test]
    fn test_ipn_ack_wire_names() {
        let json = serde_json::to_value(IpnAck::new("00", "Confirm Success")).unwrap();
        assert_eq!(json["RspCode"], "00");
        assert_eq!(json["Message"], "Confirm Success");
    }
}
