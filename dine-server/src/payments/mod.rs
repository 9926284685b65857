//! 在线支付模块
//!
//! - **vnpay**: gateway configuration, query encoding and HMAC signing
//! - **service**: payment creation, browser return, IPN reconciliation

pub mod service;
pub mod vnpay;

pub use service::{IpnAck, PaymentBillView, PaymentService, VnpayCheckout, VnpayReturnResult, VnpayStatusView};
pub use vnpay::VnpayConfig;
