//! 账单模块
//!
//! - **service**: bill request, payment application, acceptance, rejection
//! - **listing**: staff/customer listings with receipt breakdowns

pub mod listing;
pub mod service;

pub use listing::{BillListQuery, BillPage, BillQueryService, BillTab, Paging, split_adjustment};
pub use service::{
    AcceptBillResult, ActiveBillView, BillService, PaidBillResult, RejectBillResult,
    RequestBillResult,
};
