//! 账单列表
//!
//! Staff and customer bill listings: paging, status tabs, date filters and
//! per-option breakdown of modifier adjustments for receipts.

use crate::db::repository::{BillRepository, CatalogRepository, OrderRepository, TableSessionRepository};
use crate::orders::CatalogLookup;
use crate::utils::time::{DateRange, resolve_date_range};
use crate::utils::{AppError, AppResult};
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::models::{
    Bill, BillStatus, LineStatus, Order, OrderLine, OrderStatus, PaymentMethod, SessionStatus,
};
use shared::{Actor, TenantContext};
use std::collections::HashMap;
use std::str::FromStr;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Staff bill tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillTab {
    /// REQUESTED + PAYMENT_PENDING
    #[default]
    Requested,
    Paid,
    /// SETTLED + REJECTED
    Done,
}

impl BillTab {
    pub fn includes(&self, status: BillStatus) -> bool {
        match self {
            BillTab::Requested => status.is_open(),
            BillTab::Paid => status == BillStatus::Paid,
            BillTab::Done => status.is_terminal(),
        }
    }
}

impl FromStr for BillTab {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "REQUESTED" => Ok(BillTab::Requested),
            "PAID" => Ok(BillTab::Paid),
            "DONE" => Ok(BillTab::Done),
            _ => Err(AppError::invalid_request("Invalid tab")),
        }
    }
}

/// Listing query as received from the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillListQuery {
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub date_preset: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// Validated paging window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page: i64,
    pub limit: i64,
}

impl Paging {
    /// page and limit are floored at 1; limit defaults to 20 and may not exceed 100
    pub fn parse(page: Option<i64>, limit: Option<i64>) -> AppResult<Self> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT).max(1);
        if limit > MAX_LIMIT {
            return Err(AppError::invalid_request("Invalid limit (1..100)"));
        }
        Ok(Self { page, limit })
    }

    pub fn skip(&self) -> usize {
        ((self.page - 1) * self.limit) as usize
    }

    fn window<T>(&self, xs: Vec<T>) -> Vec<T> {
        xs.into_iter().skip(self.skip()).take(self.limit as usize).collect()
    }
}

/// Split a modifier's adjustment evenly across its options
///
/// `base = trunc(total / n)`; the remainder is handed out one unit at a
/// time starting from index 0.
pub fn split_adjustment(total: i64, n: usize) -> Vec<i64> {
    if n == 0 {
        return Vec::new();
    }
    let count = n as i64;
    let base = total / count;
    let rem = total - base * count;
    let mut xs = vec![base; n];
    for x in xs.iter_mut().take(rem.unsigned_abs() as usize) {
        *x += rem.signum();
    }
    xs
}

// ==================== Views ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillModifierView {
    pub group_name_snapshot: Option<String>,
    pub option_name_snapshot: Option<String>,
    pub price_adjustment_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillLineView {
    pub line_id: u32,
    pub name_snapshot: String,
    pub qty: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub status: LineStatus,
    pub note: String,
    pub modifiers: Vec<BillModifierView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillOrderView {
    pub order_id: i64,
    pub created_at: i64,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub note: String,
    pub lines: Vec<BillLineView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillListItem {
    pub bill_id: i64,
    pub status: BillStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<BillTab>,
    pub method: Option<PaymentMethod>,
    pub total_cents: i64,
    pub note: String,
    pub table_id: i64,
    pub table_number: String,
    pub session_id: i64,
    pub session_status: Option<SessionStatus>,
    pub requested_at: i64,
    pub paid_at: Option<i64>,
    pub settled_at: Option<i64>,
    pub rejected_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub order_ids: Vec<i64>,
    pub orders: Vec<BillOrderView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillPage {
    pub ok: bool,
    pub total: usize,
    pub page: i64,
    pub limit: i64,
    pub bills: Vec<BillListItem>,
}

fn line_view(line: &OrderLine, lookup: &CatalogLookup) -> BillLineView {
    let mut modifiers = Vec::new();
    for m in &line.modifiers {
        let group_name = lookup
            .group_name(m.group_id)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let shares = split_adjustment(m.price_adjustment_cents, m.option_ids.len());
        for (option_id, share) in m.option_ids.iter().zip(shares) {
            modifiers.push(BillModifierView {
                group_name_snapshot: group_name.clone(),
                option_name_snapshot: lookup
                    .option_name(*option_id)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
                price_adjustment_cents: share,
            });
        }
        if m.option_ids.is_empty() && m.price_adjustment_cents != 0 {
            modifiers.push(BillModifierView {
                group_name_snapshot: group_name,
                option_name_snapshot: None,
                price_adjustment_cents: m.price_adjustment_cents,
            });
        }
    }

    BillLineView {
        line_id: line.id,
        name_snapshot: line.name_snapshot.clone(),
        qty: line.qty,
        unit_price_cents: line.unit_price_cents_snapshot,
        line_total_cents: line.line_total_cents,
        status: line.status,
        note: line.note.clone().unwrap_or_default(),
        modifiers,
    }
}

fn order_views(bill: &Bill, orders: &HashMap<i64, Order>, lookup: &CatalogLookup) -> Vec<BillOrderView> {
    bill.order_ids
        .iter()
        .filter_map(|id| orders.get(id))
        .map(|o| BillOrderView {
            order_id: o.id,
            created_at: o.created_at,
            status: o.status,
            total_cents: o.total_cents,
            note: o.order_note.clone().unwrap_or_default(),
            lines: o.items.iter().map(|l| line_view(l, lookup)).collect(),
        })
        .collect()
}

// ==================== Service ====================

#[derive(Debug, Clone)]
pub struct BillQueryService {
    bills: BillRepository,
    orders: OrderRepository,
    sessions: TableSessionRepository,
    catalog: CatalogRepository,
    timezone: Tz,
}

impl BillQueryService {
    pub fn new(
        bills: BillRepository,
        orders: OrderRepository,
        sessions: TableSessionRepository,
        catalog: CatalogRepository,
        timezone: Tz,
    ) -> Self {
        Self {
            bills,
            orders,
            sessions,
            catalog,
            timezone,
        }
    }

    /// Staff listing by tab; the date range applies to the DONE tab only
    pub fn list_staff_bills(&self, ctx: &TenantContext, query: &BillListQuery) -> AppResult<BillPage> {
        let paging = Paging::parse(query.page, query.limit)?;
        let tab: BillTab = query.tab.as_deref().unwrap_or_default().parse()?;
        let range = if tab == BillTab::Done {
            self.date_range(query)?
        } else {
            None
        };

        let bills = self.bills.list(ctx, |b| {
            tab.includes(b.status) && range.is_none_or(|r| r.contains(b.created_at))
        })?;
        let total = bills.len();
        let bills = paging.window(bills);

        let (orders, lookup) = self.load_orders(ctx, &bills, false)?;
        let mut session_status = HashMap::new();
        for b in &bills {
            if let std::collections::hash_map::Entry::Vacant(e) = session_status.entry(b.session_id) {
                e.insert(self.sessions.find_by_id(ctx, b.session_id)?.map(|s| s.status));
            }
        }

        let items = bills
            .iter()
            .map(|b| {
                let mut item = list_item(b, &orders, &lookup);
                item.tab = Some(tab);
                item.session_status = session_status.get(&b.session_id).copied().flatten();
                item
            })
            .collect();

        Ok(BillPage {
            ok: true,
            total,
            page: paging.page,
            limit: paging.limit,
            bills: items,
        })
    }

    /// Bills attributed to the calling customer
    pub fn list_my_bills(
        &self,
        ctx: &TenantContext,
        actor: Option<&Actor>,
        query: &BillListQuery,
    ) -> AppResult<BillPage> {
        let actor = actor.ok_or_else(AppError::not_authenticated)?;
        let paging = Paging::parse(query.page, query.limit)?;
        let range = self.date_range(query)?;

        let bills = self.bills.list(ctx, |b| {
            b.customer_subject_type == Some(actor.subject_type)
                && b.customer_subject_id.as_deref() == Some(actor.subject_id.as_str())
                && range.is_none_or(|r| r.contains(b.created_at))
        })?;
        let total = bills.len();
        let bills = paging.window(bills);

        let (orders, lookup) = self.load_orders(ctx, &bills, true)?;
        let items = bills.iter().map(|b| list_item(b, &orders, &lookup)).collect();

        Ok(BillPage {
            ok: true,
            total,
            page: paging.page,
            limit: paging.limit,
            bills: items,
        })
    }

    fn date_range(&self, query: &BillListQuery) -> AppResult<Option<DateRange>> {
        resolve_date_range(
            query.date_preset.as_deref(),
            query.from.as_deref(),
            query.to.as_deref(),
            self.timezone,
            Utc::now(),
        )
    }

    fn load_orders(
        &self,
        ctx: &TenantContext,
        bills: &[Bill],
        skip_cancelled: bool,
    ) -> AppResult<(HashMap<i64, Order>, CatalogLookup)> {
        let ids: Vec<i64> = bills.iter().flat_map(|b| b.order_ids.iter().copied()).collect();
        if ids.is_empty() {
            return Ok((HashMap::new(), CatalogLookup::default()));
        }
        let orders: Vec<Order> = self
            .orders
            .find_many(ctx, &ids)?
            .into_iter()
            .filter(|o| {
                !skip_cancelled || !matches!(o.status, OrderStatus::Draft | OrderStatus::Cancelled)
            })
            .collect();
        let lookup = CatalogLookup::load(ctx, &self.catalog, &orders)?;
        Ok((orders.into_iter().map(|o| (o.id, o)).collect(), lookup))
    }
}

fn list_item(bill: &Bill, orders: &HashMap<i64, Order>, lookup: &CatalogLookup) -> BillListItem {
    BillListItem {
        bill_id: bill.id,
        status: bill.status,
        tab: None,
        method: bill.method,
        total_cents: bill.total_cents,
        note: bill.note.clone(),
        table_id: bill.table_id,
        table_number: bill.table_number_snapshot.clone(),
        session_id: bill.session_id,
        session_status: None,
        requested_at: bill.requested_at,
        paid_at: bill.paid_at,
        settled_at: bill.settled_at,
        rejected_at: bill.rejected_at,
        created_at: bill.created_at,
        updated_at: bill.updated_at,
        order_ids: bill.order_ids.clone(),
        orders: order_views(bill, orders, lookup),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorKind;

    #[test]
    fn test_split_positive_remainder_from_front() {
        assert_eq!(split_adjustment(100, 3), vec![34, 33, 33]);
        assert_eq!(split_adjustment(101, 3), vec![34, 34, 33]);
    }

    #[test]
    fn test_split_negative_remainder() {
        assert_eq!(split_adjustment(-100, 3), vec![-34, -33, -33]);
    }

    #[test]
    fn test_split_edge_cases() {
        assert!(split_adjustment(100, 0).is_empty());
        assert_eq!(split_adjustment(0, 2), vec![0, 0]);
        assert_eq!(split_adjustment(200, 1), vec![200]);
        assert_eq!(split_adjustment(2, 3), vec![1, 1, 0]);
    }

    #[test]
    fn test_paging_defaults_and_bounds() {
        assert_eq!(Paging::parse(None, None).unwrap(), Paging { page: 1, limit: 20 });
        assert_eq!(Paging::parse(Some(-3), Some(5)).unwrap().page, 1);
        assert_eq!(Paging::parse(Some(3), Some(10)).unwrap().skip(), 20);

        let err = Paging::parse(None, Some(101)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.message, "Invalid limit (1..100)");
        assert_eq!(Paging::parse(None, Some(0)).unwrap().limit, 1);
        assert_eq!(Paging::parse(None, Some(-5)).unwrap().limit, 1);
        assert_eq!(Paging::parse(None, Some(100)).unwrap().limit, 100);
    }

    #[test]
    fn test_tab_parsing_and_membership() {
        assert_eq!("".parse::<BillTab>().unwrap(), BillTab::Requested);
        assert_eq!("done".parse::<BillTab>().unwrap(), BillTab::Done);
        assert!("archived".parse::<BillTab>().is_err());

        assert!(BillTab::Requested.includes(BillStatus::PaymentPending));
        assert!(BillTab::Done.includes(BillStatus::Settled));
        assert!(BillTab::Done.includes(BillStatus::Rejected));
        assert!(!BillTab::Paid.includes(BillStatus::Settled));
    }
}
