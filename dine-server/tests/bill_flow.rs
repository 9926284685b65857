//! 账单流程
//!
//! Request, cash settlement, staff accept/reject and the bill listings.

mod common;

use common::{Fixture, line, line_with};
use dine_server::bills::BillListQuery;
use shared::models::{BillStatus, PaymentMethod, SessionStatus, TableStatus};
use shared::{Actor, ErrorCode, ErrorKind};

fn tab(name: &str) -> BillListQuery {
    BillListQuery {
        tab: Some(name.into()),
        ..Default::default()
    }
}

#[test]
fn test_request_bill_is_idempotent() {
    let fx = Fixture::new();
    let session = fx.open_session();
    fx.served_order(vec![line_with(&fx.pho, 1, &fx.size, &[&fx.large]), line(&fx.tea, 2)]);

    let first = fx
        .state
        .bills
        .request_bill(&fx.ctx, session.id, Some("  split later ".into()), None)
        .unwrap();
    assert_eq!(first.status, BillStatus::Requested);
    assert_eq!(first.total_cents, 1200 + 1000);
    assert_eq!(fx.events.count("bill.requested"), 2);

    // a later served order does not change the open bill
    fx.served_order(vec![line(&fx.tea, 1)]);
    let again = fx.state.bills.request_bill(&fx.ctx, session.id, None, None).unwrap();
    assert_eq!(again.bill_id, first.bill_id);
    assert_eq!(again.total_cents, first.total_cents);
    assert_eq!(fx.events.count("bill.requested"), 2);

    let page = fx.state.bill_queries.list_staff_bills(&fx.ctx, &tab("REQUESTED")).unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.bills[0].note, "split later");
    assert_eq!(page.bills[0].session_status, Some(SessionStatus::BillRequested));
}

#[test]
fn test_request_bill_waits_for_kitchen() {
    let fx = Fixture::new();
    let session = fx.open_session();
    fx.submit(vec![line(&fx.tea, 1)]);

    let err = fx.state.bills.request_bill(&fx.ctx, session.id, None, None).unwrap_err();
    assert_eq!(err.code, ErrorCode::KitchenQueueBusy);
    assert!(err.message.starts_with("Cannot request bill: there are unfinished orders"));
}

#[test]
fn test_request_bill_without_orders() {
    let fx = Fixture::new();
    let session = fx.open_session();
    // a draft alone is not billable
    fx.cart(vec![line(&fx.tea, 1)]);

    let err = fx.state.bills.request_bill(&fx.ctx, session.id, None, None).unwrap_err();
    assert_eq!(err.code, ErrorCode::NothingToBill);
}

#[test]
fn test_cash_payment_then_accept_closes_table() {
    let fx = Fixture::new();
    let session = fx.open_session();
    fx.served_order(vec![line(&fx.tea, 2)]);
    let bill = fx.state.bills.request_bill(&fx.ctx, session.id, None, None).unwrap();

    let paid = fx
        .state
        .bills
        .pay_cash(&fx.ctx, bill.bill_id, fx.table.id, &fx.token)
        .unwrap();
    assert_eq!(paid.status, BillStatus::Paid);
    assert_eq!(paid.method, PaymentMethod::Cash);
    assert_eq!(paid.total_cents, 1000);
    assert_eq!(fx.events.count("bill.paid"), 2);

    // paying twice is refused
    let err = fx.state.bills.mark_cash_paid(&fx.ctx, bill.bill_id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let receipt = fx
        .state
        .bills
        .get_active_bill_for_table(&fx.ctx, fx.table.id, &fx.token)
        .unwrap();
    assert_eq!(receipt.bill.status, BillStatus::Paid);
    assert_eq!(receipt.served_lines.len(), 1);
    assert_eq!(receipt.served_lines[0].qty, 2);

    let paid_tab = fx.state.bill_queries.list_staff_bills(&fx.ctx, &tab("PAID")).unwrap();
    assert_eq!(paid_tab.total, 1);

    let accepted = fx.state.bills.accept_paid_bill(&fx.ctx, bill.bill_id).unwrap();
    assert_eq!(accepted.status, BillStatus::Settled);
    assert_eq!(accepted.session.status, SessionStatus::Closed);
    assert_eq!(fx.events.count("bill.accepted"), 1);

    let table = fx.state.tables.find_by_id(&fx.ctx, fx.table.id).unwrap().unwrap();
    assert_eq!(table.status, TableStatus::Active);
    assert!(fx.state.sessions.get_active_for_table(&fx.ctx, fx.table.id).unwrap().is_none());

    let err = fx.state.bills.accept_paid_bill(&fx.ctx, bill.bill_id).unwrap_err();
    assert_eq!(err.code, ErrorCode::BillStatusConflict);
    assert_eq!(err.message, "Bill must be PAID to accept (current: SETTLED)");

    let done = fx.state.bill_queries.list_staff_bills(&fx.ctx, &tab("DONE")).unwrap();
    assert_eq!(done.total, 1);
    assert_eq!(done.bills[0].session_status, Some(SessionStatus::Closed));
}

#[test]
fn test_accept_requires_paid() {
    let fx = Fixture::new();
    let session = fx.open_session();
    fx.served_order(vec![line(&fx.tea, 1)]);
    let bill = fx.state.bills.request_bill(&fx.ctx, session.id, None, None).unwrap();

    let err = fx.state.bills.accept_paid_bill(&fx.ctx, bill.bill_id).unwrap_err();
    assert_eq!(err.code, ErrorCode::BillStatusConflict);

    let err = fx.state.bills.accept_paid_bill(&fx.ctx, 424242).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_rejected_bill_can_be_requested_again() {
    let fx = Fixture::new();
    let session = fx.open_session();
    fx.served_order(vec![line(&fx.pho, 1)]);
    let bill = fx.state.bills.request_bill(&fx.ctx, session.id, None, None).unwrap();

    let rejected = fx
        .state
        .bills
        .reject_bill(&fx.ctx, bill.bill_id, Some("wrong table".into()))
        .unwrap();
    assert_eq!(rejected.status, BillStatus::Rejected);
    assert_eq!(fx.events.count("bill.rejected"), 2);

    let current = fx
        .state
        .sessions
        .get_active_for_table(&fx.ctx, fx.table.id)
        .unwrap()
        .unwrap();
    assert_eq!(current.status, SessionStatus::Open);
    assert_eq!(current.active_bill_id, None);

    // rejecting again conflicts
    let err = fx.state.bills.reject_bill(&fx.ctx, bill.bill_id, None).unwrap_err();
    assert_eq!(err.code, ErrorCode::BillStatusConflict);

    let next = fx.state.bills.request_bill(&fx.ctx, session.id, None, None).unwrap();
    assert_ne!(next.bill_id, bill.bill_id);
    assert_eq!(next.total_cents, 1000);
}

#[test]
fn test_customer_sees_own_bills_only() {
    let fx = Fixture::new();
    let session = fx.open_session();
    fx.served_order(vec![line_with(&fx.pho, 1, &fx.size, &[&fx.large])]);
    let alice = Actor::user("alice");
    fx.state
        .bills
        .request_bill(&fx.ctx, session.id, None, Some(&alice))
        .unwrap();

    let err = fx
        .state
        .bill_queries
        .list_my_bills(&fx.ctx, None, &BillListQuery::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let mine = fx
        .state
        .bill_queries
        .list_my_bills(&fx.ctx, Some(&alice), &BillListQuery::default())
        .unwrap();
    assert_eq!(mine.total, 1);
    let lines = &mine.bills[0].orders[0].lines;
    assert_eq!(lines[0].line_total_cents, 1200);
    assert_eq!(lines[0].modifiers.len(), 1);
    assert_eq!(lines[0].modifiers[0].group_name_snapshot.as_deref(), Some("Size"));
    assert_eq!(lines[0].modifiers[0].option_name_snapshot.as_deref(), Some("Large"));
    assert_eq!(lines[0].modifiers[0].price_adjustment_cents, 200);

    let bob = Actor::user("bob");
    let theirs = fx
        .state
        .bill_queries
        .list_my_bills(&fx.ctx, Some(&bob), &BillListQuery::default())
        .unwrap();
    assert_eq!(theirs.total, 0);
}

#[test]
fn test_staff_listing_validates_query() {
    let fx = Fixture::new();

    let err = fx.state.bill_queries.list_staff_bills(&fx.ctx, &tab("ALL")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let query = BillListQuery {
        limit: Some(500),
        ..Default::default()
    };
    let err = fx.state.bill_queries.list_staff_bills(&fx.ctx, &query).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let floored = BillListQuery {
        limit: Some(0),
        ..Default::default()
    };
    let page = fx.state.bill_queries.list_staff_bills(&fx.ctx, &floored).unwrap();
    assert_eq!(page.limit, 1);

    let empty = fx
        .state
        .bill_queries
        .list_staff_bills(&fx.ctx, &BillListQuery::default())
        .unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.page, 1);
    assert_eq!(empty.limit, 20);
}

#[test]
fn test_online_confirmation_paths() {
    let fx = Fixture::new();
    let session = fx.open_session();
    fx.served_order(vec![line(&fx.tea, 1)]);
    let bill = fx.state.bills.request_bill(&fx.ctx, session.id, None, None).unwrap();

    let paid = fx
        .state
        .bills
        .pay_online(&fx.ctx, bill.bill_id, fx.table.id, &fx.token)
        .unwrap();
    assert_eq!(paid.method, PaymentMethod::Online);
    assert_eq!(paid.session_id, session.id);

    let err = fx
        .state
        .bills
        .pay_online_by_bill_id(&fx.ctx, bill.bill_id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let current = fx
        .state
        .sessions
        .get_active_for_table(&fx.ctx, fx.table.id)
        .unwrap()
        .unwrap();
    assert_eq!(current.status, SessionStatus::Paid);
    assert_eq!(current.active_bill_id, Some(bill.bill_id));
}
