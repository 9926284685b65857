//! Cart pricing
//!
//! Resolves a full-cart replacement against the live catalog. Names and
//! prices are copied into the line here and never re-read afterwards.

use crate::utils::{AppError, AppResult, ErrorCode};
use shared::models::{
    DraftLineInput, LineModifier, LineStatus, MenuItem, ModifierOption, ModifierStatus, OrderLine,
};
use std::collections::HashMap;

/// Price every requested line
///
/// `items` and `options` are catalog lookups keyed by id. An unknown,
/// deleted or unavailable item is rejected, as is an unknown or inactive
/// option or one that belongs to a different group.
pub fn price_lines(
    inputs: &[DraftLineInput],
    items: &HashMap<i64, MenuItem>,
    options: &HashMap<i64, ModifierOption>,
) -> AppResult<Vec<OrderLine>> {
    inputs
        .iter()
        .enumerate()
        .map(|(idx, input)| price_line(idx as u32 + 1, input, items, options))
        .collect()
}

fn price_line(
    line_id: u32,
    input: &DraftLineInput,
    items: &HashMap<i64, MenuItem>,
    options: &HashMap<i64, ModifierOption>,
) -> AppResult<OrderLine> {
    let item = items
        .get(&input.item_id)
        .filter(|i| !i.is_deleted)
        .ok_or_else(|| {
            AppError::with_message(
                ErrorCode::MenuItemUnavailable,
                format!("Invalid itemId: {}", input.item_id),
            )
            .with_detail("item_id", input.item_id)
        })?;
    if !item.is_orderable() {
        return Err(AppError::with_message(
            ErrorCode::MenuItemUnavailable,
            format!("Item is not available: {}", item.name),
        )
        .with_detail("item_id", item.id));
    }

    let mut modifiers = Vec::with_capacity(input.modifiers.len());
    for selection in &input.modifiers {
        let mut adjustment = 0i64;
        for option_id in &selection.option_ids {
            let option = options
                .get(option_id)
                .filter(|o| o.status == ModifierStatus::Active && o.group_id == selection.group_id)
                .ok_or_else(|| {
                    AppError::with_message(
                        ErrorCode::ModifierOptionInvalid,
                        format!("Invalid modifier option: {}", option_id),
                    )
                    .with_detail("group_id", selection.group_id)
                    .with_detail("option_id", *option_id)
                })?;
            adjustment += option.price_adjustment_cents;
        }
        modifiers.push(LineModifier {
            group_id: selection.group_id,
            option_ids: selection.option_ids.clone(),
            price_adjustment_cents: adjustment,
        });
    }

    let modifier_total: i64 = modifiers.iter().map(|m| m.price_adjustment_cents).sum();
    let line_total_cents = (item.price_cents + modifier_total) * i64::from(input.qty);

    Ok(OrderLine {
        id: line_id,
        item_id: item.id,
        name_snapshot: item.name.clone(),
        unit_price_cents_snapshot: item.price_cents,
        qty: input.qty,
        modifiers,
        note: input
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        line_total_cents,
        status: LineStatus::Queued,
        started_at: None,
        ready_at: None,
        served_at: None,
        cancelled_at: None,
    })
}

/// Sum of active line totals
pub fn order_total(lines: &[OrderLine]) -> i64 {
    lines
        .iter()
        .filter(|l| l.is_active())
        .map(|l| l.line_total_cents)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{MenuItemStatus, ModifierSelection, RatingBreakdown};

    fn item(id: i64, price: i64) -> MenuItem {
        MenuItem {
            id,
            restaurant_id: "r1".into(),
            name: format!("Item {}", id),
            price_cents: price,
            prep_time_minutes: 10,
            status: MenuItemStatus::Available,
            is_deleted: false,
            popularity_count: 0,
            modifier_group_ids: vec![],
            rating_avg: 0.0,
            rating_count: 0,
            rating_breakdown: RatingBreakdown::default(),
            created_at: 0,
        }
    }

    fn option(id: i64, group_id: i64, adj: i64) -> ModifierOption {
        ModifierOption {
            id,
            restaurant_id: "r1".into(),
            group_id,
            name: format!("Option {}", id),
            price_adjustment_cents: adj,
            status: ModifierStatus::Active,
        }
    }

    fn line(item_id: i64, qty: u32, mods: Vec<(i64, Vec<i64>)>) -> DraftLineInput {
        DraftLineInput {
            item_id,
            qty,
            modifiers: mods
                .into_iter()
                .map(|(group_id, option_ids)| ModifierSelection { group_id, option_ids })
                .collect(),
            note: None,
        }
    }

    fn catalog() -> (HashMap<i64, MenuItem>, HashMap<i64, ModifierOption>) {
        let items = [item(1, 1000), item(2, 500)]
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        let options = [option(10, 100, 200), option(11, 100, 50), option(20, 200, -100)]
            .into_iter()
            .map(|o| (o.id, o))
            .collect();
        (items, options)
    }

    #[test]
    fn test_item_with_one_modifier() {
        let (items, options) = catalog();
        let lines = price_lines(&[line(1, 1, vec![(100, vec![10])])], &items, &options).unwrap();
        assert_eq!(lines[0].line_total_cents, 1200);
        assert_eq!(lines[0].unit_price_cents_snapshot, 1000);
        assert_eq!(lines[0].modifiers[0].price_adjustment_cents, 200);
        assert_eq!(order_total(&lines), 1200);
    }

    #[test]
    fn test_quantity_multiplies_unit_plus_modifiers() {
        let (items, options) = catalog();
        let lines = price_lines(
            &[
                line(1, 2, vec![(100, vec![10, 11]), (200, vec![20])]),
                line(2, 3, vec![]),
            ],
            &items,
            &options,
        )
        .unwrap();
        // (1000 + 250 - 100) * 2
        assert_eq!(lines[0].line_total_cents, 2300);
        assert_eq!(lines[1].line_total_cents, 1500);
        assert_eq!(lines.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(order_total(&lines), 3800);
    }

    #[test]
    fn test_unknown_or_unavailable_item_rejected() {
        let (mut items, options) = catalog();
        let err = price_lines(&[line(99, 1, vec![])], &items, &options).unwrap_err();
        assert_eq!(err.kind(), shared::ErrorKind::BadRequest);
        assert_eq!(err.message, "Invalid itemId: 99");

        items.get_mut(&2).unwrap().status = MenuItemStatus::SoldOut;
        let err = price_lines(&[line(2, 1, vec![])], &items, &options).unwrap_err();
        assert_eq!(err.code, ErrorCode::MenuItemUnavailable);
    }

    #[test]
    fn test_option_must_be_active_and_in_group() {
        let (items, mut options) = catalog();
        let err = price_lines(&[line(1, 1, vec![(200, vec![10])])], &items, &options).unwrap_err();
        assert_eq!(err.code, ErrorCode::ModifierOptionInvalid);

        options.get_mut(&10).unwrap().status = ModifierStatus::Inactive;
        let err = price_lines(&[line(1, 1, vec![(100, vec![10])])], &items, &options).unwrap_err();
        assert_eq!(err.code, ErrorCode::ModifierOptionInvalid);
    }

    #[test]
    fn test_cancelled_lines_excluded_from_total() {
        let (items, options) = catalog();
        let mut lines =
            price_lines(&[line(1, 1, vec![]), line(2, 1, vec![])], &items, &options).unwrap();
        lines[1].status = LineStatus::Cancelled;
        assert_eq!(order_total(&lines), 1000);
    }
}
