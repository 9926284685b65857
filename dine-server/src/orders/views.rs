//! Read-time joins for kitchen tickets
//!
//! Prep time and modifier display names come from the live catalog each
//! time a ticket is rendered. Line names and prices stay the snapshots.

use crate::db::repository::CatalogRepository;
use crate::utils::AppResult;
use shared::models::{
    KitchenLine, KitchenTicket, MenuItem, ModifierDisplay, ModifierGroup, ModifierOption,
    ModifierStatus, OptionDisplay, Order, OrderLine,
};
use shared::TenantContext;
use std::collections::{BTreeSet, HashMap};

/// Catalog rows referenced by a batch of orders
#[derive(Debug, Default)]
pub struct CatalogLookup {
    items: HashMap<i64, MenuItem>,
    groups: HashMap<i64, ModifierGroup>,
    options: HashMap<i64, ModifierOption>,
}

impl CatalogLookup {
    /// Load every item, group and option the given orders mention
    pub fn load<'a>(
        ctx: &TenantContext,
        catalog: &CatalogRepository,
        orders: impl IntoIterator<Item = &'a Order>,
    ) -> AppResult<Self> {
        let mut item_ids = BTreeSet::new();
        let mut group_ids = BTreeSet::new();
        let mut option_ids = BTreeSet::new();

        for line in orders.into_iter().flat_map(|o| o.items.iter()) {
            item_ids.insert(line.item_id);
            for m in &line.modifiers {
                group_ids.insert(m.group_id);
                option_ids.extend(m.option_ids.iter().copied());
            }
        }

        let collect = |set: BTreeSet<i64>| set.into_iter().collect::<Vec<_>>();
        let mut lookup = Self::default();
        if !item_ids.is_empty() {
            lookup.items = catalog.items_by_ids(ctx, &collect(item_ids))?;
        }
        if !group_ids.is_empty() {
            lookup.groups = catalog.groups_by_ids(ctx, &collect(group_ids))?;
        }
        if !option_ids.is_empty() {
            lookup.options = catalog.options_by_ids(ctx, &collect(option_ids))?;
        }
        Ok(lookup)
    }

    /// 出餐时间; 已删除的菜品按 0 处理
    pub fn prep_time(&self, item_id: i64) -> u32 {
        self.items
            .get(&item_id)
            .filter(|i| !i.is_deleted)
            .map(|i| i.prep_time_minutes)
            .unwrap_or(0)
    }

    pub fn group_name(&self, group_id: i64) -> Option<&str> {
        self.groups.get(&group_id).map(|g| g.name.as_str())
    }

    /// Option name regardless of its current status (receipts)
    pub fn option_name(&self, option_id: i64) -> Option<&str> {
        self.options.get(&option_id).map(|o| o.name.as_str())
    }

    fn active_option(&self, option_id: i64) -> Option<&ModifierOption> {
        self.options
            .get(&option_id)
            .filter(|o| o.status == ModifierStatus::Active)
    }

    pub fn ticket(&self, order: &Order) -> KitchenTicket {
        KitchenTicket {
            order_id: order.id,
            table_id: order.table_id,
            table_number: order.table_number_snapshot.clone(),
            session_id: order.session_id,
            status: order.status,
            order_note: order.order_note.clone(),
            total_cents: order.total_cents,
            submitted_at: order.submitted_at,
            items: order.items.iter().map(|l| self.kitchen_line(l)).collect(),
        }
    }

    fn kitchen_line(&self, line: &OrderLine) -> KitchenLine {
        KitchenLine {
            line_id: line.id,
            item_id: line.item_id,
            name: line.name_snapshot.clone(),
            qty: line.qty,
            note: line.note.clone(),
            status: line.status,
            prep_time_minutes: self.prep_time(line.item_id),
            line_total_cents: line.line_total_cents,
            modifiers: line
                .modifiers
                .iter()
                .map(|m| ModifierDisplay {
                    group_id: m.group_id,
                    group_name: self.group_name(m.group_id).map(str::to_string),
                    price_adjustment_cents: m.price_adjustment_cents,
                    options: m
                        .option_ids
                        .iter()
                        .map(|&option_id| {
                            let option = self.active_option(option_id);
                            OptionDisplay {
                                option_id,
                                name: option.map(|o| o.name.clone()).unwrap_or_default(),
                                price_adjustment_cents: option
                                    .map(|o| o.price_adjustment_cents)
                                    .unwrap_or(0),
                            }
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Enrich a batch of orders into kitchen tickets
pub fn build_tickets(
    ctx: &TenantContext,
    catalog: &CatalogRepository,
    orders: &[Order],
) -> AppResult<Vec<KitchenTicket>> {
    let lookup = CatalogLookup::load(ctx, catalog, orders)?;
    Ok(orders.iter().map(|o| lookup.ticket(o)).collect())
}
