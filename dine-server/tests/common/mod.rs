//! 集成测试夹具
//!
//! In-memory database, recording publisher, one table with a printed QR
//! token and a tiny menu: Pho (1000) with a Size group (Large +200,
//! Small -100) and Tea (500).

#![allow(dead_code)]

use std::sync::Arc;

use dine_server::auth::QrTokenConfig;
use dine_server::payments::VnpayConfig;
use dine_server::{Config, MemoryPublisher, ServerState};
use shared::TenantContext;
use shared::models::{
    DiningTable, DiningTableCreate, DraftItemsInput, DraftLineInput, MenuItem, MenuItemCreate,
    ModifierGroup, ModifierOption, ModifierSelection, TableSession,
};

pub const HASH_SECRET: &str = "test-hash-secret";

pub fn test_config() -> Config {
    Config {
        work_dir: "./target/test-data".into(),
        restaurant_id: "r-test".into(),
        timezone: chrono_tz::Asia::Ho_Chi_Minh,
        environment: "test".into(),
        log_level: "debug".into(),
        qr: QrTokenConfig {
            secret: "test-qr-secret".into(),
        },
        vnpay: VnpayConfig {
            tmn_code: "TESTTMN".into(),
            hash_secret: HASH_SECRET.into(),
            pay_url: VnpayConfig::SANDBOX_URL.into(),
            return_url: "http://localhost:5173/payment/vnpay-return".into(),
        },
    }
}

pub struct Fixture {
    pub state: ServerState,
    pub events: MemoryPublisher,
    pub ctx: TenantContext,
    pub table: DiningTable,
    pub token: String,
    pub pho: MenuItem,
    pub tea: MenuItem,
    pub size: ModifierGroup,
    pub large: ModifierOption,
    pub small: ModifierOption,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let events = MemoryPublisher::new();
        let state = ServerState::in_memory(config, Arc::new(events.clone())).unwrap();
        let ctx = state.tenant();

        let table = state
            .tables
            .create(
                &ctx,
                DiningTableCreate {
                    table_number: "A1".into(),
                    capacity: 4,
                    location: Some("Patio".into()),
                },
            )
            .unwrap();
        let token = state.qr.issue(&table).unwrap();

        let size = state.catalog.create_group(&ctx, "Size").unwrap();
        let large = state.catalog.create_option(&ctx, size.id, "Large", 200).unwrap();
        let small = state.catalog.create_option(&ctx, size.id, "Small", -100).unwrap();
        let pho = state
            .catalog
            .create_item(
                &ctx,
                MenuItemCreate {
                    name: "Pho".into(),
                    price_cents: 1000,
                    prep_time_minutes: 12,
                    modifier_group_ids: vec![size.id],
                },
            )
            .unwrap();
        let tea = state
            .catalog
            .create_item(
                &ctx,
                MenuItemCreate {
                    name: "Tea".into(),
                    price_cents: 500,
                    prep_time_minutes: 2,
                    modifier_group_ids: vec![],
                },
            )
            .unwrap();

        Self {
            state,
            events,
            ctx,
            table,
            token,
            pho,
            tea,
            size,
            large,
            small,
        }
    }

    pub fn open_session(&self) -> TableSession {
        self.state
            .sessions
            .open_or_get_active(&self.ctx, self.table.id, &self.token)
            .unwrap()
    }

    /// Open the draft and replace its cart; returns the order id
    pub fn cart(&self, items: Vec<DraftLineInput>) -> i64 {
        let draft = self
            .state
            .customer_orders
            .open_draft(&self.ctx, self.table.id, &self.token)
            .unwrap();
        self.state
            .customer_orders
            .update_draft_items(
                &self.ctx,
                draft.order_id,
                self.table.id,
                &self.token,
                DraftItemsInput { items },
            )
            .unwrap();
        draft.order_id
    }

    /// Cart and submit in one go
    pub fn submit(&self, items: Vec<DraftLineInput>) -> i64 {
        let order_id = self.cart(items);
        self.state
            .customer_orders
            .submit(&self.ctx, order_id, self.table.id, &self.token, None)
            .unwrap();
        order_id
    }

    /// Drive a submitted order through the kitchen to `served`
    pub fn serve(&self, order_id: i64) {
        let kitchen = &self.state.kitchen;
        kitchen.accept(&self.ctx, order_id).unwrap();
        let order = self
            .state
            .customer_orders
            .get_my_order(&self.ctx, order_id, self.table.id, &self.token)
            .unwrap();
        for line in order.items.iter().filter(|l| l.is_active()) {
            kitchen.start_line(&self.ctx, order_id, line.id).unwrap();
            kitchen.ready_line(&self.ctx, order_id, line.id).unwrap();
        }
        kitchen.send_to_waiter(&self.ctx, order_id).unwrap();
        kitchen.mark_served(&self.ctx, order_id).unwrap();
    }

    /// Submitted and served order
    pub fn served_order(&self, items: Vec<DraftLineInput>) -> i64 {
        let order_id = self.submit(items);
        self.serve(order_id);
        order_id
    }
}

pub fn line(item: &MenuItem, qty: u32) -> DraftLineInput {
    DraftLineInput {
        item_id: item.id,
        qty,
        modifiers: vec![],
        note: None,
    }
}

pub fn line_with(item: &MenuItem, qty: u32, group: &ModifierGroup, options: &[&ModifierOption]) -> DraftLineInput {
    DraftLineInput {
        item_id: item.id,
        qty,
        modifiers: vec![ModifierSelection {
            group_id: group.id,
            option_ids: options.iter().map(|o| o.id).collect(),
        }],
        note: None,
    }
}
