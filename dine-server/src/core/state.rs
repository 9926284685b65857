use std::sync::Arc;

use shared::TenantContext;

use crate::auth::QrTokenService;
use crate::bills::{BillQueryService, BillService};
use crate::core::Config;
use crate::db::Storage;
use crate::db::repository::{
    BillRepository, CatalogRepository, DiningTableRepository, OrderRepository, PaymentRepository,
    ReviewRepository, TableSessionRepository,
};
use crate::message::{EventPublisher, Notifier};
use crate::orders::{CustomerOrderService, KitchenService};
use crate::payments::PaymentService;
use crate::reviews::ReviewService;
use crate::sessions::TableSessionManager;
use crate::utils::{AppError, AppResult};

/// 服务器状态 - 持有所有服务的单例引用
///
/// 所有服务内部共享同一个 [`Storage`] 和 [`Notifier`]，克隆成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | storage | 嵌入式 redb 数据库 |
/// | notifier | 实时事件出口 |
/// | tables / catalog | 桌台与菜单仓储 |
/// | qr | 桌台二维码 |
/// | sessions | 桌台会话 |
/// | customer_orders / kitchen | 点餐与出餐 |
/// | bills / bill_queries | 账单结算与列表 |
/// | payments | VNPay 对账 |
/// | reviews | 菜品评价 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub storage: Storage,
    pub notifier: Notifier,
    pub tables: DiningTableRepository,
    pub catalog: CatalogRepository,
    pub qr: QrTokenService,
    pub sessions: TableSessionManager,
    pub customer_orders: CustomerOrderService,
    pub kitchen: KitchenService,
    pub bills: BillService,
    pub bill_queries: BillQueryService,
    pub payments: PaymentService,
    pub reviews: ReviewService,
}

impl ServerState {
    /// 从已打开的存储构造全部服务
    pub fn new(config: Config, storage: Storage, publisher: Arc<dyn EventPublisher>) -> Self {
        let notifier = Notifier::new(publisher);

        let tables = DiningTableRepository::new(storage.clone());
        let session_repo = TableSessionRepository::new(storage.clone());
        let orders = OrderRepository::new(storage.clone());
        let bill_repo = BillRepository::new(storage.clone());
        let catalog = CatalogRepository::new(storage.clone());
        let payment_repo = PaymentRepository::new(storage.clone());
        let review_repo = ReviewRepository::new(storage.clone());

        let qr = QrTokenService::new(&config.qr, tables.clone());
        let sessions =
            TableSessionManager::new(tables.clone(), session_repo.clone(), qr.clone(), notifier.clone());
        let customer_orders = CustomerOrderService::new(
            sessions.clone(),
            orders.clone(),
            catalog.clone(),
            notifier.clone(),
        );
        let kitchen = KitchenService::new(orders.clone(), catalog.clone(), notifier.clone());
        let bills = BillService::new(
            sessions.clone(),
            session_repo.clone(),
            orders.clone(),
            bill_repo.clone(),
            notifier.clone(),
        );
        let bill_queries = BillQueryService::new(
            bill_repo.clone(),
            orders,
            session_repo.clone(),
            catalog.clone(),
            config.timezone,
        );
        let payments = PaymentService::new(
            config.vnpay.clone(),
            config.timezone,
            bill_repo,
            session_repo,
            payment_repo,
            bills.clone(),
            notifier.clone(),
        );
        let reviews = ReviewService::new(review_repo, catalog.clone());

        Self {
            config,
            storage,
            notifier,
            tables,
            catalog,
            qr,
            sessions,
            customer_orders,
            kitchen,
            bills,
            bill_queries,
            payments,
            reviews,
        }
    }

    /// 初始化服务器状态
    ///
    /// 创建工作目录并打开 `{work_dir}/dine.redb`
    pub fn initialize(config: Config, publisher: Arc<dyn EventPublisher>) -> AppResult<Self> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            AppError::internal(format!("Failed to create work dir {}: {}", config.work_dir, e))
        })?;
        let path = config.database_path();
        let storage = Storage::open(&path)?;
        tracing::info!(path = %path.display(), "database opened");
        Ok(Self::new(config, storage, publisher))
    }

    /// 内存数据库 (测试用)
    pub fn in_memory(config: Config, publisher: Arc<dyn EventPublisher>) -> AppResult<Self> {
        let storage = Storage::open_in_memory()?;
        Ok(Self::new(config, storage, publisher))
    }

    /// 本进程服务的租户
    pub fn tenant(&self) -> TenantContext {
        TenantContext::new(self.config.restaurant_id.clone())
    }
}
