//! Dine Server - 扫码点餐协调引擎
//!
//! # 架构概述
//!
//! - **桌台会话** (`sessions`): QR 扫码开台、关台
//! - **订单** (`orders`): 草稿购物车、提交、厨房出餐状态机
//! - **账单** (`bills`): 请求结账、现金/在线支付、确认与驳回
//! - **支付** (`payments`): VNPay 下单、回跳、IPN 对账
//! - **评价** (`reviews`): 菜品评价与评分聚合
//! - **消息** (`message`): 实时事件总线
//! - **数据库** (`db`): 嵌入式 redb 文档存储
//!
//! # 模块结构
//!
//! ```text
//! dine-server/src/
//! ├── core/          # 配置、状态
//! ├── auth/          # 桌台二维码令牌
//! ├── sessions/      # 桌台会话
//! ├── orders/        # 点餐与厨房
//! ├── bills/         # 账单结算与列表
//! ├── payments/      # VNPay
//! ├── reviews/       # 评价与评分
//! ├── message/       # 事件总线
//! ├── db/            # 存储层
//! └── utils/         # 错误、日志、时间
//! ```

pub mod auth;
pub mod bills;
pub mod core;
pub mod db;
pub mod message;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod sessions;
pub mod utils;

// Re-export 公共类型
pub use core::{Config, ServerState};
pub use message::{EventPublisher, MemoryPublisher, MessageBus, Notifier};
pub use utils::{AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
