use crate::auth::QrTokenConfig;
use crate::payments::VnpayConfig;
use chrono_tz::Tz;

/// 服务配置 - 点餐引擎的所有配置项
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | RESTAURANT_ID | default | 租户 ID |
/// | BUSINESS_TIMEZONE | Asia/Ho_Chi_Minh | 业务时区 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | QR_TOKEN_SECRET | dev_qr_secret | 桌台二维码签名密钥 |
/// | VNPAY_TMN_CODE / VNPAY_HASH_SECRET / VNPAY_URL / VNPAY_RETURN_URL | | 支付网关 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/dine RESTAURANT_ID=r-001 cargo run -p dine-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志
    pub work_dir: String,
    /// Tenant served by this process
    pub restaurant_id: String,
    /// 业务时区
    pub timezone: Tz,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    /// 桌台二维码配置
    pub qr: QrTokenConfig,
    /// VNPay 网关配置
    pub vnpay: VnpayConfig,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            restaurant_id: std::env::var("RESTAURANT_ID").unwrap_or_else(|_| "default".into()),
            timezone: std::env::var("BUSINESS_TIMEZONE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(chrono_tz::Asia::Ho_Chi_Minh),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            qr: QrTokenConfig::from_env(),
            vnpay: VnpayConfig::from_env(),
        }
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("dine.redb")
    }

    /// 日志目录
    pub fn log_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("logs")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
