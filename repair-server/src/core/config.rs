use std::collections::HashMap;
use std::path::PathBuf;

use crate::orders::{BranchPolicies, LedgerPolicy};

/// 服务器配置 - 维修服务端的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/repair | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | DEFAULT_BRANCH | CENTRO | 未指定分店时使用的分店 |
/// | DIAGNOSIS_FEE | 0 | 诊断费 (诊断单报价前的预付款) |
/// | DIAGNOSIS_ADVANCE_PERCENT | 100 | 诊断单报价后的预付比例 |
/// | SPECIFIC_SERVICE_ADVANCE_PERCENT | 50 | 指定服务单的预付比例 |
/// | PAYMENT_TOLERANCE | 0.01 | 付款校验的舍入容差 |
/// | BRANCH_POLICIES | (空) | 分店覆盖, JSON: `{"NORTE": {...}}` |
/// | CATALOG_PATH | (空) | 价目表 JSON 文件 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/repair HTTP_PORT=8080 DIAGNOSIS_FEE=150 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库和日志
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 日志级别
    pub log_level: String,
    /// 默认分店
    pub default_branch: String,
    /// 全局账本策略
    pub ledger: LedgerPolicy,
    /// 分店账本策略覆盖 (键为大写分店代码)
    pub branch_overrides: HashMap<String, LedgerPolicy>,
    /// 价目表文件路径
    pub catalog_path: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        let defaults = LedgerPolicy::default();
        let ledger = LedgerPolicy {
            diagnosis_fee: env_parse("DIAGNOSIS_FEE", defaults.diagnosis_fee),
            diagnosis_advance_percent: env_parse(
                "DIAGNOSIS_ADVANCE_PERCENT",
                defaults.diagnosis_advance_percent,
            ),
            specific_service_advance_percent: env_parse(
                "SPECIFIC_SERVICE_ADVANCE_PERCENT",
                defaults.specific_service_advance_percent,
            ),
            tolerance: env_parse("PAYMENT_TOLERANCE", defaults.tolerance),
        };

        let branch_overrides = std::env::var("BRANCH_POLICIES")
            .ok()
            .map(|raw| parse_branch_overrides(&raw))
            .unwrap_or_default();

        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/repair".into()),
            http_port: env_parse("HTTP_PORT", 3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            default_branch: std::env::var("DEFAULT_BRANCH")
                .map(|b| b.trim().to_uppercase())
                .unwrap_or_else(|_| "CENTRO".into()),
            ledger,
            branch_overrides,
            catalog_path: std::env::var("CATALOG_PATH").ok().filter(|p| !p.is_empty()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 指定分店的账本策略 (无覆盖时回落到全局策略)
    pub fn ledger_policy_for(&self, branch: &str) -> LedgerPolicy {
        self.branch_overrides
            .get(&branch.trim().to_uppercase())
            .copied()
            .unwrap_or(self.ledger)
    }

    /// 注入编排器的完整策略表
    pub fn branch_policies(&self) -> BranchPolicies {
        self.branch_overrides
            .iter()
            .fold(BranchPolicies::new(self.ledger), |policies, (branch, policy)| {
                policies.with_override(branch, *policy)
            })
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("data").join("orders.redb")
    }

    /// 日志目录
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// 解析 BRANCH_POLICIES，格式错误时记录警告并忽略
fn parse_branch_overrides(raw: &str) -> HashMap<String, LedgerPolicy> {
    match serde_json::from_str::<HashMap<String, LedgerPolicy>>(raw) {
        Ok(map) => map
            .into_iter()
            .map(|(branch, policy)| (branch.trim().to_uppercase(), policy))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed BRANCH_POLICIES");
            HashMap::new()
        }
    }
}
