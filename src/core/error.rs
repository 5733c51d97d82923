use thiserror::Error;

use crate::core::types::Address;

pub type AutomationResult<T> = std::result::Result<T, AutomationError>;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("机器人未授权: {caller}")]
    BotNotApproved { caller: Address },

    #[error("调用者不是管理员: {caller}")]
    SenderNotOwner { caller: Address },

    #[error("无权创建{0}")]
    NoAuthToCreate(String),

    #[error("订阅不存在: {0}")]
    SubNotFound(u64),

    #[error("订阅未启用: {0}")]
    SubNotEnabled(u64),

    #[error("订阅数据摘要不匹配: {0}")]
    SubDigestMismatch(u64),

    #[error("调用者不是订阅所有者: 订阅 {sub_id} (调用者: {caller})")]
    SenderNotSubOwner { sub_id: u64, caller: Address },

    #[error("无效的策略索引: {index} (目标 {target_id})")]
    InvalidStrategyIndex { target_id: u64, index: usize },

    #[error("订阅数据无效: {0}")]
    InvalidSubscription(String),

    #[error("触发条件未满足: 第{index}个触发器 ({kind})")]
    TriggerNotMet { index: usize, kind: String },

    #[error("动作执行失败: 第{index}步 {kind} - {reason}")]
    ActionFailure {
        index: usize,
        kind: String,
        reason: String,
    },

    #[error("后置条件不满足: 第{index}步 - {reason}")]
    PostConditionViolated { index: usize, reason: String },

    #[error("策略结构错误: {0}")]
    SchemaError(String),

    #[error("策略组参数结构不一致: {0}")]
    SchemaMismatch(String),

    #[error("策略未找到: {0}")]
    UnknownStrategy(u64),

    #[error("策略组未找到: {0}")]
    UnknownBundle(u64),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("YAML配置错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误大类，对应执行入口对外暴露的失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authorization,
    Subscription,
    TriggerNotMet,
    ActionFailure,
    PostConditionViolated,
    Schema,
    Config,
    Internal,
}

impl AutomationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AutomationError::BotNotApproved { .. }
            | AutomationError::SenderNotOwner { .. }
            | AutomationError::NoAuthToCreate(_) => ErrorCategory::Authorization,
            AutomationError::SubNotFound(_)
            | AutomationError::SubNotEnabled(_)
            | AutomationError::SubDigestMismatch(_)
            | AutomationError::SenderNotSubOwner { .. }
            | AutomationError::InvalidStrategyIndex { .. }
            | AutomationError::InvalidSubscription(_) => ErrorCategory::Subscription,
            AutomationError::TriggerNotMet { .. } => ErrorCategory::TriggerNotMet,
            AutomationError::ActionFailure { .. } => ErrorCategory::ActionFailure,
            AutomationError::PostConditionViolated { .. } => ErrorCategory::PostConditionViolated,
            AutomationError::SchemaError(_)
            | AutomationError::SchemaMismatch(_)
            | AutomationError::UnknownStrategy(_)
            | AutomationError::UnknownBundle(_) => ErrorCategory::Schema,
            AutomationError::ConfigError(_)
            | AutomationError::YamlError(_)
            | AutomationError::SerdeError(_)
            | AutomationError::IoError(_) => ErrorCategory::Config,
            AutomationError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// 判断机器人是否可以带着新的触发证据或参数重新提交
    ///
    /// 引擎内部从不重试，每次调用要么整体提交要么整体回滚。
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::TriggerNotMet
                | ErrorCategory::ActionFailure
                | ErrorCategory::PostConditionViolated
        )
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::TriggerNotMet => ErrorSeverity::Info,
            ErrorCategory::ActionFailure | ErrorCategory::PostConditionViolated => {
                ErrorSeverity::Warning
            }
            ErrorCategory::Subscription | ErrorCategory::Schema => ErrorSeverity::Error,
            ErrorCategory::Authorization | ErrorCategory::Config | ErrorCategory::Internal => {
                ErrorSeverity::Critical
            }
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    Info,     // 条件暂未满足，稍后再试
    Warning,  // 本次执行失败，可换参数重试
    Error,    // 调用数据有误，需要修正
    Critical, // 权限或配置问题，需要立即处理
}

/// 协议适配器返回的错误，由执行管线补充步骤信息后转换为 `AutomationError`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("余额不足: {asset} 需要 {required}, 可用 {available}")]
    InsufficientBalance {
        asset: String,
        required: u128,
        available: u128,
    },

    #[error("流动性不足: {0}")]
    InsufficientLiquidity(String),

    #[error("滑点超限: 最少 {min_out}, 实际 {actual}")]
    SlippageExceeded { min_out: u128, actual: u128 },

    #[error("参数错误: {0}")]
    InvalidParam(String),

    #[error("仓位不存在: {0}")]
    PositionNotFound(u64),

    #[error("不是仓位所有者: {0}")]
    NotPositionOwner(u64),

    #[error("抵押率不足: 当前 {ratio_bps} 低于清算线 {liquidation_bps}")]
    Undercollateralized { ratio_bps: u128, liquidation_bps: u128 },

    #[error("价格不可用: {0}")]
    PriceUnavailable(String),

    #[error("闪电贷未归还: {asset} 缺少 {shortfall}")]
    FlashLoanNotRepaid { asset: String, shortfall: u128 },

    #[error("数值溢出")]
    Overflow,

    #[error("{0}")]
    PostCondition(String),
}

impl AdapterError {
    /// 附加步骤信息
    pub fn at_step(self, index: usize, kind: &str) -> AutomationError {
        match self {
            AdapterError::PostCondition(reason) => {
                AutomationError::PostConditionViolated { index, reason }
            }
            other => AutomationError::ActionFailure {
                index,
                kind: kind.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_follow_taxonomy() {
        let err = AutomationError::BotNotApproved {
            caller: Address::from("bot"),
        };
        assert_eq!(err.category(), ErrorCategory::Authorization);
        assert!(!err.is_retryable());

        let err = AutomationError::SubDigestMismatch(3);
        assert_eq!(err.category(), ErrorCategory::Subscription);

        let err = AutomationError::TriggerNotMet {
            index: 0,
            kind: "gas_price".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Info);
    }

    #[test]
    fn test_adapter_error_mapping() {
        let err = AdapterError::InsufficientLiquidity("DAI".to_string()).at_step(2, "Sell");
        assert!(matches!(
            err,
            AutomationError::ActionFailure { index: 2, ref kind, .. } if kind == "Sell"
        ));

        let err = AdapterError::PostCondition("ratio".to_string()).at_step(5, "RatioCheck");
        assert_eq!(err.category(), ErrorCategory::PostConditionViolated);
    }
}
