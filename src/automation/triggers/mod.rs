//! 触发器评估
//!
//! 每种触发器类型对应一个检查器，评估器按模板声明的顺序逐个检查，
//! 任意一个不满足即以 `TriggerNotMet` 失败，不会执行任何动作。

pub mod gas_price;
pub mod price;
pub mod ratio;
pub mod tick_range;
pub mod timestamp;
pub mod trailing_stop;

use std::collections::HashMap;
use std::sync::Arc;

use crate::automation::domain::{Ledger, SubId, TriggerKind, TriggerParams};
use crate::automation::oracle::PriceOracle;
use crate::core::error::{AutomationError, AutomationResult};
use crate::core::types::{ExecutionEnv, Value};

pub use gas_price::GasPriceTrigger;
pub use price::{OffchainPriceTrigger, PriceThresholdTrigger};
pub use ratio::RatioTrigger;
pub use tick_range::TickRangeTrigger;
pub use timestamp::TimestampTrigger;
pub use trailing_stop::TrailingStopTrigger;

/// 跨调用保留的触发器状态，随执行单元一起提交或丢弃
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerMemory {
    last_rounds: HashMap<SubId, u64>,
}

impl TriggerMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 该订阅最近一次通过校验的轮次
    pub fn last_round(&self, sub_id: SubId) -> Option<u64> {
        self.last_rounds.get(&sub_id).copied()
    }

    pub fn record_round(&mut self, sub_id: SubId, round_id: u64) {
        self.last_rounds.insert(sub_id, round_id);
    }
}

/// 检查器可见的只读状态
pub struct TriggerContext<'a> {
    pub sub_id: SubId,
    pub ledger: &'a Ledger,
    pub oracle: &'a dyn PriceOracle,
    pub env: &'a ExecutionEnv,
    pub memory: &'a mut TriggerMemory,
}

pub trait TriggerChecker: Send + Sync {
    fn kinds(&self) -> Vec<TriggerKind>;

    /// 评估单个触发器；参数类型不匹配返回错误，条件不满足返回 `Ok(false)`
    fn check(
        &self,
        kind: TriggerKind,
        params: &TriggerParams,
        evidence: &Value,
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<bool>;

    /// 持续型订阅执行成功后的新参数，`None` 表示不变
    fn next_params(&self, _params: &TriggerParams) -> Option<TriggerParams> {
        None
    }
}

pub(crate) fn params_mismatch(kind: TriggerKind, params: &TriggerParams) -> AutomationError {
    AutomationError::InvalidSubscription(format!(
        "触发器 {} 的参数类型不匹配: {:?}",
        kind, params
    ))
}

/// 触发器评估器，按类型分发到检查器
#[derive(Clone)]
pub struct TriggerEvaluator {
    checkers: HashMap<TriggerKind, Arc<dyn TriggerChecker>>,
}

impl TriggerEvaluator {
    pub fn new() -> Self {
        Self {
            checkers: HashMap::new(),
        }
    }

    pub fn register<C>(&mut self, checker: C)
    where
        C: TriggerChecker + 'static,
    {
        let checker: Arc<dyn TriggerChecker> = Arc::new(checker);
        for kind in checker.kinds() {
            self.checkers.insert(kind, checker.clone());
        }
    }

    pub fn supports(&self, kind: TriggerKind) -> bool {
        self.checkers.contains_key(&kind)
    }

    fn checker(&self, kind: TriggerKind) -> AutomationResult<&Arc<dyn TriggerChecker>> {
        self.checkers
            .get(&kind)
            .ok_or_else(|| AutomationError::Internal(format!("未注册的触发器类型: {}", kind)))
    }

    /// 依次评估全部触发器，缺失的证据按 `Uint(0)` 处理
    pub fn evaluate(
        &self,
        kinds: &[TriggerKind],
        params: &[TriggerParams],
        evidence: &[Value],
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<()> {
        if kinds.len() != params.len() {
            return Err(AutomationError::InvalidSubscription(format!(
                "触发器参数数量不匹配: 需要 {}, 提供 {}",
                kinds.len(),
                params.len()
            )));
        }

        let missing = Value::Uint(0);
        for (index, (kind, trigger_params)) in kinds.iter().zip(params).enumerate() {
            let checker = self.checker(*kind)?;
            let item = evidence.get(index).unwrap_or(&missing);
            if !checker.check(*kind, trigger_params, item, ctx)? {
                log::debug!("订阅 {} 第{}个触发器 {} 未满足", ctx.sub_id, index, kind);
                return Err(AutomationError::TriggerNotMet {
                    index,
                    kind: kind.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 计算重新布防后的触发器参数，返回是否有变化
    pub fn rearm(
        &self,
        kinds: &[TriggerKind],
        params: &[TriggerParams],
    ) -> AutomationResult<(Vec<TriggerParams>, bool)> {
        let mut changed = false;
        let mut next = Vec::with_capacity(params.len());
        for (kind, trigger_params) in kinds.iter().zip(params) {
            match self.checker(*kind)?.next_params(trigger_params) {
                Some(updated) => {
                    changed = true;
                    next.push(updated);
                }
                None => next.push(trigger_params.clone()),
            }
        }
        Ok((next, changed))
    }
}

impl Default for TriggerEvaluator {
    fn default() -> Self {
        let mut evaluator = TriggerEvaluator::new();
        evaluator.register(RatioTrigger);
        evaluator.register(PriceThresholdTrigger);
        evaluator.register(OffchainPriceTrigger);
        evaluator.register(TimestampTrigger);
        evaluator.register(GasPriceTrigger);
        evaluator.register(TrailingStopTrigger);
        evaluator.register(TickRangeTrigger);
        evaluator
    }
}
