//! 协议适配器
//!
//! 每种动作类型对应一个 [`ActionAdapter`] 实现，通过 [`ActionRegistry`] 按名称查找。
//! 适配器只操作传入的账本副本，成功与否由执行管线统一提交或丢弃。

pub mod basic;
pub mod exchange;
pub mod flash_loan;
pub mod lending;

use std::collections::HashMap;
use std::sync::Arc;

use crate::automation::domain::Ledger;
use crate::automation::oracle::PriceOracle;
use crate::automation::ratio_gate::RatioCheckAction;
use crate::core::config::FlashLoanConfig;
use crate::core::error::AdapterError;
use crate::core::types::{Address, ExecutionEnv, Value};

pub use basic::SendTokenAction;
pub use exchange::{SellAction, SWAP_VENUE};
pub use flash_loan::{FlashLoanAction, FlashLoanBook, FlashLoanObligation};
pub use lending::{BorrowAction, PaybackAction, PositionRatioAction, SupplyAction, WithdrawAction};

/// 动作在管线中的位置约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRole {
    Standard,
    /// 必须有后续的还款动作，不能是最后一步
    FlashLoan,
    /// 后置条件检查，只能是最后一步
    Terminal,
}

/// 单个动作执行时可见的上下文
pub struct ActionContext<'a> {
    pub ledger: &'a mut Ledger,
    pub oracle: &'a dyn PriceOracle,
    pub env: &'a ExecutionEnv,
    pub owner: &'a Address,
    pub flash_loans: &'a mut FlashLoanBook,
    pub flash_config: &'a FlashLoanConfig,
}

pub trait ActionAdapter: Send + Sync {
    fn kind(&self) -> &'static str;

    /// 参数个数
    fn arity(&self) -> usize;

    fn role(&self) -> ActionRole {
        ActionRole::Standard
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError>;
}

/// 按位置读取已解析的参数
pub struct ParamReader<'a> {
    params: &'a [Value],
}

impl<'a> ParamReader<'a> {
    pub fn new(params: &'a [Value]) -> Self {
        Self { params }
    }

    fn get(&self, index: usize, name: &str) -> Result<&'a Value, AdapterError> {
        self.params
            .get(index)
            .ok_or_else(|| AdapterError::InvalidParam(format!("缺少参数 {}", name)))
    }

    pub fn uint(&self, index: usize, name: &str) -> Result<u128, AdapterError> {
        let value = self.get(index, name)?;
        value.as_uint().ok_or_else(|| {
            AdapterError::InvalidParam(format!("{} 应为 uint, 实际 {}", name, value.slot_type()))
        })
    }

    pub fn id(&self, index: usize, name: &str) -> Result<u64, AdapterError> {
        let raw = self.uint(index, name)?;
        u64::try_from(raw)
            .map_err(|_| AdapterError::InvalidParam(format!("{} 超出范围: {}", name, raw)))
    }

    pub fn boolean(&self, index: usize, name: &str) -> Result<bool, AdapterError> {
        let value = self.get(index, name)?;
        value.as_bool().ok_or_else(|| {
            AdapterError::InvalidParam(format!("{} 应为 bool, 实际 {}", name, value.slot_type()))
        })
    }

    pub fn text(&self, index: usize, name: &str) -> Result<&'a str, AdapterError> {
        let value = self.get(index, name)?;
        value.as_text().ok_or_else(|| {
            AdapterError::InvalidParam(format!("{} 应为 text, 实际 {}", name, value.slot_type()))
        })
    }

    pub fn address(&self, index: usize, name: &str) -> Result<&'a Address, AdapterError> {
        let value = self.get(index, name)?;
        value.as_address().ok_or_else(|| {
            AdapterError::InvalidParam(format!(
                "{} 应为 address, 实际 {}",
                name,
                value.slot_type()
            ))
        })
    }
}

/// 动作注册表，运行时按名称解析动作实现
#[derive(Clone)]
pub struct ActionRegistry {
    adapters: HashMap<String, Arc<dyn ActionAdapter>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    pub fn register<A>(&mut self, adapter: A)
    where
        A: ActionAdapter + 'static,
    {
        self.adapters
            .insert(adapter.kind().to_string(), Arc::new(adapter));
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn ActionAdapter>> {
        self.adapters.get(kind).cloned()
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.adapters.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        let mut registry = ActionRegistry::new();
        registry.register(SendTokenAction);
        registry.register(FlashLoanAction);
        registry.register(SellAction);
        registry.register(SupplyAction);
        registry.register(WithdrawAction);
        registry.register(BorrowAction);
        registry.register(PaybackAction);
        registry.register(PositionRatioAction);
        registry.register(RatioCheckAction);
        registry
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_kinds() {
        let registry = ActionRegistry::default();
        let kinds = registry.kinds();
        for kind in ["SendToken", "FlashLoan", "Sell", "Withdraw", "RatioCheck"] {
            assert!(kinds.iter().any(|k| k == kind), "missing {}", kind);
        }
        assert_eq!(
            registry.get("RatioCheck").map(|a| a.role()),
            Some(ActionRole::Terminal)
        );
        assert!(registry.get("Unknown").is_none());
    }

    #[test]
    fn test_param_reader_types() {
        let params = vec![Value::Uint(5), Value::from("WETH"), Value::Bool(true)];
        let reader = ParamReader::new(&params);
        assert_eq!(reader.uint(0, "amount").unwrap(), 5);
        assert_eq!(reader.text(1, "asset").unwrap(), "WETH");
        assert!(reader.boolean(2, "flag").unwrap());
        assert!(matches!(
            reader.uint(1, "amount"),
            Err(AdapterError::InvalidParam(_))
        ));
        assert!(reader.address(3, "to").is_err());
    }
}
