//! 动作管线
//!
//! 严格按顺序执行动作列表，第i步的输出追加到 outputs，后续步骤通过管道引用读取。
//! 管线本身不做回滚，调用方在 [`UnitOfWork`] 的状态副本上运行它，失败时直接丢弃副本。

pub mod params;
pub mod unit_of_work;

use serde::{Deserialize, Serialize};

use crate::automation::adapters::{ActionContext, ActionRegistry, ActionRole, FlashLoanBook};
use crate::automation::domain::{ActionSpec, Ledger, ParamSource};
use crate::automation::oracle::PriceOracle;
use crate::core::config::FlashLoanConfig;
use crate::core::error::{AutomationError, AutomationResult};
use crate::core::types::{ExecutionEnv, Value};

pub use params::ParamResolver;
pub use unit_of_work::{EngineState, EngineStore, UnitOfWork};

/// 不经过订阅直接执行的动作列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub actions: Vec<ActionSpec>,
}

/// 校验动作列表结构
///
/// slot_count 为可引用的参数槽数量，直接执行的 recipe 传 0。
pub fn validate_actions(
    name: &str,
    actions: &[ActionSpec],
    slot_count: usize,
    registry: &ActionRegistry,
) -> AutomationResult<()> {
    if actions.is_empty() {
        return Err(AutomationError::SchemaError(format!("{} 没有任何动作", name)));
    }

    let last = actions.len() - 1;
    for (i, action) in actions.iter().enumerate() {
        let adapter = registry.get(&action.kind).ok_or_else(|| {
            AutomationError::SchemaError(format!("第{}步动作类型不存在: {}", i, action.kind))
        })?;

        if action.params.len() != adapter.arity() {
            return Err(AutomationError::SchemaError(format!(
                "第{}步 {} 需要 {} 个参数, 实际 {}",
                i,
                action.kind,
                adapter.arity(),
                action.params.len()
            )));
        }

        match adapter.role() {
            ActionRole::Terminal if i != last => {
                return Err(AutomationError::SchemaError(format!(
                    "第{}步 {} 只能作为最后一步",
                    i, action.kind
                )));
            }
            ActionRole::FlashLoan if i == last => {
                return Err(AutomationError::SchemaError(format!(
                    "闪电贷 {} 之后必须有归还动作",
                    action.kind
                )));
            }
            _ => {}
        }

        for source in &action.params {
            match source {
                ParamSource::Pipe(j) if *j >= i => {
                    return Err(AutomationError::SchemaError(format!(
                        "第{}步引用了第{}步的输出, 只能引用更早的动作",
                        i, j
                    )));
                }
                ParamSource::Slot(k) if *k >= slot_count => {
                    return Err(AutomationError::SchemaError(format!(
                        "第{}步引用了不存在的参数槽 {}",
                        i, k
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

/// 动作执行器
#[derive(Clone)]
pub struct RecipeExecutor {
    actions: ActionRegistry,
    flash_config: FlashLoanConfig,
}

impl RecipeExecutor {
    pub fn new(actions: ActionRegistry, flash_config: FlashLoanConfig) -> Self {
        Self {
            actions,
            flash_config,
        }
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// 依次执行全部动作并在最后结算闪电贷，返回每一步的输出
    pub fn run(
        &self,
        specs: &[ActionSpec],
        resolver: &ParamResolver<'_>,
        ledger: &mut Ledger,
        oracle: &dyn PriceOracle,
        env: &ExecutionEnv,
    ) -> AutomationResult<Vec<Value>> {
        let mut outputs: Vec<Value> = Vec::with_capacity(specs.len());
        let mut flash_loans = FlashLoanBook::default();

        for (index, spec) in specs.iter().enumerate() {
            let adapter = self
                .actions
                .get(&spec.kind)
                .ok_or_else(|| AutomationError::ActionFailure {
                    index,
                    kind: spec.kind.clone(),
                    reason: "动作类型未注册".to_string(),
                })?;
            let params = resolver.resolve(index, spec, &outputs)?;

            let mut ctx = ActionContext {
                ledger: &mut *ledger,
                oracle,
                env,
                owner: resolver.owner(),
                flash_loans: &mut flash_loans,
                flash_config: &self.flash_config,
            };
            let output = adapter
                .execute(&mut ctx, &params)
                .map_err(|e| e.at_step(index, &spec.kind))?;

            log::debug!("第{}步 {} 完成, 输出 {:?}", index, spec.kind, output);
            outputs.push(output);
        }

        if !flash_loans.is_empty() {
            // 结算失败归到最后一步
            if let Some(last) = specs.last() {
                flash_loans
                    .settle(ledger)
                    .map_err(|e| e.at_step(specs.len() - 1, &last.kind))?;
            }
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::adapters::SWAP_VENUE;
    use crate::automation::oracle::InMemoryOracle;
    use crate::core::types::{Address, PRICE_SCALE};

    fn oracle() -> InMemoryOracle {
        let oracle = InMemoryOracle::new();
        oracle.push_price("WETH", 2 * PRICE_SCALE);
        oracle.push_price("DAI", PRICE_SCALE);
        oracle
    }

    #[test]
    fn test_pipe_feeds_later_step() {
        let executor = RecipeExecutor::new(ActionRegistry::default(), FlashLoanConfig::default());
        let owner = Address::from("alice");
        let bob = Address::from("bob");
        let mut ledger = Ledger::new();
        ledger.credit(&owner, "WETH", 10).unwrap();
        ledger.credit(&Address::from(SWAP_VENUE), "DAI", 1_000).unwrap();

        let specs = vec![
            ActionSpec::new("Sell", vec![ParamSource::Literal; 4]),
            ActionSpec::new(
                "SendToken",
                vec![ParamSource::Literal, ParamSource::Literal, ParamSource::Pipe(0)],
            ),
        ];
        let literals = vec![
            vec![
                Value::from("WETH"),
                Value::from("DAI"),
                Value::Uint(10),
                Value::Uint(0),
            ],
            vec![Value::from("DAI"), Value::Address(bob.clone())],
        ];
        let resolver = ParamResolver::new(&owner, &[], &literals);

        let outputs = executor
            .run(&specs, &resolver, &mut ledger, &oracle(), &ExecutionEnv::current(1))
            .unwrap();
        assert_eq!(outputs, vec![Value::Uint(20), Value::Uint(20)]);
        assert_eq!(ledger.balance_of(&bob, "DAI"), 20);
    }

    #[test]
    fn test_unrepaid_flash_loan_fails_at_settlement() {
        let config = FlashLoanConfig::default();
        let lender = config.lender.clone();
        let executor = RecipeExecutor::new(ActionRegistry::default(), config);
        let owner = Address::from("alice");
        let mut ledger = Ledger::new();
        ledger.credit(&lender, "DAI", 5_000).unwrap();

        let specs = vec![
            ActionSpec::new("FlashLoan", vec![ParamSource::Literal; 2]),
            ActionSpec::new("SendToken", vec![ParamSource::Literal; 3]),
        ];
        let literals = vec![
            vec![Value::from("DAI"), Value::Uint(1_000)],
            vec![Value::from("DAI"), Value::Address(lender.clone()), Value::Uint(999)],
        ];
        let resolver = ParamResolver::new(&owner, &[], &literals);

        let err = executor
            .run(&specs, &resolver, &mut ledger, &oracle(), &ExecutionEnv::current(1))
            .unwrap_err();
        assert!(matches!(err, AutomationError::ActionFailure { index: 1, .. }));
    }

    #[test]
    fn test_validate_actions() {
        let registry = ActionRegistry::default();
        let send = ActionSpec::new("SendToken", vec![ParamSource::Literal; 3]);
        assert!(validate_actions("ok", &[send.clone()], 0, &registry).is_ok());
        assert!(validate_actions("empty", &[], 0, &registry).is_err());

        let slot = ActionSpec::new(
            "SendToken",
            vec![ParamSource::Slot(0), ParamSource::Literal, ParamSource::Literal],
        );
        assert!(validate_actions("slot", &[slot.clone()], 0, &registry).is_err());
        assert!(validate_actions("slot", &[slot], 1, &registry).is_ok());

        let unknown = ActionSpec::new("Teleport", vec![]);
        assert!(validate_actions("unknown", &[unknown], 0, &registry).is_err());
    }
}
