//! 闪电贷
//!
//! 借出的流动性在管线中途转入执行账户，必须在同一次调用内由后续动作归还本金加手续费。
//! 归还检查在最后一个动作之后进行，不足则整次调用失败，借出的本金随之回滚。

use std::collections::BTreeMap;

use super::{ActionAdapter, ActionContext, ActionRole, ParamReader};
use crate::automation::domain::Ledger;
use crate::core::error::AdapterError;
use crate::core::types::{Address, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashLoanObligation {
    pub lender: Address,
    pub asset: String,
    pub principal: u128,
    pub fee: u128,
    /// 借出前出借方余额
    pub lender_balance_before: u128,
}

/// 单次调用内未结清的闪电贷
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashLoanBook {
    obligations: Vec<FlashLoanObligation>,
}

impl FlashLoanBook {
    pub fn open(&mut self, obligation: FlashLoanObligation) {
        self.obligations.push(obligation);
    }

    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty()
    }

    pub fn obligations(&self) -> &[FlashLoanObligation] {
        &self.obligations
    }

    /// 检查所有闪电贷均已归还
    ///
    /// 同一出借方同一资产的多笔借款合并结算: 出借方余额须回到首笔借出前的余额加上全部手续费。
    pub fn settle(&self, ledger: &Ledger) -> Result<(), AdapterError> {
        let mut required: BTreeMap<(&Address, &str), u128> = BTreeMap::new();
        for obligation in &self.obligations {
            let key = (&obligation.lender, obligation.asset.as_str());
            let owed = required
                .entry(key)
                .or_insert(obligation.lender_balance_before);
            *owed = owed
                .checked_add(obligation.fee)
                .ok_or(AdapterError::Overflow)?;
        }

        for ((lender, asset), owed) in required {
            let balance = ledger.balance_of(lender, asset);
            if balance < owed {
                return Err(AdapterError::FlashLoanNotRepaid {
                    asset: asset.to_string(),
                    shortfall: owed - balance,
                });
            }
        }
        Ok(())
    }
}

/// 闪电借款: [asset, amount]，返回借入数量
pub struct FlashLoanAction;

impl ActionAdapter for FlashLoanAction {
    fn kind(&self) -> &'static str {
        "FlashLoan"
    }

    fn arity(&self) -> usize {
        2
    }

    fn role(&self) -> ActionRole {
        ActionRole::FlashLoan
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let asset = reader.text(0, "asset")?;
        let amount = reader.uint(1, "amount")?;

        let lender = ctx.flash_config.lender.clone();
        let fee = ctx
            .flash_config
            .fee_for(amount)
            .ok_or(AdapterError::Overflow)?;
        let lender_balance_before = ctx.ledger.balance_of(&lender, asset);
        if lender_balance_before < amount {
            return Err(AdapterError::InsufficientLiquidity(format!(
                "闪电贷 {} 需要 {}, 可用 {}",
                asset, amount, lender_balance_before
            )));
        }

        ctx.ledger.transfer(&lender, ctx.owner, asset, amount)?;
        ctx.flash_loans.open(FlashLoanObligation {
            lender,
            asset: asset.to_string(),
            principal: amount,
            fee,
            lender_balance_before,
        });

        log::debug!("闪电贷借入 {} {} (手续费 {})", amount, asset, fee);
        Ok(Value::Uint(amount))
    }
}
