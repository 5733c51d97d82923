use super::{ActionAdapter, ActionContext, ParamReader};
use crate::core::error::AdapterError;
use crate::core::types::{Value, MAX_AMOUNT};

/// 从执行账户转出代币: [asset, to, amount]
///
/// amount 为 `MAX_AMOUNT` 时转出全部余额。
pub struct SendTokenAction;

impl ActionAdapter for SendTokenAction {
    fn kind(&self) -> &'static str {
        "SendToken"
    }

    fn arity(&self) -> usize {
        3
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let asset = reader.text(0, "asset")?;
        let to = reader.address(1, "to")?;
        let mut amount = reader.uint(2, "amount")?;

        if amount == MAX_AMOUNT {
            amount = ctx.ledger.balance_of(ctx.owner, asset);
        }

        ctx.ledger.transfer(ctx.owner, to, asset, amount)?;
        log::debug!("转账 {} {} -> {}", amount, asset, to);
        Ok(Value::Uint(amount))
    }
}
