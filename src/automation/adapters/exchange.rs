use super::{ActionAdapter, ActionContext, ParamReader};
use crate::core::error::AdapterError;
use crate::core::types::{Address, Value, MAX_AMOUNT, PRICE_SCALE};

/// 兑换场所账户
pub const SWAP_VENUE: &str = "swap-venue";

/// 兑换: [from_asset, to_asset, amount, min_out]，返回买入数量
///
/// 报价优先使用账本中设置的场所报价，否则按预言机价格推导。
pub struct SellAction;

impl ActionAdapter for SellAction {
    fn kind(&self) -> &'static str {
        "Sell"
    }

    fn arity(&self) -> usize {
        4
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let from_asset = reader.text(0, "from_asset")?;
        let to_asset = reader.text(1, "to_asset")?;
        let mut amount = reader.uint(2, "amount")?;
        let min_out = reader.uint(3, "min_out")?;

        if amount == MAX_AMOUNT {
            amount = ctx.ledger.balance_of(ctx.owner, from_asset);
        }

        let rate = ctx.ledger.swap_rate(from_asset, to_asset, ctx.oracle)?;
        let out = amount
            .checked_mul(rate)
            .map(|scaled| scaled / PRICE_SCALE)
            .ok_or(AdapterError::Overflow)?;
        if out < min_out {
            return Err(AdapterError::SlippageExceeded {
                min_out,
                actual: out,
            });
        }

        let venue = Address::from(SWAP_VENUE);
        if ctx.ledger.balance_of(&venue, to_asset) < out {
            return Err(AdapterError::InsufficientLiquidity(format!(
                "兑换场所 {} 不足 {}",
                to_asset, out
            )));
        }

        ctx.ledger.transfer(ctx.owner, &venue, from_asset, amount)?;
        ctx.ledger.transfer(&venue, ctx.owner, to_asset, out)?;

        log::debug!("兑换 {} {} -> {} {}", amount, from_asset, out, to_asset);
        Ok(Value::Uint(out))
    }
}
