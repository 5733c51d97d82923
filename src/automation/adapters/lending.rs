//! 抵押借贷仓位操作
//!
//! 所有动作都要求执行账户是仓位所有者；取出和借款后仓位抵押率不得低于清算线。

use super::{ActionAdapter, ActionContext, ParamReader};
use crate::automation::domain::{Ledger, Position};
use crate::automation::oracle::PriceOracle;
use crate::core::error::AdapterError;
use crate::core::types::{Address, Value, MAX_AMOUNT};

fn owned_position<'l>(
    ledger: &'l mut Ledger,
    id: u64,
    owner: &Address,
) -> Result<&'l mut Position, AdapterError> {
    let position = ledger.position_mut(id)?;
    if &position.owner != owner {
        return Err(AdapterError::NotPositionOwner(id));
    }
    Ok(position)
}

fn ensure_healthy(position: &Position, oracle: &dyn PriceOracle) -> Result<(), AdapterError> {
    let ratio_bps = Ledger::ratio_of(position, oracle)?;
    if ratio_bps < position.liquidation_ratio_bps {
        return Err(AdapterError::Undercollateralized {
            ratio_bps,
            liquidation_bps: position.liquidation_ratio_bps,
        });
    }
    Ok(())
}

/// 存入抵押品: [position, amount]
pub struct SupplyAction;

impl ActionAdapter for SupplyAction {
    fn kind(&self) -> &'static str {
        "Supply"
    }

    fn arity(&self) -> usize {
        2
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let id = reader.id(0, "position")?;
        let mut amount = reader.uint(1, "amount")?;

        let asset = owned_position(ctx.ledger, id, ctx.owner)?
            .collateral_asset
            .clone();
        if amount == MAX_AMOUNT {
            amount = ctx.ledger.balance_of(ctx.owner, &asset);
        }

        ctx.ledger.debit(ctx.owner, &asset, amount)?;
        let position = ctx.ledger.position_mut(id)?;
        position.collateral = position
            .collateral
            .checked_add(amount)
            .ok_or(AdapterError::Overflow)?;

        Ok(Value::Uint(amount))
    }
}

/// 取出抵押品: [position, amount, to]
pub struct WithdrawAction;

impl ActionAdapter for WithdrawAction {
    fn kind(&self) -> &'static str {
        "Withdraw"
    }

    fn arity(&self) -> usize {
        3
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let id = reader.id(0, "position")?;
        let mut amount = reader.uint(1, "amount")?;
        let to = reader.address(2, "to")?;

        let position = owned_position(ctx.ledger, id, ctx.owner)?;
        if amount == MAX_AMOUNT {
            amount = position.collateral;
        }
        if position.collateral < amount {
            return Err(AdapterError::InsufficientBalance {
                asset: position.collateral_asset.clone(),
                required: amount,
                available: position.collateral,
            });
        }
        position.collateral -= amount;
        ensure_healthy(position, ctx.oracle)?;

        let asset = position.collateral_asset.clone();
        ctx.ledger.credit(to, &asset, amount)?;
        Ok(Value::Uint(amount))
    }
}

/// 借款: [position, amount, to]
pub struct BorrowAction;

impl ActionAdapter for BorrowAction {
    fn kind(&self) -> &'static str {
        "Borrow"
    }

    fn arity(&self) -> usize {
        3
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let id = reader.id(0, "position")?;
        let amount = reader.uint(1, "amount")?;
        let to = reader.address(2, "to")?;

        let position = owned_position(ctx.ledger, id, ctx.owner)?;
        position.debt = position
            .debt
            .checked_add(amount)
            .ok_or(AdapterError::Overflow)?;
        ensure_healthy(position, ctx.oracle)?;

        let asset = position.debt_asset.clone();
        ctx.ledger.credit(to, &asset, amount)?;
        Ok(Value::Uint(amount))
    }
}

/// 还款: [position, amount]，超过债务的部分按债务计，返回实际还款数量
pub struct PaybackAction;

impl ActionAdapter for PaybackAction {
    fn kind(&self) -> &'static str {
        "Payback"
    }

    fn arity(&self) -> usize {
        2
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let id = reader.id(0, "position")?;
        let amount = reader.uint(1, "amount")?;

        let position = owned_position(ctx.ledger, id, ctx.owner)?;
        let amount = amount.min(position.debt);
        let asset = position.debt_asset.clone();

        ctx.ledger.debit(ctx.owner, &asset, amount)?;
        ctx.ledger.position_mut(id)?.debt -= amount;
        Ok(Value::Uint(amount))
    }
}

/// 读取当前抵押率: [position]，供后置检查作为起始值
pub struct PositionRatioAction;

impl ActionAdapter for PositionRatioAction {
    fn kind(&self) -> &'static str {
        "PositionRatio"
    }

    fn arity(&self) -> usize {
        1
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let id = reader.id(0, "position")?;
        let ratio = ctx.ledger.position_ratio(id, ctx.oracle)?;
        Ok(Value::Uint(ratio))
    }
}
