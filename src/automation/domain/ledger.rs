//! 内存账本
//!
//! 代替外部协议状态：账户余额、抵押债务仓位、区间订单和兑换报价。
//! 每次执行都在账本副本上进行，只有整体成功才替换原账本。

use std::collections::BTreeMap;

use crate::automation::oracle::PriceOracle;
use crate::core::error::AdapterError;
use crate::core::types::{Address, PRICE_SCALE, RATIO_BPS};

/// 抵押债务仓位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub id: u64,
    pub owner: Address,
    pub collateral_asset: String,
    pub debt_asset: String,
    pub collateral: u128,
    pub debt: u128,
    pub liquidation_ratio_bps: u128,
}

/// 集中流动性区间订单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeOrder {
    pub id: u64,
    pub owner: Address,
    pub pool: String,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: BTreeMap<(Address, String), u128>,
    positions: BTreeMap<u64, Position>,
    range_orders: BTreeMap<u64, RangeOrder>,
    /// 1单位 from 可兑换的 to 数量，精度 PRICE_SCALE
    swap_rates: BTreeMap<(String, String), u128>,
    next_position_id: u64,
    next_order_id: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // ── 余额 ────────────────────────────────────────────────────────────

    pub fn balance_of(&self, account: &Address, asset: &str) -> u128 {
        self.balances
            .get(&(account.clone(), asset.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn credit(&mut self, account: &Address, asset: &str, amount: u128) -> Result<(), AdapterError> {
        let entry = self
            .balances
            .entry((account.clone(), asset.to_string()))
            .or_insert(0);
        *entry = entry.checked_add(amount).ok_or(AdapterError::Overflow)?;
        Ok(())
    }

    pub fn debit(&mut self, account: &Address, asset: &str, amount: u128) -> Result<(), AdapterError> {
        let available = self.balance_of(account, asset);
        if available < amount {
            return Err(AdapterError::InsufficientBalance {
                asset: asset.to_string(),
                required: amount,
                available,
            });
        }
        self.balances
            .insert((account.clone(), asset.to_string()), available - amount);
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        asset: &str,
        amount: u128,
    ) -> Result<(), AdapterError> {
        self.debit(from, asset, amount)?;
        self.credit(to, asset, amount)
    }

    // ── 仓位 ────────────────────────────────────────────────────────────

    /// 直接登记一个已有仓位，不移动任何余额
    pub fn open_position(
        &mut self,
        owner: &Address,
        collateral_asset: &str,
        debt_asset: &str,
        collateral: u128,
        debt: u128,
        liquidation_ratio_bps: u128,
    ) -> u64 {
        self.next_position_id += 1;
        let id = self.next_position_id;
        self.positions.insert(
            id,
            Position {
                id,
                owner: owner.clone(),
                collateral_asset: collateral_asset.to_string(),
                debt_asset: debt_asset.to_string(),
                collateral,
                debt,
                liquidation_ratio_bps,
            },
        );
        id
    }

    pub fn position(&self, id: u64) -> Result<&Position, AdapterError> {
        self.positions
            .get(&id)
            .ok_or(AdapterError::PositionNotFound(id))
    }

    pub fn position_mut(&mut self, id: u64) -> Result<&mut Position, AdapterError> {
        self.positions
            .get_mut(&id)
            .ok_or(AdapterError::PositionNotFound(id))
    }

    /// 仓位抵押率(基点)，无债务时视为无穷大
    pub fn position_ratio(&self, id: u64, oracle: &dyn PriceOracle) -> Result<u128, AdapterError> {
        let position = self.position(id)?;
        Self::ratio_of(position, oracle)
    }

    pub fn ratio_of(position: &Position, oracle: &dyn PriceOracle) -> Result<u128, AdapterError> {
        if position.debt == 0 {
            return Ok(u128::MAX);
        }

        let collateral_price = oracle
            .price(&position.collateral_asset)
            .ok_or_else(|| AdapterError::PriceUnavailable(position.collateral_asset.clone()))?;
        let debt_price = oracle
            .price(&position.debt_asset)
            .ok_or_else(|| AdapterError::PriceUnavailable(position.debt_asset.clone()))?;

        let collateral_value = position
            .collateral
            .checked_mul(collateral_price)
            .ok_or(AdapterError::Overflow)?;
        let debt_value = position
            .debt
            .checked_mul(debt_price)
            .ok_or(AdapterError::Overflow)?;

        if debt_value == 0 {
            return Err(AdapterError::PriceUnavailable(position.debt_asset.clone()));
        }

        collateral_value
            .checked_mul(RATIO_BPS)
            .ok_or(AdapterError::Overflow)?
            .checked_div(debt_value)
            .ok_or_else(|| AdapterError::PriceUnavailable(position.debt_asset.clone()))
    }

    // ── 区间订单 ────────────────────────────────────────────────────────

    pub fn open_range_order(
        &mut self,
        owner: &Address,
        pool: &str,
        tick_lower: i32,
        tick_upper: i32,
    ) -> u64 {
        self.next_order_id += 1;
        let id = self.next_order_id;
        self.range_orders.insert(
            id,
            RangeOrder {
                id,
                owner: owner.clone(),
                pool: pool.to_string(),
                tick_lower,
                tick_upper,
            },
        );
        id
    }

    pub fn range_order(&self, id: u64) -> Option<&RangeOrder> {
        self.range_orders.get(&id)
    }

    // ── 兑换报价 ────────────────────────────────────────────────────────

    /// 设置兑换场所报价，覆盖预言机推导的价格
    pub fn set_swap_rate(&mut self, from: &str, to: &str, rate: u128) {
        self.swap_rates
            .insert((from.to_string(), to.to_string()), rate);
    }

    pub fn swap_rate(&self, from: &str, to: &str, oracle: &dyn PriceOracle) -> Result<u128, AdapterError> {
        if let Some(rate) = self.swap_rates.get(&(from.to_string(), to.to_string())) {
            return Ok(*rate);
        }

        let from_price = oracle
            .price(from)
            .ok_or_else(|| AdapterError::PriceUnavailable(from.to_string()))?;
        let to_price = oracle
            .price(to)
            .ok_or_else(|| AdapterError::PriceUnavailable(to.to_string()))?;
        if to_price == 0 {
            return Err(AdapterError::PriceUnavailable(to.to_string()));
        }

        from_price
            .checked_mul(PRICE_SCALE)
            .map(|scaled| scaled / to_price)
            .ok_or(AdapterError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::oracle::InMemoryOracle;

    #[test]
    fn test_transfer_moves_balance() {
        let mut ledger = Ledger::new();
        let alice = Address::from("alice");
        let bob = Address::from("bob");
        ledger.credit(&alice, "WETH", 100).unwrap();

        ledger.transfer(&alice, &bob, "WETH", 40).unwrap();
        assert_eq!(ledger.balance_of(&alice, "WETH"), 60);
        assert_eq!(ledger.balance_of(&bob, "WETH"), 40);

        let err = ledger.transfer(&alice, &bob, "WETH", 61).unwrap_err();
        assert!(matches!(err, AdapterError::InsufficientBalance { available: 60, .. }));
    }

    #[test]
    fn test_position_ratio() {
        let oracle = InMemoryOracle::new();
        oracle.push_price("WETH", 2 * PRICE_SCALE);
        oracle.push_price("DAI", PRICE_SCALE);

        let mut ledger = Ledger::new();
        let id = ledger.open_position(&Address::from("alice"), "WETH", "DAI", 850, 1000, 12_000);
        assert_eq!(ledger.position_ratio(id, &oracle).unwrap(), 17_000);

        ledger.position_mut(id).unwrap().debt = 0;
        assert_eq!(ledger.position_ratio(id, &oracle).unwrap(), u128::MAX);
    }

    #[test]
    fn test_zero_debt_price_is_unavailable() {
        let oracle = InMemoryOracle::new();
        oracle.push_price("WETH", 2 * PRICE_SCALE);
        oracle.push_price("DAI", 0);

        let mut ledger = Ledger::new();
        let id = ledger.open_position(&Address::from("alice"), "WETH", "DAI", 850, 1000, 12_000);
        assert_eq!(
            ledger.position_ratio(id, &oracle),
            Err(AdapterError::PriceUnavailable("DAI".to_string()))
        );
    }

    #[test]
    fn test_swap_rate_override() {
        let oracle = InMemoryOracle::new();
        oracle.push_price("WETH", 2 * PRICE_SCALE);
        oracle.push_price("DAI", PRICE_SCALE);

        let mut ledger = Ledger::new();
        assert_eq!(
            ledger.swap_rate("WETH", "DAI", &oracle).unwrap(),
            2 * PRICE_SCALE
        );
        ledger.set_swap_rate("WETH", "DAI", 3 * PRICE_SCALE);
        assert_eq!(
            ledger.swap_rate("WETH", "DAI", &oracle).unwrap(),
            3 * PRICE_SCALE
        );
    }
}
