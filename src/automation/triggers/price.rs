use super::{params_mismatch, TriggerChecker, TriggerContext};
use crate::automation::domain::{OrderType, PriceState, TriggerKind, TriggerParams};
use crate::core::error::AutomationResult;
use crate::core::types::Value;

/// 预言机价格阈值触发器，Over/Under 均为严格比较
pub struct PriceThresholdTrigger;

impl TriggerChecker for PriceThresholdTrigger {
    fn kinds(&self) -> Vec<TriggerKind> {
        vec![TriggerKind::PriceThreshold]
    }

    fn check(
        &self,
        kind: TriggerKind,
        params: &TriggerParams,
        _evidence: &Value,
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<bool> {
        let TriggerParams::Price {
            asset,
            price,
            state,
        } = params
        else {
            return Err(params_mismatch(kind, params));
        };

        let Some(current) = ctx.oracle.price(asset) else {
            log::warn!("⚠️ {} 无可用价格", asset);
            return Ok(false);
        };

        Ok(match state {
            PriceState::Over => current > *price,
            PriceState::Under => current < *price,
        })
    }
}

/// 链下限价单触发器
///
/// 证据为机器人提交的链下价格；订单过期后永不满足。
/// Buy: 价格不高于目标；Sell: 价格不低于目标。
pub struct OffchainPriceTrigger;

impl TriggerChecker for OffchainPriceTrigger {
    fn kinds(&self) -> Vec<TriggerKind> {
        vec![TriggerKind::OffchainPrice]
    }

    fn check(
        &self,
        kind: TriggerKind,
        params: &TriggerParams,
        evidence: &Value,
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<bool> {
        let TriggerParams::OffchainPrice {
            target_price,
            good_until,
            order_type,
        } = params
        else {
            return Err(params_mismatch(kind, params));
        };

        if ctx.env.timestamp() > *good_until {
            log::debug!("订阅 {} 限价单已过期", ctx.sub_id);
            return Ok(false);
        }

        let Some(price) = evidence.as_uint().filter(|p| *p > 0) else {
            return Ok(false);
        };

        Ok(match order_type {
            OrderType::Buy => price <= *target_price,
            OrderType::Sell => price >= *target_price,
        })
    }
}
