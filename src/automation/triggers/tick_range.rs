use super::{params_mismatch, TriggerChecker, TriggerContext};
use crate::automation::domain::{PriceState, TriggerKind, TriggerParams};
use crate::core::error::AutomationResult;
use crate::core::types::Value;

/// 区间订单触发器
///
/// Over: 池子tick到达区间上沿及以上；Under: tick低于区间下沿。
pub struct TickRangeTrigger;

impl TriggerChecker for TickRangeTrigger {
    fn kinds(&self) -> Vec<TriggerKind> {
        vec![TriggerKind::TickRange]
    }

    fn check(
        &self,
        kind: TriggerKind,
        params: &TriggerParams,
        _evidence: &Value,
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<bool> {
        let TriggerParams::TickRange { order_id, state } = params else {
            return Err(params_mismatch(kind, params));
        };

        let Some(order) = ctx.ledger.range_order(*order_id) else {
            log::warn!("⚠️ 区间订单不存在: {}", order_id);
            return Ok(false);
        };
        let Some(tick) = ctx.oracle.current_tick(&order.pool) else {
            return Ok(false);
        };

        Ok(match state {
            PriceState::Over => tick >= order.tick_upper,
            PriceState::Under => tick < order.tick_lower,
        })
    }
}
