//! 追踪止损触发器
//!
//! 机器人提交峰值价格所在的轮次ID作为证据。轮次必须存在、不早于订阅的起始轮次，
//! 并且严格大于该订阅上一次通过校验的轮次，防止用过期的有利读数重放。
//! 当最新价格回撤到峰值的 (1 - percentage) 以下时满足。

use super::{params_mismatch, TriggerChecker, TriggerContext};
use crate::automation::domain::{TriggerKind, TriggerParams};
use crate::core::error::AutomationResult;
use crate::core::types::{Value, RATIO_BPS};

pub struct TrailingStopTrigger;

impl TriggerChecker for TrailingStopTrigger {
    fn kinds(&self) -> Vec<TriggerKind> {
        vec![TriggerKind::TrailingStop]
    }

    fn check(
        &self,
        kind: TriggerKind,
        params: &TriggerParams,
        evidence: &Value,
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<bool> {
        let TriggerParams::TrailingStop {
            asset,
            percentage_bps,
            start_round,
        } = params
        else {
            return Err(params_mismatch(kind, params));
        };

        let round_id = match evidence.as_uint().map(u64::try_from) {
            Some(Ok(id)) if id > 0 => id,
            _ => return Ok(false),
        };
        if round_id < *start_round {
            return Ok(false);
        }
        if let Some(last) = ctx.memory.last_round(ctx.sub_id) {
            if round_id <= last {
                log::warn!(
                    "⚠️ 订阅 {} 提交的轮次 {} 不大于上次校验的轮次 {}",
                    ctx.sub_id,
                    round_id,
                    last
                );
                return Ok(false);
            }
        }

        let (Some(peak), Some(latest)) = (
            ctx.oracle.round(asset, round_id),
            ctx.oracle.latest_round(asset),
        ) else {
            return Ok(false);
        };

        let Some(stop_price) = RATIO_BPS
            .checked_sub(*percentage_bps)
            .and_then(|keep| peak.price.checked_mul(keep))
            .map(|scaled| scaled / RATIO_BPS)
        else {
            return Ok(false);
        };

        if latest.price > stop_price {
            return Ok(false);
        }

        ctx.memory.record_round(ctx.sub_id, round_id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::triggers::test_support::Harness;

    fn stop(start_round: u64) -> TriggerParams {
        TriggerParams::TrailingStop {
            asset: "WETH".to_string(),
            percentage_bps: 1_000,
            start_round,
        }
    }

    #[test]
    fn test_trailing_stop_after_drawdown() {
        let mut h = Harness::new();
        let kind = TriggerKind::TrailingStop;
        h.oracle.push_price("WETH", 1_000);
        let peak = h.oracle.push_price("WETH", 2_000);
        h.oracle.push_price("WETH", 1_850);

        // 回撤 7.5%，不足 10%
        assert!(!h.check(&TrailingStopTrigger, kind, &stop(1), Value::Uint(peak as u128)).unwrap());

        h.oracle.push_price("WETH", 1_800);
        assert!(h.check(&TrailingStopTrigger, kind, &stop(1), Value::Uint(peak as u128)).unwrap());
        assert_eq!(h.memory.last_round(h.sub_id), Some(peak));
    }

    #[test]
    fn test_stale_or_invalid_rounds_are_rejected() {
        let mut h = Harness::new();
        let kind = TriggerKind::TrailingStop;
        let peak = h.oracle.push_price("WETH", 2_000);
        h.oracle.push_price("WETH", 1_000);

        assert!(!h.check(&TrailingStopTrigger, kind, &stop(1), Value::Uint(0)).unwrap());
        assert!(!h.check(&TrailingStopTrigger, kind, &stop(2), Value::Uint(peak as u128)).unwrap());
        assert!(!h.check(&TrailingStopTrigger, kind, &stop(1), Value::Uint(9)).unwrap());

        h.memory.record_round(h.sub_id, peak);
        assert!(!h.check(&TrailingStopTrigger, kind, &stop(1), Value::Uint(peak as u128)).unwrap());
    }
}
