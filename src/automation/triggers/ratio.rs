use super::{params_mismatch, TriggerChecker, TriggerContext};
use crate::automation::domain::{TriggerKind, TriggerParams};
use crate::core::error::AutomationResult;
use crate::core::types::Value;

/// 仓位抵押率触发器
///
/// RatioUnder: 当前抵押率严格低于阈值(repay)；RatioOver: 严格高于阈值(boost)。
pub struct RatioTrigger;

impl TriggerChecker for RatioTrigger {
    fn kinds(&self) -> Vec<TriggerKind> {
        vec![TriggerKind::RatioUnder, TriggerKind::RatioOver]
    }

    fn check(
        &self,
        kind: TriggerKind,
        params: &TriggerParams,
        _evidence: &Value,
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<bool> {
        let TriggerParams::Ratio {
            position,
            ratio_bps,
        } = params
        else {
            return Err(params_mismatch(kind, params));
        };

        let current = match ctx.ledger.position_ratio(*position, ctx.oracle) {
            Ok(ratio) => ratio,
            Err(e) => {
                log::warn!("⚠️ 读取仓位 {} 抵押率失败: {}", position, e);
                return Ok(false);
            }
        };

        Ok(match kind {
            TriggerKind::RatioUnder => current < *ratio_bps,
            _ => current > *ratio_bps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::triggers::test_support::Harness;
    use crate::core::types::{Address, PRICE_SCALE};

    #[test]
    fn test_ratio_thresholds_are_strict() {
        let mut h = Harness::new();
        h.oracle.push_price("WETH", 2 * PRICE_SCALE);
        h.oracle.push_price("DAI", PRICE_SCALE);
        let position = h
            .ledger
            .open_position(&Address::from("alice"), "WETH", "DAI", 850, 1_000, 12_000);

        let at = |ratio_bps| TriggerParams::Ratio {
            position,
            ratio_bps,
        };
        // 当前 170%
        assert!(h.check(&RatioTrigger, TriggerKind::RatioUnder, &at(18_000), Value::Uint(0)).unwrap());
        assert!(!h.check(&RatioTrigger, TriggerKind::RatioUnder, &at(17_000), Value::Uint(0)).unwrap());
        assert!(h.check(&RatioTrigger, TriggerKind::RatioOver, &at(16_000), Value::Uint(0)).unwrap());
        assert!(!h.check(&RatioTrigger, TriggerKind::RatioOver, &at(17_000), Value::Uint(0)).unwrap());
    }

    #[test]
    fn test_missing_position_fails_closed() {
        let mut h = Harness::new();
        let params = TriggerParams::Ratio {
            position: 42,
            ratio_bps: 18_000,
        };
        assert!(!h.check(&RatioTrigger, TriggerKind::RatioUnder, &params, Value::Uint(0)).unwrap());

        let wrong = TriggerParams::GasPrice { max_gas_price: 1 };
        assert!(h.check(&RatioTrigger, TriggerKind::RatioUnder, &wrong, Value::Uint(0)).is_err());
    }
}
