use super::{params_mismatch, TriggerChecker, TriggerContext};
use crate::automation::domain::{TriggerKind, TriggerParams};
use crate::core::error::AutomationResult;
use crate::core::types::Value;

/// 当前gas价格不超过上限时满足
pub struct GasPriceTrigger;

impl TriggerChecker for GasPriceTrigger {
    fn kinds(&self) -> Vec<TriggerKind> {
        vec![TriggerKind::GasPrice]
    }

    fn check(
        &self,
        kind: TriggerKind,
        params: &TriggerParams,
        _evidence: &Value,
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<bool> {
        match params {
            TriggerParams::GasPrice { max_gas_price } => Ok(ctx.env.gas_price <= *max_gas_price),
            _ => Err(params_mismatch(kind, params)),
        }
    }
}
