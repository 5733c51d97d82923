use super::{params_mismatch, TriggerChecker, TriggerContext};
use crate::automation::domain::{TriggerKind, TriggerParams};
use crate::core::error::AutomationResult;
use crate::core::types::Value;

/// 定时触发器: now >= last_timestamp + interval
///
/// 执行成功后 last_timestamp 前进整一个周期，而不是重置为当前时间。
pub struct TimestampTrigger;

impl TriggerChecker for TimestampTrigger {
    fn kinds(&self) -> Vec<TriggerKind> {
        vec![TriggerKind::Timestamp]
    }

    fn check(
        &self,
        kind: TriggerKind,
        params: &TriggerParams,
        _evidence: &Value,
        ctx: &mut TriggerContext<'_>,
    ) -> AutomationResult<bool> {
        let TriggerParams::Timestamp {
            last_timestamp,
            interval_secs,
        } = params
        else {
            return Err(params_mismatch(kind, params));
        };

        let Some(due) = last_timestamp.checked_add(*interval_secs) else {
            return Ok(false);
        };
        Ok(ctx.env.timestamp() >= due)
    }

    fn next_params(&self, params: &TriggerParams) -> Option<TriggerParams> {
        match params {
            TriggerParams::Timestamp {
                last_timestamp,
                interval_secs,
            } => Some(TriggerParams::Timestamp {
                last_timestamp: last_timestamp.saturating_add(*interval_secs),
                interval_secs: *interval_secs,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::triggers::test_support::Harness;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_due_after_interval() {
        let mut h = Harness::new();
        h.env.now = Utc.timestamp_opt(1_100, 0).unwrap();
        let kind = TriggerKind::Timestamp;

        let params = TriggerParams::Timestamp {
            last_timestamp: 1_000,
            interval_secs: 100,
        };
        assert!(h.check(&TimestampTrigger, kind, &params, Value::Uint(0)).unwrap());

        let next = TimestampTrigger.next_params(&params).unwrap();
        assert!(!h.check(&TimestampTrigger, kind, &next, Value::Uint(0)).unwrap());

        h.env.now = Utc.timestamp_opt(1_200, 0).unwrap();
        assert!(h.check(&TimestampTrigger, kind, &next, Value::Uint(0)).unwrap());
    }
}
