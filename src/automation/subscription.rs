//! 订阅存储
//!
//! 只持久化 `{owner, enabled, digest}`，完整的订阅数据由调用方保存并在执行时重新提交，
//! 通过摘要校验发现篡改或过期数据。每次变更都会产生一条带完整数据的事件，
//! 事件先挂在存储上，提交后移入只追加的 [`SubscriptionLog`]。

use crate::automation::domain::{
    StoredSubscription, SubId, SubscriptionEvent, SubscriptionRecord, TriggerParams,
};
use crate::automation::registry::StrategyRegistry;
use crate::core::error::{AutomationError, AutomationResult};
use crate::core::types::Address;

#[derive(Debug, Clone, Default)]
pub struct SubscriptionStore {
    subs: Vec<StoredSubscription>,
    /// 尚未提交到日志的事件
    pending: Vec<SubscriptionEvent>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按目标的参数槽结构和触发器校验订阅数据
    ///
    /// 策略组的每个成员都必须能接受同一份触发器参数。
    pub fn validate_record(
        record: &SubscriptionRecord,
        registry: &StrategyRegistry,
    ) -> AutomationResult<()> {
        let candidates = registry.candidates(record.target_id, record.is_bundle)?;
        for template in candidates {
            if record.slot_values.len() != template.slots.len() {
                return Err(AutomationError::InvalidSubscription(format!(
                    "策略 #{} 需要 {} 个参数槽, 提供 {}",
                    template.id,
                    template.slots.len(),
                    record.slot_values.len()
                )));
            }
            for (slot, value) in template.slots.iter().zip(&record.slot_values) {
                if value.slot_type() != slot.slot_type {
                    return Err(AutomationError::InvalidSubscription(format!(
                        "参数槽 {} 应为 {}, 实际 {}",
                        slot.name,
                        slot.slot_type,
                        value.slot_type()
                    )));
                }
            }

            if record.trigger_params.len() != template.triggers.len() {
                return Err(AutomationError::InvalidSubscription(format!(
                    "策略 #{} 需要 {} 组触发器参数, 提供 {}",
                    template.id,
                    template.triggers.len(),
                    record.trigger_params.len()
                )));
            }
            for (trigger, params) in template.triggers.iter().zip(&record.trigger_params) {
                if !params.fits(trigger.kind) {
                    return Err(AutomationError::InvalidSubscription(format!(
                        "触发器 {} 的参数类型不匹配",
                        trigger.kind
                    )));
                }
            }
        }
        Ok(())
    }

    fn stored(&self, sub_id: SubId) -> AutomationResult<&StoredSubscription> {
        usize::try_from(sub_id)
            .ok()
            .and_then(|index| self.subs.get(index))
            .ok_or(AutomationError::SubNotFound(sub_id))
    }

    fn stored_mut(&mut self, sub_id: SubId) -> AutomationResult<&mut StoredSubscription> {
        usize::try_from(sub_id)
            .ok()
            .and_then(|index| self.subs.get_mut(index))
            .ok_or(AutomationError::SubNotFound(sub_id))
    }

    fn owned_mut(
        &mut self,
        caller: &Address,
        sub_id: SubId,
    ) -> AutomationResult<&mut StoredSubscription> {
        let stored = self.stored_mut(sub_id)?;
        if &stored.owner != caller {
            return Err(AutomationError::SenderNotSubOwner {
                sub_id,
                caller: caller.clone(),
            });
        }
        Ok(stored)
    }

    /// 创建订阅，调用者成为所有者
    pub fn subscribe(
        &mut self,
        owner: &Address,
        record: SubscriptionRecord,
        registry: &StrategyRegistry,
    ) -> AutomationResult<SubId> {
        Self::validate_record(&record, registry)?;

        let sub_id = self.subs.len() as SubId;
        self.subs.push(StoredSubscription {
            owner: owner.clone(),
            enabled: true,
            digest: record.digest()?,
        });
        log::info!(
            "✅ 新订阅 #{}: 所有者 {} 目标 {}#{}",
            sub_id,
            owner,
            if record.is_bundle { "策略组" } else { "策略" },
            record.target_id
        );
        self.pending.push(SubscriptionEvent::Subscribed {
            sub_id,
            owner: owner.clone(),
            record,
        });
        Ok(sub_id)
    }

    /// 所有者整体替换订阅数据，所有者本身不可变
    pub fn update_sub_data(
        &mut self,
        caller: &Address,
        sub_id: SubId,
        record: SubscriptionRecord,
        registry: &StrategyRegistry,
    ) -> AutomationResult<()> {
        self.owned_mut(caller, sub_id)?;
        Self::validate_record(&record, registry)?;
        self.store_record(sub_id, record)
    }

    /// 所有者修改触发器参数，需要提交当前完整数据
    pub fn update_trigger_data(
        &mut self,
        caller: &Address,
        sub_id: SubId,
        current: &SubscriptionRecord,
        trigger_params: Vec<TriggerParams>,
        registry: &StrategyRegistry,
    ) -> AutomationResult<SubscriptionRecord> {
        self.owned_mut(caller, sub_id)?;
        if !self.verify(sub_id, current)? {
            return Err(AutomationError::SubDigestMismatch(sub_id));
        }

        let record = current.with_trigger_params(trigger_params);
        Self::validate_record(&record, registry)?;
        self.store_record(sub_id, record.clone())?;
        Ok(record)
    }

    /// 执行成功后由引擎重新布防，不做所有者检查
    pub(crate) fn rearm(&mut self, sub_id: SubId, record: SubscriptionRecord) -> AutomationResult<()> {
        self.store_record(sub_id, record)
    }

    fn store_record(&mut self, sub_id: SubId, record: SubscriptionRecord) -> AutomationResult<()> {
        let digest = record.digest()?;
        self.stored_mut(sub_id)?.digest = digest;
        self.pending.push(SubscriptionEvent::Updated { sub_id, record });
        Ok(())
    }

    pub fn set_enabled(&mut self, caller: &Address, sub_id: SubId, enabled: bool) -> AutomationResult<()> {
        self.owned_mut(caller, sub_id)?;
        self.apply_enabled(sub_id, enabled)
    }

    pub fn activate_sub(&mut self, caller: &Address, sub_id: SubId) -> AutomationResult<()> {
        self.set_enabled(caller, sub_id, true)
    }

    pub fn deactivate_sub(&mut self, caller: &Address, sub_id: SubId) -> AutomationResult<()> {
        self.set_enabled(caller, sub_id, false)
    }

    /// 一次性订阅执行成功后由引擎停用
    pub(crate) fn disable(&mut self, sub_id: SubId) -> AutomationResult<()> {
        self.apply_enabled(sub_id, false)
    }

    fn apply_enabled(&mut self, sub_id: SubId, enabled: bool) -> AutomationResult<()> {
        self.stored_mut(sub_id)?.enabled = enabled;
        let event = if enabled {
            SubscriptionEvent::Enabled { sub_id }
        } else {
            SubscriptionEvent::Disabled { sub_id }
        };
        log::info!("订阅 #{} 已{}", sub_id, if enabled { "启用" } else { "停用" });
        self.pending.push(event);
        Ok(())
    }

    /// 校验提交的订阅数据与存储的摘要一致
    pub fn verify(&self, sub_id: SubId, record: &SubscriptionRecord) -> AutomationResult<bool> {
        let stored = self.stored(sub_id)?;
        Ok(stored.digest == record.digest()?)
    }

    /// 执行前检查: 摘要一致且订阅已启用
    pub fn check_executable(
        &self,
        sub_id: SubId,
        record: &SubscriptionRecord,
    ) -> AutomationResult<StoredSubscription> {
        if !self.verify(sub_id, record)? {
            return Err(AutomationError::SubDigestMismatch(sub_id));
        }
        let stored = self.stored(sub_id)?;
        if !stored.enabled {
            return Err(AutomationError::SubNotEnabled(sub_id));
        }
        Ok(stored.clone())
    }

    pub fn get_sub(&self, sub_id: SubId) -> AutomationResult<StoredSubscription> {
        self.stored(sub_id).cloned()
    }

    pub fn subs_count(&self) -> usize {
        self.subs.len()
    }

    pub fn pending_events(&self) -> &[SubscriptionEvent] {
        &self.pending
    }

    /// 取走尚未提交的事件
    pub fn take_events(&mut self) -> Vec<SubscriptionEvent> {
        std::mem::take(&mut self.pending)
    }
}

/// 订阅事件日志，只追加
///
/// 不参与执行时的状态快照，长度只随已提交的变更增长。
#[derive(Debug, Clone, Default)]
pub struct SubscriptionLog {
    events: Vec<SubscriptionEvent>,
}

impl SubscriptionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, events: Vec<SubscriptionEvent>) {
        self.events.extend(events);
    }

    pub fn events(&self) -> &[SubscriptionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn for_sub(&self, sub_id: SubId) -> Vec<SubscriptionEvent> {
        self.events
            .iter()
            .filter(|event| event.sub_id() == sub_id)
            .cloned()
            .collect()
    }

    /// 从事件日志中恢复最新的完整订阅数据
    pub fn latest_record(&self, sub_id: SubId) -> Option<SubscriptionRecord> {
        self.events
            .iter()
            .rev()
            .filter(|event| event.sub_id() == sub_id)
            .find_map(|event| match event {
                SubscriptionEvent::Subscribed { record, .. }
                | SubscriptionEvent::Updated { record, .. } => Some(record.clone()),
                _ => None,
            })
    }
}
