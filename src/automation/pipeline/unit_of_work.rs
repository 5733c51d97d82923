use crate::automation::domain::Ledger;
use crate::automation::subscription::{SubscriptionLog, SubscriptionStore};
use crate::automation::triggers::TriggerMemory;

/// 一次调用可能修改的全部状态
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub ledger: Ledger,
    pub subscriptions: SubscriptionStore,
    pub trigger_memory: TriggerMemory,
}

/// 引擎持有的存储: 可回滚的状态加上只追加的订阅事件日志
///
/// 执行单元只复制 `state`，日志在提交时追加本次调用产生的事件。
#[derive(Debug, Default)]
pub struct EngineStore {
    pub state: EngineState,
    pub log: SubscriptionLog,
}

impl EngineStore {
    /// 非执行路径上的直接修改完成后，把挂起的事件移入日志
    pub fn flush_events(&mut self) {
        let events = self.state.subscriptions.take_events();
        self.log.append(events);
    }
}

/// 执行单元: 在状态副本上完成全部修改，只有显式提交才写回
///
/// 未提交就被丢弃时，原状态和事件日志都保持调用前的样子。
pub struct UnitOfWork<'s> {
    target: &'s mut EngineStore,
    staged: EngineState,
}

impl<'s> UnitOfWork<'s> {
    pub fn begin(target: &'s mut EngineStore) -> Self {
        target.flush_events();
        let staged = target.state.clone();
        Self { target, staged }
    }

    pub fn state(&self) -> &EngineState {
        &self.staged
    }

    pub fn state_mut(&mut self) -> &mut EngineState {
        &mut self.staged
    }

    pub fn commit(mut self) {
        let events = self.staged.subscriptions.take_events();
        self.target.state = self.staged;
        self.target.log.append(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::domain::SubscriptionEvent;
    use crate::automation::subscription::test_support::setup;
    use crate::core::types::Address;

    #[test]
    fn test_dropped_unit_leaves_state_untouched() {
        let alice = Address::from("alice");
        let mut store = EngineStore::default();
        store.state.ledger.credit(&alice, "DAI", 10).unwrap();

        {
            let mut uow = UnitOfWork::begin(&mut store);
            uow.state_mut().ledger.credit(&alice, "DAI", 5).unwrap();
            assert_eq!(uow.state().ledger.balance_of(&alice, "DAI"), 15);
        }
        assert_eq!(store.state.ledger.balance_of(&alice, "DAI"), 10);

        let mut uow = UnitOfWork::begin(&mut store);
        uow.state_mut().trigger_memory.record_round(0, 3);
        uow.commit();
        assert_eq!(store.state.trigger_memory.last_round(0), Some(3));
    }

    #[test]
    fn test_log_stays_outside_staged_state() {
        let (registry, record) = setup();
        let alice = Address::from("alice");
        let mut store = EngineStore::default();
        let sub_id = store
            .state
            .subscriptions
            .subscribe(&alice, record, &registry)
            .unwrap();
        store.flush_events();
        assert_eq!(store.log.len(), 1);

        // 丢弃的执行单元不留下事件
        {
            let mut uow = UnitOfWork::begin(&mut store);
            assert!(uow.state().subscriptions.pending_events().is_empty());
            uow.state_mut().subscriptions.disable(sub_id).unwrap();
        }
        assert_eq!(store.log.len(), 1);
        assert!(store.state.subscriptions.get_sub(sub_id).unwrap().enabled);

        let mut uow = UnitOfWork::begin(&mut store);
        uow.state_mut().subscriptions.disable(sub_id).unwrap();
        uow.commit();
        assert_eq!(store.log.len(), 2);
        assert!(store.state.subscriptions.pending_events().is_empty());
        assert!(matches!(
            store.log.events().last(),
            Some(SubscriptionEvent::Disabled { .. })
        ));
    }
}
