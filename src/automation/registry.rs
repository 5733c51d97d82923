//! 策略与策略组注册表
//!
//! 模板在注册时完成全部结构校验，之后只读：
//! 管道引用只能指向更早的动作，参数槽名称唯一，动作类型和参数个数与动作注册表一致。

use std::collections::HashSet;
use std::sync::Arc;

use crate::automation::adapters::ActionRegistry;
use crate::automation::domain::{
    Bundle, BundleId, SlotDef, StrategyDraft, StrategyId, StrategyTemplate,
};
use crate::automation::pipeline::validate_actions;
use crate::automation::triggers::TriggerEvaluator;
use crate::core::config::RegistryConfig;
use crate::core::error::{AutomationError, AutomationResult};
use crate::core::types::Address;

pub struct StrategyRegistry {
    owner: Address,
    open_to_public: bool,
    strategies: Vec<Arc<StrategyTemplate>>,
    bundles: Vec<Bundle>,
}

impl StrategyRegistry {
    pub fn new(owner: Address, config: &RegistryConfig) -> Self {
        Self {
            owner,
            open_to_public: config.open_to_public,
            strategies: Vec::new(),
            bundles: Vec::new(),
        }
    }

    fn check_edit_permission(&self, caller: &Address, what: &str) -> AutomationResult<()> {
        if self.open_to_public || caller == &self.owner {
            Ok(())
        } else {
            Err(AutomationError::NoAuthToCreate(what.to_string()))
        }
    }

    /// 切换是否允许任何人创建策略，仅管理员可调用
    pub fn change_edit_permission(&mut self, caller: &Address, open: bool) -> AutomationResult<()> {
        if caller != &self.owner {
            return Err(AutomationError::SenderNotOwner {
                caller: caller.clone(),
            });
        }
        self.open_to_public = open;
        log::info!("策略注册权限已变更: open_to_public={}", open);
        Ok(())
    }

    pub fn is_open_to_public(&self) -> bool {
        self.open_to_public
    }

    /// 注册策略模板，返回新的策略ID
    pub fn create_strategy(
        &mut self,
        caller: &Address,
        draft: StrategyDraft,
        actions: &ActionRegistry,
        triggers: &TriggerEvaluator,
    ) -> AutomationResult<StrategyId> {
        self.check_edit_permission(caller, "策略")?;
        validate_draft(&draft, actions, triggers)?;

        let id = self.strategies.len() as StrategyId;
        let template = StrategyTemplate::from_draft(id, caller.clone(), draft);
        log::info!(
            "✅ 策略已注册: #{} {} ({}个触发器, {}个动作)",
            id,
            template.name,
            template.triggers.len(),
            template.actions.len()
        );
        self.strategies.push(Arc::new(template));
        Ok(id)
    }

    /// 注册策略组，所有成员的参数槽结构必须完全一致
    pub fn create_bundle(
        &mut self,
        caller: &Address,
        strategy_ids: Vec<StrategyId>,
    ) -> AutomationResult<BundleId> {
        self.check_edit_permission(caller, "策略组")?;

        let Some(first_id) = strategy_ids.first() else {
            return Err(AutomationError::SchemaMismatch("策略组不能为空".to_string()));
        };
        let first = self.strategy(*first_id)?;
        for id in &strategy_ids[1..] {
            let member = self.strategy(*id)?;
            if member.slots != first.slots {
                return Err(AutomationError::SchemaMismatch(format!(
                    "策略 #{} 与策略 #{} 的参数槽不一致",
                    id, first_id
                )));
            }
        }

        let id = self.bundles.len() as BundleId;
        log::info!("✅ 策略组已注册: #{} 成员 {:?}", id, strategy_ids);
        self.bundles.push(Bundle {
            id,
            creator: caller.clone(),
            strategy_ids,
        });
        Ok(id)
    }

    pub fn strategy(&self, id: StrategyId) -> AutomationResult<Arc<StrategyTemplate>> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.strategies.get(index))
            .cloned()
            .ok_or(AutomationError::UnknownStrategy(id))
    }

    pub fn bundle(&self, id: BundleId) -> AutomationResult<Bundle> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.bundles.get(index))
            .cloned()
            .ok_or(AutomationError::UnknownBundle(id))
    }

    /// 策略组中第index个成员的策略ID
    pub fn strategy_id(&self, bundle_id: BundleId, index: usize) -> AutomationResult<StrategyId> {
        let bundle = self.bundle(bundle_id)?;
        bundle
            .strategy_ids
            .get(index)
            .copied()
            .ok_or(AutomationError::InvalidStrategyIndex {
                target_id: bundle_id,
                index,
            })
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }

    pub fn paginated_strategies(&self, page: usize, per_page: usize) -> Vec<Arc<StrategyTemplate>> {
        page_of(&self.strategies, page, per_page).to_vec()
    }

    pub fn paginated_bundles(&self, page: usize, per_page: usize) -> Vec<Bundle> {
        page_of(&self.bundles, page, per_page).to_vec()
    }

    /// 订阅目标的全部候选策略；单个策略只有它自己
    pub fn candidates(
        &self,
        target_id: u64,
        is_bundle: bool,
    ) -> AutomationResult<Vec<Arc<StrategyTemplate>>> {
        if is_bundle {
            self.bundle(target_id)?
                .strategy_ids
                .iter()
                .map(|id| self.strategy(*id))
                .collect()
        } else {
            Ok(vec![self.strategy(target_id)?])
        }
    }

    /// 解析执行时选择的策略，非策略组只接受索引0
    pub fn resolve(
        &self,
        target_id: u64,
        is_bundle: bool,
        index: usize,
    ) -> AutomationResult<Arc<StrategyTemplate>> {
        if is_bundle {
            let id = self.strategy_id(target_id, index)?;
            self.strategy(id)
        } else if index != 0 {
            Err(AutomationError::InvalidStrategyIndex { target_id, index })
        } else {
            self.strategy(target_id)
        }
    }
}

fn page_of<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    let start = page.saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}

fn validate_slots(slots: &[SlotDef]) -> AutomationResult<()> {
    let mut names = HashSet::new();
    for slot in slots {
        if slot.name.trim().is_empty() {
            return Err(AutomationError::SchemaError("参数槽名称不能为空".to_string()));
        }
        if !names.insert(slot.name.as_str()) {
            return Err(AutomationError::SchemaError(format!(
                "参数槽名称重复: {}",
                slot.name
            )));
        }
    }
    Ok(())
}

fn validate_draft(
    draft: &StrategyDraft,
    actions: &ActionRegistry,
    triggers: &TriggerEvaluator,
) -> AutomationResult<()> {
    validate_slots(&draft.slots)?;

    for trigger in &draft.triggers {
        if !triggers.supports(trigger.kind) {
            return Err(AutomationError::SchemaError(format!(
                "不支持的触发器类型: {}",
                trigger.kind
            )));
        }
    }

    validate_actions(&draft.name, &draft.actions, draft.slots.len(), actions)
}
