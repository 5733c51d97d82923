//! 自动化执行引擎
//!
//! 执行入口的检查顺序固定：机器人白名单 → 订阅摘要与启用状态 → 策略选择 → 全部触发器 → 动作管线。
//! 管线和订阅状态的更新在同一个执行单元中完成，任何一步失败都不会留下部分效果。

use std::sync::{Arc, Mutex, RwLock};

use log::Level;
use serde::Serialize;

use crate::automation::adapters::ActionRegistry;
use crate::automation::bot_auth::BotAuth;
use crate::automation::domain::{
    Bundle, BundleId, Ledger, StoredSubscription, StrategyDraft, StrategyId, StrategyTemplate,
    SubId, SubscriptionEvent, SubscriptionRecord, TriggerParams,
};
use crate::automation::oracle::{InMemoryOracle, PriceOracle};
use crate::automation::pipeline::{
    validate_actions, EngineStore, ParamResolver, Recipe, RecipeExecutor, UnitOfWork,
};
use crate::automation::registry::StrategyRegistry;
use crate::automation::subscription::SubscriptionStore;
use crate::automation::triggers::{TriggerContext, TriggerEvaluator};
use crate::core::config::EngineConfig;
use crate::core::error::{AutomationResult, ErrorCategory, ErrorSeverity};
use crate::core::types::{Address, ExecutionEnv, Value};
use crate::utils::unified_logger::AuditLogger;

/// 机器人提交的执行请求
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    pub sub_id: SubId,
    /// 策略组中选择的成员，单个策略固定为0
    pub strategy_index: usize,
    pub trigger_evidence: Vec<Value>,
    /// 按步骤、按参数位置提供的字面量
    pub action_params: Vec<Vec<Value>>,
    pub record: SubscriptionRecord,
}

impl ExecuteRequest {
    pub fn new(sub_id: SubId, record: SubscriptionRecord) -> Self {
        Self {
            sub_id,
            strategy_index: 0,
            trigger_evidence: Vec::new(),
            action_params: Vec::new(),
            record,
        }
    }

    pub fn with_strategy_index(mut self, index: usize) -> Self {
        self.strategy_index = index;
        self
    }

    pub fn with_trigger_evidence(mut self, evidence: Vec<Value>) -> Self {
        self.trigger_evidence = evidence;
        self
    }

    pub fn with_action_params(mut self, params: Vec<Vec<Value>>) -> Self {
        self.action_params = params;
        self
    }
}

/// 执行成功的回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReceipt {
    pub sub_id: SubId,
    pub strategy_id: StrategyId,
    pub outputs: Vec<Value>,
    /// 下次执行需要提交的订阅数据(持续型订阅可能已重新布防)
    pub record: SubscriptionRecord,
    pub disabled: bool,
}

pub struct AutomationEngine {
    config: EngineConfig,
    registry: RwLock<StrategyRegistry>,
    bot_auth: RwLock<BotAuth>,
    triggers: TriggerEvaluator,
    pipeline: RecipeExecutor,
    oracle: Arc<dyn PriceOracle>,
    state: Mutex<EngineStore>,
    audit: Option<Arc<AuditLogger>>,
}

/// 构建引擎的辅助结构
pub struct AutomationEngineBuilder {
    config: EngineConfig,
    oracle: Option<Arc<dyn PriceOracle>>,
    actions: Option<ActionRegistry>,
    triggers: Option<TriggerEvaluator>,
    audit: Option<Arc<AuditLogger>>,
}

impl AutomationEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            oracle: None,
            actions: None,
            triggers: None,
            audit: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn PriceOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_action_registry(mut self, actions: ActionRegistry) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn with_trigger_evaluator(mut self, triggers: TriggerEvaluator) -> Self {
        self.triggers = Some(triggers);
        self
    }

    pub fn with_audit_logger(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn build(self) -> AutomationResult<AutomationEngine> {
        self.config.validate()?;

        let audit = match self.audit {
            Some(audit) => Some(audit),
            None if self.config.logging.audit => {
                Some(Arc::new(AuditLogger::new(self.config.logging.clone())?))
            }
            None => None,
        };
        let oracle: Arc<dyn PriceOracle> = match self.oracle {
            Some(oracle) => oracle,
            None => Arc::new(InMemoryOracle::new()),
        };
        let pipeline = RecipeExecutor::new(
            self.actions.unwrap_or_default(),
            self.config.flash_loan.clone(),
        );

        log::info!(
            "🚀 自动化引擎初始化: 管理员 {} 白名单机器人 {} 个",
            self.config.owner,
            self.config.bots.len()
        );

        Ok(AutomationEngine {
            registry: RwLock::new(StrategyRegistry::new(
                self.config.owner.clone(),
                &self.config.registry,
            )),
            bot_auth: RwLock::new(BotAuth::new(self.config.owner.clone(), &self.config.bots)),
            triggers: self.triggers.unwrap_or_default(),
            pipeline,
            oracle,
            state: Mutex::new(EngineStore::default()),
            audit,
            config: self.config,
        })
    }
}

impl AutomationEngine {
    pub fn builder(config: EngineConfig) -> AutomationEngineBuilder {
        AutomationEngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn oracle(&self) -> Arc<dyn PriceOracle> {
        self.oracle.clone()
    }

    // ── 注册表 ──────────────────────────────────────────────────────────

    pub fn create_strategy(&self, caller: &Address, draft: StrategyDraft) -> AutomationResult<StrategyId> {
        crate::safe_write!(self.registry)?.create_strategy(
            caller,
            draft,
            self.pipeline.actions(),
            &self.triggers,
        )
    }

    pub fn create_bundle(
        &self,
        caller: &Address,
        strategy_ids: Vec<StrategyId>,
    ) -> AutomationResult<BundleId> {
        crate::safe_write!(self.registry)?.create_bundle(caller, strategy_ids)
    }

    pub fn change_edit_permission(&self, caller: &Address, open: bool) -> AutomationResult<()> {
        crate::safe_write!(self.registry)?.change_edit_permission(caller, open)
    }

    pub fn strategy(&self, id: StrategyId) -> AutomationResult<Arc<StrategyTemplate>> {
        crate::safe_read!(self.registry)?.strategy(id)
    }

    pub fn bundle(&self, id: BundleId) -> AutomationResult<Bundle> {
        crate::safe_read!(self.registry)?.bundle(id)
    }

    pub fn with_registry<R>(&self, f: impl FnOnce(&StrategyRegistry) -> R) -> AutomationResult<R> {
        let registry = crate::safe_read!(self.registry)?;
        Ok(f(&registry))
    }

    // ── 订阅 ────────────────────────────────────────────────────────────

    /// 在订阅存储上完成一次直接修改，成功产生的事件随即写入日志
    fn with_subscriptions<R>(
        &self,
        f: impl FnOnce(&mut SubscriptionStore, &StrategyRegistry) -> AutomationResult<R>,
    ) -> AutomationResult<R> {
        let mut store = crate::safe_lock!(self.state)?;
        let registry = crate::safe_read!(self.registry)?;
        let result = f(&mut store.state.subscriptions, &*registry);
        store.flush_events();
        result
    }

    pub fn subscribe(&self, caller: &Address, record: SubscriptionRecord) -> AutomationResult<SubId> {
        self.with_subscriptions(|subs, registry| subs.subscribe(caller, record, registry))
    }

    pub fn update_sub_data(
        &self,
        caller: &Address,
        sub_id: SubId,
        record: SubscriptionRecord,
    ) -> AutomationResult<()> {
        self.with_subscriptions(|subs, registry| {
            subs.update_sub_data(caller, sub_id, record, registry)
        })
    }

    pub fn update_trigger_data(
        &self,
        caller: &Address,
        sub_id: SubId,
        current: &SubscriptionRecord,
        trigger_params: Vec<TriggerParams>,
    ) -> AutomationResult<SubscriptionRecord> {
        self.with_subscriptions(|subs, registry| {
            subs.update_trigger_data(caller, sub_id, current, trigger_params, registry)
        })
    }

    pub fn activate_sub(&self, caller: &Address, sub_id: SubId) -> AutomationResult<()> {
        self.with_subscriptions(|subs, _| subs.activate_sub(caller, sub_id))
    }

    pub fn deactivate_sub(&self, caller: &Address, sub_id: SubId) -> AutomationResult<()> {
        self.with_subscriptions(|subs, _| subs.deactivate_sub(caller, sub_id))
    }

    pub fn get_sub(&self, sub_id: SubId) -> AutomationResult<StoredSubscription> {
        crate::safe_lock!(self.state)?.state.subscriptions.get_sub(sub_id)
    }

    pub fn verify_sub(&self, sub_id: SubId, record: &SubscriptionRecord) -> AutomationResult<bool> {
        crate::safe_lock!(self.state)?
            .state
            .subscriptions
            .verify(sub_id, record)
    }

    pub fn latest_record(&self, sub_id: SubId) -> AutomationResult<Option<SubscriptionRecord>> {
        Ok(crate::safe_lock!(self.state)?.log.latest_record(sub_id))
    }

    pub fn subs_count(&self) -> AutomationResult<usize> {
        Ok(crate::safe_lock!(self.state)?.state.subscriptions.subs_count())
    }

    pub fn sub_events(&self, sub_id: SubId) -> AutomationResult<Vec<SubscriptionEvent>> {
        Ok(crate::safe_lock!(self.state)?.log.for_sub(sub_id))
    }

    // ── 机器人白名单 ────────────────────────────────────────────────────

    pub fn add_bot(&self, caller: &Address, bot: Address) -> AutomationResult<()> {
        crate::safe_write!(self.bot_auth)?.add_caller(caller, bot)
    }

    pub fn remove_bot(&self, caller: &Address, bot: &Address) -> AutomationResult<()> {
        crate::safe_write!(self.bot_auth)?.remove_caller(caller, bot)
    }

    pub fn is_bot_approved(&self, bot: &Address) -> AutomationResult<bool> {
        Ok(crate::safe_read!(self.bot_auth)?.is_approved(bot))
    }

    // ── 外部协议状态 ────────────────────────────────────────────────────

    pub fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> AutomationResult<R> {
        let store = crate::safe_lock!(self.state)?;
        Ok(f(&store.state.ledger))
    }

    /// 直接修改账本，用于初始化余额和仓位
    pub fn with_ledger_mut<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> AutomationResult<R> {
        let mut store = crate::safe_lock!(self.state)?;
        Ok(f(&mut store.state.ledger))
    }

    // ── 执行 ────────────────────────────────────────────────────────────

    /// 机器人执行入口
    pub fn execute_strategy(
        &self,
        caller: &Address,
        request: ExecuteRequest,
        env: &ExecutionEnv,
    ) -> AutomationResult<ExecutionReceipt> {
        let sub_id = request.sub_id;
        let result = self.run_strategy(caller, &request, env);

        match &result {
            Ok(receipt) => {
                let message = format!(
                    "✅ 执行成功: 策略 #{} 步骤 {} 调用者 {}{}",
                    receipt.strategy_id,
                    receipt.outputs.len(),
                    caller,
                    if receipt.disabled { " (订阅已停用)" } else { "" }
                );
                log::info!("订阅 #{} {}", sub_id, message);
                self.audit(sub_id, Level::Info, &message);
            }
            Err(e) if e.category() == ErrorCategory::Authorization => {
                log::warn!("⚠️ 拒绝执行订阅 #{}: {}", sub_id, e);
            }
            Err(e) => {
                let level = match e.severity() {
                    ErrorSeverity::Info => Level::Info,
                    ErrorSeverity::Warning => Level::Warn,
                    ErrorSeverity::Error | ErrorSeverity::Critical => Level::Error,
                };
                let message = format!("❌ 执行失败: {} 调用者 {}", e, caller);
                log::log!(level, "订阅 #{} {}", sub_id, message);
                self.audit(sub_id, level, &message);
            }
        }

        result
    }

    fn run_strategy(
        &self,
        caller: &Address,
        request: &ExecuteRequest,
        env: &ExecutionEnv,
    ) -> AutomationResult<ExecutionReceipt> {
        crate::safe_read!(self.bot_auth)?.ensure_approved(caller)?;

        let sub_id = request.sub_id;
        let record = &request.record;
        let mut store = crate::safe_lock!(self.state)?;
        let mut uow = UnitOfWork::begin(&mut *store);

        let stored = uow.state().subscriptions.check_executable(sub_id, record)?;
        let template = crate::safe_read!(self.registry)?.resolve(
            record.target_id,
            record.is_bundle,
            request.strategy_index,
        )?;
        let trigger_kinds = template.trigger_kinds();

        let staged = uow.state_mut();
        let mut trigger_ctx = TriggerContext {
            sub_id,
            ledger: &staged.ledger,
            oracle: self.oracle.as_ref(),
            env,
            memory: &mut staged.trigger_memory,
        };
        self.triggers.evaluate(
            &trigger_kinds,
            &record.trigger_params,
            &request.trigger_evidence,
            &mut trigger_ctx,
        )?;

        let resolver = ParamResolver::new(&stored.owner, &record.slot_values, &request.action_params);
        let outputs = self.pipeline.run(
            &template.actions,
            &resolver,
            &mut staged.ledger,
            self.oracle.as_ref(),
            env,
        )?;

        let disabled = record.one_time || !template.continuous;
        let next_record = if disabled {
            staged.subscriptions.disable(sub_id)?;
            record.clone()
        } else {
            let (params, changed) = self.triggers.rearm(&trigger_kinds, &record.trigger_params)?;
            if changed {
                let next = record.with_trigger_params(params);
                staged.subscriptions.rearm(sub_id, next.clone())?;
                next
            } else {
                record.clone()
            }
        };

        uow.commit();

        Ok(ExecutionReceipt {
            sub_id,
            strategy_id: template.id,
            outputs,
            record: next_record,
            disabled,
        })
    }

    /// 账户所有者直接执行一组动作，不经过触发器和订阅
    pub fn execute_recipe(
        &self,
        caller: &Address,
        recipe: &Recipe,
        action_params: &[Vec<Value>],
        env: &ExecutionEnv,
    ) -> AutomationResult<Vec<Value>> {
        validate_actions(&recipe.name, &recipe.actions, 0, self.pipeline.actions())?;

        let mut store = crate::safe_lock!(self.state)?;
        let mut uow = UnitOfWork::begin(&mut *store);
        let resolver = ParamResolver::new(caller, &[], action_params);

        let outputs = self.pipeline.run(
            &recipe.actions,
            &resolver,
            &mut uow.state_mut().ledger,
            self.oracle.as_ref(),
            env,
        )?;
        uow.commit();

        log::info!("✅ 配方 {} 执行成功: 调用者 {}", recipe.name, caller);
        Ok(outputs)
    }

    fn audit(&self, sub_id: SubId, level: Level, message: &str) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.record(sub_id, level, message) {
                log::warn!("⚠️ 写入审计日志失败: {}", e);
            }
        }
    }
}
