//! 策略定义文件
//!
//! 用YAML描述一组命名的策略和策略组，参数使用紧凑写法：
//! `&name` 引用参数槽，`&owner`(或 `&wallet` `&proxy` `&eoa`) 表示订阅所有者，
//! `%xxx` 由调用方在执行时提供，`$N` 引用第N个动作(从1开始)的输出。

use std::collections::BTreeMap;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::automation::domain::{
    ActionSpec, BundleId, ParamSource, SlotDef, StrategyDraft, StrategyId, TriggerKind, TriggerSpec,
};
use crate::automation::executor::AutomationEngine;
use crate::core::error::{AutomationError, AutomationResult};
use crate::core::types::Address;

const OWNER_ALIASES: [&str; 4] = ["owner", "wallet", "proxy", "eoa"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDef {
    pub kind: String,
    #[serde(default)]
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDef {
    pub name: String,
    #[serde(default)]
    pub continuous: bool,
    #[serde(default)]
    pub triggers: Vec<TriggerKind>,
    #[serde(default)]
    pub slots: Vec<SlotDef>,
    pub actions: Vec<ActionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleDef {
    pub name: String,
    /// 成员策略名称
    pub strategies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyBook {
    #[serde(default)]
    pub strategies: Vec<StrategyDef>,
    #[serde(default)]
    pub bundles: Vec<BundleDef>,
}

/// 安装结果: 名称到ID的映射
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledBook {
    pub strategies: BTreeMap<String, StrategyId>,
    pub bundles: BTreeMap<String, BundleId>,
}

/// 解析单个参数的紧凑写法
pub fn parse_param(token: &str, slots: &[SlotDef]) -> AutomationResult<ParamSource> {
    let token = token.trim();
    if let Some(name) = token.strip_prefix('&') {
        if OWNER_ALIASES.contains(&name) {
            return Ok(ParamSource::Owner);
        }
        return slots
            .iter()
            .position(|slot| slot.name == name)
            .map(ParamSource::Slot)
            .ok_or_else(|| AutomationError::ConfigError(format!("未定义的参数槽: {}", token)));
    }
    if token.starts_with('%') {
        return Ok(ParamSource::Literal);
    }
    if let Some(index) = token.strip_prefix('$') {
        return match index.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(ParamSource::Pipe(n - 1)),
            _ => Err(AutomationError::ConfigError(format!(
                "无效的管道引用: {}",
                token
            ))),
        };
    }
    Err(AutomationError::ConfigError(format!(
        "无法识别的参数写法: '{}'",
        token
    )))
}

impl StrategyDef {
    pub fn to_draft(&self) -> AutomationResult<StrategyDraft> {
        let actions = self
            .actions
            .iter()
            .map(|action| {
                let params = action
                    .params
                    .iter()
                    .map(|token| parse_param(token, &self.slots))
                    .collect::<AutomationResult<Vec<_>>>()?;
                Ok(ActionSpec::new(action.kind.clone(), params))
            })
            .collect::<AutomationResult<Vec<_>>>()?;

        Ok(StrategyDraft {
            name: self.name.clone(),
            triggers: self.triggers.iter().copied().map(TriggerSpec::new).collect(),
            actions,
            slots: self.slots.clone(),
            continuous: self.continuous,
        })
    }
}

impl StrategyBook {
    /// 从YAML文件加载策略定义
    pub fn from_file(path: &str) -> AutomationResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| AutomationError::ConfigError(format!("读取策略文件失败: {}", e)))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> AutomationResult<Self> {
        let book: StrategyBook = serde_yaml::from_str(contents)?;
        Ok(book)
    }

    /// 按顺序注册全部策略和策略组
    pub fn install(&self, engine: &AutomationEngine, caller: &Address) -> AutomationResult<InstalledBook> {
        let mut installed = InstalledBook::default();

        for def in &self.strategies {
            if installed.strategies.contains_key(&def.name) {
                return Err(AutomationError::ConfigError(format!(
                    "策略名称重复: {}",
                    def.name
                )));
            }
            let id = engine.create_strategy(caller, def.to_draft()?)?;
            installed.strategies.insert(def.name.clone(), id);
        }

        for def in &self.bundles {
            let ids = def
                .strategies
                .iter()
                .map(|name| {
                    installed.strategies.get(name).copied().ok_or_else(|| {
                        AutomationError::ConfigError(format!(
                            "策略组 {} 引用了未定义的策略 {}",
                            def.name, name
                        ))
                    })
                })
                .collect::<AutomationResult<Vec<_>>>()?;
            let id = engine.create_bundle(caller, ids)?;
            installed.bundles.insert(def.name.clone(), id);
        }

        log::info!(
            "📚 策略定义已安装: {} 个策略, {} 个策略组",
            installed.strategies.len(),
            installed.bundles.len()
        );
        Ok(installed)
    }
}
