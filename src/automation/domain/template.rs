//! 策略模板与策略组定义
//!
//! 模板注册后不可变，新版本总是获得新的ID。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::{Address, SlotType};

pub type StrategyId = u64;
pub type BundleId = u64;

/// 订阅参数槽定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDef {
    pub name: String,
    #[serde(rename = "type")]
    pub slot_type: SlotType,
}

impl SlotDef {
    pub fn new(name: impl Into<String>, slot_type: SlotType) -> Self {
        Self {
            name: name.into(),
            slot_type,
        }
    }
}

/// 触发器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    RatioUnder,
    RatioOver,
    PriceThreshold,
    Timestamp,
    GasPrice,
    TrailingStop,
    TickRange,
    OffchainPrice,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerKind::RatioUnder => "ratio_under",
            TriggerKind::RatioOver => "ratio_over",
            TriggerKind::PriceThreshold => "price_threshold",
            TriggerKind::Timestamp => "timestamp",
            TriggerKind::GasPrice => "gas_price",
            TriggerKind::TrailingStop => "trailing_stop",
            TriggerKind::TickRange => "tick_range",
            TriggerKind::OffchainPrice => "offchain_price",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub kind: TriggerKind,
}

impl TriggerSpec {
    pub fn new(kind: TriggerKind) -> Self {
        Self { kind }
    }
}

/// 动作参数来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    /// 调用方在 actionParams 中提供
    Literal,
    /// 订阅绑定的第k个参数槽
    Slot(usize),
    /// 第j个(更早的)动作的返回值
    Pipe(usize),
    /// 订阅所有者，即执行账户
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub kind: String,
    pub params: Vec<ParamSource>,
}

impl ActionSpec {
    pub fn new(kind: impl Into<String>, params: Vec<ParamSource>) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// 尚未注册的策略模板
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDraft {
    pub name: String,
    pub triggers: Vec<TriggerSpec>,
    pub actions: Vec<ActionSpec>,
    pub slots: Vec<SlotDef>,
    pub continuous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyTemplate {
    pub id: StrategyId,
    pub name: String,
    pub creator: Address,
    pub triggers: Vec<TriggerSpec>,
    pub actions: Vec<ActionSpec>,
    pub slots: Vec<SlotDef>,
    pub continuous: bool,
}

impl StrategyTemplate {
    pub fn from_draft(id: StrategyId, creator: Address, draft: StrategyDraft) -> Self {
        Self {
            id,
            name: draft.name,
            creator,
            triggers: draft.triggers,
            actions: draft.actions,
            slots: draft.slots,
            continuous: draft.continuous,
        }
    }

    pub fn trigger_kinds(&self) -> Vec<TriggerKind> {
        self.triggers.iter().map(|t| t.kind).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: BundleId,
    pub creator: Address,
    pub strategy_ids: Vec<StrategyId>,
}
