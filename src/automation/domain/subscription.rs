use serde::{Deserialize, Serialize};

use super::template::TriggerKind;
use crate::core::error::AutomationResult;
use crate::core::types::{Address, Value};
use crate::utils::digest::DigestHelper;

pub type SubId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceState {
    Over,
    Under,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Buy,
    Sell,
}

/// 订阅绑定的触发器参数，持续型订阅执行成功后可被重新布防
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerParams {
    /// ratio_under / ratio_over
    Ratio { position: u64, ratio_bps: u128 },
    Price {
        asset: String,
        price: u128,
        state: PriceState,
    },
    Timestamp { last_timestamp: i64, interval_secs: i64 },
    GasPrice { max_gas_price: u128 },
    TrailingStop {
        asset: String,
        percentage_bps: u128,
        start_round: u64,
    },
    /// Over: tick 高于区间上沿; Under: tick 低于区间下沿
    TickRange { order_id: u64, state: PriceState },
    OffchainPrice {
        target_price: u128,
        good_until: i64,
        order_type: OrderType,
    },
}

impl TriggerParams {
    pub fn fits(&self, kind: TriggerKind) -> bool {
        matches!(
            (self, kind),
            (TriggerParams::Ratio { .. }, TriggerKind::RatioUnder)
                | (TriggerParams::Ratio { .. }, TriggerKind::RatioOver)
                | (TriggerParams::Price { .. }, TriggerKind::PriceThreshold)
                | (TriggerParams::Timestamp { .. }, TriggerKind::Timestamp)
                | (TriggerParams::GasPrice { .. }, TriggerKind::GasPrice)
                | (TriggerParams::TrailingStop { .. }, TriggerKind::TrailingStop)
                | (TriggerParams::TickRange { .. }, TriggerKind::TickRange)
                | (TriggerParams::OffchainPrice { .. }, TriggerKind::OffchainPrice)
        )
    }
}

/// 订阅完整数据，链下保存，执行时由机器人重新提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub target_id: u64,
    pub is_bundle: bool,
    pub trigger_params: Vec<TriggerParams>,
    pub slot_values: Vec<Value>,
    pub one_time: bool,
}

impl SubscriptionRecord {
    pub fn digest(&self) -> AutomationResult<String> {
        DigestHelper::canonical_digest(self)
    }

    pub fn with_trigger_params(&self, trigger_params: Vec<TriggerParams>) -> Self {
        Self {
            trigger_params,
            ..self.clone()
        }
    }
}

/// 实际持久化的订阅信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubscription {
    pub owner: Address,
    pub enabled: bool,
    pub digest: String,
}

/// 订阅事件，机器人据此重建最新的订阅数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionEvent {
    Subscribed {
        sub_id: SubId,
        owner: Address,
        record: SubscriptionRecord,
    },
    Updated {
        sub_id: SubId,
        record: SubscriptionRecord,
    },
    Enabled { sub_id: SubId },
    Disabled { sub_id: SubId },
}

impl SubscriptionEvent {
    pub fn sub_id(&self) -> SubId {
        match self {
            SubscriptionEvent::Subscribed { sub_id, .. }
            | SubscriptionEvent::Updated { sub_id, .. }
            | SubscriptionEvent::Enabled { sub_id }
            | SubscriptionEvent::Disabled { sub_id } => *sub_id,
        }
    }
}
