use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 抵押率精度: 10000 = 100%
pub const RATIO_BPS: u128 = 10_000;

/// 价格精度: 1e8 (与链上预言机一致)
pub const PRICE_SCALE: u128 = 100_000_000;

/// 金额哨兵值，表示"全部可用余额"
pub const MAX_AMOUNT: u128 = u128::MAX;

/// 账户地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 参数槽类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotType {
    Uint,
    Bool,
    Address,
    Text,
    Bytes,
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotType::Uint => "uint",
            SlotType::Bool => "bool",
            SlotType::Address => "address",
            SlotType::Text => "text",
            SlotType::Bytes => "bytes",
        };
        write!(f, "{}", name)
    }
}

/// 动作之间、订阅与动作之间传递的值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Uint(u128),
    Bool(bool),
    Address(Address),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn slot_type(&self) -> SlotType {
        match self {
            Value::Uint(_) => SlotType::Uint,
            Value::Bool(_) => SlotType::Bool,
            Value::Address(_) => SlotType::Address,
            Value::Text(_) => SlotType::Text,
            Value::Bytes(_) => SlotType::Bytes,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Value::Address(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<u128> for Value {
    fn from(value: u128) -> Self {
        Value::Uint(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Address> for Value {
    fn from(value: Address) -> Self {
        Value::Address(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// 单次调用的外部环境快照
#[derive(Debug, Clone)]
pub struct ExecutionEnv {
    pub now: DateTime<Utc>,
    pub gas_price: u128,
}

impl ExecutionEnv {
    pub fn new(now: DateTime<Utc>, gas_price: u128) -> Self {
        Self { now, gas_price }
    }

    pub fn current(gas_price: u128) -> Self {
        Self::new(Utc::now(), gas_price)
    }

    pub fn timestamp(&self) -> i64 {
        self.now.timestamp()
    }
}
