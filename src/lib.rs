pub mod automation;
pub mod core;
pub mod utils;

pub use automation::{
    AutomationEngine, ExecuteRequest, ExecutionReceipt, StrategyBook, StrategyDraft,
    SubscriptionRecord,
};
pub use crate::core::{config::*, error::*, types::*};
pub use utils::*;
