pub mod ledger;
pub mod subscription;
pub mod template;

pub use ledger::{Ledger, Position, RangeOrder};
pub use subscription::{
    OrderType, PriceState, StoredSubscription, SubId, SubscriptionEvent, SubscriptionRecord,
    TriggerParams,
};
pub use template::{
    ActionSpec, Bundle, BundleId, ParamSource, SlotDef, StrategyDraft, StrategyId,
    StrategyTemplate, TriggerKind, TriggerSpec,
};
