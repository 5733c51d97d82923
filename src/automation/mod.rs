// 自动化执行引擎 - 策略注册、订阅、触发器评估与原子化动作管线
pub mod adapters;
pub mod bot_auth;
pub mod definitions;
pub mod domain;
pub mod executor;
pub mod oracle;
pub mod pipeline;
pub mod ratio_gate;
pub mod registry;
pub mod subscription;
pub mod triggers;

pub use adapters::{ActionAdapter, ActionContext, ActionRegistry, ActionRole};
pub use bot_auth::BotAuth;
pub use definitions::{InstalledBook, StrategyBook};
pub use domain::*;
pub use executor::{AutomationEngine, AutomationEngineBuilder, ExecuteRequest, ExecutionReceipt};
pub use oracle::{InMemoryOracle, PriceOracle, PriceRound};
pub use pipeline::{EngineState, EngineStore, Recipe, RecipeExecutor, UnitOfWork};
pub use ratio_gate::{RatioDirection, RatioGate};
pub use registry::StrategyRegistry;
pub use subscription::{SubscriptionLog, SubscriptionStore};
pub use triggers::{TriggerChecker, TriggerEvaluator, TriggerMemory};
