// 工具模块 - 通用工具函数
pub mod digest;
pub mod safe_macros;
pub mod unified_logger;

pub use digest::DigestHelper;
pub use unified_logger::{init_logger, AuditLogger, LogConfig};
