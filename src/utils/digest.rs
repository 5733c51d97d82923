use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::error::AutomationResult;

/// 摘要工具：订阅只持久化摘要，执行时由调用方重新提供完整数据
pub struct DigestHelper;

impl DigestHelper {
    /// SHA-256(bytes) 十六进制
    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// 规范JSON编码后取摘要
    pub fn canonical_digest<T: Serialize>(value: &T) -> AutomationResult<String> {
        let encoded = serde_json::to_vec(value)?;
        Ok(Self::sha256_hex(&encoded))
    }
}
