use crate::core::error::AutomationError;
use crate::core::types::{Address, RATIO_BPS};
use crate::utils::unified_logger::LogConfig;
use serde::{Deserialize, Serialize};
use std::fs;

/// 策略注册表权限
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// 为false时只有管理员可以创建策略和策略组
    #[serde(default = "default_open_to_public")]
    pub open_to_public: bool,
}

fn default_open_to_public() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            open_to_public: true,
        }
    }
}

/// 闪电贷配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashLoanConfig {
    /// 提供流动性的账户
    pub lender: Address,
    /// 手续费(基点)
    #[serde(default)]
    pub fee_bps: u32,
}

impl Default for FlashLoanConfig {
    fn default() -> Self {
        Self {
            lender: Address::from("flash-lender"),
            fee_bps: 0,
        }
    }
}

impl FlashLoanConfig {
    pub fn fee_for(&self, principal: u128) -> Option<u128> {
        principal
            .checked_mul(u128::from(self.fee_bps))
            .map(|scaled| scaled / RATIO_BPS)
    }
}

/// 引擎全局配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub owner: Address,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub bots: Vec<Address>,
    #[serde(default)]
    pub flash_loan: FlashLoanConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

impl EngineConfig {
    /// 从YAML文件加载配置
    pub fn from_file(path: &str) -> Result<Self, AutomationError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| AutomationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, AutomationError> {
        let config: EngineConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.owner.is_empty() {
            return Err(AutomationError::ConfigError("owner 不能为空".to_string()));
        }
        if self.flash_loan.lender.is_empty() {
            return Err(AutomationError::ConfigError(
                "flash_loan.lender 不能为空".to_string(),
            ));
        }
        if u128::from(self.flash_loan.fee_bps) >= RATIO_BPS {
            return Err(AutomationError::ConfigError(format!(
                "flash_loan.fee_bps 过大: {}",
                self.flash_loan.fee_bps
            )));
        }
        if let Some(bot) = self.bots.iter().find(|bot| bot.is_empty()) {
            return Err(AutomationError::ConfigError(format!(
                "bots 中存在空地址: '{}'",
                bot
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            owner: Address::from("owner"),
            registry: RegistryConfig::default(),
            bots: Vec::new(),
            flash_loan: FlashLoanConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_engine_config() {
        let yaml = r#"
owner: governance
registry:
  open_to_public: false
bots: [bot-1, bot-2]
flash_loan:
  lender: balancer-vault
  fee_bps: 9
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.owner, Address::from("governance"));
        assert!(!config.registry.open_to_public);
        assert_eq!(config.bots.len(), 2);
        assert_eq!(config.flash_loan.fee_for(10_000), Some(9));
        assert_eq!(config.logging.root_dir, "logs");
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = EngineConfig::from_yaml(include_str!("../../config/engine.yml")).unwrap();
        assert_eq!(config.bots.len(), 3);
        assert!(config.logging.audit);
    }

    #[test]
    fn test_reject_invalid_fee() {
        let yaml = r#"
owner: governance
flash_loan:
  lender: vault
  fee_bps: 10000
"#;
        assert!(matches!(
            EngineConfig::from_yaml(yaml),
            Err(AutomationError::ConfigError(_))
        ));
    }
}
