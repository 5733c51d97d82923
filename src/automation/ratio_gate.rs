//! 抵押率后置检查
//!
//! 作为管线的最后一步读取执行后的仓位状态：
//! boost 必须严格降低抵押率，repay 必须严格提高抵押率，
//! 开启目标检查时还要求结果达到目标值。任一不满足则整次调用回滚。

use crate::automation::adapters::{ActionAdapter, ActionContext, ActionRole, ParamReader};
use crate::core::error::AdapterError;
use crate::core::types::Value;

/// 期望的变化方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioDirection {
    /// boost
    Lower,
    /// repay
    Higher,
}

impl RatioDirection {
    pub fn from_code(code: u128) -> Result<Self, AdapterError> {
        match code {
            0 => Ok(RatioDirection::Lower),
            1 => Ok(RatioDirection::Higher),
            other => Err(AdapterError::InvalidParam(format!(
                "未知的抵押率方向: {}",
                other
            ))),
        }
    }

    pub fn code(&self) -> u128 {
        match self {
            RatioDirection::Lower => 0,
            RatioDirection::Higher => 1,
        }
    }
}

/// 后置检查配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatioGate {
    pub direction: RatioDirection,
    pub check_target: bool,
    pub target_ratio: u128,
}

impl RatioGate {
    /// 校验执行前后的抵押率
    pub fn check(&self, start_ratio: u128, current_ratio: u128) -> Result<(), AdapterError> {
        match self.direction {
            RatioDirection::Lower => {
                if current_ratio >= start_ratio {
                    return Err(AdapterError::PostCondition(format!(
                        "抵押率未降低: 执行前 {} 执行后 {}",
                        start_ratio, current_ratio
                    )));
                }
                if self.check_target && current_ratio > self.target_ratio {
                    return Err(AdapterError::PostCondition(format!(
                        "抵押率 {} 高于目标 {}",
                        current_ratio, self.target_ratio
                    )));
                }
            }
            RatioDirection::Higher => {
                if current_ratio <= start_ratio {
                    return Err(AdapterError::PostCondition(format!(
                        "抵押率未提高: 执行前 {} 执行后 {}",
                        start_ratio, current_ratio
                    )));
                }
                if self.check_target && current_ratio < self.target_ratio {
                    return Err(AdapterError::PostCondition(format!(
                        "抵押率 {} 低于目标 {}",
                        current_ratio, self.target_ratio
                    )));
                }
            }
        }
        Ok(())
    }
}

/// 后置检查动作: [direction, check_target, target_ratio, position, start_ratio]
///
/// start_ratio 通常引用管线开头 PositionRatio 的输出，返回执行后的抵押率。
pub struct RatioCheckAction;

impl ActionAdapter for RatioCheckAction {
    fn kind(&self) -> &'static str {
        "RatioCheck"
    }

    fn arity(&self) -> usize {
        5
    }

    fn role(&self) -> ActionRole {
        ActionRole::Terminal
    }

    fn execute(&self, ctx: &mut ActionContext<'_>, params: &[Value]) -> Result<Value, AdapterError> {
        let reader = ParamReader::new(params);
        let gate = RatioGate {
            direction: RatioDirection::from_code(reader.uint(0, "direction")?)?,
            check_target: reader.boolean(1, "check_target")?,
            target_ratio: reader.uint(2, "target_ratio")?,
        };
        let position = reader.id(3, "position")?;
        let start_ratio = reader.uint(4, "start_ratio")?;

        let current_ratio = ctx.ledger.position_ratio(position, ctx.oracle)?;
        gate.check(start_ratio, current_ratio)?;

        log::debug!(
            "后置检查通过: 仓位 {} 抵押率 {} -> {}",
            position,
            start_ratio,
            current_ratio
        );
        Ok(Value::Uint(current_ratio))
    }
}
