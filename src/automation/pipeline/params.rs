use crate::automation::domain::{ActionSpec, ParamSource};
use crate::core::error::{AutomationError, AutomationResult};
use crate::core::types::{Address, Value};

/// 动作参数解析
///
/// 每个参数按其来源取值: 调用方字面量、订阅参数槽、更早动作的输出或订阅所有者。
pub struct ParamResolver<'a> {
    owner: &'a Address,
    slot_values: &'a [Value],
    literals: &'a [Vec<Value>],
}

impl<'a> ParamResolver<'a> {
    pub fn new(owner: &'a Address, slot_values: &'a [Value], literals: &'a [Vec<Value>]) -> Self {
        Self {
            owner,
            slot_values,
            literals,
        }
    }

    pub fn owner(&self) -> &'a Address {
        self.owner
    }

    /// 解析第index步的全部参数，outputs 只包含更早步骤的输出
    pub fn resolve(
        &self,
        index: usize,
        spec: &ActionSpec,
        outputs: &[Value],
    ) -> AutomationResult<Vec<Value>> {
        let missing = |reason: String| AutomationError::ActionFailure {
            index,
            kind: spec.kind.clone(),
            reason,
        };

        spec.params
            .iter()
            .enumerate()
            .map(|(position, source)| match source {
                ParamSource::Literal => self
                    .literals
                    .get(index)
                    .and_then(|params| params.get(position))
                    .cloned()
                    .ok_or_else(|| missing(format!("缺少调用方参数 #{}", position))),
                ParamSource::Slot(k) => self
                    .slot_values
                    .get(*k)
                    .cloned()
                    .ok_or_else(|| missing(format!("缺少参数槽 #{}", k))),
                ParamSource::Pipe(j) if *j < index => outputs
                    .get(*j)
                    .cloned()
                    .ok_or_else(|| missing(format!("第{}步没有输出", j))),
                ParamSource::Pipe(j) => Err(missing(format!("非法的向后引用 #{}", j))),
                ParamSource::Owner => Ok(Value::Address(self.owner.clone())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_every_source() {
        let owner = Address::from("alice");
        let slots = vec![Value::from("DAI")];
        let literals = vec![vec![], vec![Value::Uint(0), Value::Uint(0), Value::Uint(7)]];
        let resolver = ParamResolver::new(&owner, &slots, &literals);

        let spec = ActionSpec::new(
            "X",
            vec![
                ParamSource::Slot(0),
                ParamSource::Pipe(0),
                ParamSource::Literal,
                ParamSource::Owner,
            ],
        );
        let resolved = resolver.resolve(1, &spec, &[Value::Uint(42)]).unwrap();
        assert_eq!(
            resolved,
            vec![
                Value::from("DAI"),
                Value::Uint(42),
                Value::Uint(7),
                Value::Address(owner.clone()),
            ]
        );
    }

    #[test]
    fn test_missing_literal_is_action_failure() {
        let owner = Address::from("alice");
        let resolver = ParamResolver::new(&owner, &[], &[]);
        let spec = ActionSpec::new("SendToken", vec![ParamSource::Literal]);

        let err = resolver.resolve(0, &spec, &[]).unwrap_err();
        assert!(matches!(
            err,
            AutomationError::ActionFailure { index: 0, ref kind, .. } if kind == "SendToken"
        ));

        let self_ref = ActionSpec::new("SendToken", vec![ParamSource::Pipe(0)]);
        assert!(resolver.resolve(0, &self_ref, &[Value::Uint(1)]).is_err());
    }
}
