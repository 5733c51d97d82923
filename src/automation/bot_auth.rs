use std::collections::HashSet;

use crate::core::error::{AutomationError, AutomationResult};
use crate::core::types::Address;

/// 机器人白名单，由管理员维护
#[derive(Debug, Clone)]
pub struct BotAuth {
    owner: Address,
    approved: HashSet<Address>,
}

impl BotAuth {
    pub fn new(owner: Address, bots: &[Address]) -> Self {
        Self {
            owner,
            approved: bots.iter().cloned().collect(),
        }
    }

    fn only_owner(&self, caller: &Address) -> AutomationResult<()> {
        if caller != &self.owner {
            return Err(AutomationError::SenderNotOwner {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    pub fn add_caller(&mut self, caller: &Address, bot: Address) -> AutomationResult<()> {
        self.only_owner(caller)?;
        log::info!("✅ 机器人已加入白名单: {}", bot);
        self.approved.insert(bot);
        Ok(())
    }

    pub fn remove_caller(&mut self, caller: &Address, bot: &Address) -> AutomationResult<()> {
        self.only_owner(caller)?;
        if self.approved.remove(bot) {
            log::info!("机器人已移出白名单: {}", bot);
        }
        Ok(())
    }

    pub fn is_approved(&self, caller: &Address) -> bool {
        self.approved.contains(caller)
    }

    pub fn ensure_approved(&self, caller: &Address) -> AutomationResult<()> {
        if self.is_approved(caller) {
            Ok(())
        } else {
            Err(AutomationError::BotNotApproved {
                caller: caller.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_governs_allow_list() {
        let owner = Address::from("owner");
        let bot = Address::from("bot-1");
        let mut auth = BotAuth::new(owner.clone(), &[]);

        assert!(matches!(
            auth.ensure_approved(&bot),
            Err(AutomationError::BotNotApproved { .. })
        ));
        assert!(matches!(
            auth.add_caller(&bot, bot.clone()),
            Err(AutomationError::SenderNotOwner { .. })
        ));

        auth.add_caller(&owner, bot.clone()).unwrap();
        assert!(auth.ensure_approved(&bot).is_ok());

        auth.remove_caller(&owner, &bot).unwrap();
        assert!(!auth.is_approved(&bot));
    }
}
