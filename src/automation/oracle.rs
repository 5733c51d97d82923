use std::collections::HashMap;
use std::sync::RwLock;

/// 单轮价格报告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRound {
    pub round_id: u64,
    pub price: u128,
}

/// 只读的价格/状态预言机，触发器和后置检查通过它读取外部状态
pub trait PriceOracle: Send + Sync {
    /// 最新价格
    fn price(&self, asset: &str) -> Option<u128> {
        self.latest_round(asset).map(|round| round.price)
    }

    fn latest_round(&self, asset: &str) -> Option<PriceRound>;

    fn round(&self, asset: &str, round_id: u64) -> Option<PriceRound>;

    /// 池子当前tick
    fn current_tick(&self, pool: &str) -> Option<i32>;
}

/// 内存预言机，每次喂价生成一个递增的轮次
#[derive(Default)]
pub struct InMemoryOracle {
    rounds: RwLock<HashMap<String, Vec<PriceRound>>>,
    ticks: RwLock<HashMap<String, i32>>,
}

impl InMemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 推送新价格，返回轮次ID(从1开始)
    pub fn push_price(&self, asset: &str, price: u128) -> u64 {
        let mut rounds = match self.rounds.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let history = rounds.entry(asset.to_string()).or_default();
        let round_id = history.last().map(|r| r.round_id + 1).unwrap_or(1);
        history.push(PriceRound { round_id, price });
        round_id
    }

    pub fn set_tick(&self, pool: &str, tick: i32) {
        let mut ticks = match self.ticks.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        ticks.insert(pool.to_string(), tick);
    }
}

impl PriceOracle for InMemoryOracle {
    fn latest_round(&self, asset: &str) -> Option<PriceRound> {
        let rounds = self.rounds.read().ok()?;
        rounds.get(asset).and_then(|history| history.last().copied())
    }

    fn round(&self, asset: &str, round_id: u64) -> Option<PriceRound> {
        let rounds = self.rounds.read().ok()?;
        rounds
            .get(asset)
            .and_then(|history| history.iter().find(|r| r.round_id == round_id).copied())
    }

    fn current_tick(&self, pool: &str) -> Option<i32> {
        let ticks = self.ticks.read().ok()?;
        ticks.get(pool).copied()
    }
}
