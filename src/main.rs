use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, Command};
use rustauto::automation::adapters::SWAP_VENUE;
use rustauto::automation::{InMemoryOracle, InstalledBook, TriggerParams};
use rustauto::{
    core::config::EngineConfig,
    utils::unified_logger::init_logger,
    Address, AutomationEngine, ExecuteRequest, ExecutionEnv, StrategyBook, SubscriptionRecord,
    Value, PRICE_SCALE,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载环境变量
    dotenv::dotenv().ok();

    // 解析命令行参数
    let matches = Command::new("RustAuto")
        .version("0.1")
        .about("自动化策略执行引擎")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("引擎配置文件路径")
                .default_value("config/engine.yml"),
        )
        .arg(
            Arg::new("strategies")
                .short('s')
                .long("strategies")
                .value_name("FILE")
                .help("策略定义文件路径")
                .default_value("config/strategies.yml"),
        )
        .arg(
            Arg::new("demo")
                .long("demo")
                .action(ArgAction::SetTrue)
                .help("运行模拟的还款场景: 多个机器人竞争同一个一次性订阅"),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .ok_or_else(|| anyhow!("缺少 --config"))?;
    let strategies_file = matches
        .get_one::<String>("strategies")
        .ok_or_else(|| anyhow!("缺少 --strategies"))?;

    let config = if Path::new(config_file).exists() {
        EngineConfig::from_file(config_file)?
    } else {
        EngineConfig::default()
    };

    // 初始化日志系统
    init_logger(&config.logging);
    log::info!("启动自动化引擎, 配置文件: {}", config_file);

    let oracle = Arc::new(InMemoryOracle::new());
    oracle.push_price("WETH", 2 * PRICE_SCALE);
    oracle.push_price("DAI", PRICE_SCALE);

    let owner = config.owner.clone();
    let engine = Arc::new(
        AutomationEngine::builder(config)
            .with_oracle(oracle.clone())
            .build()?,
    );

    let book = StrategyBook::from_file(strategies_file)
        .with_context(|| format!("加载策略定义失败: {}", strategies_file))?;
    let installed = book.install(&engine, &owner)?;
    print_registry(&engine, &installed)?;

    if matches.get_flag("demo") {
        run_demo(engine, oracle, &installed).await?;
    }

    Ok(())
}

fn print_registry(engine: &AutomationEngine, installed: &InstalledBook) -> Result<()> {
    let (strategies, bundles, open) = engine.with_registry(|registry| {
        (
            registry.strategy_count(),
            registry.bundle_count(),
            registry.is_open_to_public(),
        )
    })?;
    log::info!(
        "📚 注册表: {} 个策略, {} 个策略组, 公开创建: {}",
        strategies,
        bundles,
        open
    );

    for (name, id) in &installed.strategies {
        let template = engine.strategy(*id)?;
        log::info!(
            "  策略 #{} {}: 触发器 {:?}, {} 个动作, {}",
            id,
            name,
            template.trigger_kinds(),
            template.actions.len(),
            if template.continuous { "持续型" } else { "一次性" }
        );
    }
    for (name, id) in &installed.bundles {
        let bundle = engine.bundle(*id)?;
        log::info!("  策略组 #{} {}: 成员 {:?}", id, name, bundle.strategy_ids);
    }
    Ok(())
}

/// 还款演示: 170% 的仓位通过取出抵押品、兑换、还款提升到 225%
async fn run_demo(
    engine: Arc<AutomationEngine>,
    oracle: Arc<InMemoryOracle>,
    installed: &InstalledBook,
) -> Result<()> {
    let bundle = *installed
        .bundles
        .get("repay-bundle")
        .ok_or_else(|| anyhow!("策略定义中缺少 repay-bundle"))?;

    let alice = Address::from("alice");
    let venue = Address::from(SWAP_VENUE);
    let lender = engine.config().flash_loan.lender.clone();
    let position = engine
        .with_ledger_mut(|ledger| -> Result<u64> {
            ledger.credit(&venue, "DAI", 100_000)?;
            ledger.credit(&lender, "WETH", 100_000)?;
            Ok(ledger.open_position(&alice, "WETH", "DAI", 850, 1_000, 12_000))
        })??;

    let record = SubscriptionRecord {
        target_id: bundle,
        is_bundle: true,
        trigger_params: vec![TriggerParams::Ratio {
            position,
            ratio_bps: 18_000,
        }],
        slot_values: vec![
            Value::Uint(position as u128),
            Value::Uint(1),
            Value::Bool(true),
            Value::Uint(22_000),
        ],
        one_time: true,
    };
    let sub_id = engine.subscribe(&alice, record.clone())?;
    log::info!("📝 alice 订阅还款策略组, 订阅 #{}", sub_id);

    let mut bots = engine.config().bots.clone();
    if bots.is_empty() {
        let bot = Address::from("bot-1");
        engine.add_bot(&engine.config().owner, bot.clone())?;
        log::warn!("⚠️ 配置中没有白名单机器人, 使用默认机器人 {}", bot);
        bots.push(bot);
    }

    let request = ExecuteRequest::new(sub_id, record).with_action_params(vec![
        vec![],
        vec![Value::Uint(0), Value::Uint(220)],
        vec![
            Value::from("WETH"),
            Value::from("DAI"),
            Value::Uint(0),
            Value::Uint(430),
        ],
    ]);

    let mut handles = Vec::new();
    for bot in bots {
        let engine = engine.clone();
        let request = request.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let result = engine.execute_strategy(&bot, request, &ExecutionEnv::current(20));
            (bot, result)
        }));
    }

    let mut winners = 0;
    for handle in handles {
        let (bot, result) = handle.await?;
        match result {
            Ok(receipt) => {
                winners += 1;
                log::info!(
                    "🏆 {} 执行成功: 策略 #{} 最终抵押率 {:?}",
                    bot,
                    receipt.strategy_id,
                    receipt.outputs.last()
                );
            }
            Err(e) => log::info!("{} 未能执行: {}", bot, e),
        }
    }

    let ratio = engine.with_ledger(|ledger| ledger.position_ratio(position, oracle.as_ref()))??;
    log::info!(
        "演示结束: {} 个机器人成功, 仓位 #{} 当前抵押率 {}",
        winners,
        position,
        ratio
    );
    Ok(())
}
