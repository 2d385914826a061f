use clap::Parser;
use spot_agent::cli::{Cli, Commands};
use spot_agent::config::Config;
use spot_agent::market::MemoryMarketData;
use spot_agent::service::TradingService;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
            eprintln!("Using default configuration");
            toml::from_str(include_str!("../config.toml.example"))?
        }
    };
    config.validate()?;

    // Initialize telemetry
    let _telemetry = spot_agent::telemetry::init_telemetry(&config.telemetry)?;

    if let Commands::Config = cli.command {
        print_config(&config);
        return Ok(());
    }

    let market = Arc::new(MemoryMarketData::load_dir(&config.app.data_dir)?);
    // No exchange wire protocol ships; live execution reports the missing gateway.
    // The state file stays claimed until `service` drops; every change is written through.
    let service = TradingService::open(config, market, None)?;

    match &cli.command {
        Commands::Propose(args) => args.execute(&service).await,
        Commands::Approve(args) => args.execute(&service).await,
        Commands::Execute(args) => args.execute(&service).await,
        Commands::Retry(args) => args.execute(&service).await,
        Commands::Close(args) => args.execute(&service).await,
        Commands::Backtest(args) => args.execute(&service).await,
        Commands::KillSwitch(args) => args.execute(&service).await,
        Commands::Audit(args) => args.execute(&service).await,
        Commands::Status => {
            let report = service.status(chrono::Utc::now()).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Config => Ok(()),
    }
}

fn print_config(config: &Config) {
    let t = &config.trading;
    let r = &config.risk;
    println!("Current configuration:");
    println!("  Whitelist: {}", t.symbol_whitelist.join(", "));
    println!("  Timeframe: {} (limit {})", t.timeframe, t.candle_limit);
    println!(
        "  Safety: kill_switch={} require_approval={} dry_run={} live_consent={}",
        t.kill_switch, t.require_approval, t.dry_run, t.i_understand_live_trading
    );
    println!(
        "  Risk: capital={} max_pos={}% max_notional={} loss/trade={} loss/day={} orders/day={} cooldown={}m",
        r.capital,
        r.max_position_pct * rust_decimal_macros::dec!(100),
        r.max_order_notional,
        r.max_loss_per_trade,
        r.max_loss_per_day,
        r.max_orders_per_day,
        r.cooldown_minutes
    );
    println!(
        "  Paper: slippage={}bps fee={}bps seed={}",
        config.paper.slippage_bps, config.paper.fee_bps, config.paper.seed
    );
    println!(
        "  Autopilot: enabled={} max_notional={} min_confidence={}",
        config.autopilot.enabled, config.autopilot.max_order_notional, config.autopilot.min_confidence
    );
}
