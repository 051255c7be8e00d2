use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use crossover_engine::data::{load_file, write_csv};
use crossover_engine::logging::init_logging;
use crossover_engine::{
    generate_synthetic_bars, run_grid, AppConfig, BacktestConfig, BacktestEngine, BacktestResult,
    BatchOutcome, ExecutionCosts, NamedSeries, PortfolioStore, Term,
};

#[derive(Parser, Debug)]
#[command(name = "crossover-engine")]
#[command(version)]
#[command(about = "SMA crossover backtester for daily bars", long_about = None)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding portfolio.json, tickerdata.json and ticker CSVs
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Backtest one bar file (or seeded synthetic data)
    Run(RunArgs),
    /// Backtest every term / risk-control combination over several files
    Compare(CompareArgs),
    /// Write a seeded synthetic bar series to CSV
    Generate(GenerateArgs),
    /// Manage stored tickers
    #[command(subcommand)]
    Ticker(TickerCommand),
    /// Show the portfolio
    Portfolio,
    /// Drop all tickers and restart the portfolio
    Reset {
        /// New initial balance (10,000 - 1,000,000)
        #[arg(long)]
        balance: Option<f64>,
    },
}

#[derive(Args, Debug)]
struct StrategyArgs {
    /// Moving-average pair: short (20/50) or long (50/200)
    #[arg(short, long, default_value = "long")]
    term: Term,

    /// Disable the ATR stop
    #[arg(long)]
    no_risk_control: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Data file path (CSV/JSON). If not provided, uses synthetic data.
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    #[command(flatten)]
    strategy: StrategyArgs,

    /// Allocated balance
    #[arg(short, long, default_value = "1000")]
    balance: f64,

    /// Number of synthetic bars
    #[arg(short, long, default_value = "1260")]
    days: usize,

    /// Seed for synthetic data
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Output format (json, text)
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Include the indicator series in JSON output
    #[arg(long)]
    with_indicators: bool,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Bar files (CSV/JSON); the file stem names each series
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Allocated balance per run
    #[arg(short, long, default_value = "1000")]
    balance: f64,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Output CSV path
    output: PathBuf,

    #[arg(short, long, default_value = "1260")]
    days: usize,

    #[arg(long, default_value = "50.0")]
    initial_price: f64,

    #[arg(long, default_value = "42")]
    seed: u64,
}

#[derive(Subcommand, Debug)]
enum TickerCommand {
    /// Import a ticker's daily bars from a CSV file
    Add {
        symbol: String,
        /// CSV with Date/Open/High/Low/Close/Volume columns
        #[arg(short = 'f', long)]
        file: PathBuf,
        #[arg(long)]
        company: Option<String>,
    },
    /// Remove a ticker, reverting its backtest from the balance
    Remove { symbol: String },
    /// List stored tickers
    List,
    /// Backtest a stored ticker and apply the result to the balance
    Backtest {
        symbol: String,
        /// Share of the balance to allocate, in percent (5 - 40)
        #[arg(short, long, default_value = "10")]
        allocation: f64,
        #[command(flatten)]
        strategy: StrategyArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut app = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        app.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        app.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        app.log_format = format.clone();
    }

    init_logging(&app.log_level, &app.log_format);

    match cli.command {
        Command::Run(args) => run_backtest(args),
        Command::Compare(args) => compare(args),
        Command::Generate(args) => {
            let bars = generate_synthetic_bars(args.days, args.initial_price, args.seed);
            write_csv(&args.output, &bars)?;
            eprintln!("Wrote {} bars to {}", bars.len(), args.output.display());
            Ok(())
        }
        Command::Ticker(command) => ticker(&app, command),
        Command::Portfolio => {
            let store = PortfolioStore::open(&app.data_dir, app.default_initial_balance)?;
            let portfolio = store.portfolio();
            println!("Balance:          ${:>14.2}", portfolio.balance);
            println!("Initial Balance:  ${:>14.2}", portfolio.initial_balance);
            println!("Net:              {:>+14.2}%", portfolio.net_change_percent());
            Ok(())
        }
        Command::Reset { balance } => {
            let mut store = PortfolioStore::open(&app.data_dir, app.default_initial_balance)?;
            store.reset(balance)?;
            println!(
                "Your portfolio has been reset. Your balance is now ${:.2}",
                store.portfolio().balance
            );
            Ok(())
        }
    }
}

fn run_backtest(args: RunArgs) -> Result<()> {
    let config = BacktestConfig::new(
        args.strategy.term,
        !args.strategy.no_risk_control,
        args.balance,
    );

    let bars = if let Some(path) = &args.data_file {
        eprintln!("Loading data from {:?}...", path);
        load_file(path)?
    } else {
        eprintln!(
            "Generating {} days of synthetic data (seed {})...",
            args.days, args.seed
        );
        generate_synthetic_bars(args.days, 50.0, args.seed)
    };

    let run = BacktestEngine::new(config).run(&bars)?;

    match args.output.as_str() {
        "json" => {
            let value = if args.with_indicators {
                serde_json::to_value(&run)?
            } else {
                serde_json::to_value(&run.result)?
            };
            let json = if args.pretty {
                serde_json::to_string_pretty(&value)?
            } else {
                serde_json::to_string(&value)?
            };
            println!("{}", json);
        }
        "text" => {
            print_text_report(&run.result);
            if let Some(open) = &run.open_position {
                println!(
                    "  Open position since {}: {} shares @ ${:.2} (${:.2} cost, unrealized)",
                    open.entry_date,
                    open.shares,
                    open.entry_price,
                    open.cost_basis()
                );
                println!();
            }
        }
        other => bail!("Unknown output format: {}", other),
    }

    Ok(())
}

fn compare(args: CompareArgs) -> Result<()> {
    let series = args
        .files
        .iter()
        .map(|path| {
            Ok(NamedSeries {
                name: series_name(path),
                bars: load_file(path).with_context(|| format!("failed to load {}", path.display()))?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let outcomes = run_grid(&series, args.balance, &ExecutionCosts::default());
    print_comparison(&outcomes);
    Ok(())
}

fn series_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("series")
        .to_string()
}

fn ticker(app: &AppConfig, command: TickerCommand) -> Result<()> {
    let mut store = PortfolioStore::open(&app.data_dir, app.default_initial_balance)?;

    match command {
        TickerCommand::Add {
            symbol,
            file,
            company,
        } => {
            let symbol = store.add_ticker(&symbol, &file, company)?;
            println!("Stock data for ticker \"{}\" successfully added.", symbol);
        }
        TickerCommand::Remove { symbol } => {
            let record = store.remove_ticker(&symbol)?;
            match record.backtest {
                Some(summary) => println!(
                    "Ticker removed. Its net change of {:+.2} has been reverted; balance is now ${:.2}",
                    summary.net_pnl(),
                    store.portfolio().balance
                ),
                None => println!("Ticker removed."),
            }
        }
        TickerCommand::List => {
            if store.tickers().next().is_none() {
                println!("No tickers have been added yet.");
            }
            for (symbol, record) in store.tickers() {
                let company = record.company_name.as_deref().unwrap_or("UNKNOWN COMPANY");
                match &record.backtest {
                    Some(s) => println!(
                        "  {:<8} {:<30} {}-term, {} | {:+.2}% (best {:+.2}%, worst {:+.2}%)",
                        symbol,
                        company,
                        s.term,
                        if s.risk_control { "risk-controlled" } else { "no risk control" },
                        s.net_change,
                        s.highest_win,
                        s.highest_loss
                    ),
                    None => println!("  {:<8} {:<30} not backtested", symbol, company),
                }
            }
        }
        TickerCommand::Backtest {
            symbol,
            allocation,
            strategy,
        } => {
            let run = store.backtest_ticker(
                &symbol,
                allocation,
                strategy.term,
                !strategy.no_risk_control,
                &ExecutionCosts::default(),
            )?;
            print_text_report(&run.result);
            println!(
                "Backtest applied. Your balance is now ${:.2}",
                store.portfolio().balance
            );
        }
    }

    Ok(())
}

fn print_text_report(result: &BacktestResult) {
    println!();
    println!("================================================================");
    println!(
        "  BACKTEST REPORT - {}-term SMA crossover ({})",
        result.term,
        if result.risk_control {
            "risk-controlled"
        } else {
            "no risk control"
        }
    );
    println!("================================================================");
    println!();
    println!("  Period: {} to {}", result.start_date, result.end_date);
    println!();
    println!("----------------------------------------------------------------");
    println!("  BALANCE");
    println!("----------------------------------------------------------------");
    println!("  Allocated:        ${:>12.2}", result.allocated_balance);
    println!("  Final Balance:    ${:>12.2}", result.final_balance);
    println!(
        "  Net Change:       ${:>12.2} ({:+.2}%)",
        result.net_pnl(),
        result.net_change_percent
    );
    println!();
    println!("----------------------------------------------------------------");
    println!("  TRADE STATISTICS");
    println!("----------------------------------------------------------------");
    println!("  Total Trades:     {:>12}", result.statistics.total_trades);
    println!("  Winning Trades:   {:>12}", result.statistics.winning_trades);
    println!("  Losing Trades:    {:>12}", result.statistics.losing_trades);
    println!("  Win Rate:         {:>12.1}%", result.statistics.win_rate);
    println!("  Highest Win:      {:>+12.2}%", result.highest_win_percent);
    println!("  Highest Loss:     {:>+12.2}%", result.highest_loss_percent);
    println!();
    println!("================================================================");

    if !result.trades.is_empty() {
        println!();
        println!("  RECENT TRADES (last 5)");
        println!("----------------------------------------------------------------");
        for trade in result.trades.iter().rev().take(5) {
            println!(
                "  {} -> {} ({}d) | {} sh | P&L: ${:+.2} ({:+.1}%) | {}",
                trade.entry_date,
                trade.exit_date,
                trade.holding_days(),
                trade.shares,
                trade.pnl(),
                trade.return_pct(),
                trade.exit_reason
            );
        }
        println!();
    }
}

fn print_comparison(outcomes: &[BatchOutcome]) {
    println!(
        "{:<12} {:<6} {:<5} {:>12} {:>10} {:>7}",
        "series", "term", "risk", "final", "net %", "trades"
    );
    for outcome in outcomes {
        let risk = if outcome.config.risk_control { "on" } else { "off" };
        match &outcome.outcome {
            Ok(result) => println!(
                "{:<12} {:<6} {:<5} {:>12.2} {:>+10.2} {:>7}",
                outcome.name,
                outcome.config.term,
                risk,
                result.final_balance,
                result.net_change_percent,
                result.statistics.total_trades
            ),
            Err(error) => println!(
                "{:<12} {:<6} {:<5} error: {}",
                outcome.name, outcome.config.term, risk, error
            ),
        }
    }
}
