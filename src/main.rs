use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

use ncdash::cli::{self, OutputFormat, ViewOptions};
use ncdash::config::{self, NcdashConfig, schema::SourceKind};
use ncdash::dashboard::{Dashboard, View};
use ncdash::logging::EventLog;

#[derive(Debug, Parser)]
#[command(name = "ncdash")]
#[command(about = "Non-Conformance ticket reporting: status, aging, cost, customers and Pareto views")]
#[command(version)]
struct App {
    /// Use the built-in sample data instead of the configured source
    #[arg(long, global = true)]
    sample: bool,
    #[command(subcommand)]
    command: Commands,
}

/// Filters shared by every view command.
#[derive(Debug, Args)]
struct FilterArgs {
    /// Earliest submission date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    from: Option<String>,
    /// Latest submission date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    to: Option<String>,
    /// Relative window: current-week, last-week, last-2-weeks, last-4-weeks
    #[arg(long)]
    period: Option<String>,
    /// Status, e.g. "Open" or "In Progress"
    #[arg(long)]
    status: Option<String>,
    /// Priority: High, Medium or Low
    #[arg(long)]
    priority: Option<String>,
    /// External or Internal
    #[arg(long)]
    origin: Option<String>,
    /// Exact customer name ("Unspecified" for tickets without one)
    #[arg(long)]
    customer: Option<String>,
    /// Case-insensitive text search across ticket fields
    #[arg(long)]
    search: Option<String>,
    /// Clock for aging and relative periods (defaults to now)
    #[arg(long)]
    now: Option<String>,
    /// Output format: table (default), json, csv
    #[arg(long, default_value = "table")]
    format: String,
}

impl FilterArgs {
    fn options(&self, threshold: Option<f64>) -> Result<ViewOptions> {
        let now = cli::parse_now(self.now.as_deref())?;
        // `period` last: it replaces any --from/--to.
        let predicates = cli::build_predicates(
            &[
                ("from", self.from.as_deref()),
                ("to", self.to.as_deref()),
                ("status", self.status.as_deref()),
                ("priority", self.priority.as_deref()),
                ("origin", self.origin.as_deref()),
                ("customer", self.customer.as_deref()),
                ("search", self.search.as_deref()),
                ("period", self.period.as_deref()),
            ],
            now,
        )?;
        Ok(ViewOptions {
            predicates,
            now,
            threshold,
            format: OutputFormat::from_str_opt(Some(&self.format)),
        })
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Headline KPIs: counts, open rate, cost totals
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Status, priority and origin breakdowns
    Status {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Age buckets and per-priority age of open tickets
    Aging {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Rework and avoided cost by group
    Cost {
        /// Grouping: status, priority, origin, customer, issue-type, week, month
        #[arg(long, default_value = "issue-type")]
        by: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Per-customer counts, costs and risk score
    Customers {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Issue types ranked by count with cumulative share
    Pareto {
        /// Vital-few threshold in percent (default: pareto.threshold_pct)
        #[arg(long)]
        threshold: Option<f64>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// The filtered ticket list
    Tickets {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Export a view (or the ticket list) as CSV
    Export {
        /// View to export: tickets, summary, status, aging, cost, customers, pareto
        #[arg(default_value = "tickets")]
        view: String,
        /// Grouping for the cost view
        #[arg(long)]
        by: Option<String>,
        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Drop the fetch cache and reload from the source
    Refresh,
    /// Show recent data-load, export and request events
    Events {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Check config files, the data source and the event log
    Health,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Serve the JSON API
    Serve {
        /// Listen address (default: web.addr)
        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default ~/.ncdash/config.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `source.path ~/nc.csv`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn load_config(sample: bool) -> NcdashConfig {
    let mut cfg = config::load();
    if sample {
        cfg.source.kind = SourceKind::Sample;
    }
    cfg
}

fn dashboard(sample: bool) -> Result<Dashboard> {
    Dashboard::from_config(load_config(sample))
}

fn main() -> Result<()> {
    let app = App::parse();
    let sample = app.sample;

    let (view, filters, threshold) = match app.command {
        Commands::Summary { filters } => (View::Summary, filters, None),
        Commands::Status { filters } => (View::Status, filters, None),
        Commands::Aging { filters } => (View::Aging, filters, None),
        Commands::Cost { by, filters } => {
            let Some(view) = View::parse("cost", Some(&by)) else {
                bail!("unknown cost grouping '{by}'");
            };
            (view, filters, None)
        }
        Commands::Customers { filters } => (View::Customers, filters, None),
        Commands::Pareto { threshold, filters } => (View::Pareto, filters, threshold),
        Commands::Tickets { filters } => (View::Tickets, filters, None),
        Commands::Export {
            view,
            by,
            output,
            filters,
        } => {
            let Some(view) = View::parse(&view, by.as_deref()) else {
                bail!("unknown view '{view}'");
            };
            let opts = filters.options(None)?;
            return cli::run_export(&mut dashboard(sample)?, view, &opts, output.as_deref());
        }
        Commands::Refresh => return cli::run_refresh(&mut dashboard(sample)?),
        Commands::Events { limit, format } => {
            let log = EventLog::from_config(&load_config(sample).logging);
            return cli::run_events(&log, limit, OutputFormat::from_str_opt(Some(&format)));
        }
        Commands::Health => return cli::run_health(),
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => cli::run_config_show(),
                ConfigAction::Init { force } => cli::run_config_init(force),
                ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
                ConfigAction::Reset => cli::run_config_reset(),
            };
        }
        Commands::Serve { addr } => {
            let cfg = load_config(sample);
            let addr = addr.unwrap_or_else(|| cfg.web.addr.clone());
            return cli::run_serve(Dashboard::from_config(cfg)?, &addr);
        }
    };

    if let Some(pct) = threshold.filter(|p| !(0.0..=100.0).contains(p)) {
        bail!("--threshold must be between 0 and 100, got {pct}");
    }
    let opts = filters.options(threshold)?;
    cli::run_view(&mut dashboard(sample)?, view, &opts)
}
