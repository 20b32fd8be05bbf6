//! Command-line front end.
//!
//! Stands in for the dashboard's UI layer: it loads the table once, then
//! answers one selection request per invocation through the filter API.

use crate::filter::SensorPath;
use crate::loader;
use crate::logging::LogFormat;
use crate::map::node_map;
use crate::options::{cascade, day_options, Selection};
use crate::query::Query;
use crate::series::{build_plot, Plot, Smoothing};
use aot_common::{Error, OutputFormat, Result, Table};
use aot_config::{resolve_config, ConfigOverrides, DashboardConfig};
use aot_store::{pretty_format, TableCache};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "aot-dash",
    version,
    about = "Array of Things sensor data: load, cache, and filter readings"
)]
pub struct Cli {
    /// Config file (JSON). Defaults to $XDG_CONFIG_HOME/aot_dashboard/config.json
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding data.csv, nodes.csv and the cache
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Table cache path
    #[arg(long, global = true, value_name = "FILE")]
    pub cache: Option<PathBuf>,

    /// Measurement log (CSV)
    #[arg(long, global = true, value_name = "FILE")]
    pub measurements: Option<PathBuf>,

    /// Node metadata (CSV)
    #[arg(long, global = true, value_name = "FILE")]
    pub nodes: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,

    /// Log format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build (or read the cached) table and summarize it
    Load,
    /// Node locations for the map view
    Nodes,
    /// Days present in the data
    Days,
    /// Dropdown options for a partial selection
    Options(SelectionArgs),
    /// Rows matching a selection
    Query(QueryArgs),
    /// Per-day time series for a selection
    Series(SeriesArgs),
    /// Inspect or delete the table cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache file metadata
    Status,
    /// Delete the cache so the next load rebuilds it
    Clear,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Node id
    #[arg(long)]
    pub node: Option<String>,
    /// Subsystem (e.g. metsense)
    #[arg(long)]
    pub subsystem: Option<String>,
    /// Sensor (e.g. tsys01)
    #[arg(long)]
    pub sensor: Option<String>,
    /// Parameter (e.g. temperature)
    #[arg(long)]
    pub parameter: Option<String>,
}

impl SelectionArgs {
    fn selection(&self) -> Selection {
        Selection {
            node_id: self.node.clone(),
            subsystem: self.subsystem.clone(),
            sensor: self.sensor.clone(),
            parameter: self.parameter.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Calendar day (YYYY-MM-DD); repeatable
    #[arg(long = "day", value_name = "DATE")]
    pub days: Vec<NaiveDate>,

    /// Start of a date range (date or timestamp; only the date counts)
    #[arg(long, requires = "end", value_parser = parse_datetime_arg)]
    pub start: Option<NaiveDateTime>,

    /// End of a date range, inclusive
    #[arg(long, requires = "start", value_parser = parse_datetime_arg)]
    pub end: Option<NaiveDateTime>,

    /// Start of a time-of-day window (HH:MM[:SS]), inclusive
    #[arg(long, requires = "to_time", value_parser = parse_time_arg)]
    pub from_time: Option<NaiveTime>,

    /// End of a time-of-day window, inclusive
    #[arg(long, requires = "from_time", value_parser = parse_time_arg)]
    pub to_time: Option<NaiveTime>,

    /// Rows shown in summary output
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl QueryArgs {
    pub fn query(&self) -> Query {
        let sel = &self.selection;
        let mut query = Query::new().path(SensorPath {
            subsystem: sel.subsystem.clone(),
            sensor: sel.sensor.clone(),
            parameter: sel.parameter.clone(),
        });
        if let Some(node) = &sel.node {
            query = query.node(node.as_str());
        }
        for day in &self.days {
            query = query.day(*day);
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            query = query.date_range(start, end);
        }
        if let (Some(from), Some(to)) = (self.from_time, self.to_time) {
            query = query.time_range(from, to);
        }
        query
    }
}

#[derive(Args, Debug, Clone)]
pub struct SeriesArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Day to plot (YYYY-MM-DD); repeatable. Defaults to the first days in the data
    #[arg(long = "day", value_name = "DATE")]
    pub days: Vec<NaiveDate>,

    /// Smooth with a trailing moving average
    #[arg(long)]
    pub moving_average: bool,

    /// Moving-average window in samples (overrides config)
    #[arg(long, requires = "moving_average")]
    pub window: Option<usize>,
}

fn parse_time_arg(s: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| format!("expected HH:MM[:SS]: {e}"))
}

fn parse_datetime_arg(s: &str) -> std::result::Result<NaiveDateTime, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    crate::ingest::parse_timestamp(s).map_err(|e| e.to_string())
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides {
        config_file: cli.config.clone(),
        data_dir: cli.data_dir.clone(),
        cache: cli.cache.clone(),
        measurements: cli.measurements.clone(),
        nodes: cli.nodes.clone(),
        moving_average_window: None,
    };
    let config = resolve_config(&overrides)?.config;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Command::Cache { command } = &cli.command {
        return run_cache(command, &config, cli.format, &mut out);
    }

    // Load eagerly so every command below only filters in memory.
    let table = loader::install(config.paths.clone())?.get()?;

    match &cli.command {
        Command::Load => cmd_load(&table, &config, cli.format, &mut out),
        Command::Nodes => cmd_nodes(&table, &config, cli.format, &mut out),
        Command::Days => cmd_days(&table, cli.format, &mut out),
        Command::Options(args) => cmd_options(&table, args, cli.format, &mut out),
        Command::Query(args) => cmd_query(&table, args, cli.format, &mut out),
        Command::Series(args) => cmd_series(&table, args, &config, cli.format, &mut out),
        Command::Cache { .. } => Ok(()),
    }
}

fn emit_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn csv_unsupported(command: &str) -> Error {
    Error::Config(format!("csv output is not available for `{command}`"))
}

fn csv_writer<W: Write>(out: W) -> csv::Writer<W> {
    csv::Writer::from_writer(out)
}

fn csv_err(err: csv::Error) -> Error {
    Error::Io(err.into())
}

#[derive(Serialize)]
struct LoadSummary<'a> {
    rows: usize,
    nodes: usize,
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
    cache: &'a std::path::Path,
}

fn cmd_load(
    table: &Table,
    config: &DashboardConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let span = table.date_span();
    let summary = LoadSummary {
        rows: table.len(),
        nodes: table.node_ids().len(),
        first_date: span.map(|s| s.0),
        last_date: span.map(|s| s.1),
        cache: &config.paths.cache,
    };
    match format {
        OutputFormat::Json => emit_json(out, &summary),
        OutputFormat::Csv => Err(csv_unsupported("load")),
        OutputFormat::Summary => {
            write!(out, "{} rows from {} nodes", summary.rows, summary.nodes)?;
            if let Some((first, last)) = span {
                write!(out, ", {first} to {last}")?;
            }
            writeln!(out)?;
            writeln!(out, "cache: {}", config.paths.cache.display())?;
            Ok(())
        }
    }
}

fn cmd_nodes(
    table: &Table,
    config: &DashboardConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let map = node_map(table, &config.map);
    match format {
        OutputFormat::Json => emit_json(out, &map),
        OutputFormat::Csv => {
            let mut w = csv_writer(out);
            w.write_record(["node_id", "latitude", "longitude", "address", "subsystems", "size", "color"])
                .map_err(csv_err)?;
            for m in &map.markers {
                w.write_record([
                    m.node_id.clone(),
                    m.latitude.to_string(),
                    m.longitude.to_string(),
                    m.address.clone(),
                    m.subsystems.join(";"),
                    m.size.to_string(),
                    m.color.clone(),
                ])
                .map_err(csv_err)?;
            }
            w.flush()?;
            Ok(())
        }
        OutputFormat::Summary => {
            for m in &map.markers {
                writeln!(
                    out,
                    "{}  ({:.6}, {:.6})  {}  subsystems: {}",
                    m.node_id,
                    m.latitude,
                    m.longitude,
                    m.address,
                    m.subsystems.join(", ")
                )?;
            }
            Ok(())
        }
    }
}

fn cmd_days(table: &Table, format: OutputFormat, out: &mut impl Write) -> Result<()> {
    let days = day_options(table);
    match format {
        OutputFormat::Json => emit_json(out, &days),
        OutputFormat::Csv => {
            let mut w = csv_writer(out);
            for day in &days {
                w.serialize(day).map_err(csv_err)?;
            }
            w.flush()?;
            Ok(())
        }
        OutputFormat::Summary => {
            for day in &days {
                writeln!(out, "{}  {}", day.date, day.label)?;
            }
            Ok(())
        }
    }
}

fn cmd_options(
    table: &Table,
    args: &SelectionArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let result = cascade(table, &args.selection());
    match format {
        OutputFormat::Json => emit_json(out, &result),
        OutputFormat::Csv => Err(csv_unsupported("options")),
        OutputFormat::Summary => {
            let sel = &result.selection;
            for (level, chosen, opts) in [
                ("node", &sel.node_id, &result.nodes),
                ("subsystem", &sel.subsystem, &result.subsystems),
                ("sensor", &sel.sensor, &result.sensors),
                ("parameter", &sel.parameter, &result.parameters),
            ] {
                let values: Vec<&str> = opts.iter().map(|o| o.value.as_str()).collect();
                writeln!(
                    out,
                    "{level}: {}  [{}]",
                    chosen.as_deref().unwrap_or("-"),
                    values.join(", ")
                )?;
            }
            Ok(())
        }
    }
}

fn cmd_query(
    table: &Table,
    args: &QueryArgs,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let rows = args.query().apply(table);
    match format {
        OutputFormat::Json => emit_json(out, &rows),
        OutputFormat::Csv => {
            let mut w = csv_writer(out);
            if rows.is_empty() {
                w.write_record(aot_common::COLUMNS).map_err(csv_err)?;
            }
            for row in &rows {
                w.serialize(row).map_err(csv_err)?;
            }
            w.flush()?;
            Ok(())
        }
        OutputFormat::Summary => {
            writeln!(out, "{} rows", rows.len())?;
            if !rows.is_empty() {
                writeln!(out, "{}", pretty_format(&rows, args.limit)?)?;
                if rows.len() > args.limit {
                    writeln!(out, "... {} more", rows.len() - args.limit)?;
                }
            }
            Ok(())
        }
    }
}

fn cmd_series(
    table: &Table,
    args: &SeriesArgs,
    config: &DashboardConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let resolved = cascade(table, &args.selection.selection()).selection;
    let days = if args.days.is_empty() {
        table.dates()
    } else {
        args.days.clone()
    };
    let smoothing = if args.moving_average {
        Smoothing::MovingAverage {
            window: args.window.unwrap_or(config.moving_average_window),
        }
    } else {
        Smoothing::Raw
    };
    let plot = build_plot(table, &resolved, &days, smoothing, config.max_panels);

    match format {
        OutputFormat::Json => emit_json(out, &plot),
        OutputFormat::Csv => write_series_csv(&plot, out),
        OutputFormat::Summary => {
            writeln!(out, "{}", plot.title)?;
            for s in &plot.series {
                let defined: Vec<f64> = s.points.iter().filter_map(|p| p.value).collect();
                write!(
                    out,
                    "{} {}: {} points",
                    s.label,
                    s.date,
                    s.points.len()
                )?;
                if !defined.is_empty() {
                    let min = defined.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = defined.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    write!(out, ", min {min}, max {max}")?;
                }
                writeln!(out)?;
            }
            Ok(())
        }
    }
}

fn write_series_csv(plot: &Plot, out: &mut impl Write) -> Result<()> {
    let mut w = csv_writer(out);
    w.write_record(["date", "label", "time", "value"])
        .map_err(csv_err)?;
    for s in &plot.series {
        for p in &s.points {
            w.write_record([
                s.date.to_string(),
                s.label.clone(),
                p.time.to_string(),
                p.value.map(|v| v.to_string()).unwrap_or_default(),
            ])
            .map_err(csv_err)?;
        }
    }
    w.flush()?;
    Ok(())
}

fn run_cache(
    command: &CacheCommand,
    config: &DashboardConfig,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let cache = TableCache::new(&config.paths.cache);
    match command {
        CacheCommand::Status => {
            let status = cache.status()?;
            match format {
                OutputFormat::Json => emit_json(out, &status),
                OutputFormat::Csv => Err(csv_unsupported("cache status")),
                OutputFormat::Summary => {
                    if !status.exists {
                        writeln!(out, "no cache at {}", status.path.display())?;
                        return Ok(());
                    }
                    writeln!(out, "cache: {}", status.path.display())?;
                    if let Some(rows) = status.rows {
                        writeln!(out, "rows: {rows}")?;
                    }
                    if let Some(size) = status.size_bytes {
                        writeln!(out, "size: {size} bytes")?;
                    }
                    if let Some(version) = &status.schema_version {
                        writeln!(out, "schema: {version}")?;
                    }
                    if let Some(modified) = status.modified {
                        writeln!(out, "modified: {}", modified.to_rfc3339())?;
                    }
                    Ok(())
                }
            }
        }
        CacheCommand::Clear => {
            if format == OutputFormat::Csv {
                return Err(csv_unsupported("cache clear"));
            }
            let removed = cache.clear()?;
            match format {
                OutputFormat::Json => emit_json(
                    out,
                    &serde_json::json!({ "path": cache.path(), "removed": removed }),
                ),
                _ => {
                    if removed {
                        writeln!(out, "removed {}", cache.path().display())?;
                    } else {
                        writeln!(out, "no cache at {}", cache.path().display())?;
                    }
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_time_arg_formats() {
        assert_eq!(
            parse_time_arg("08:00").unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time_arg("08:00:30").unwrap(),
            NaiveTime::from_hms_opt(8, 0, 30).unwrap()
        );
        assert!(parse_time_arg("8am").is_err());
    }

    #[test]
    fn test_query_args_build_query() {
        let cli = Cli::try_parse_from([
            "aot-dash",
            "query",
            "--node",
            "N1",
            "--subsystem",
            "metsense",
            "--day",
            "2020-08-24",
            "--from-time",
            "08:00",
            "--to-time",
            "09:00",
        ])
        .unwrap();
        let Command::Query(args) = cli.command else {
            panic!("expected query");
        };
        let query = args.query();
        assert_eq!(query.node_id.as_ref().map(|n| n.as_str()), Some("N1"));
        assert_eq!(query.path, SensorPath::new().subsystem("metsense"));
        assert_eq!(query.days.len(), 1);
        assert!(query.time_range.is_some());
        assert!(query.date_range.is_none());
    }

    #[test]
    fn test_start_requires_end() {
        let err = Cli::try_parse_from(["aot-dash", "query", "--start", "2020-08-24"]);
        assert!(err.is_err());
    }
}
