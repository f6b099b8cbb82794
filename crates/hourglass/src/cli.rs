//! Command line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hourglass_core::wait::{WaitAction, WaitArgs};
use hourglass_core::{TimeUnit, WeekStart};

#[derive(Parser, Debug)]
#[command(version, about = "Calendar windows, date-math names and completion waits")]
pub struct CliArgs {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true, env = "HOURGLASS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a calendar window to epoch boundaries
    #[command(subcommand)]
    Range(RangeCommand),

    /// Render a name template; `<...>` names are resolved by the cluster
    Render {
        /// Template such as `logs-%Y.%m.%d` or `<logs-{now/d}>`
        name: String,
    },

    /// Extract the epoch encoded in a resource name
    Epoch {
        /// Resource name, e.g. `logs-2024.01.31`
        name: String,

        /// Timestring the date was rendered with, e.g. `%Y.%m.%d`
        #[arg(long)]
        timestring: String,
    },

    /// Wait for a long-running cluster operation to finish
    Wait(WaitCommand),
}

#[derive(Subcommand, Debug)]
pub enum RangeCommand {
    /// Window counted in units from now (or from `--epoch`)
    Relative(RelativeRange),

    /// Window between two literal dates
    Absolute(AbsoluteRange),
}

#[derive(Args, Debug)]
pub struct RelativeRange {
    /// hours, days, weeks, months or years
    #[arg(long)]
    pub unit: TimeUnit,

    /// First unit of the window; negative is in the past
    #[arg(long, allow_negative_numbers = true)]
    pub from: i64,

    /// Last unit of the window
    #[arg(long, allow_negative_numbers = true)]
    pub to: i64,

    /// Point of reference instead of now (seconds or milliseconds)
    #[arg(long)]
    pub epoch: Option<i64>,

    /// First day of the week for `weeks`
    #[arg(long, default_value = "sunday")]
    pub week_starts_on: WeekStart,
}

#[derive(Args, Debug)]
pub struct AbsoluteRange {
    #[arg(long)]
    pub unit: TimeUnit,

    /// Start date, e.g. `2024.01`
    #[arg(long)]
    pub from: String,

    /// End date; the window runs to the end of its unit
    #[arg(long)]
    pub to: String,

    /// Timestring for `--from`, e.g. `%Y.%m`
    #[arg(long)]
    pub from_format: Option<String>,

    /// Timestring for `--to`
    #[arg(long)]
    pub to_format: Option<String>,
}

#[derive(Args, Debug)]
pub struct WaitCommand {
    /// allocation, replicas, cluster_routing, snapshot, restore, reindex, shrink or relocate
    pub action: WaitAction,

    /// Task to follow (reindex)
    #[arg(long)]
    pub task_id: Option<String>,

    /// Snapshot name (snapshot)
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Snapshot repository (snapshot)
    #[arg(long)]
    pub repository: Option<String>,

    /// Index whose shards are moving (relocate)
    #[arg(long)]
    pub index: Option<String>,

    /// Comma separated indices being restored (restore)
    #[arg(long, value_delimiter = ',')]
    pub index_list: Option<Vec<String>>,

    /// Seconds between checks; overrides `wait.interval_secs`
    #[arg(long)]
    pub interval: Option<u64>,

    /// Seconds before giving up, -1 for no limit; overrides `wait.max_wait_secs`
    #[arg(long, allow_negative_numbers = true)]
    pub max_wait: Option<i64>,
}

impl WaitCommand {
    pub fn wait_args(&self) -> WaitArgs {
        WaitArgs {
            task_id: self.task_id.clone(),
            snapshot: self.snapshot.clone(),
            repository: self.repository.clone(),
            index: self.index.clone(),
            index_list: self.index_list.clone(),
        }
    }
}
