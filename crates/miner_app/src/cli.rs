use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miner_core::{GraphType, OutputFormat, SamplingMethod, SearchStrategy};

use crate::app::Goal;
use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "miner")]
#[command(about = "Drive and monitor graph pattern-mining jobs", long_about = None)]
pub struct Cli {
    /// RON config file; missing file means defaults
    #[arg(long, global = true, default_value = "miner.ron")]
    pub config: PathBuf,

    /// Mining service base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List imported graph jobs
    History,
    /// Make a job the active one on the service
    Select {
        /// Job id as shown by `history`
        job_id: String,
    },
    /// Run pattern mining on the active job and follow its progress
    Mine(MineArgs),
}

#[derive(Args, Default)]
pub struct MineArgs {
    /// Job to mine instead of the service's current selection
    #[arg(long)]
    pub job: Option<String>,

    #[arg(long)]
    pub min_pattern_size: Option<u32>,
    #[arg(long)]
    pub max_pattern_size: Option<u32>,
    #[arg(long)]
    pub min_neighborhood_size: Option<u32>,
    #[arg(long)]
    pub max_neighborhood_size: Option<u32>,
    #[arg(long)]
    pub n_neighborhoods: Option<u32>,
    #[arg(long)]
    pub n_trials: Option<u32>,
    #[arg(long)]
    pub out_batch_size: Option<u32>,
    /// greedy | mcts
    #[arg(long)]
    pub search_strategy: Option<SearchStrategy>,
    /// tree | radius
    #[arg(long)]
    pub sample_method: Option<SamplingMethod>,
    /// directed | undirected
    #[arg(long)]
    pub graph_type: Option<GraphType>,
    /// representative | instance
    #[arg(long)]
    pub output_format: Option<OutputFormat>,

    /// Directory for the downloaded result
    #[arg(long)]
    pub download_dir: Option<PathBuf>,
    /// Do not download the result
    #[arg(long, conflicts_with = "download_dir")]
    pub no_download: bool,
    /// Cancel the run if it has not finished after this many seconds
    #[arg(long)]
    pub max_wait_secs: Option<u64>,
}

impl Cli {
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        let Command::Mine(args) = &self.command else {
            return;
        };

        let params = &mut config.params;
        let numeric = [
            (&mut params.min_pattern_size, args.min_pattern_size),
            (&mut params.max_pattern_size, args.max_pattern_size),
            (&mut params.min_neighborhood_size, args.min_neighborhood_size),
            (&mut params.max_neighborhood_size, args.max_neighborhood_size),
            (&mut params.n_neighborhoods, args.n_neighborhoods),
            (&mut params.n_trials, args.n_trials),
            (&mut params.out_batch_size, args.out_batch_size),
        ];
        for (slot, value) in numeric {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(strategy) = args.search_strategy {
            params.search_strategy = strategy;
        }
        if let Some(method) = args.sample_method {
            params.sample_method = method;
        }
        if let Some(graph_type) = args.graph_type {
            params.graph_type = graph_type;
        }
        if let Some(format) = args.output_format {
            params.output_format = format;
        }

        if args.no_download {
            config.download_dir = None;
        } else if let Some(dir) = &args.download_dir {
            config.download_dir = Some(dir.clone());
        }
    }

    pub fn goal(&self) -> Goal {
        match &self.command {
            Command::History => Goal::History,
            Command::Select { job_id } => Goal::Select(job_id.clone()),
            Command::Mine(args) => Goal::Mine {
                job: args.job.clone(),
                max_wait: args.max_wait_secs.map(std::time::Duration::from_secs),
            },
        }
    }
}
