use clap::{Args, Subcommand, ValueEnum};
use engine_config::settings::task::{ReaderKind, SyncOverrides};
use engine_processing::control::ClearScope;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Push the source onto the queue, resuming from the last checkpoint
    Sync {
        #[command(flatten)]
        task: TaskArgs,

        #[command(flatten)]
        sync: SyncArgs,
    },
    /// Print the progress of a task
    Monitor {
        #[command(flatten)]
        task: TaskArgs,

        #[arg(long, help = "Print the progress as JSON instead of a table")]
        json: bool,
    },
    /// Remove the checkpoint and/or the queued records of a task
    Clear {
        #[command(flatten)]
        task: TaskArgs,

        #[arg(short = 'C', long = "clean-type", value_enum, help = "What to remove")]
        scope: ScopeArg,
    },
    /// Print or save a task file template
    New {
        #[arg(short = 'T', long = "task-type", value_enum)]
        task_type: TemplateArg,

        #[arg(short, long = "output-task-file", help = "Save the template into this file")]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
pub struct TaskArgs {
    #[arg(short = 'f', long = "config-file", help = "Task config file")]
    pub config: PathBuf,
}

/// Command line overrides of the task's `sync` section.
#[derive(Args, Default)]
pub struct SyncArgs {
    #[arg(short, long, help = "Records read from the source per page")]
    pub limit: Option<usize>,

    #[arg(long, help = "The queue holds at most limit * scale records")]
    pub limit_scale: Option<usize>,

    #[arg(long, conflicts_with = "no_blocking", help = "Wait while the queue is full")]
    pub blocking: bool,

    #[arg(short = 'B', long, help = "Push regardless of the queue length")]
    pub no_blocking: bool,

    #[arg(short, long, help = "Seconds to wait before checking the queue again")]
    pub time_sleep: Option<u64>,
}

impl SyncArgs {
    pub fn overrides(&self) -> SyncOverrides {
        let block = match (self.blocking, self.no_blocking) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        SyncOverrides {
            limit: self.limit,
            scale: self.limit_scale,
            block,
            sleep: self.time_sleep,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    Status,
    Queue,
    All,
}

impl From<ScopeArg> for ClearScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Status => ClearScope::Status,
            ScopeArg::Queue => ClearScope::Queue,
            ScopeArg::All => ClearScope::All,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TemplateArg {
    Mysql,
    Mongo,
    Json,
    File,
    Csv,
}

impl From<TemplateArg> for ReaderKind {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::Mysql => ReaderKind::Mysql,
            TemplateArg::Mongo => ReaderKind::Mongo,
            TemplateArg::Json => ReaderKind::Json,
            TemplateArg::File => ReaderKind::File,
            TemplateArg::Csv => ReaderKind::Csv,
        }
    }
}
