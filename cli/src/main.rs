use anyhow::Result;
use clap::{Parser, Subcommand};
use gridiq::{chart, summary, AnalysisMode, PlayDf, PlayType};
use itertools::Itertools;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::path::PathBuf;

mod server;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// A workbook and the sheets to read from it, in the order given
#[derive(clap::Args, Debug)]
struct Selection {
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: PathBuf,

    #[arg(short = 's', long = "sheet", required = true)]
    sheets: Vec<String>,
}

impl Selection {
    fn load(&self) -> Result<PlayDf> {
        let plays = PlayDf::load(&self.file, &self.sheets)?;
        log::info!("Loaded {} plays", plays.height());
        Ok(plays)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the sheets in a workbook
    Sheets {
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        file: PathBuf,
    },
    /// Summary stats, comparable metrics, and a play count chart
    Analyze {
        #[command(flatten)]
        selection: Selection,

        #[arg(long, default_value = "offensive")]
        mode: AnalysisMode,
    },
    /// Chart one metric across the selected sheets
    Compare {
        #[command(flatten)]
        selection: Selection,

        #[arg(short = 'm', long = "metric")]
        metric: Option<String>,

        #[arg(long, default_value = "offensive")]
        mode: AnalysisMode,
    },
    /// First rows of the normalized play table
    Preview {
        #[command(flatten)]
        selection: Selection,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Plays matching a play type and/or a SQL query over the `plays` table
    Plays {
        #[command(flatten)]
        selection: Selection,

        /// Run, Pass, or Unknown
        #[arg(long)]
        play_type: Option<PlayType>,

        #[arg(long)]
        sql: Option<String>,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 5000)]
        port: u16,

        #[arg(long, default_value = "uploads")]
        upload_dir: PathBuf,

        #[arg(long, default_value_t = 16)]
        upload_limit_mb: usize,

        /// Reject everything but health checks
        #[arg(long)]
        maintenance: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set the default level based on verbosity
    let default_level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let config = ConfigBuilder::new().add_filter_allow_str("gridiq").build();
    TermLogger::init(
        default_level,
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    log::trace!("Args {:#?}", args);

    match args.command {
        Command::Sheets { file } => {
            let sheets = gridiq::sheet::list_sheets(&file)?;
            println!("{}", sheets.iter().join("\n"));
        }
        Command::Analyze { selection, mode } => {
            let plays = selection.load()?;
            let analysis = summary::analyze(&plays, mode)?;
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Command::Compare {
            selection,
            metric,
            mode,
        } => {
            let plays = selection.load()?;
            let chart = chart::compare(&plays, metric.as_deref(), mode)?;
            println!("{}", serde_json::to_string_pretty(&chart)?);
        }
        Command::Preview { selection, limit } => {
            let plays = selection.load()?;
            println!("{}", plays.head(Some(limit)));
        }
        Command::Plays {
            selection,
            play_type,
            sql,
        } => {
            let mut plays = selection.load()?;
            if let Some(play_type) = play_type {
                let filter = gridiq::filter::PlayFilter::new().play_type(play_type).build();
                plays = plays.filter(filter)?;
            }
            if let Some(sql) = sql {
                plays = plays.filter_sql(&sql)?;
            }
            log::info!("{} plays matched", plays.height());
            println!("{}", *plays);
        }
        Command::Serve {
            host,
            port,
            upload_dir,
            upload_limit_mb,
            maintenance,
        } => {
            let config = server::ServerConfig {
                host,
                port,
                upload_dir,
                upload_limit_mb,
                maintenance,
            };
            tokio::runtime::Runtime::new()?.block_on(server::serve(config))?;
        }
    }

    Ok(())
}
