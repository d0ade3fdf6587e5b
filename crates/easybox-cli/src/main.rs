use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use easybox_core::EasyboxConfig;
use easybox_installer::{
    Collaborators, EngineConfig, HttpFetcher, LifecycleEngine, ShellExecutor, StateLayout,
    SystemExtractor,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

mod completion;
mod render;

use completion::{write_completions_script, CliCompletionShell};
use render::{
    format_doctor_lines, format_info_json, format_install_report_lines, format_list_lines,
    format_plan_lines, format_rollback_lines, render_error_line, ProgressFetcher,
    TerminalRenderer,
};

const LOG_ENV_VAR: &str = "EASYBOX_LOG";
const DRY_RUN_FLAG: &str = "--dry-run";

#[derive(Parser, Debug)]
#[command(name = "easybox")]
#[command(version, about = "Local application lifecycle manager", long_about = None)]
struct Cli {
    /// Directory holding easybox.toml and all easybox state.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Extraction directory; overrides install_path from easybox_config.json.
    #[arg(long, global = true)]
    install_path: Option<PathBuf>,
    /// Skip the per-application lock file.
    #[arg(long, global = true)]
    no_lock: bool,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Honors `--dry-run` even when it follows the application name, where
    /// clap collects it as a start-command argument.
    fn normalized(mut self) -> Self {
        if let Commands::Install { dry_run, args, .. } = &mut self.command {
            let before = args.len();
            args.retain(|arg| arg != DRY_RUN_FLAG);
            *dry_run |= args.len() != before;
        }
        self
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install or refresh an application, then run its start command.
    Install {
        name: String,
        /// Print what would happen without touching any state.
        #[arg(long)]
        dry_run: bool,
        /// Extra arguments appended to the start command.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Refresh an application if its remote artifact changed.
    Update { name: String },
    /// Remove the cached artifact and metadata of an application.
    Rollback { name: String },
    /// List installed applications.
    List,
    /// Print the metadata record of an installed application.
    Info { name: String },
    /// Print resolved state paths.
    Doctor,
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse().normalized();
    init_tracing(cli.verbose);
    let renderer = TerminalRenderer::current();

    match run_cli(cli, renderer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error_line(renderer.style(), &err));
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli, renderer: TerminalRenderer) -> Result<()> {
    let layout = StateLayout::new(&cli.root);

    match &cli.command {
        Commands::Completions { shell } => {
            let mut stdout = io::stdout().lock();
            write_completions_script(*shell, &mut stdout)?;
            stdout.flush().context("failed flushing completion script")?;
            return Ok(());
        }
        Commands::Doctor => {
            let config = engine_config(&cli, &layout)?;
            renderer.print_lines(&format_doctor_lines(&layout, &config));
            return Ok(());
        }
        _ => {}
    }

    let config = engine_config(&cli, &layout)?;
    let http = HttpFetcher::new()?;
    let fetcher = ProgressFetcher::new(&http, renderer.style());
    let extractor = SystemExtractor;
    let executor = ShellExecutor::new().in_dir(layout.root());
    let engine = LifecycleEngine::new(
        config,
        Collaborators {
            fetcher: &fetcher,
            extractor: &extractor,
            executor: &executor,
        },
    );

    match cli.command {
        Commands::Install {
            name,
            dry_run: true,
            args,
        } => {
            let plan = engine.plan_install(&name, &args)?;
            renderer.print_lines(&format_plan_lines(&plan));
        }
        Commands::Install { name, args, .. } => {
            layout.ensure_base_dirs()?;
            let report = engine.install(&name, &args)?;
            renderer.print_lines(&format_install_report_lines(&report, renderer.style()));
        }
        Commands::Update { name } => {
            layout.ensure_base_dirs()?;
            let report = engine.update(&name)?;
            renderer.print_lines(&format_install_report_lines(&report, renderer.style()));
        }
        Commands::Rollback { name } => {
            layout.ensure_base_dirs()?;
            let report = engine.rollback(&name)?;
            renderer.print_lines(&format_rollback_lines(&report, renderer.style()));
        }
        Commands::List => {
            let names = engine.list()?;
            renderer.print_lines(&format_list_lines(&names));
        }
        Commands::Info { name } => {
            let record = engine.info(&name)?;
            println!("{}", format_info_json(&record)?);
        }
        Commands::Doctor | Commands::Completions { .. } => {}
    }

    Ok(())
}

fn engine_config(cli: &Cli, layout: &StateLayout) -> Result<EngineConfig> {
    let mut config = EasyboxConfig::load(&layout.config_path())?;
    if let Some(install_path) = &cli.install_path {
        config.install_path = Some(install_path.clone());
    }

    let engine_config = EngineConfig::from_layout(layout, &config);
    Ok(if cli.no_lock {
        engine_config.without_locking()
    } else {
        engine_config
    })
}

fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for_verbosity(verbose).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .try_init();
}
