/*!
 * Skyhook CLI
 *
 * The `run` subcommand is the remote-side worker: point it (via cron, a
 * systemd timer, or a directory watcher) at the drop path the origin copies
 * batches to, and at the inbox path results must land in.
 */

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use skyhook::{
    logging, JobBatch, JobRunner, LocalSession, RemoteJobRunner, ShellJob,
};

#[derive(Parser)]
#[command(name = "skyhook")]
#[command(version, about = "Remote job dispatch over one-way file-transfer channels", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an unexecuted shell-job batch file from command lines
    Pack {
        /// Batch file to write
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Command lines, one job each
        #[arg(required = true, value_name = "COMMAND")]
        commands: Vec<String>,
    },

    /// Execute a dropped batch file and ship the results to the inbox path
    Run {
        /// Dropped batch file (unexecuted jobs)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Inbox path the executed batch is copied to; defaults to the
        /// return address embedded in the batch
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print per-job status of a batch file
    Show {
        /// Batch file to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Commands) -> anyhow::Result<()> {
    run_command(command, &mut std::io::stdout())
}

fn run_command(command: Commands, out: &mut impl std::io::Write) -> anyhow::Result<()> {
    match command {
        Commands::Pack { output, commands } => {
            let jobs: Vec<ShellJob> = commands.into_iter().map(ShellJob::new).collect();
            let batch = JobBatch::unexecuted(jobs);
            batch.write(&output)?;
            writeln!(out, "packed {} job(s) into {}", batch.len(), output.display())?;
            Ok(())
        }

        Commands::Run { input, output } => {
            let mut remote = match output {
                Some(output) => {
                    RemoteJobRunner::<ShellJob, _>::load(LocalSession::new(), output, &input)?
                }
                None => RemoteJobRunner::<ShellJob, _>::from_dropped(LocalSession::new(), &input)?,
            };
            remote.start()?;
            remote.stop()?;

            let failed = remote
                .results()
                .iter()
                .flatten()
                .filter(|r| !r.success)
                .count();
            writeln!(
                out,
                "executed batch from {}; results at {} ({} failed)",
                input.display(),
                remote.return_file().display(),
                failed
            )?;
            Ok(())
        }

        Commands::Show { file } => {
            let batch = JobBatch::<ShellJob>::read(&file)?;
            for (index, (job, result)) in batch.jobs.iter().zip(batch.results.iter()).enumerate() {
                let status = match result {
                    None => "pending".to_string(),
                    Some(r) if r.success => "ok".to_string(),
                    Some(r) => format!("failed: {}", r.error.as_deref().unwrap_or("?")),
                };
                writeln!(out, "#{:<3} [{}] {}", index + 1, status, job.command)?;
            }
            Ok(())
        }
    }
}
