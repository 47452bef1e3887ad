use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;

use petclinic_load::commands::{inspect, run};
use petclinic_load::config::LoadArgs;
use petclinic_load::logging::init_logger;

#[derive(Parser)]
#[command(name = "petclinic-load")]
#[command(version)]
#[command(about = "Load-test harness for the Spring PetClinic REST API")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate load with the selected scenarios and print a summary
    Run {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Print the resolved scenario options as JSON without sending traffic
    Inspect {
        #[command(flatten)]
        load: LoadArgs,
    },
}

pub fn print_banner() {
    let line = concat!(
        "petclinic-load v",
        env!("CARGO_PKG_VERSION"),
        " - PetClinic REST load test"
    );
    if atty::is(atty::Stream::Stdout) {
        println!("{}", line.cyan());
    } else {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Run { load } => {
            print_banner();
            run::handle_run(load).await?;
        }
        Commands::Inspect { load } => {
            inspect::handle_inspect(load)?;
        }
    }

    Ok(())
}
