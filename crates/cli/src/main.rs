use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ignite_db::bson::Bson;
use ignite_kernel::settings::{BootstrapMode, Settings};

#[derive(Debug, Parser)]
#[command(name = "ignite-cli", version, about = "Provision the user store")]
struct Cli {
    /// Target database, overriding `database.name`
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Provision the configured deployment
    Bootstrap {
        /// Skip objects that already exist instead of failing
        #[arg(long)]
        if_absent: bool,
    },
    /// Run the bootstrap against an in-memory store
    Plan {
        /// Also print each collection's validator
        #[arg(long)]
        show_schema: bool,
    },
    /// Check that the deployment answers a ping
    Ping,
    /// Check the deployment against the registered modules
    Verify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load settings")?;
    if let Some(database) = cli.database {
        settings.database.name = database;
    }
    ignite_telemetry::init(&settings.telemetry)?;

    tracing::debug!(env = ?settings.environment, command = ?cli.command, "ignite-cli starting");

    match cli.command {
        Command::Bootstrap { if_absent } => {
            if if_absent {
                settings.bootstrap.mode = BootstrapMode::IfAbsent;
            }
            let report = ignite_app::bootstrap(&settings).await?;
            println!("{report}");
        }
        Command::Plan { show_schema } => {
            let report = ignite_app::plan(&settings).await?;
            println!("{report}");

            if show_schema {
                print_schemas()?;
            }
        }
        Command::Ping => {
            ignite_app::ping(&settings).await?;
            println!("ok");
        }
        Command::Verify => {
            let report = ignite_app::verify(&settings).await?;
            for (collection, count) in &report.collections {
                println!("{collection}: {count} documents");
            }
            if !report.is_ok() {
                for problem in &report.problems {
                    eprintln!("{problem}");
                }
                bail!("verification found {} problem(s)", report.problems.len());
            }
        }
    }

    Ok(())
}

fn print_schemas() -> anyhow::Result<()> {
    let registry = ignite_app::modules::registry();
    for (_, collection) in registry.collect_collections()? {
        let validator = Bson::Document(collection.contract.to_validator()).into_relaxed_extjson();
        println!("{}:", collection.name);
        println!("{}", serde_json::to_string_pretty(&validator)?);
    }
    Ok(())
}
