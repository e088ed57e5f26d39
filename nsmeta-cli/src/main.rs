use std::path::PathBuf;
use std::str::FromStr;

use argh::FromArgs;
use sqlx::postgres::PgPoolOptions;

use nsmeta_core::InodeId;
use nsmeta_db::{Dialect, NamespaceDriver};

mod config;

use config::NamespaceConfig;

/// Namespace metadata engine: migration bootstrap and a small inspection CLI.
#[derive(FromArgs)]
struct Cli {
    #[argh(option, short = 'c', default = "PathBuf::from(\"nsmeta.toml\")")]
    /// path to the TOML configuration file
    config: PathBuf,

    #[argh(switch, short = 'v')]
    /// emit debug-level logs
    verbose: bool,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Migrate(MigrateCmd),
    Stat(StatCmd),
    Ls(LsCmd),
    Mkdir(MkdirCmd),
}

/// apply pending schema migrations
#[derive(FromArgs)]
#[argh(subcommand, name = "migrate")]
struct MigrateCmd {}

/// print an inode's attributes
#[derive(FromArgs)]
#[argh(subcommand, name = "stat")]
struct StatCmd {
    #[argh(positional)]
    inode: String,
    #[argh(option, default = "0")]
    /// data level (0 = primary data, 1-7 = sidecar levels)
    level: u8,
}

/// list a directory's entries
#[derive(FromArgs)]
#[argh(subcommand, name = "ls")]
struct LsCmd {
    #[argh(positional)]
    inode: String,
}

/// create a subdirectory
#[derive(FromArgs)]
#[argh(subcommand, name = "mkdir")]
struct MkdirCmd {
    #[argh(positional)]
    parent: String,
    #[argh(positional)]
    name: String,
    #[argh(option, default = "0o755")]
    mode: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli: Cli = argh::from_env();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let config = NamespaceConfig::load(&cli.config)?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    let known = nsmeta_db::dialect::KNOWN_DIALECTS
        .iter()
        .any(|d| d.name.eq_ignore_ascii_case(&config.dialect));
    if !known {
        tracing::warn!(dialect = %config.dialect, "unknown dialect, falling back to default");
    }
    let dialect = Dialect::for_name(&config.dialect);
    let driver = NamespaceDriver::new(dialect, config.default_io_enabled);

    match cli.command {
        Command::Migrate(_) => {
            nsmeta_db::MIGRATOR.run(&pool).await?;
            println!("migrations applied");
        }
        Command::Stat(cmd) => {
            let inode = InodeId::from_str(&cmd.inode)
                .map_err(|e| anyhow::anyhow!("invalid inode id: {e}"))?;
            match driver.stat(&pool, inode, cmd.level).await? {
                Some(stat) => println!("{stat:#?}"),
                None => println!("not found"),
            }
        }
        Command::Ls(cmd) => {
            let inode = InodeId::from_str(&cmd.inode)
                .map_err(|e| anyhow::anyhow!("invalid inode id: {e}"))?;
            for name in driver.list_dir(&pool, inode).await? {
                println!("{name}");
            }
        }
        Command::Mkdir(cmd) => {
            let parent = InodeId::from_str(&cmd.parent)
                .map_err(|e| anyhow::anyhow!("invalid inode id: {e}"))?;
            let id = driver
                .mkdir(&pool, parent, &cmd.name, 0, 0, cmd.mode)
                .await?;
            println!("{id}");
        }
    }

    Ok(())
}
