use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use gator_cli::{
    commands, load_settings, parse_environment_type, sort_state, CliSortKey, SettingsUpdate,
};
use gator_client::EnvironmentClient;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, env = "GATOR_SETTINGS")]
    settings: Option<Utf8PathBuf>,
    /// Server root, overriding the configured one
    #[arg(long, global = true, env = "GATOR_URL")]
    url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage conda environments
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },
    /// Manage packages of one environment
    Pkg {
        #[arg(short = 'n', long = "name", help = "Target environment")]
        env: String,
        #[command(subcommand)]
        command: PkgCommands,
    },
    /// Show or change the stored settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    Show,
    Set {
        #[arg(long = "base-url")]
        base_url: Option<String>,
        #[arg(long)]
        from_history: Option<bool>,
        #[arg(long)]
        whitelist: Option<bool>,
        #[arg(long)]
        poll_interval_ms: Option<u64>,
        #[arg(
            long = "env-type",
            value_name = "NAME=PACKAGES",
            value_parser = parse_environment_type,
            help = "Add or replace an environment type, packages space-separated"
        )]
        environment_types: Vec<(String, Vec<String>)>,
    },
}

#[derive(Subcommand)]
enum EnvCommands {
    List,
    Create {
        name: String,
        #[arg(
            short = 't',
            long = "type",
            help = "Environment type, or a space-separated package list"
        )]
        kind: Option<String>,
    },
    Clone {
        target: String,
        name: String,
    },
    Import {
        name: String,
        file: Utf8PathBuf,
    },
    Update {
        name: String,
        file: Utf8PathBuf,
    },
    Export {
        name: String,
        #[arg(long, help = "Only packages explicitly requested by the user")]
        from_history: Option<bool>,
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
    Remove {
        name: String,
    },
    Channels {
        name: String,
    },
}

#[derive(Subcommand)]
enum PkgCommands {
    List {
        #[arg(short, long, help = "Include packages available from the channels")]
        available: bool,
        #[arg(long, value_enum, default_value_t = CliSortKey::Name)]
        sort: CliSortKey,
        #[arg(long)]
        desc: bool,
    },
    Install {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    Update {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    Remove {
        #[arg(required = true)]
        packages: Vec<String>,
    },
    Develop {
        path: Utf8PathBuf,
    },
    #[command(name = "check-updates", alias = "check")]
    CheckUpdates,
    Deps {
        package: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings_file = cli.settings.as_deref();
    let connect = || -> anyhow::Result<EnvironmentClient> {
        let settings = load_settings(settings_file, cli.url.clone())?;
        Ok(EnvironmentClient::from_settings(settings)?)
    };

    match cli.command {
        Commands::Env { command } => {
            let client = connect()?;
            match command {
                EnvCommands::List => commands::cmd_env_list(&client).await?,
                EnvCommands::Create { name, kind } => {
                    commands::cmd_env_create(&client, &name, kind.as_deref()).await?
                }
                EnvCommands::Clone { target, name } => {
                    commands::cmd_env_clone(&client, &target, &name).await?
                }
                EnvCommands::Import { name, file } => {
                    commands::cmd_env_import(&client, &name, &file).await?
                }
                EnvCommands::Update { name, file } => {
                    commands::cmd_env_update(&client, &name, &file).await?
                }
                EnvCommands::Export {
                    name,
                    from_history,
                    output,
                } => commands::cmd_env_export(&client, &name, from_history, output).await?,
                EnvCommands::Remove { name } => commands::cmd_env_remove(&client, &name).await?,
                EnvCommands::Channels { name } => {
                    commands::cmd_env_channels(&client, &name).await?
                }
            }
        }
        Commands::Pkg { env, command } => {
            let client = connect()?;
            match command {
                PkgCommands::List {
                    available,
                    sort,
                    desc,
                } => {
                    commands::cmd_pkg_list(&client, &env, available, sort_state(sort, desc))
                        .await?
                }
                PkgCommands::Install { packages } => {
                    commands::cmd_pkg_install(&client, &env, &packages).await?
                }
                PkgCommands::Update { packages } => {
                    commands::cmd_pkg_update(&client, &env, &packages).await?
                }
                PkgCommands::Remove { packages } => {
                    commands::cmd_pkg_remove(&client, &env, &packages).await?
                }
                PkgCommands::Develop { path } => {
                    commands::cmd_pkg_develop(&client, &env, &path).await?
                }
                PkgCommands::CheckUpdates => {
                    commands::cmd_pkg_check_updates(&client, &env).await?
                }
                PkgCommands::Deps { package } => {
                    commands::cmd_pkg_deps(&client, &env, &package).await?
                }
            }
        }
        // Works without a reachable or even valid server URL.
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                commands::cmd_config_show(&load_settings(settings_file, cli.url.clone())?)
            }
            ConfigCommands::Set {
                base_url,
                from_history,
                whitelist,
                poll_interval_ms,
                environment_types,
            } => {
                let update = SettingsUpdate {
                    base_url,
                    from_history,
                    whitelist,
                    poll_interval_ms,
                    environment_types,
                };
                commands::cmd_config_set(settings_file, update)?;
            }
        },
    }

    Ok(())
}
