use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use google_apiclient::console::TerminalConsole;
use google_apiclient::services::Gmail;
use google_apiclient::{
    ApiClientError, AuthorizationMode, Console, LineConsole, LocalServerConfig, Module,
    ModuleConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "google-apiclient",
    about = "Set up OAuth credentials for Google APIs and keep their access tokens fresh.",
    arg_required_else_help = true
)]
struct Cli {
    /// Module configuration file (JSON)
    #[arg(long, global = true, env = "GOOGLE_APICLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory that `@runtime` expands to
    #[arg(long, global = true)]
    runtime_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Configures a Google API and stores its credentials
    Configure {
        /// Client secret file downloaded from the Google Cloud console
        client_secret_path: String,

        /// API name, prompted for when missing or unknown
        api: Option<String>,

        /// Directory receiving the credential file
        #[arg(long)]
        config_path: Option<String>,

        /// Paste the verification code instead of running a loopback listener
        #[arg(long)]
        manual: bool,

        /// Do not try to open the consent page in a browser
        #[arg(long)]
        no_browser: bool,

        /// Loopback listener port; 0 picks a free one
        #[arg(long, default_value_t = 0)]
        port: u16,
    },

    /// Lists all the available APIs
    List {
        /// Show every version of each API
        #[arg(long)]
        show_all_versions: bool,
    },

    /// Prints a valid access token for a configured component
    Token { component: String },

    /// Prints the subject of the latest inbox message using a Gmail component
    Demo {
        component: String,

        #[arg(long, default_value = "me")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), ApiClientError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => ModuleConfig::load(path)?,
        None => ModuleConfig::default(),
    };
    if let Some(runtime_dir) = cli.runtime_dir {
        config.runtime_dir = runtime_dir;
    }

    match cli.command {
        Command::Configure {
            client_secret_path,
            api,
            config_path,
            manual,
            no_browser,
            port,
        } => {
            if let Some(config_path) = config_path {
                config.config_path = config_path;
            }
            let module = Module::new(config);
            let secret_path = module.resolve_path(client_secret_path)?;
            let mode = if manual {
                AuthorizationMode::Manual
            } else {
                AuthorizationMode::LocalServer(LocalServerConfig::default().with_port(port))
            };

            if std::io::stdin().is_terminal() {
                let console = TerminalConsole::new(!no_browser);
                run_configure(&module, console, secret_path, api, mode).await
            } else {
                let console = LineConsole::new(
                    std::io::stdin().lock(),
                    std::io::stdout(),
                    std::io::stderr(),
                );
                run_configure(&module, console, secret_path, api, mode).await
            }
        }
        Command::List { show_all_versions } => {
            let module = Module::new(config);
            let console = LineConsole::new(std::io::empty(), std::io::stdout(), std::io::stderr());
            module.command(console)?.list(show_all_versions).await
        }
        Command::Token { component } => {
            let module = Module::new(config);
            let client = module.component(&component)?.authorized_client().await?;
            let output = serde_json::to_string_pretty(client.access_token())?;
            println!("{output}");
            Ok(())
        }
        Command::Demo { component, user } => {
            let module = Module::new(config);
            let gmail: Gmail = module.component(&component)?.service().await?;
            match gmail.latest_inbox_subject(&user).await? {
                None => println!("You have no emails in your INBOX .. how did you achieve that ??"),
                Some(subject) => println!("Your last email subject is: {subject}"),
            }
            Ok(())
        }
    }
}

async fn run_configure<C: Console>(
    module: &Module,
    console: C,
    client_secret_path: PathBuf,
    api: Option<String>,
    mode: AuthorizationMode,
) -> Result<(), ApiClientError> {
    let mut command = module.command(console)?;
    command
        .configure(client_secret_path, api.as_deref(), &mode)
        .await?;
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn configure_takes_secret_path_before_api() {
        let cli = Cli::try_parse_from(["google-apiclient", "configure", "secret.json", "gmail"])
            .unwrap();
        match cli.command {
            Command::Configure {
                client_secret_path,
                api,
                ..
            } => {
                assert_eq!(client_secret_path, "secret.json");
                assert_eq!(api.as_deref(), Some("gmail"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn configure_requires_secret_path() {
        assert!(Cli::try_parse_from(["google-apiclient", "configure"]).is_err());
    }
}
