use std::sync::Arc;

use clap::{Parser, Subcommand};
use dashboard_session::config::AuthConfig;
use dashboard_session::error::{AuthProviderError, ConfigError};
use dashboard_session::flag::MemoryFlagStore;
use dashboard_session::guard::{self, GuardDecision};
use dashboard_session::provider::IdentityProvider;
use dashboard_session::provider::memory::{MemoryIdentityProvider, PopupOutcome};
use dashboard_session::router::HistoryNavigator;
use dashboard_session::SessionManager;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthProviderError),
    #[error("failed to render state: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "dashboard-session", about = "Drive the dashboard session flow against an in-memory identity provider")]
struct Cli {
    #[arg(long, env = "DEMO_EMAIL", default_value = "admin@example.com")]
    email: String,

    #[arg(long, env = "DEMO_PASSWORD", default_value = "change-me")]
    password: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and sign it in.
    Register,
    /// Sign in a pre-existing account.
    Login,
    /// Sign in through the federated popup flow.
    Federated {
        #[arg(long)]
        display_name: Option<String>,
        /// Simulate the user refusing consent.
        #[arg(long)]
        deny: bool,
    },
    /// Register, log out, log back in, reload as a returning visitor, log out.
    Cycle,
}

struct App {
    manager: Arc<SessionManager>,
    provider: Arc<MemoryIdentityProvider>,
    flags: Arc<MemoryFlagStore>,
    nav: Arc<HistoryNavigator>,
}

impl App {
    fn new(config: AuthConfig) -> Self {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let flags = Arc::new(MemoryFlagStore::new());
        let nav = Arc::new(HistoryNavigator::new());
        let manager = Arc::new(SessionManager::new(provider.clone(), flags.clone(), nav.clone(), config));
        Self { manager, provider, flags, nav }
    }

    fn report(&self, step: &str) -> Result<(), CliError> {
        let state = self.manager.state();
        let gate = match guard::require_auth(&state, self.manager.config()) {
            GuardDecision::Pending => json!("pending"),
            GuardDecision::Allow(user) => json!({ "allow": user.id }),
            GuardDecision::Redirect(path) => json!({ "redirect": path }),
        };
        let line = json!({
            "step": step,
            "state": state,
            "loginFlag": guard::presumed_logged_in(self.flags.as_ref(), self.manager.config()),
            "guard": gate,
            "route": self.nav.current(),
        });
        println!("{}", serde_json::to_string_pretty(&line)?);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AuthConfig::from_env()?;
    tracing::info!(flag = %config.flag_cookie, provider = %config.federated_provider, "session demo starting");

    let app = App::new(config);
    let mount = app.manager.mount();
    app.report("mount")?;

    match cli.command {
        Command::Register => {
            app.manager.register(&cli.email, &cli.password).await?;
            app.report("register")?;
        }
        Command::Login => {
            // Seed the account out-of-band, as if it had been registered earlier.
            app.provider.create_account(&cli.email, &cli.password).await?;
            app.provider.sign_out().await?;
            app.manager.login(&cli.email, &cli.password).await?;
            app.report("login")?;
        }
        Command::Federated { display_name, deny } => {
            let outcome = if deny {
                PopupOutcome::Denied
            } else {
                PopupOutcome::Approve { email: cli.email.clone(), display_name, photo_url: None }
            };
            app.provider.script_popup(outcome);
            let result = app.manager.login_with_federated_provider().await;
            app.report("federated")?;
            result?;
        }
        Command::Cycle => run_cycle(&app, mount, &cli.email, &cli.password).await?,
    }

    Ok(())
}

async fn run_cycle(
    app: &App,
    mount: dashboard_session::MountHandle,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    app.manager.register(email, password).await?;
    app.report("register")?;

    app.manager.logout().await?;
    app.report("logout")?;

    if let Err(err) = app.manager.login(email, "definitely-wrong").await {
        tracing::info!(code = err.code(), "rejected login surfaced to caller");
    }
    app.report("login-rejected")?;

    app.manager.login(email, password).await?;
    app.report("login")?;

    // Simulate a page reload: tear down the root and mount a fresh one while
    // the flag cookie is still present.
    mount.unmount();
    let reloaded = App {
        manager: Arc::new(SessionManager::new(
            app.provider.clone(),
            app.flags.clone(),
            app.nav.clone(),
            app.manager.config().clone(),
        )),
        provider: app.provider.clone(),
        flags: app.flags.clone(),
        nav: app.nav.clone(),
    };
    let mount = reloaded.manager.mount();
    let mut rx = reloaded.manager.subscribe();
    if rx.wait_for(|s| !s.loading).await.is_ok() {
        reloaded.report("reload")?;
    }

    reloaded.manager.logout().await?;
    reloaded.report("logout")?;
    mount.unmount();
    Ok(())
}
