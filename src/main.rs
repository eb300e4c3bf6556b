use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use recipebox::backend::{BackendError, SupabaseBackend};
use recipebox::config::{AppConfig, ConfigError};
use recipebox::routes::{
    Navigator, Route, install_root_redirect, route_after_sign_in, route_after_sign_out, route_after_sign_up,
};
use recipebox::services::AuthController;
use recipebox::services::validation::{ValidationError, validate_login, validate_reset, validate_sign_up};
use recipebox::state::auth::{AuthState, AuthStore};
use recipebox::state::query_cache::QueryCache;
use recipebox::storage::{FileStorage, KeyValueStorage};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Backend(#[from] BackendError),
}

#[derive(Parser, Debug)]
#[command(name = "recipebox", about = "Recipe box account session CLI")]
struct Cli {
    /// Directory holding persisted client state.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show who is signed in.
    Status,
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    SignUp {
        #[arg(long)]
        display_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "RECIPEBOX_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    SignOut,
    /// Email a password-reset link.
    ResetPassword {
        #[arg(long)]
        email: String,
    },
}

/// Prints route transitions instead of rendering screens.
struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: Route) {
        println!("-> {}", route.path());
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }

    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(&config.storage_dir));
    let backend = Arc::new(SupabaseBackend::new(&config.backend, Arc::clone(&storage))?);
    let store = AuthStore::rehydrate(storage);
    let controller =
        AuthController::new(backend, store.clone(), QueryCache::new()).with_reset_redirect(config.reset_redirect);

    let redirect = install_root_redirect(&store, Arc::new(PrintNavigator));
    let handle = controller.start().await;
    if let Err(e) = redirect.await {
        tracing::warn!(error = %e, "root redirect task failed");
    }

    match cli.command {
        Command::Status => print_status(&store.snapshot()),
        Command::SignIn { email, password } => {
            let creds = validate_login(&email, &password)?;
            controller.sign_in(&creds.email, &creds.password).await?;
            // An account without a profile row still gets its status printed.
            let limit = Duration::from_secs(config.backend.timeouts.request_secs);
            store.profile_loaded(limit).await;
            PrintNavigator.navigate(route_after_sign_in());
            print_status(&store.snapshot());
        }
        Command::SignUp { display_name, email, password, confirm_password } => {
            let form = validate_sign_up(&display_name, &email, &password, &confirm_password)?;
            let outcome = controller.sign_up(&form.email, &form.password, &form.display_name).await?;
            if outcome.session().is_none() {
                println!("Check your email: we sent you a confirmation link.");
            }
            PrintNavigator.navigate(route_after_sign_up(&outcome));
        }
        Command::SignOut => {
            controller.sign_out().await?;
            PrintNavigator.navigate(route_after_sign_out());
        }
        Command::ResetPassword { email } => {
            let email = validate_reset(&email)?;
            controller.reset_password(&email).await?;
            println!("Check your email for a link to reset your password.");
        }
    }

    handle.shutdown().await;
    Ok(())
}

fn print_status(state: &AuthState) {
    let Some(user) = &state.user else {
        println!("signed out");
        return;
    };
    let email = user.email.as_deref().unwrap_or("<no email>");
    match &state.profile {
        Some(profile) => println!("signed in as {email} ({})", profile.display_name),
        None => println!("signed in as {email}"),
    }
}
