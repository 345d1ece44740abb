use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dashboard_shell::config::{AppConfig, ConfigError};
use dashboard_shell::error::IdentityError;
use dashboard_shell::net::api::{ApiClient, ApiError};
use dashboard_shell::net::identity::IdentityToolkitClient;
use dashboard_shell::net::profile::HttpProfileBackend;
use dashboard_shell::pages::login::{LoginForm, LoginOutcome, LoginViewModel};
use dashboard_shell::pages::shell::{Shell, render_menu, render_prefs, render_setup_required, render_whoami};
use dashboard_shell::routes::menu::{MenuError, NavigationMenu};
use dashboard_shell::routes::table::RouteTable;
use dashboard_shell::state::controller::SessionController;
use dashboard_shell::state::events::{self, Inbox, Navigation, NoticeLevel, Outbox, UiEvent};
use dashboard_shell::state::prefs::{Locale, Preferences, ThemeMode};
use dashboard_shell::util::credentials::CredentialStore;
use dashboard_shell::util::storage::{FileStore, KeyValueStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("identity provider is not configured; run `dashboard-shell check-config`")]
    NotConfigured,
    #[error("identity client failed: {0}")]
    Identity(#[from] IdentityError),
    #[error("backend client failed: {0}")]
    Api(#[from] ApiError),
    #[error(transparent)]
    Menu(#[from] MenuError),
    #[error("login form is invalid")]
    InvalidForm,
    #[error("sign-in failed: {0}")]
    LoginFailed(String),
    #[error("a sign-in is already in progress")]
    Busy,
}

#[derive(Parser, Debug)]
#[command(name = "dashboard-shell", about = "Dashboard session, routing and preferences shell")]
struct Cli {
    /// Directory holding the persisted token, identity session and preferences.
    #[arg(long, env = "DASHBOARD_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[arg(long, env = "DASHBOARD_API_BASE_URL")]
    api_base_url: Option<String>,

    /// JSON navigation menu definition.
    #[arg(long, env = "DASHBOARD_MENU_FILE")]
    menu_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
        /// Location to open after signing in.
        #[arg(long)]
        return_to: Option<String>,
    },
    Logout,
    Whoami,
    /// Re-fetch the signed-in profile from the backend.
    Refresh,
    /// Render a location the way the dashboard would.
    Open {
        path: String,
    },
    /// Show the navigation entries visible to the current session.
    Menu {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    Prefs(PrefsCommand),
    /// Report which identity provider settings are missing.
    CheckConfig,
}

#[derive(Args, Debug)]
struct PrefsCommand {
    #[command(subcommand)]
    command: Option<PrefsSubcommand>,
}

#[derive(Subcommand, Debug)]
enum PrefsSubcommand {
    Show,
    Locale { locale: Locale },
    Theme { mode: ThemeMode },
    ToggleTheme,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url.trim_end_matches('/').to_owned();
    }
    let file_store = FileStore::in_dir(&config.state_dir);
    tracing::debug!(path = %file_store.path().display(), "state file");

    if matches!(cli.command, Command::CheckConfig) {
        run_check_config(&config, file_store.path());
        return Ok(());
    }
    let store: Arc<dyn KeyValueStore> = Arc::new(file_store);

    match cli.command {
        Command::Prefs(prefs) => {
            run_prefs(&config, store, prefs.command.unwrap_or(PrefsSubcommand::Show));
            Ok(())
        }
        command => {
            if !config.identity.is_configured() {
                print!("{}", render_setup_required(&config.identity.missing_keys()));
                return Err(CliError::NotConfigured);
            }
            let mut app = App::start(config, store).await?;
            let result = app.run(command, cli.menu_file.as_deref()).await;
            app.flush_events();
            result
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run_check_config(config: &AppConfig, state_file: &Path) {
    if config.identity.is_configured() {
        println!("identity provider: configured");
    } else {
        print!("{}", render_setup_required(&config.identity.missing_keys()));
    }
    println!("api base url:  {}", config.api_base_url);
    println!("state file:    {}", state_file.display());
    println!("login path:    {}", config.login_path);
    println!("home path:     {}", config.home_path);
}

fn run_prefs(config: &AppConfig, store: Arc<dyn KeyValueStore>, command: PrefsSubcommand) {
    let prefs = Preferences::new(store, config.default_locale, config.default_theme);
    match command {
        PrefsSubcommand::Show => {}
        PrefsSubcommand::Locale { locale } => prefs.change_language(locale),
        PrefsSubcommand::Theme { mode } => prefs.change_theme_mode(mode),
        PrefsSubcommand::ToggleTheme => {
            prefs.toggle_theme();
        }
    }
    print!("{}", render_prefs(prefs.locale(), prefs.theme()));
}

fn load_menu(path: Option<&Path>) -> Result<NavigationMenu, MenuError> {
    path.map_or_else(|| Ok(NavigationMenu::default()), NavigationMenu::load)
}

// =============================================================================
// SESSION COMMANDS
// =============================================================================

struct App {
    config: AppConfig,
    controller: Arc<SessionController>,
    outbox: Outbox,
    inbox: Inbox,
}

impl App {
    /// Wire the clients and controller, resume any stored session, and wait
    /// until the session has resolved.
    async fn start(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, CliError> {
        let credentials = CredentialStore::new(Arc::clone(&store));
        let (outbox, inbox) = events::channel();

        let hook_outbox = outbox.clone();
        let login_path = config.login_path.clone();
        let api = ApiClient::new(&config.api_base_url, credentials.clone(), config.http_timeout)?
            .with_unauthorized_hook(Arc::new(move || {
                hook_outbox.navigate(Navigation::Hard { to: login_path.clone() });
            }));
        let backend = Arc::new(HttpProfileBackend::new(Arc::new(api)));
        let identity = Arc::new(IdentityToolkitClient::new(&config.identity, store, config.http_timeout)?);

        let controller = Arc::new(SessionController::new(
            identity.clone(),
            backend,
            credentials,
            outbox.clone(),
            config.login_path.clone(),
        ));
        controller.spawn();
        identity.restore().await;
        let session = controller.resolved().await;
        tracing::debug!(phase = ?session.phase(), "session resolved");

        Ok(Self { config, controller, outbox, inbox })
    }

    fn shell(&self, menu: NavigationMenu) -> Shell {
        Shell::new(RouteTable::standard(&self.config.login_path, &self.config.home_path), menu)
    }

    async fn run(&mut self, command: Command, menu_file: Option<&Path>) -> Result<(), CliError> {
        match command {
            Command::Login { email, password, return_to } => {
                let view = LoginViewModel::new(
                    Arc::clone(&self.controller),
                    self.outbox.clone(),
                    self.config.home_path.clone(),
                );
                match view.handle_login(&LoginForm::new(email, password), return_to.as_deref()).await {
                    LoginOutcome::SignedIn { to } => {
                        let screen = self.shell(load_menu(menu_file)?).open(&to, &self.controller.snapshot()).await;
                        print!("{}", screen.body);
                        Ok(())
                    }
                    LoginOutcome::Invalid(errors) => {
                        for error in errors {
                            eprintln!("{:?}: {}", error.field, error.message);
                        }
                        Err(CliError::InvalidForm)
                    }
                    LoginOutcome::Failed { message } => Err(CliError::LoginFailed(message)),
                    LoginOutcome::Busy => Err(CliError::Busy),
                }
            }
            Command::Logout => {
                self.controller.logout().await;
                println!("Signed out");
                Ok(())
            }
            Command::Whoami => {
                print!("{}", render_whoami(&self.controller.snapshot()));
                Ok(())
            }
            Command::Refresh => {
                self.controller.refresh_profile().await;
                print!("{}", render_whoami(&self.controller.snapshot()));
                Ok(())
            }
            Command::Open { path } => {
                let screen = self.shell(load_menu(menu_file)?).open(&path, &self.controller.snapshot()).await;
                for hop in &screen.redirects {
                    eprintln!("-> {hop}");
                }
                print!("{}", screen.body);
                Ok(())
            }
            Command::Menu { file } => {
                let menu = load_menu(file.as_deref().or(menu_file))?;
                let session = self.controller.snapshot();
                print!("{}", render_menu(&menu.visible(&session), &self.config.home_path));
                Ok(())
            }
            Command::Prefs(_) | Command::CheckConfig => Ok(()),
        }
    }

    /// Print queued notices and navigation requests.
    fn flush_events(&mut self) {
        for event in self.inbox.drain() {
            match event {
                UiEvent::Notice(notice) => {
                    let level = match notice.level {
                        NoticeLevel::Info => "info",
                        NoticeLevel::Success => "ok",
                        NoticeLevel::Warning => "warn",
                        NoticeLevel::Error => "error",
                    };
                    eprintln!("[{level}] {}", notice.message);
                }
                UiEvent::Navigate(navigation) => eprintln!("navigate: {}", navigation.target()),
            }
        }
    }
}
