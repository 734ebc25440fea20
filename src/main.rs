use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use comfy_table::{modifiers, presets, ContentArrangement, Table};
use serde_json::Value;
use terminal_size::{terminal_size, Width};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use kcdeploy::api::{KeycloakAdminApi, KeycloakGateway, OpenStackApi, OpenStackGateway};
use kcdeploy::config::{self, DEFAULT_HOST, DEFAULT_PORT};
use kcdeploy::models::{AppState, AuthSession, AuthToken, ClientConfig, Credentials, KeycloakUser, Notification, NotificationLevel, RealmSettings, TokenLifespans, UserPatch};
use kcdeploy::routes::build_router;
use kcdeploy::services::{assemble, load_credentials, store_session, write_export, ScopedSession, UserDirectory, UserQuery, EXPORT_FILE_NAME};
use kcdeploy::wizard::{ServerInstanceForm, WizardController, DEFAULT_KEYCLOAK_PORT};
use kcdeploy::ApiError;

fn build_gateways() -> (OpenStackGateway, KeycloakGateway) {
    let client = match reqwest::Client::builder()
        .user_agent(format!("kcdeploy/{}", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(%e, "Failed to create HTTP client");
            eprintln!("{}: {}", yansi::Paint::red("Failed to create HTTP client"), e);
            process::exit(1);
        }
    };
    let retry = config::get_retry_policy();
    let openstack = OpenStackGateway {
        client: client.clone(),
        compute_url: config::get_compute_url(),
        identity_url: config::get_identity_url(),
        server: config::get_server_settings(),
        retry,
    };
    let keycloak = KeycloakGateway {
        client,
        base_url: config::get_keycloak_base_url(),
        realm: config::get_keycloak_realm(),
        retry,
    };
    (openstack, keycloak)
}

fn build_state_from_env(env_file: Option<&str>) -> AppState {
    config::load_env_file(env_file);
    let (openstack, keycloak) = build_gateways();
    AppState::new(Arc::new(openstack), Arc::new(keycloak), config::get_default_credentials())
}

async fn start_server(state: AppState, host: &str, port: u16) {
    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(%e, "Invalid host/port format");
            eprintln!("{}: {}", yansi::Paint::red("Invalid host/port format"), e);
            process::exit(1);
        }
    };
    let app = build_router(state);
    tracing::info!(%addr, "Starting kcdeploy console");
    println!(
        "{} {}",
        yansi::Paint::new("Console API running on").green(),
        yansi::Paint::new(format!("http://{}", addr)).cyan()
    );
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(%e, "Server encountered an error while running");
                eprintln!("{}: {}", yansi::Paint::new("Server error").red(), e);
                process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(%e, "Failed to bind to address; is the port already in use?");
            eprintln!(
                "{}: {}\n{}",
                yansi::Paint::new(format!("Failed to bind to {}", addr)).red(),
                e,
                yansi::Paint::new("Stop the process using this port, or pass a different --port value.").yellow()
            );
            process::exit(1);
        }
    }
}

fn json_value_to_string(v: &Value) -> String {
    match v {
        Value::Null => "".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(json_value_to_string).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if let Some((Width(w), _)) = terminal_size() {
        table.set_width(w.saturating_sub(4));
    }
    table
}

/// Render a list of objects with the given columns.
fn print_rows(columns: &[&str], rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty list)");
        return;
    }
    let mut table = new_table();
    table.set_header(columns.to_vec());
    for row in rows {
        table.add_row(
            columns
                .iter()
                .map(|c| row.get(*c).map(json_value_to_string).unwrap_or_default())
                .collect::<Vec<_>>(),
        );
    }
    println!("\n{table}\n");
}

fn print_notifications(notifications: &[Notification]) {
    for n in notifications {
        match n.level {
            NotificationLevel::Success => println!("{}", yansi::Paint::new(&n.message).green()),
            NotificationLevel::Error => eprintln!("{}", yansi::Paint::new(&n.message).red()),
        }
    }
}

fn fail(context: &str, error: &ApiError) -> ! {
    tracing::debug!(kind = error.kind(), "Command failed");
    eprintln!("{}: {}", yansi::Paint::new(context).red(), error);
    process::exit(1);
}

fn require_credentials() -> Credentials {
    match config::get_default_credentials() {
        Some(c) => c,
        None => {
            eprintln!(
                "{}",
                yansi::Paint::new("OPENSTACK_USERNAME and OPENSTACK_PASSWORD must be set").red()
            );
            process::exit(1);
        }
    }
}

/// Authenticate once and keep the token in a session that is invalidated
/// when the command finishes.
async fn openstack_session(api: &OpenStackGateway, credentials: &Credentials) -> (ScopedSession, AuthSession) {
    let session = match api.authenticate(credentials).await {
        Ok(s) => s,
        Err(e) => fail("OpenStack authentication failed", &e),
    };
    let mut scoped = ScopedSession::new(session.expires_at);
    store_session(&mut scoped, &session);
    match load_credentials(&scoped) {
        Some((token, _)) => (scoped, AuthSession { token, ..session }),
        None => fail("OpenStack session expired immediately", &ApiError::Unauthorized),
    }
}

async fn keycloak_admin_token(api: &KeycloakGateway) -> AuthToken {
    let (username, password) = match config::get_keycloak_admin() {
        Some(pair) => pair,
        None => {
            eprintln!(
                "{}",
                yansi::Paint::new("KEYCLOAK_ADMIN_USERNAME and KEYCLOAK_ADMIN_PASSWORD must be set").red()
            );
            process::exit(1);
        }
    };
    match api.obtain_token(&username, &password).await {
        Ok(t) => t,
        Err(e) => fail("Keycloak admin login failed", &e),
    }
}

fn print_users(directory: &UserDirectory, query: &UserQuery) {
    let page = directory.view(query);
    let rows: Vec<Value> = page
        .items
        .iter()
        .map(|u| serde_json::to_value(u).unwrap_or_default())
        .collect();
    print_rows(&["id", "username", "email", "firstName", "lastName", "enabled"], &rows);
    if query.page > 0 && page.total_pages > 1 {
        println!(
            "{}",
            yansi::Paint::new(format!(
                "Page {} of {} | Showing {} of {} matching users",
                page.current_page,
                page.total_pages,
                page.items.len(),
                page.total_count
            ))
            .cyan()
        );
    }
}

#[derive(Parser)]
#[command(
    name = "kcdeploy",
    author,
    version,
    about = "Keycloak provisioning console for OpenStack",
    long_about = r#"kcdeploy provisions a Keycloak server on OpenStack and administers its users.

Run `serve` for the JSON console API, or use the subcommands directly. Settings come from environment variables, optionally loaded from a `.env` file with `--env-file`.

Examples:
  1) Run the console API:
      kcdeploy serve --host 127.0.0.1 --port 3000
  2) Create the Keycloak server:
      kcdeploy provision --flavor 1 --keypair k1 --network n1
  3) List realm users whose email contains "example":
      kcdeploy users list --email example
"#,
    after_help = "Use `kcdeploy <subcommand> --help` to get subcommand specific options."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Path to .env file
    #[arg(long, global = true)]
    env_file: Option<String>,
    /// Disable colorized output
    #[arg(long, global = true)]
    no_color: bool,
    /// Disable request/response logging
    #[arg(long, global = true)]
    silent: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the console API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value_t = String::from(DEFAULT_HOST))]
        host: String,
        /// Port to bind to
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Validate configuration and upstream connectivity
    #[command(long_about = "Check the OpenStack and Keycloak settings. When credentials are configured, authenticate against each to confirm they are accepted.")]
    CheckConfig,
    /// Browse OpenStack reference data
    Openstack {
        #[command(subcommand)]
        sub: OpenStackCommands,
    },
    /// Create the Keycloak server instance
    #[command(long_about = "Run the provisioning wizard non-interactively: load reference data, validate the selection, authenticate and request one server. The server is not polled until ready.")]
    Provision {
        #[arg(long)]
        flavor: String,
        #[arg(long)]
        keypair: String,
        #[arg(long)]
        network: String,
        /// Port Keycloak listens on, recorded in the server metadata
        #[arg(long, default_value = DEFAULT_KEYCLOAK_PORT)]
        port: String,
    },
    /// Manage users of the configured Keycloak realm
    Users {
        #[command(subcommand)]
        sub: UserCommands,
    },
    /// Realm configuration documents
    Config {
        #[command(subcommand)]
        sub: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum OpenStackCommands {
    /// List compute flavors
    Flavors,
    /// List SSH keypairs
    Keypairs,
    /// List networks
    Networks,
}

#[derive(Subcommand)]
enum UserCommands {
    /// List users, optionally filtered by email
    List {
        /// Case-insensitive substring of the email address
        #[arg(long)]
        email: Option<String>,
        /// Page number to display (1-indexed). Use 0 to show all users.
        #[arg(long, short = 'p', default_value = "0")]
        page: usize,
        #[arg(long, default_value = "20")]
        per_page: usize,
    },
    /// Create a user
    Create {
        username: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Create the account disabled
        #[arg(long, default_value_t = false)]
        disabled: bool,
    },
    /// Update fields of an existing user
    Update {
        id: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Delete a user
    Delete { id: String },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write keycloak-config.json
    Export {
        /// Target file or directory
        #[arg(long, short = 'o', default_value = ".")]
        output: PathBuf,
        #[arg(long)]
        realm: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        root_url: Option<String>,
        /// May be repeated
        #[arg(long)]
        redirect_uri: Vec<String>,
        /// May be repeated
        #[arg(long)]
        web_origin: Vec<String>,
        /// Access token lifespan in seconds
        #[arg(long)]
        access_token_lifespan: Option<u32>,
    },
}

async fn run_openstack(sub: OpenStackCommands) {
    let (api, _) = build_gateways();
    let credentials = require_credentials();
    let (mut scoped, session) = openstack_session(&api, &credentials).await;
    let token = &session.token;
    let result = match sub {
        OpenStackCommands::Flavors => api.list_flavors(token).await.map(|flavors| {
            let rows: Vec<Value> = flavors
                .iter()
                .map(|f| serde_json::json!({"id": f.id, "name": f.name, "size": f.summary()}))
                .collect();
            print_rows(&["id", "name", "size"], &rows);
        }),
        OpenStackCommands::Keypairs => api.list_keypairs(token).await.map(|keypairs| {
            let rows: Vec<Value> = keypairs
                .iter()
                .map(|k| serde_json::json!({"name": k.name, "fingerprint": k.fingerprint}))
                .collect();
            print_rows(&["name", "fingerprint"], &rows);
        }),
        OpenStackCommands::Networks => api.list_networks(token).await.map(|networks| {
            let rows: Vec<Value> = networks
                .iter()
                .map(|n| serde_json::json!({"id": n.id, "label": n.label}))
                .collect();
            print_rows(&["id", "label"], &rows);
        }),
    };
    scoped.invalidate();
    if let Err(e) = result {
        fail("Listing failed", &e);
    }
}

async fn run_provision(form: ServerInstanceForm) {
    let (api, _) = build_gateways();
    let credentials = require_credentials();
    let (mut scoped, session) = openstack_session(&api, &credentials).await;

    let mut wizard = WizardController::new();
    let started = wizard.start(&api, Some(&session.token)).await;
    print_notifications(&wizard.take_notifications());
    if let Err(e) = started {
        scoped.invalidate();
        fail("Could not start provisioning", &e);
    }

    let reference = wizard.reference();
    if !reference.flavors.is_empty() && !reference.flavors.iter().any(|f| f.id == form.flavor.trim()) {
        eprintln!("{} '{}'", yansi::Paint::new("Warning: unknown flavor").yellow(), form.flavor);
    }
    if !reference.keypairs.is_empty() && !reference.keypairs.iter().any(|k| k.name == form.keypair.trim()) {
        eprintln!("{} '{}'", yansi::Paint::new("Warning: unknown keypair").yellow(), form.keypair);
    }

    // The session from the reference-data load carries the submission too.
    let result = wizard.submit_with_session(&api, &form, session).await;
    scoped.invalidate();
    print_notifications(&wizard.take_notifications());
    if let Err(e) = result {
        fail(&format!("Provisioning stopped at step {}", wizard.step().name()), &e);
    }
    if let Some(instance) = wizard.instance() {
        println!(
            "{} {}",
            yansi::Paint::new("Server requested:").green(),
            yansi::Paint::new(&instance.id).cyan()
        );
    }
}

async fn run_users(sub: UserCommands) {
    let (_, api) = build_gateways();
    let token = keycloak_admin_token(&api).await;
    let mut directory = UserDirectory::new();

    let (result, query) = match sub {
        UserCommands::List { email, page, per_page } => {
            let query = UserQuery { email, page, per_page };
            (directory.refresh(&api, &token).await, Some(query))
        }
        UserCommands::Create {
            username,
            email,
            first_name,
            last_name,
            disabled,
        } => {
            let user = KeycloakUser {
                username,
                email,
                first_name,
                last_name,
                enabled: !disabled,
                ..Default::default()
            };
            (directory.create(&api, &token, user).await, None)
        }
        UserCommands::Update {
            id,
            email,
            first_name,
            last_name,
            enabled,
        } => {
            let patch = UserPatch {
                email,
                first_name,
                last_name,
                enabled,
                ..Default::default()
            };
            (directory.patch(&api, &token, &id, patch).await, None)
        }
        UserCommands::Delete { id } => (directory.delete(&api, &token, &id).await, None),
    };

    print_notifications(&directory.take_notifications());
    if let Err(e) = result {
        fail("Keycloak request failed", &e);
    }
    if let Some(query) = query {
        print_users(&directory, &query);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        yansi::whenever(yansi::Condition::NEVER);
    }

    if cli.silent {
        kcdeploy::api::set_silent(true);
    }

    let env_file = cli.env_file.as_deref();

    // No subcommand serves the console API with defaults
    let command = match cli.command {
        Some(c) => c,
        None => {
            let state = build_state_from_env(env_file);
            start_server(state, DEFAULT_HOST, DEFAULT_PORT).await;
            return;
        }
    };

    match command {
        Commands::Serve { host, port } => {
            let state = build_state_from_env(env_file);
            start_server(state, &host, port).await;
        }
        Commands::CheckConfig => {
            config::load_env_file(env_file);
            let (openstack, keycloak) = build_gateways();
            let mut ok = true;
            println!("Compute:  {}", openstack.compute_url);
            println!("Identity: {}", openstack.identity_url);
            println!("Keycloak: {} (realm {})", keycloak.base_url, keycloak.realm);
            if openstack.server.image_id.is_empty() {
                eprintln!("{}", yansi::Paint::new("OPENSTACK_IMAGE_ID is not configured").red());
                ok = false;
            }
            match config::get_default_credentials() {
                Some(credentials) => match openstack.authenticate(&credentials).await {
                    Ok(session) => println!(
                        "{} {}",
                        yansi::Paint::new("OpenStack credentials accepted for user").green(),
                        session.user_id
                    ),
                    Err(e) => {
                        eprintln!("{}: {}", yansi::Paint::new("OpenStack authentication failed").red(), e);
                        ok = false;
                    }
                },
                None => {
                    eprintln!("{}", yansi::Paint::new("OPENSTACK_USERNAME/OPENSTACK_PASSWORD are not configured").red());
                    ok = false;
                }
            }
            match config::get_keycloak_admin() {
                Some((username, password)) => {
                    if let Err(e) = keycloak.obtain_token(&username, &password).await {
                        eprintln!("{}: {}", yansi::Paint::new("Keycloak admin login failed").red(), e);
                        ok = false;
                    } else {
                        println!("{}", yansi::Paint::new("Keycloak admin credentials accepted").green());
                    }
                }
                None => println!(
                    "{}",
                    yansi::Paint::new("Keycloak admin credentials not configured; user commands need a bearer token").yellow()
                ),
            }
            if !ok {
                process::exit(1);
            }
            println!("{}", yansi::Paint::new("Configuration looks valid").green());
        }
        Commands::Openstack { sub } => {
            config::load_env_file(env_file);
            run_openstack(sub).await;
        }
        Commands::Provision {
            flavor,
            keypair,
            network,
            port,
        } => {
            config::load_env_file(env_file);
            run_provision(ServerInstanceForm {
                flavor,
                keypair,
                network,
                port,
            })
            .await;
        }
        Commands::Users { sub } => {
            config::load_env_file(env_file);
            run_users(sub).await;
        }
        Commands::Config { sub } => match sub {
            ConfigCommands::Export {
                output,
                realm,
                display_name,
                client_id,
                root_url,
                redirect_uri,
                web_origin,
                access_token_lifespan,
            } => {
                let mut realm_settings = RealmSettings::default();
                if let Some(r) = realm {
                    realm_settings.realm = r;
                }
                if let Some(d) = display_name {
                    realm_settings.display_name = d;
                }
                let mut client = ClientConfig::default();
                if let Some(c) = client_id {
                    client.client_id = c;
                }
                if let Some(r) = root_url {
                    client.root_url = r;
                }
                client.redirect_uris = redirect_uri;
                client.web_origins = web_origin;
                let mut tokens = TokenLifespans::default();
                if let Some(secs) = access_token_lifespan {
                    tokens.access_token_lifespan = secs;
                }
                let document = assemble(&realm_settings, &client, &tokens);
                match write_export(&document, &output) {
                    Ok(path) => println!(
                        "{} {}",
                        yansi::Paint::new(format!("Wrote {}", EXPORT_FILE_NAME)).green(),
                        yansi::Paint::new(path.display().to_string()).cyan()
                    ),
                    Err(e) => {
                        tracing::error!(%e, "Failed to write export");
                        eprintln!("{}: {}", yansi::Paint::new("Failed to write export").red(), e);
                        process::exit(1);
                    }
                }
            }
        },
    }
}
