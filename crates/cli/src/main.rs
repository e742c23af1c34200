//! Command-line client for the LabRec record service.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use labrec_client::{
    ClientConfig, CredentialStore, Gateway, ReferenceRangeRegistry, SessionManager, fetch_summary,
};
use labrec_core::{LabTestResult, RangeDraft, ReferenceRange, Verdict, classify};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "labrectl")]
#[command(about = "Client for the LabRec clinical record service")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ConnectionArgs {
    /// Server base URL (overrides config and LABREC_SERVER_URL)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Client config file path
    #[arg(long, global = true, env = "LABREC_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Credential file path (overrides config)
    #[arg(long, global = true, env = "LABREC_CREDENTIALS")]
    credentials: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the bearer token locally
    Login {
        /// Account email
        email: String,
        /// Password value (avoid if possible; prefer --password-stdin)
        #[arg(long)]
        password: Option<String>,
        /// Read the password from stdin
        #[arg(long, default_value_t = false)]
        password_stdin: bool,
    },
    /// Create an account (does not log in)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Account role, e.g. "technician" or "doctor"
        #[arg(long)]
        role: String,
        /// Password value (avoid if possible; prefer --password-stdin)
        #[arg(long)]
        password: Option<String>,
        /// Read the password from stdin
        #[arg(long, default_value_t = false)]
        password_stdin: bool,
    },
    /// Discard the stored session
    Logout,
    /// Show the current session
    Whoami,
    /// Reference range management
    Range {
        #[command(subcommand)]
        command: RangeCommands,
    },
    /// Dashboard aggregate counts
    Summary,
    /// Classify a test value against the stored reference ranges
    Classify {
        /// Test parameter, e.g. "Hemoglobin"
        #[arg(long)]
        parameter: String,
        /// Recorded value
        #[arg(long)]
        value: String,
    },
}

#[derive(Subcommand)]
enum RangeCommands {
    /// List reference ranges
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        per_page: u32,
        /// Filter by parameter substring
        #[arg(long)]
        parameter: Option<String>,
    },
    /// Add a reference range
    Add {
        #[arg(long)]
        parameter: String,
        #[arg(long)]
        min: String,
        #[arg(long)]
        max: String,
        #[arg(long)]
        units: String,
    },
    /// Update a reference range
    Update {
        /// Range ID
        id: i64,
        #[arg(long)]
        parameter: Option<String>,
        #[arg(long)]
        min: Option<String>,
        #[arg(long)]
        max: Option<String>,
        #[arg(long)]
        units: Option<String>,
    },
    /// Delete a reference range
    Delete {
        /// Range ID
        id: i64,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

struct App {
    store: Arc<CredentialStore>,
    gateway: Arc<Gateway>,
    session: SessionManager,
}

fn build_app(connection: &ConnectionArgs) -> Result<App> {
    let mut config = ClientConfig::load(connection.config.as_deref())
        .context("failed to load client configuration")?;
    if let Some(server) = &connection.server {
        config.server_url = server.clone();
    }
    if let Some(path) = &connection.credentials {
        config.credentials_path = Some(path.clone());
    }

    let store = Arc::new(CredentialStore::open(config.credentials_path()?));
    let gateway = Arc::new(Gateway::new(&config, Arc::clone(&store))?);
    let session = SessionManager::new(Arc::clone(&gateway), Arc::clone(&store));
    Ok(App {
        store,
        gateway,
        session,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let Cli {
        connection,
        command,
    } = Cli::parse();
    let app = build_app(&connection)?;

    match command {
        Commands::Login {
            email,
            password,
            password_stdin,
        } => handle_login(&app, &email, password, password_stdin).await,
        Commands::Register {
            name,
            email,
            role,
            password,
            password_stdin,
        } => handle_register(&app, &name, &email, &role, password, password_stdin).await,
        Commands::Logout => handle_logout(&app),
        Commands::Whoami => handle_whoami(&app),
        Commands::Range { command } => handle_range_command(&app, command).await,
        Commands::Summary => handle_summary(&app).await,
        Commands::Classify { parameter, value } => handle_classify(&app, &parameter, &value).await,
    }
}

fn read_secret(value: Option<String>, from_stdin: bool) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    if from_stdin {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        let value = buf.trim().to_string();
        if value.is_empty() {
            anyhow::bail!("password read from stdin is empty");
        }
        return Ok(value);
    }
    anyhow::bail!("one of --password or --password-stdin is required");
}

async fn handle_login(
    app: &App,
    email: &str,
    password: Option<String>,
    password_stdin: bool,
) -> Result<()> {
    let password = read_secret(password, password_stdin)?;

    if !app.session.login(email, &password).await {
        anyhow::bail!("login failed; check email and password");
    }

    println!("Logged in as {email}");
    if let Some(identity) = app.session.session().identity {
        println!("  Name: {}", identity.name);
        println!("  Role: {}", identity.role);
    }
    println!("Credentials: {}", app.store.path().display());
    Ok(())
}

async fn handle_register(
    app: &App,
    name: &str,
    email: &str,
    role: &str,
    password: Option<String>,
    password_stdin: bool,
) -> Result<()> {
    let password = read_secret(password, password_stdin)?;

    if !app.session.register(name, email, &password, role).await {
        anyhow::bail!("registration failed");
    }

    println!("Account created for {email}.");
    println!("Log in with: labrectl login {email}");
    Ok(())
}

fn handle_logout(app: &App) -> Result<()> {
    app.session.logout();
    println!("Logged out.");
    Ok(())
}

fn handle_whoami(app: &App) -> Result<()> {
    let session = app.session.restore();
    if !session.authenticated {
        println!("Not logged in.");
        return Ok(());
    }
    match session.identity {
        Some(identity) => {
            println!("Logged in as {}", identity.email);
            println!("  Name: {}", identity.name);
            println!("  Role: {}", identity.role);
        }
        None => {
            println!("Logged in (stored credential; identity unknown until next login).");
        }
    }
    println!("Credentials: {}", app.store.path().display());
    Ok(())
}

async fn handle_range_command(app: &App, command: RangeCommands) -> Result<()> {
    match command {
        RangeCommands::List {
            page,
            per_page,
            parameter,
        } => {
            let mut registry = ReferenceRangeRegistry::new();
            registry.set_per_page(per_page);
            match parameter.as_deref() {
                Some(term) => {
                    // Searching resets to page one; step forward afterwards
                    // if a later page was asked for.
                    registry.search(&app.gateway, term).await;
                    if page > 1 {
                        registry.set_page(page);
                        registry.refresh(&app.gateway).await;
                    }
                }
                None => {
                    registry.set_page(page);
                    registry.refresh(&app.gateway).await;
                }
            }
            if let Some(err) = registry.error() {
                anyhow::bail!("{err}");
            }

            if registry.items().is_empty() {
                println!("No reference ranges found.");
            } else {
                println!(
                    "{:<6} {:<24} {:>12} {:>12} Units",
                    "ID", "Parameter", "Min", "Max"
                );
                println!("{}", "-".repeat(70));
                for range in registry.items() {
                    println!(
                        "{:<6} {:<24} {:>12} {:>12} {}",
                        range.id, range.parameter, range.normal_min, range.normal_max, range.units
                    );
                }
                let state = registry.page();
                println!("\nPage {} of {} ({} total)", state.page, state.pages, state.total);
            }
            Ok(())
        }
        RangeCommands::Add {
            parameter,
            min,
            max,
            units,
        } => {
            let mut registry = ReferenceRangeRegistry::new();
            *registry.draft_mut() = RangeDraft {
                parameter,
                normal_min: min,
                normal_max: max,
                units,
            };
            submit_draft(app, &mut registry, "Reference range added.").await
        }
        RangeCommands::Update {
            id,
            parameter,
            min,
            max,
            units,
        } => {
            // Load current values so partial flags update in place.
            let current: ReferenceRange = app
                .gateway
                .get_json(&format!("/api/reference_ranges/{id}"), &[])
                .await
                .with_context(|| format!("reference range {id} not found"))?;

            let mut registry = ReferenceRangeRegistry::new();
            registry.edit(&current);
            let draft = registry.draft_mut();
            if let Some(parameter) = parameter {
                draft.parameter = parameter;
            }
            if let Some(min) = min {
                draft.normal_min = min;
            }
            if let Some(max) = max {
                draft.normal_max = max;
            }
            if let Some(units) = units {
                draft.units = units;
            }
            submit_draft(app, &mut registry, "Reference range updated.").await
        }
        RangeCommands::Delete { id, force } => {
            let mut registry = ReferenceRangeRegistry::new();
            registry.request_remove(id);

            if !force {
                use std::io::Write;
                print!("Delete reference range {id}? [y/N]: ");
                std::io::stdout().flush()?;

                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;
                if !input.trim().eq_ignore_ascii_case("y") {
                    registry.cancel_remove();
                    println!("Aborted.");
                    return Ok(());
                }
            }

            if !registry.confirm_remove(&app.gateway).await {
                anyhow::bail!(
                    "{}",
                    registry.error().unwrap_or("failed to delete reference range")
                );
            }
            println!("Reference range deleted.");
            Ok(())
        }
    }
}

async fn submit_draft(
    app: &App,
    registry: &mut ReferenceRangeRegistry,
    success: &str,
) -> Result<()> {
    if registry.submit(&app.gateway).await {
        println!("{success}");
        return Ok(());
    }

    let mut had_field_errors = false;
    for (field, message) in registry.field_errors().iter() {
        eprintln!("  {field}: {message}");
        had_field_errors = true;
    }
    match registry.error() {
        Some(err) => anyhow::bail!("{err}"),
        None if had_field_errors => anyhow::bail!("validation failed"),
        None => anyhow::bail!("submission rejected"),
    }
}

async fn handle_summary(app: &App) -> Result<()> {
    let summary = fetch_summary(&app.gateway).await?;
    println!("Dashboard:");
    println!("  Patients: {}", summary.patient_count);
    println!("  Tests recorded: {}", summary.test_count);
    println!("  Abnormal results: {}", summary.abnormal_count);
    Ok(())
}

async fn handle_classify(app: &App, parameter: &str, value: &str) -> Result<()> {
    let ranges = fetch_all_ranges(app).await?;
    let result = LabTestResult::new(parameter, serde_json::Value::String(value.to_string()));
    let verdict = classify(&result, &ranges);

    match ranges.iter().find(|r| r.parameter == parameter) {
        Some(range) => println!(
            "{parameter} = {value}: {verdict} (normal range {}-{} {})",
            range.normal_min, range.normal_max, range.units
        ),
        None => println!("{parameter} = {value}: {verdict} (no reference range on record)"),
    }
    if verdict == Verdict::Unknown && ranges.iter().any(|r| r.parameter == parameter) {
        eprintln!("Warning: recorded value is not numeric.");
    }
    Ok(())
}

/// Walk every page of the reference-range collection.
async fn fetch_all_ranges(app: &App) -> Result<Vec<ReferenceRange>> {
    let mut ranges = Vec::new();
    let mut page: u32 = 1;
    loop {
        let envelope = app
            .gateway
            .get_page::<ReferenceRange>(
                "/api/reference_ranges/",
                &[("page", page.to_string()), ("per_page", "100".to_string())],
            )
            .await?;
        ranges.extend(envelope.data);
        if !envelope.pagination.has_next {
            break;
        }
        page += 1;
    }
    Ok(ranges)
}
