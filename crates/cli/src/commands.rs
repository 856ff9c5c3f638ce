//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use portal_access_core::{
    AccessSet, Catalog, ConsoleConfig, Decoded, Directory, DirectoryUser, EditSession,
    GroupCatalog, Preview, SubmitReport, UserId, UserUpdate,
};
use portal_access_http::DirectoryClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// List every directory group and how it is classified
    Groups,

    /// List directory users
    Users,

    /// Show a user's current roles and grants
    Show {
        /// Directory id of the user
        user_id: String,
    },

    /// Change a user's roles and grants
    Edit(EditArgs),

    /// Allow a user to sign in again
    Enable {
        /// Directory id of the user
        user_id: String,
    },

    /// Block a user from signing in
    Disable {
        /// Directory id of the user
        user_id: String,
    },

    /// Configuration file operations
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, clap::Args)]
pub struct EditArgs {
    /// Directory id of the user
    pub user_id: String,

    /// Replace all roles with this list (repeatable)
    #[arg(long = "role", value_name = "ROLE")]
    pub roles: Vec<String>,

    /// Add a role
    #[arg(long, value_name = "ROLE")]
    pub add_role: Vec<String>,

    /// Remove a role
    #[arg(long, value_name = "ROLE")]
    pub remove_role: Vec<String>,

    /// Grant a dataset in a country
    #[arg(long, value_name = "COUNTRY=DATASET", value_parser = parse_grant)]
    pub grant: Vec<(String, String)>,

    /// Revoke a dataset in a country
    #[arg(long, value_name = "COUNTRY=DATASET", value_parser = parse_grant)]
    pub revoke: Vec<(String, String)>,

    /// Revoke every dataset in a country
    #[arg(long, value_name = "COUNTRY")]
    pub revoke_country: Vec<String>,

    /// Apply the change instead of only previewing it
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default values
    Generate {
        /// Output file path (defaults to the user config directory)
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Show,
}

/// Parse `COUNTRY=DATASET`
pub fn parse_grant(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((country, dataset)) if !country.trim().is_empty() && !dataset.trim().is_empty() => {
            Ok((country.trim().to_string(), dataset.trim().to_string()))
        }
        _ => Err(format!("expected COUNTRY=DATASET, got {value:?}")),
    }
}

impl Commands {
    pub async fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self {
            Self::Groups => {
                let (config, client) = connect(config_path)?;
                list_groups(&config, &client).await
            }
            Self::Users => {
                let (_, client) = connect(config_path)?;
                list_users(&client).await
            }
            Self::Show { user_id } => {
                let (config, client) = connect(config_path)?;
                let session = open_session(&config, Arc::clone(&client) as Arc<dyn Directory>, client.as_ref(), &user_id).await?;
                print_access("Current access", session.initial());
                Ok(())
            }
            Self::Edit(args) => {
                let (config, client) = connect(config_path)?;
                edit(&config, Arc::clone(&client) as Arc<dyn Directory>, client.as_ref(), &args).await
            }
            Self::Enable { user_id } => {
                let (_, client) = connect(config_path)?;
                set_account_enabled(&client, &user_id, true).await
            }
            Self::Disable { user_id } => {
                let (_, client) = connect(config_path)?;
                set_account_enabled(&client, &user_id, false).await
            }
            Self::Config { command } => command.execute(config_path),
        }
    }
}

fn connect(config_path: Option<PathBuf>) -> Result<(ConsoleConfig, Arc<DirectoryClient>)> {
    let config = config::load_config(config_path.as_deref())?;
    let client = DirectoryClient::from_config(&config.directory)
        .context("Failed to create portal API client")?;
    Ok((config, Arc::new(client)))
}

impl ConfigCommands {
    pub fn execute(self, config_path: Option<PathBuf>) -> Result<()> {
        match self {
            Self::Generate { output } => {
                let path = output.unwrap_or_else(config::default_config_path);
                if path.exists() {
                    bail!("{} already exists", path.display());
                }
                config::generate_default_config(&path)?;
                info!(path = %path.display(), "Generated default configuration");
                println!("Wrote default configuration to {}", path.display());
                Ok(())
            }
            Self::Show => {
                let config = config::load_config(config_path.as_deref())?;
                println!("{}", config::redacted_json(&config)?);
                Ok(())
            }
        }
    }
}

async fn open_session(
    config: &ConsoleConfig,
    directory: Arc<dyn Directory>,
    catalog: &dyn GroupCatalog,
    user_id: &str,
) -> Result<EditSession> {
    EditSession::open(
        directory,
        catalog,
        &UserId::new(user_id),
        &config.access.role_classifier(),
        config.access.codec(),
    )
    .await
    .with_context(|| format!("Failed to load access for user {user_id}"))
}

async fn list_groups(config: &ConsoleConfig, client: &DirectoryClient) -> Result<()> {
    let catalog = Catalog::load(client).await?;
    let codec = config.access.codec();
    let roles = catalog.role_names(&config.access.role_classifier());

    for group in catalog.groups() {
        let kind = match codec.decode(&group.name, &roles) {
            Decoded::Role(_) => "role".to_string(),
            Decoded::Grant(grant) => format!("grant {grant}"),
            Decoded::Unrecognized(_) => "other".to_string(),
        };
        println!("{}\t{}\t{kind}", group.id, group.name);
    }
    info!(groups = catalog.len(), "Listed groups");
    Ok(())
}

async fn list_users(client: &DirectoryClient) -> Result<()> {
    let users = sorted_by_email(client.users().await?);
    for (email, user) in &users {
        println!(
            "{}\t{}\t{}",
            user.id,
            email.as_deref().unwrap_or_default(),
            user.display_name.as_deref().unwrap_or_default()
        );
    }
    info!(users = users.len(), "Listed users");
    Ok(())
}

/// Pair each user with their resolved email, ordered by it. Users without
/// an address go last.
fn sorted_by_email(users: Vec<DirectoryUser>) -> Vec<(Option<String>, DirectoryUser)> {
    let mut users: Vec<_> = users
        .into_iter()
        .map(|user| (user.resolved_email(), user))
        .collect();
    users.sort_by(|(a, _), (b, _)| a.is_none().cmp(&b.is_none()).then_with(|| a.cmp(b)));
    users
}

async fn set_account_enabled(client: &DirectoryClient, user_id: &str, enabled: bool) -> Result<()> {
    client
        .edit_user(&UserId::new(user_id), &UserUpdate::enabled(enabled))
        .await
        .with_context(|| format!("Failed to update user {user_id}"))?;

    let state = if enabled { "enabled" } else { "disabled" };
    info!(user = user_id, state, "Updated account state");
    println!("User {user_id} {state}.");
    Ok(())
}

/// Apply the requested edits to an open session
fn apply_edits(session: &mut EditSession, args: &EditArgs) -> Result<()> {
    if !args.roles.is_empty() {
        session.set_roles(args.roles.iter().cloned())?;
    }
    for role in &args.add_role {
        session.add_role(role)?;
    }
    for role in &args.remove_role {
        session.remove_role(role)?;
    }
    for country in &args.revoke_country {
        session.remove_country(country)?;
    }
    for (country, dataset) in &args.revoke {
        session.remove_grant(country, dataset)?;
    }
    for (country, dataset) in &args.grant {
        session.add_grant(country, dataset)?;
    }
    Ok(())
}

/// Result of running the edit pipeline
#[derive(Debug)]
enum EditOutcome {
    Unchanged(Preview),
    DryRun(Preview),
    Applied(Preview, SubmitReport),
}

/// Apply flag edits, validate new values against the configured options,
/// then submit only when `--yes` was given.
async fn run_edit(
    config: &ConsoleConfig,
    directory: Arc<dyn Directory>,
    catalog: &dyn GroupCatalog,
    args: &EditArgs,
) -> Result<EditOutcome> {
    let mut session = open_session(config, directory, catalog, &args.user_id).await?;
    apply_edits(&mut session, args)?;

    let options = config.access.form_options(session.known_roles());
    let form = session.form();
    session.apply_form(&form, &options)?;

    let preview = session.preview();
    if preview.delta.is_empty() {
        return Ok(EditOutcome::Unchanged(preview));
    }
    if !args.yes {
        return Ok(EditOutcome::DryRun(preview));
    }

    let report = session.submit().await?;
    Ok(EditOutcome::Applied(preview, report))
}

async fn edit(
    config: &ConsoleConfig,
    directory: Arc<dyn Directory>,
    catalog: &dyn GroupCatalog,
    args: &EditArgs,
) -> Result<()> {
    match run_edit(config, directory, catalog, args).await? {
        EditOutcome::Unchanged(preview) => {
            print_preview(&preview);
            println!("No changes.");
        }
        EditOutcome::DryRun(preview) => {
            print_preview(&preview);
            println!("Dry run. Re-run with --yes to apply.");
        }
        EditOutcome::Applied(preview, report) => {
            print_preview(&preview);
            print_report(&report);
        }
    }
    Ok(())
}

fn print_access(title: &str, access: &AccessSet) {
    println!("{title}:");
    if access.is_empty() {
        println!("  no roles or grants");
    } else {
        let roles: Vec<&str> = access.roles().iter().map(String::as_str).collect();
        println!("  roles: {}", if roles.is_empty() { "-".to_string() } else { roles.join(", ") });
        for (country, datasets) in access.grants() {
            let datasets: Vec<&str> = datasets.iter().map(String::as_str).collect();
            println!("  {country}: {}", datasets.join(", "));
        }
    }
    for name in access.unrecognized() {
        println!("  (other group) {name}");
    }
}

fn print_preview(preview: &Preview) {
    for atom in &preview.delta.to_add {
        println!("+ {atom}");
    }
    for atom in &preview.delta.to_remove {
        println!("- {atom}");
    }
    for anomaly in &preview.resolved.unresolved {
        println!("! skipped {anomaly}");
    }
    println!("{}", preview.message);
}

fn print_report(report: &SubmitReport) {
    match &report.request {
        Some(request) => println!(
            "Applied: {} added, {} removed.",
            request.groups_to_add.len(),
            request.groups_to_remove.len()
        ),
        None => println!("Nothing could be applied."),
    }
    if !report.unresolved.is_empty() {
        println!(
            "{} change(s) were skipped because no matching directory group exists.",
            report.unresolved.len()
        );
    }
}
