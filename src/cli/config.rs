//! `init`, `config` and `user` commands
//!
//! These work before any organization exists, so none of them need `--org`.

use clap::Subcommand;
use serde_json::json;

use crate::error::TaxboxResult;
use crate::models::format_rate;
use crate::services::OrganizationService;
use crate::storage::{initialize_storage, Storage};

use super::context::{CliContext, Outcome};

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show paths and settings
    Show,
    /// Set the user commands act as when --user is not given
    DefaultUser {
        /// User e-mail
        email: String,
    },
}

/// User subcommands
#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Add {
        /// E-mail address, unique per store
        email: String,
        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// List all users
    List,
    /// Show the acting user
    Whoami,
}

/// Initialize the store, optionally registering a first user as the default
pub fn handle_init(
    storage: &Storage,
    email: Option<String>,
    name: Option<String>,
) -> TaxboxResult<Outcome> {
    let paths = storage.paths();
    let fresh = initialize_storage(paths)?;
    let mut text = if fresh {
        format!("Initialized taxbox at: {}\n", paths.data_dir().display())
    } else {
        format!("taxbox already initialized at: {}\n", paths.data_dir().display())
    };

    let mut user_data = None;
    if let Some(email) = email {
        let name = name.unwrap_or_else(|| email.clone());
        let user = OrganizationService::create_user(storage, &email, &name)?;

        let mut settings = storage.settings.clone();
        settings.default_user = Some(user.email.clone());
        settings.save(paths)?;

        text.push_str(&format!("Created user {} and made them the default\n", user.email));
        text.push_str("Next: 'taxbox org create <NAME> --tax-id <13 digits>'\n");
        user_data = Some(user);
    }

    Outcome::text(text).with_data(&json!({
        "data_dir": paths.data_dir(),
        "initialized": fresh,
        "user": user_data,
    }))
}

pub fn handle_config_command(storage: &Storage, cmd: ConfigCommands) -> TaxboxResult<Outcome> {
    let paths = storage.paths();
    match cmd {
        ConfigCommands::Show => {
            let s = &storage.settings;
            let mut text = String::new();
            text.push_str("taxbox configuration\n");
            text.push_str("====================\n");
            text.push_str(&format!("Data directory:  {}\n", paths.data_dir().display()));
            text.push_str(&format!("Files directory: {}\n", paths.files_dir().display()));
            text.push_str(&format!("Audit log:       {}\n", paths.audit_log().display()));
            text.push('\n');
            text.push_str("Settings:\n");
            text.push_str(&format!("  Default user:        {}\n", s.default_user.as_deref().unwrap_or("-")));
            text.push_str(&format!("  Default VAT rate:    {}\n", format_rate(s.default_vat_rate_bp)));
            text.push_str(&format!("  WHT filing day:      {}\n", s.wht_filing_day));
            text.push_str(&format!("  VAT filing day:      {}\n", s.vat_filing_day));
            text.push_str(&format!(
                "  Health weights:      wht {} / docs {} / tasks {}\n",
                s.health_weights.overdue_wht, s.health_weights.pending_docs, s.health_weights.overdue_tasks
            ));
            text.push_str(&format!("  Export target:       {}\n", s.default_export_target));
            text.push_str(&format!(
                "  E-mail relay:        {}\n",
                s.email_relay_url.as_deref().unwrap_or("(not set)")
            ));
            text.push_str(&format!("  HTTP timeout:        {}s\n", s.http_timeout_secs));
            Outcome::text(text).with_data(s)
        }
        ConfigCommands::DefaultUser { email } => {
            let user = OrganizationService::find_user(storage, &email)?;
            let mut settings = storage.settings.clone();
            settings.default_user = Some(user.email.clone());
            settings.save(paths)?;
            tracing::info!(user = %user.email, "default user changed");
            Outcome::text(format!("Default user: {}\n", user.email)).with_data(&settings)
        }
    }
}

pub fn handle_user_command(ctx: &CliContext<'_>, cmd: UserCommands) -> TaxboxResult<Outcome> {
    match cmd {
        UserCommands::Add { email, name } => {
            let user = OrganizationService::create_user(ctx.storage, &email, &name)?;
            Outcome::text(format!("Created user: {} <{}>\n  ID: {}\n", user.name, user.email, user.id))
                .with_data(&user)
        }
        UserCommands::List => {
            let mut users = ctx.storage.users.get_all()?;
            users.sort_by(|a, b| a.email.cmp(&b.email));
            let mut text = String::new();
            if users.is_empty() {
                text.push_str("No users. Add one with 'taxbox user add'.\n");
            }
            for user in &users {
                text.push_str(&format!("{}  {}  ({})\n", user.id, user.email, user.name));
            }
            Outcome::text(text).with_data(&users)
        }
        UserCommands::Whoami => {
            let user = ctx.user()?;
            Outcome::text(format!("{} <{}>\n", user.name, user.email)).with_data(&user)
        }
    }
}
