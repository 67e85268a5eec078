use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::api::{auth, token, M365Client, GRAPH_RESOURCE};
use crate::error::{CommandError, CommandResult};
use crate::session::{epoch_s, Session};
use crate::types::AccessToken;

use super::output::{print_info, print_success, print_value};
use super::Context;

/// Lifetime Azure AD gives refresh tokens of public clients
const REFRESH_TOKEN_LIFETIME: u64 = 90 * 24 * 60 * 60;

#[derive(Args, Debug)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthSubcommand {
    /// Log in using the device code flow
    Login {
        /// Tenant ID or domain (default: the `auth.tenant` setting)
        #[arg(short, long)]
        tenant: Option<String>,
    },

    /// Show the current connection
    Status,

    /// Log out and forget all tokens
    Logout,
}

pub async fn execute(cmd: AuthCommand, ctx: &mut Context<'_>) -> CommandResult<()> {
    match cmd.command {
        AuthSubcommand::Login { tenant } => {
            ctx.report.command = "auth login".to_string();
            login(ctx, tenant).await
        }
        AuthSubcommand::Status => {
            ctx.report.command = "auth status".to_string();
            status(ctx)
        }
        AuthSubcommand::Logout => {
            ctx.report.command = "auth logout".to_string();
            logout(ctx)
        }
    }
}

fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
        Ok(()) => print_info("The code has been copied to your clipboard"),
        Err(e) => warn!(error = %e, "Could not copy the device code"),
    }
}

async fn login(ctx: &mut Context<'_>, tenant: Option<String>) -> CommandResult<()> {
    let mut config = ctx.config.clone();
    if let Some(tenant) = tenant {
        config.auth.tenant = tenant;
    }

    let session = Session::restore()?;
    let client = M365Client::new(&config, session)?;

    let info = auth::gen_device_code(client.http(), client.authority()).await?;
    print_info(&info.message);
    if config.settings.copy_device_code_to_clipboard {
        copy_to_clipboard(&info.user_code);
    }
    if config.settings.auto_open_links_in_browser {
        if let Err(e) = open::that(&info.verification_uri) {
            warn!(error = %e, "Could not open the browser");
        }
    }

    let deadline = Instant::now() + Duration::from_secs(info.expires_in);
    let interval = Duration::from_secs(info.interval.max(1));

    let tokens = loop {
        sleep(interval).await;
        if let Some(tokens) =
            auth::poll_device_code(client.http(), client.authority(), &info.device_code).await?
        {
            break tokens;
        }
        if Instant::now() >= deadline {
            return Err(CommandError::Auth(
                "The device code expired. Run 'm365 auth login' again.".to_string(),
            ));
        }
        debug!("Waiting for the user to sign in");
    };

    let refresh_token = tokens
        .refresh_token
        .ok_or_else(|| CommandError::Auth("No refresh token in the login response".to_string()))?;

    let session = client.session();
    session.begin(
        token::user_name(&tokens.access_token),
        token::tenant_id(&tokens.access_token).or(Some(config.auth.tenant.clone())),
        AccessToken {
            value: refresh_token,
            expires: epoch_s() + REFRESH_TOKEN_LIFETIME,
        },
    )?;
    session.store_token(
        GRAPH_RESOURCE,
        AccessToken {
            value: tokens.access_token,
            expires: epoch_s() + tokens.expires_in,
        },
    )?;
    ctx.report.session_id = session.id();

    match session.user_name() {
        Some(user) => print_success(&format!("Logged in as {}", user)),
        None => print_success("Logged in"),
    }
    Ok(())
}

fn status(ctx: &mut Context<'_>) -> CommandResult<()> {
    let session = Session::restore()?;
    ctx.report.session_id = session.id();

    let value = if session.static_token().is_some() {
        json!({
            "connectedAs": session.static_token().and_then(token::user_name),
            "authType": "accessToken",
        })
    } else if session.is_active() {
        json!({
            "connectedAs": session.user_name(),
            "tenant": session.tenant(),
            "authType": "deviceCode",
            "sessionId": session.id(),
        })
    } else {
        print_info("Logged out. Run 'm365 auth login' to log in.");
        return Ok(());
    };

    print_value(&value, ctx.format());
    Ok(())
}

fn logout(ctx: &mut Context<'_>) -> CommandResult<()> {
    let session = Session::restore()?;
    ctx.report.session_id = session.id();
    session.end()?;
    print_success("Logged out");
    Ok(())
}
