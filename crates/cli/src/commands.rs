//! CLI commands

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;
use storefront_core::{CredentialStore, Service, decode_claims, is_expired};
use storefront_http::{ApiRequest, LoginRequest, RegisterRequest};
use tracing::info;

use crate::config::CliContext;

const ADMIN_ROLE: &str = "ADMIN";

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the issued credentials
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a new account
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(short, long)]
        email: Option<String>,
    },

    /// Revoke the session and forget the stored credentials
    Logout,

    /// Show who the stored access token belongs to
    Whoami {
        /// Ask the auth service instead of decoding the token locally
        #[arg(long)]
        remote: bool,
    },

    /// Inspect stored credentials
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// GET a path on a service
    Get(RequestArgs),

    /// DELETE a path on a service
    Delete(RequestArgs),

    /// POST a JSON body to a path on a service
    Post(BodyArgs),

    /// PUT a JSON body to a path on a service
    Put(BodyArgs),
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Show whether the stored access token is still usable
    Status,
}

#[derive(Args)]
pub struct RequestArgs {
    /// Target service (account, product, inventory, order, role, cart)
    service: Service,

    /// Path relative to the service base URL
    path: String,

    /// Send without credentials
    #[arg(long)]
    guest: bool,
}

#[derive(Args)]
pub struct BodyArgs {
    #[command(flatten)]
    target: RequestArgs,

    /// JSON request body
    #[arg(long)]
    json: Option<String>,
}

impl Commands {
    pub async fn execute(self, context: &CliContext) -> Result<()> {
        match self {
            Self::Login { username, password } => login(context, username, password).await,
            Self::Register {
                username,
                password,
                email,
            } => register(context, username, password, email).await,
            Self::Logout => logout(context).await,
            Self::Whoami { remote } => whoami(context, remote).await,
            Self::Token { command } => command.execute(context),
            Self::Get(args) => {
                let request = ApiRequest::get(args.path.clone());
                send(context, &args, request).await
            }
            Self::Delete(args) => {
                let request = ApiRequest::delete(args.path.clone());
                send(context, &args, request).await
            }
            Self::Post(args) => {
                let request = with_body(ApiRequest::post(args.target.path.clone()), args.json)?;
                send(context, &args.target, request).await
            }
            Self::Put(args) => {
                let request = with_body(ApiRequest::put(args.target.path.clone()), args.json)?;
                send(context, &args.target, request).await
            }
        }
    }
}

impl TokenCommands {
    pub fn execute(self, context: &CliContext) -> Result<()> {
        match self {
            Self::Status => token_status(context),
        }
    }
}

fn with_body(request: ApiRequest, json: Option<String>) -> Result<ApiRequest> {
    match json {
        Some(raw) => {
            let body: Value = serde_json::from_str(&raw).context("--json is not valid JSON")?;
            Ok(request.with_json(body))
        }
        None => Ok(request),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn login(context: &CliContext, username: String, password: String) -> Result<()> {
    let credentials = LoginRequest { username, password };
    context
        .factory
        .auth()
        .login(&credentials)
        .await
        .context("Login failed")?;

    info!("Stored credentials in {}", context.store.path().display());
    println!("Logged in as {}", credentials.username);
    Ok(())
}

async fn register(
    context: &CliContext,
    username: String,
    password: String,
    email: Option<String>,
) -> Result<()> {
    let request = RegisterRequest {
        username,
        password,
        email,
        extra: serde_json::Map::new(),
    };
    let account = context
        .factory
        .auth()
        .register(&request)
        .await
        .context("Registration failed")?;

    print_json(&account)
}

async fn logout(context: &CliContext) -> Result<()> {
    context.factory.auth().logout().await?;
    println!("Logged out");
    Ok(())
}

async fn whoami(context: &CliContext, remote: bool) -> Result<()> {
    if remote {
        let profile = context
            .factory
            .auth()
            .current_user()
            .await
            .context("Failed to fetch the current user")?;
        return print_json(&serde_json::to_value(profile)?);
    }

    let Some(token) = context.store.access_token()? else {
        println!("Not logged in");
        return Ok(());
    };

    let claims = decode_claims(&token).context("Stored access token is unreadable")?;
    println!("Subject:     {}", claims.sub.as_deref().unwrap_or("-"));
    if let Some(user_id) = claims.user_id {
        println!("User ID:     {user_id}");
    }
    println!("Roles:       {}", claims.roles.join(", "));
    if claims.has_role(ADMIN_ROLE) {
        println!("Admin:       yes");
    }
    if !claims.permissions.is_empty() {
        println!("Permissions: {}", claims.permissions.join(", "));
    }
    if let Some(expires_at) = claims.expires_at() {
        println!("Expires:     {}", expires_at.to_rfc3339());
    }
    Ok(())
}

fn token_status(context: &CliContext) -> Result<()> {
    let buffer = context.config.auth.expiry_buffer_secs;
    let access = context.store.access_token()?;
    let refresh = context.store.refresh_token()?;

    let state = match access.as_deref() {
        None => "missing",
        Some(token) if is_expired(Some(token), buffer) => "expired",
        Some(_) => "valid",
    };
    println!("Access token:  {state}");

    if let Some(expires_at) = access
        .as_deref()
        .and_then(|token| decode_claims(token).ok())
        .and_then(|claims| claims.expires_at())
    {
        let remaining = expires_at - chrono::Utc::now();
        println!(
            "Expires:       {} ({}s from now)",
            expires_at.to_rfc3339(),
            remaining.num_seconds()
        );
    }

    println!(
        "Refresh token: {}",
        if refresh.is_some() { "present" } else { "missing" }
    );
    println!("Store:         {}", context.store.path().display());
    Ok(())
}

async fn send(context: &CliContext, target: &RequestArgs, request: ApiRequest) -> Result<()> {
    let client = context.factory.client_for(target.service, !target.guest);
    let method = request.method().clone();
    let url = request.url(client.base_url());

    info!("{method} {url}");
    let body: Value = client
        .execute(request)
        .await
        .with_context(|| format!("{method} {url} failed"))?;

    print_json(&body)
}
