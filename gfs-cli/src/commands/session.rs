use std::io::{self, BufRead};

use anyhow::{Context as _, Result, bail};
use clap::Args;
use rpassword::prompt_password;
use shared::models::UserRecord;

use crate::context::Context;

#[derive(Args, Debug)]
pub struct CredentialArgs {
    /// Account name
    #[arg(long, short)]
    pub username: String,

    /// Read the password from the first line of stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Args, Debug)]
pub struct PasswordArgs {
    /// Read the old and new passwords from the first two lines of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Args, Debug)]
pub struct CreateAdminArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
}

pub async fn login(ctx: &Context, args: CredentialArgs) -> Result<()> {
    let password = read_password("Password: ", args.password_stdin)?;
    let user = ctx
        .api()
        .login(&args.username, &password)
        .await
        .context("login failed")?;

    println!("Logged in as {}", display_name(&user));
    if user.is_admin() {
        println!("admin: yes");
    }
    print_storage(ctx);
    Ok(())
}

pub async fn signup(ctx: &Context, args: CredentialArgs) -> Result<()> {
    let password = read_password("Password: ", args.password_stdin)?;
    let user = ctx
        .api()
        .signup(&args.username, &password)
        .await
        .context("signup failed")?;
    println!("Created account {}", display_name(&user));
    println!("run `gfs login --username {}` to sign in", args.username);
    Ok(())
}

pub fn whoami(ctx: &Context) {
    match ctx.session.user() {
        Some(user) => println!("user: {}", display_name(&user)),
        None => println!("user: (none)"),
    }
    println!("authenticated: {}", yes_no(ctx.session.is_authenticated()));
    println!("admin: {}", yes_no(ctx.session.is_admin()));
    print_storage(ctx);
}

pub async fn logout(ctx: &Context) -> Result<()> {
    let was_authenticated = ctx.session.is_authenticated();
    ctx.api().logout().await.context("failed to clear session")?;
    if was_authenticated {
        println!("Logged out");
    } else {
        println!("No active session");
    }
    Ok(())
}

pub async fn change_password(ctx: &Context, args: PasswordArgs) -> Result<()> {
    require_session(ctx)?;
    let (old_password, new_password) = if args.password_stdin {
        let mut lines = io::stdin().lock().lines();
        let old = next_line(&mut lines, "old password")?;
        let new = next_line(&mut lines, "new password")?;
        (old, new)
    } else {
        let old = prompt_password("Current password: ")?;
        let new = prompt_password("New password: ")?;
        let confirm = prompt_password("Confirm new password: ")?;
        if new != confirm {
            bail!("new passwords do not match");
        }
        (old, new)
    };
    if new_password.trim().is_empty() {
        bail!("password must not be empty");
    }

    ctx.api()
        .change_password(&old_password, &new_password)
        .await
        .context("password change failed")?;
    println!("Password changed");
    Ok(())
}

pub async fn create_admin(ctx: &Context, args: CreateAdminArgs) -> Result<()> {
    require_session(ctx)?;
    if !ctx.session.is_admin() {
        eprintln!("warning: the stored user is not an admin; the server will likely refuse");
    }
    let credentials = args.credentials;
    let password = read_password("Password for new admin: ", credentials.password_stdin)?;
    let user = ctx
        .api()
        .create_admin(&credentials.username, &password)
        .await
        .context("admin creation failed")?;
    println!("Created admin {}", display_name(&user));
    Ok(())
}

fn require_session(ctx: &Context) -> Result<()> {
    if !ctx.session.is_authenticated() {
        bail!("no active session; run `gfs login` first");
    }
    Ok(())
}

fn read_password(prompt: &str, from_stdin: bool) -> Result<String> {
    let password = if from_stdin {
        next_line(&mut io::stdin().lock().lines(), "password")?
    } else {
        prompt_password(prompt)?
    };
    if password.trim().is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

fn next_line(lines: &mut impl Iterator<Item = io::Result<String>>, what: &str) -> Result<String> {
    match lines.next() {
        Some(line) => Ok(line?.trim_end_matches(['\r', '\n']).to_string()),
        None => bail!("expected {what} on stdin"),
    }
}

fn display_name(user: &UserRecord) -> String {
    match (user.username(), user.user_id()) {
        (Some(name), Some(id)) => format!("{name} (id {id})"),
        (Some(name), None) => name.to_string(),
        (None, Some(id)) => format!("user {id}"),
        (None, None) => "(unnamed user)".to_string(),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn print_storage(ctx: &Context) {
    if ctx.session.is_persistent() {
        println!("session stored at {}", ctx.config.storage_path.display());
    } else {
        println!("session not persisted (ephemeral)");
    }
}
