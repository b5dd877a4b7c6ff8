//! Login / logout handlers.

use dialoguer::{Confirm, Input};
use secrecy::SecretString;
use tracing::debug;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config;
use crate::error::CliError;

use super::util;

pub async fn login(args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::start(global).await?;
    let profile_name = session.profile().to_owned();
    let profile = &session.resolved.profile;

    // 1. Client secret: configured, or prompted and optionally kept
    let secret = match session.resolved.sync.client_secret.clone() {
        Some(secret) => secret,
        None => {
            let value = rpassword::prompt_password("Client secret: ").map_err(util::prompt_err)?;
            let secret = SecretString::from(value);
            let keep = Confirm::new()
                .with_prompt("Store the client secret in the system keyring?")
                .default(true)
                .interact()
                .map_err(util::prompt_err)?;
            if keep {
                config::store_client_secret(&profile_name, &secret)?;
            }
            secret
        }
    };

    // 2. Username (flag > profile > prompt)
    let username = match args.username.or_else(|| profile.username.clone()) {
        Some(u) => u,
        None => Input::<String>::new()
            .with_prompt("Netatmo e-mail")
            .interact_text()
            .map_err(util::prompt_err)?,
    };

    // 3. Password (flag / env > prompt)
    let password = match args.password {
        Some(p) => p,
        None => rpassword::prompt_password("Password: ").map_err(util::prompt_err)?,
    };

    if session.handle.state().is_authenticated() {
        debug!(profile = %profile_name, "replacing restored session");
    }

    let spinner = util::spinner("Signing in...", global.quiet);
    let result = session
        .handle
        .login(username.clone(), SecretString::from(password), secret)
        .await;
    spinner.finish_and_clear();
    result?;

    if !global.quiet {
        eprintln!("✓ Signed in as {username} (profile '{profile_name}')");
    }
    Ok(())
}

pub async fn logout(global: &GlobalOpts) -> Result<(), CliError> {
    let session = util::start(global).await?;
    session.handle.logout().await;

    if !global.quiet {
        eprintln!("✓ Signed out of profile '{}'", session.profile());
    }
    Ok(())
}
