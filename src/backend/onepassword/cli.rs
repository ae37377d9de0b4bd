//! `op` CLI client
//!
//! Signs in with `op signin --raw` (master password on stdin) and reads items
//! with `op get item`. The session token reaches `op` through its
//! `OP_SESSION_<account>` environment variable, never the command line.

use super::OnePasswordClient;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use zeroize::Zeroizing;

/// Account shorthand the session is registered under
const ACCOUNT: &str = "externalsecret";

/// Variable `op` reads the session token of [`ACCOUNT`] from
const SESSION_ENV: &str = "OP_SESSION_externalsecret";

#[derive(Default)]
pub struct OpCli {
    session: Mutex<Option<Zeroizing<String>>>,
}

impl std::fmt::Debug for OpCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpCli").field("session", &"***").finish()
    }
}

impl OpCli {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn locate() -> Result<PathBuf> {
        which::which("op").context("1Password CLI 'op' not found in PATH")
    }

    fn session(&self) -> Result<Zeroizing<String>> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .context("not signed in to 1Password")
    }
}

#[async_trait]
impl OnePasswordClient for OpCli {
    async fn sign_in(
        &self,
        domain: &str,
        email: &str,
        secret_key: &str,
        master_password: &str,
    ) -> Result<()> {
        let mut child = command_at(&Self::locate()?)
            .args(["signin", domain, email, secret_key, "--raw", "--shorthand", ACCOUNT])
            .spawn()
            .context("failed to run 'op signin'")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(format!("{master_password}\n").as_bytes())
                .await
                .context("failed to pass master password to 'op signin'")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("failed to wait for 'op signin'")?;
        if !output.status.success() {
            bail!("{}", String::from_utf8_lossy(&output.stderr).trim());
        }

        let token = Zeroizing::new(String::from_utf8_lossy(&output.stdout).trim().to_string());
        if token.is_empty() {
            bail!("'op signin' returned an empty session token");
        }
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        debug!(domain = domain, "1Password session established");
        Ok(())
    }

    async fn get_item(&self, vault: &str, item: &str) -> Result<Option<String>> {
        let session = self.session()?;
        let output = get_item_command(&Self::locate()?, vault, item, &session)
            .output()
            .await
            .context("failed to run 'op get item'")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_not_found(&stderr) {
                return Ok(None);
            }
            bail!("{}", stderr.trim());
        }

        let document: Value =
            serde_json::from_slice(&output.stdout).context("'op get item' returned invalid JSON")?;
        extract_password(&document).map(Some)
    }
}

fn command_at(binary: &Path) -> Command {
    let mut command = Command::new(binary);
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

fn get_item_command(binary: &Path, vault: &str, item: &str, session: &str) -> Command {
    let mut command = command_at(binary);
    command
        .args(["get", "item", item])
        .arg(format!("--vault={vault}"))
        .arg(format!("--account={ACCOUNT}"))
        .env(SESSION_ENV, session)
        .stdin(Stdio::null());
    command
}

fn is_not_found(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("isn't an item") || stderr.contains("not found")
}

/// Password of an `op get item` document
///
/// Login items keep it in `details.fields` with `designation: password`;
/// password items keep it in `details.password`.
fn extract_password(document: &Value) -> Result<String> {
    let details = &document["details"];

    let from_fields = details["fields"].as_array().and_then(|fields| {
        fields
            .iter()
            .find(|field| field["designation"] == "password")
            .and_then(|field| field["value"].as_str())
    });

    from_fields
        .or_else(|| details["password"].as_str())
        .map(str::to_string)
        .context("item has no password field")
}
