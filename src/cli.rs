use anyhow::{bail, Result};
use std::env;

/// Host/credential flags shared by every tool that talks to the platform.
/// Flattened into each binary's argument struct.
#[derive(clap::Args, Debug)]
pub struct HostArgs {
    /// Platform host URL (defaults to $XNAT_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Platform username (defaults to $XNAT_USER)
    #[arg(short = 'u', long)]
    pub username: Option<String>,
}

impl HostArgs {
    /// Resolve host, username and password, falling back to the
    /// conventional environment variables.
    pub fn resolve(&self) -> Result<(String, String, String)> {
        let host = match self.host.clone().or_else(|| env::var("XNAT_HOST").ok()) {
            Some(h) => h,
            None => bail!("no host given: pass --host or set XNAT_HOST"),
        };
        let username = match self.username.clone().or_else(|| env::var("XNAT_USER").ok()) {
            Some(u) => u,
            None => bail!("no username given: pass --username or set XNAT_USER"),
        };
        let password = match env::var("XNAT_PASS") {
            Ok(p) => p,
            Err(_) => bail!("no password found: set XNAT_PASS"),
        };
        Ok((host, username, password))
    }
}
