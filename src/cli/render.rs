//! # Render Command
//!
//! Renders the Terraform manifests of a `PostgreSql` manifest offline. Passwords
//! are given on the command line as `key=value`, keyed like the Secret keys the
//! users reference.

use crate::validate::{load_resource, resource_name};
use anyhow::{bail, Context, Result};
use sql_instance_controller::controller::reconciler::validate_spec;
use sql_instance_controller::credentials::{check_password, CredentialMap};
use sql_instance_controller::manifest::{compose, ManifestSet, StagingArea};
use std::path::{Path, PathBuf};

pub fn render_command(file: &Path, passwords: &[String], out: Option<PathBuf>) -> Result<()> {
    let instance = load_resource(file)?;
    let name = resource_name(&instance)?;

    validate_spec(&instance.spec, name)?;
    let spec = instance.spec.with_defaults(name);
    let credentials = parse_passwords(passwords)?;
    let manifests = compose(&spec, &credentials)?;

    match out {
        Some(dir) => {
            let staging = StagingArea::at(dir);
            staging.write_manifests(&manifests)?;
            println!("✔ Manifests written to {}", staging.root().display());
        }
        None => {
            let main = ManifestSet::to_bytes(&manifests.instance)?;
            print!(
                "{}",
                String::from_utf8(main).context("rendered manifest is not UTF-8")?
            );
        }
    }
    Ok(())
}

fn parse_passwords(entries: &[String]) -> Result<CredentialMap> {
    let mut credentials = CredentialMap::new();
    for entry in entries {
        let Some((key, password)) = entry.split_once('=') else {
            bail!("--password expects key=value, got {entry:?}");
        };
        if let Err(violation) = check_password(password) {
            bail!("password for key {key:?} is too weak: {violation}");
        }
        credentials.insert(key, password);
    }
    Ok(credentials)
}
