//! `shelver name` – preview the path a naming pattern produces.

use anyhow::{bail, Result};
use shelver_core::config::ShelverConfig;
use shelver_core::finalize::ensure_within_root;
use shelver_core::naming::{resolve_file_name, NamingVariables};

/// Split `KEY=VALUE`.
fn parse_var(s: &str) -> Result<(&str, &str)> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim(), v)),
        _ => bail!("expected KEY=VALUE, got {s:?}"),
    }
}

pub fn run_name(
    cfg: &ShelverConfig,
    pattern: Option<&str>,
    vars: &[String],
    ext: Option<&str>,
) -> Result<()> {
    let pattern = pattern.unwrap_or(&cfg.naming.file_pattern);
    let mut bindings = NamingVariables::default();
    for v in vars {
        let (key, value) = parse_var(v)?;
        bindings.set(key, value);
    }
    let relative = resolve_file_name(pattern, &bindings, ext);
    match cfg.output_path.as_deref() {
        Some(root) => println!("{}", ensure_within_root(root, &relative)?.display()),
        None => println!("{}", relative.display()),
    }
    Ok(())
}
