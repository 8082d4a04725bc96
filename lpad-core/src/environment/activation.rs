// lpad-core/src/environment/activation.rs
//! Shell snippets for entering and leaving a project environment.
//!
//! The shell hook `eval`s these in the interactive shell itself. Activation
//! records what it changed in `LPAD_ACTIVE_VARS` and saves each original
//! value (or an "unset" sentinel) so deactivation can put things back exactly.
//! Sourcing it again for the same project does nothing; if another project
//! is active, that one is restored first.
use std::fmt::Write;
use std::path::Path;

use lpad_common::model::env::{is_list_variable, is_valid_variable_name};
use lpad_common::model::EnvironmentMap;

use crate::stub::shell_quote;

pub const SAVED_PREFIX: &str = "_LPAD_SAVED_";
pub const UNSET_SENTINEL: &str = "__LPAD_UNSET__";
pub const ACTIVE_DIR_VAR: &str = "LPAD_ACTIVE_DIR";
pub const ACTIVE_VARS_VAR: &str = "LPAD_ACTIVE_VARS";

pub fn activation_script(project_dir: &Path, env_root: &Path, env: &EnvironmentMap) -> String {
    let mut applied = EnvironmentMap::new();
    let bins: Vec<String> = ["bin", "sbin"]
        .iter()
        .map(|d| env_root.join(d).to_string_lossy().to_string())
        .collect();
    applied.set("PATH", bins.join(":"));
    for (key, value) in env {
        if key == "PATH" || key.starts_with("LPAD_") || !is_valid_variable_name(key) {
            continue;
        }
        applied.set(key.clone(), value.clone());
    }

    let project = shell_quote(&project_dir.to_string_lossy());
    let mut out = String::new();
    let _ = writeln!(out, "if [ \"${{{ACTIVE_DIR_VAR}-}}\" != {project} ]; then");
    let _ = writeln!(out, "if [ -n \"${{{ACTIVE_DIR_VAR}-}}\" ]; then");
    out.push_str(&restore_active_vars());
    out.push_str("fi\n");
    for (key, _) in &applied {
        let _ = writeln!(
            out,
            "export {SAVED_PREFIX}{key}=\"${{{key}-{UNSET_SENTINEL}}}\""
        );
    }
    for (key, value) in &applied {
        if is_list_variable(key) {
            let _ = writeln!(
                out,
                "export {key}={}\"${{{key}:+:${key}}}\"",
                shell_quote(value)
            );
        } else {
            let _ = writeln!(out, "export {key}={}", shell_quote(value));
        }
    }
    let names: Vec<&str> = applied.keys().collect();
    let _ = writeln!(out, "export {ACTIVE_DIR_VAR}={project}");
    let _ = writeln!(out, "export {ACTIVE_VARS_VAR}={}", shell_quote(&names.join(" ")));
    out.push_str("fi\n");
    out
}

/// Restores every variable named in `active_vars` (the value of
/// `LPAD_ACTIVE_VARS`) and clears the bookkeeping.
pub fn deactivation_script(active_vars: &str) -> String {
    let mut out = String::new();
    for key in active_vars.split_whitespace() {
        if !is_valid_variable_name(key) {
            continue;
        }
        let saved = format!("{SAVED_PREFIX}{key}");
        let _ = writeln!(
            out,
            "if [ \"${{{saved}-{UNSET_SENTINEL}}}\" = {UNSET_SENTINEL} ]; then unset {key}; else export {key}=\"${saved}\"; fi"
        );
        let _ = writeln!(out, "unset {saved}");
    }
    let _ = writeln!(out, "unset {ACTIVE_DIR_VAR} {ACTIVE_VARS_VAR}");
    out
}

/// Undoes whatever activation is recorded in `LPAD_ACTIVE_VARS` at run time,
/// for switching straight from one project to another.
fn restore_active_vars() -> String {
    format!(
        r#"for _lpad_v in ${{{ACTIVE_VARS_VAR}-}}; do
  case $_lpad_v in ''|[0-9]*|*[!A-Za-z0-9_]*) continue ;; esac
  eval "_lpad_s=\${{{SAVED_PREFIX}$_lpad_v-{UNSET_SENTINEL}}}"
  if [ "$_lpad_s" = {UNSET_SENTINEL} ]; then unset "$_lpad_v"; else export "$_lpad_v=$_lpad_s"; fi
  unset "{SAVED_PREFIX}$_lpad_v"
done
unset _lpad_v _lpad_s {ACTIVE_DIR_VAR} {ACTIVE_VARS_VAR}
"#
    )
}

/// The hook should deactivate once the shell leaves the project subtree.
pub fn should_deactivate(cwd: &Path, active_dir: &Path) -> bool {
    !cwd.starts_with(active_dir)
}
