// lpad-core/src/stub/script.rs
//! Renders stub scripts.
//!
//! A stub saves every variable it is about to touch, applies the package
//! environment, runs the real binary as a child and restores the saved
//! values from an EXIT trap. The binary is never `exec`ed so the trap always
//! gets to run.
use std::fmt::Write;
use std::path::Path;

use lpad_common::model::env::{is_list_variable, is_valid_variable_name};
use lpad_common::model::StubScript;
use tracing::warn;

/// Names the stub uses for its own bookkeeping.
const INTERNAL_PREFIX: &str = "_lpad_";

/// Where a stub finds things at run time.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Directory the stub is written into; skipped when searching PATH.
    pub stub_dir: &'a Path,
    /// Command used for on-demand resolution, e.g. `pkgx`.
    pub resolver: &'a str,
    /// Root under which activated project markers live.
    pub dev_marker_dir: &'a Path,
}

/// Single-quotes `value` for POSIX sh.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'\''"#))
}

pub fn render(stub: &StubScript, ctx: &RenderContext<'_>) -> String {
    let name = shell_quote(&stub.binary_name);
    let mut out = String::new();

    out.push_str("#!/bin/sh\n");
    let _ = writeln!(
        out,
        "# lpad stub for {} ({}@{}). Regenerated on reinstall.",
        stub.binary_name, stub.project, stub.version
    );
    out.push('\n');
    let _ = writeln!(
        out,
        "_lpad_stub_dir={}",
        shell_quote(&ctx.stub_dir.to_string_lossy())
    );
    let _ = writeln!(
        out,
        "_lpad_target={}",
        shell_quote(&stub.target.to_string_lossy())
    );
    out.push_str("_lpad_path=${PATH-}\n\n");

    if stub.dev_aware {
        render_dev_check(&mut out, &name, ctx);
    }

    let vars: Vec<(&String, &String)> = stub
        .env
        .iter()
        .filter(|(key, _)| {
            if !is_valid_variable_name(key) {
                warn!(
                    "Stub {}: skipping invalid variable name '{}'",
                    stub.binary_name, key
                );
                return false;
            }
            if key.starts_with(INTERNAL_PREFIX) {
                warn!(
                    "Stub {}: skipping '{}', the {} prefix is reserved for the stub itself",
                    stub.binary_name, key, INTERNAL_PREFIX
                );
                return false;
            }
            true
        })
        .collect();

    for (key, _) in &vars {
        let _ = writeln!(out, "_lpad_set_{key}=${{{key}+x}}");
        let _ = writeln!(out, "_lpad_orig_{key}=${{{key}-}}");
    }
    out.push('\n');

    out.push_str("_lpad_restored=\n");
    out.push_str("_lpad_restore() {\n");
    out.push_str("  [ -n \"$_lpad_restored\" ] && return 0\n");
    out.push_str("  _lpad_restored=1\n");
    for (key, _) in &vars {
        let _ = writeln!(
            out,
            "  if [ -n \"$_lpad_set_{key}\" ]; then {key}=$_lpad_orig_{key}; export {key}; else unset {key}; fi"
        );
    }
    out.push_str("  :\n}\n");
    out.push_str("trap '_lpad_restore' EXIT\n");
    out.push_str("trap '_lpad_restore; exit 130' INT\n");
    out.push_str("trap '_lpad_restore; exit 143' TERM\n\n");

    for (key, value) in &vars {
        if is_list_variable(key) {
            let _ = writeln!(
                out,
                "{key}={}\"${{_lpad_orig_{key}:+:$_lpad_orig_{key}}}\"; export {key}",
                shell_quote(value)
            );
        } else {
            let _ = writeln!(out, "{key}={}; export {key}", shell_quote(value));
        }
    }
    out.push('\n');

    let resolver = shell_quote(ctx.resolver);
    let pinned = shell_quote(&format!("+{}={}", stub.project, stub.version));
    let _ = write!(
        out,
        r#"_lpad_run() {{
  if [ -x "$_lpad_target" ]; then
    "$_lpad_target" "$@"
    return $?
  fi
  if command -v {resolver} >/dev/null 2>&1 &&
    {resolver} {pinned} sh -c 'command -v "$1"' _ {name} >/dev/null 2>&1; then
    echo "lpad: $_lpad_target is missing, running through {resolver_plain}" >&2
    {resolver} {pinned} {name} "$@"
    return $?
  fi
  _lpad_ifs=$IFS
  IFS=:
  for _lpad_dir in $_lpad_path; do
    IFS=$_lpad_ifs
    [ -n "$_lpad_dir" ] || continue
    [ "$_lpad_dir" = "$_lpad_stub_dir" ] && continue
    if [ -x "$_lpad_dir"/{name} ]; then
      echo "lpad: warning: $_lpad_target is missing, using $_lpad_dir/{name_plain}" >&2
      "$_lpad_dir"/{name} "$@"
      return $?
    fi
  done
  IFS=$_lpad_ifs
  echo "lpad: {name_plain}: $_lpad_target is missing and no fallback was found" >&2
  return 127
}}

_lpad_run "$@"
exit $?
"#,
        resolver_plain = sanitize_for_message(ctx.resolver),
        name_plain = sanitize_for_message(&stub.binary_name),
    );
    out
}

/// Prefers the binary from an activated dev environment when the working
/// directory sits inside one.
fn render_dev_check(out: &mut String, name: &str, ctx: &RenderContext<'_>) {
    let marker_root = shell_quote(&ctx.dev_marker_dir.to_string_lossy());
    let _ = write!(
        out,
        r#"_lpad_d=$PWD
while [ -n "$_lpad_d" ]; do
  if [ -f {marker_root}"$_lpad_d/dev.pkgx.activated" ]; then
    _lpad_ifs=$IFS
    IFS=:
    for _lpad_dir in $PATH; do
      IFS=$_lpad_ifs
      [ -n "$_lpad_dir" ] || continue
      [ "$_lpad_dir" = "$_lpad_stub_dir" ] && continue
      if [ -x "$_lpad_dir"/{name} ]; then
        "$_lpad_dir"/{name} "$@"
        exit $?
      fi
    done
    IFS=$_lpad_ifs
    break
  fi
  _lpad_d=${{_lpad_d%/*}}
done

"#
    );
}

/// Text that is safe inside a double-quoted echo argument.
fn sanitize_for_message(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '"' | '$' | '`' | '\\'))
        .collect()
}
