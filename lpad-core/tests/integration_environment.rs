#![cfg(unix)]

mod common;

use std::fs;
use std::process::Command;

use common::Sandbox;
use lpad_common::dependency::PackageRequirement;
use lpad_core::environment::METADATA_FILE;
use lpad_core::EnvironmentManager;
use lpad_net::PkgxResolver;

#[tokio::test]
async fn ensure_creates_a_healthy_environment() {
    let sb = Sandbox::new();
    sb.package("nodejs.org", "20.11.0", &["node"]);
    let resolver = sb.answering_resolver(&sb.v2_json(&[("nodejs.org", "20.11.0")]));
    let config = sb.config(&resolver);
    let project = sb.path().join("my-app");
    fs::create_dir_all(&project).unwrap();

    let manager = EnvironmentManager::new(config.clone());
    let (env, report) = manager
        .ensure_with_resolver(
            &project,
            &[PackageRequirement::parse("nodejs.org@20").unwrap()],
            PkgxResolver::new(&config),
        )
        .await
        .unwrap();

    assert_eq!(report.installed_count(), 1);
    assert!(env.hash.starts_with("my-app_"));
    assert_eq!(env.root_path, config.envs_dir.join(&env.hash));
    assert_eq!(env.packages.len(), 1);
    assert_eq!(env.packages[0].project, "nodejs.org");
    assert!(env.root_path.join(METADATA_FILE).is_file());
    assert!(env.root_path.join("bin/node").is_file());
    assert!(manager.health(&env.hash).unwrap().is_healthy());

    let found = manager.find(&project).unwrap().expect("environment exists");
    assert_eq!(found.hash, env.hash);
    assert_eq!(
        found.project_dir.as_deref(),
        Some(project.canonicalize().unwrap().as_path())
    );
    let listed: Vec<String> = manager.list().unwrap().into_iter().map(|e| e.hash).collect();
    assert_eq!(listed, vec![env.hash.clone()]);
}

#[tokio::test]
async fn failed_first_install_leaves_nothing_behind() {
    let sb = Sandbox::new();
    let resolver = sb.resolver("echo 'pkg not found: nope.example' >&2; exit 1");
    let config = sb.config(&resolver);
    let project = sb.path().join("broken");
    fs::create_dir_all(&project).unwrap();

    let manager = EnvironmentManager::new(config.clone());
    let result = manager
        .ensure_with_resolver(
            &project,
            &[PackageRequirement::parse("nope.example").unwrap()],
            PkgxResolver::new(&config),
        )
        .await;

    assert!(result.is_err());
    assert!(manager.find(&project).unwrap().is_none());
    assert!(manager.list().unwrap().is_empty());
}

#[tokio::test]
async fn activation_round_trips_in_a_shell() {
    let sb = Sandbox::new();
    sb.package("nodejs.org", "20.11.0", &["node"]);
    let resolver = sb.answering_resolver(&sb.v2_json(&[("nodejs.org", "20.11.0")]));
    let config = sb.config(&resolver);
    let project = sb.path().join("web");
    fs::create_dir_all(&project).unwrap();

    let manager = EnvironmentManager::new(config.clone());
    let (env, _) = manager
        .ensure_with_resolver(
            &project,
            &[PackageRequirement::parse("nodejs.org").unwrap()],
            PkgxResolver::new(&config),
        )
        .await
        .unwrap();

    let script = manager.activation(&project).unwrap();
    let script_path = sb.path().join("activate.sh");
    fs::write(&script_path, script).unwrap();

    let out = Command::new("/bin/sh")
        .arg("-c")
        .arg(format!(
            ". '{}'\nnode\necho \"active=$LPAD_ACTIVE_DIR\"",
            script_path.display()
        ))
        .env("PATH", "/usr/bin:/bin")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("node 20.11.0"), "{stdout}");
    assert!(
        stdout.contains(&format!("active={}", project.canonicalize().unwrap().display())),
        "{stdout}"
    );

    manager.remove(&env.hash).unwrap();
    assert!(manager.find(&project).unwrap().is_none());
    assert!(manager.activation(&project).is_err());
}
