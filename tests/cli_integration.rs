//! CLI integration tests for Paasify
//!
//! These run the binary against temporary projects. Commands that reach the
//! compose engine use a shell script standing in for `docker-compose`.

use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the paasify binary
fn paasify_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("paasify"));
    cmd.env_remove("PAASIFY_PROJECT_DIR")
        .env_remove("PAASIFY_COLLECTIONS_DIR")
        .env_remove("PAASIFY_COMPOSE_BIN")
        .env_remove("RUST_LOG");
    cmd
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Create a project with two stacks
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("paasify.yml"),
        r#"
config:
  namespace: home
  tags_suffix: [logging]
sources:
  community:
    url: https://example.org/community.git
stacks:
  - traefik
  - path: wiki
    app: community:wikijs
    tags: [traefik-svc]
"#,
    );
    write(
        &dir.path().join("traefik/docker-compose.yml"),
        "services:\n  traefik:\n    image: traefik\n",
    );
    dir
}

// =============================================================================
// Project Commands
// =============================================================================

#[test]
fn test_ls_lists_stacks() {
    let dir = setup_project();

    paasify_cmd()
        .current_dir(dir.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("traefik"))
        .stdout(predicate::str::contains("community:wikijs"))
        .stdout(predicate::str::contains("traefik-svc, logging"));
}

#[test]
fn test_ls_json() {
    let dir = setup_project();

    let output = paasify_cmd()
        .arg("-c")
        .arg(dir.path())
        .args(["ls", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "traefik");
    assert_eq!(rows[1]["path"], "wiki");
    assert_eq!(rows[1]["tags"], serde_json::json!(["traefik-svc", "logging"]));
}

#[test]
fn test_ls_shows_effective_tags() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("paasify.yml"),
        r#"
config:
  tags_prefix: [ghost, web]
stacks:
  - path: site
    tags: ["-ghost", web, backup]
"#,
    );

    let output = paasify_cmd()
        .arg("-c")
        .arg(dir.path())
        .args(["ls", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["tags"], serde_json::json!(["web", "backup"]));
}

#[test]
fn test_info_shows_namespace() {
    let dir = setup_project();

    paasify_cmd()
        .arg("-c")
        .arg(dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("home"))
        .stdout(predicate::str::contains("logging"));
}

#[test]
fn test_src_ls() {
    let dir = setup_project();

    paasify_cmd()
        .arg("-c")
        .arg(dir.path())
        .args(["src", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("community"))
        .stdout(predicate::str::contains("https://example.org/community.git"));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_unknown_stack_fails() {
    let dir = setup_project();

    paasify_cmd()
        .arg("-c")
        .arg(dir.path())
        .args(["build", "nope"])
        .assert()
        .code(19)
        .stderr(predicate::str::contains("nope"))
        .stderr(predicate::str::contains("traefik"));
}

#[test]
fn test_outside_project_fails() {
    let dir = TempDir::new().unwrap();

    paasify_cmd()
        .current_dir(dir.path())
        .arg("ls")
        .assert()
        .code(17)
        .stderr(predicate::str::contains("paasify.yml"));
}

#[test]
fn test_duplicate_stack_dirs_fail() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("paasify.yml"),
        "stacks:\n  - path: web\n  - name: other\n    path: web\n",
    );

    paasify_cmd()
        .arg("-c")
        .arg(dir.path())
        .arg("ls")
        .assert()
        .code(18)
        .stderr(predicate::str::contains("Duplicate stack directory"));
}

#[test]
fn test_missing_base_compose_file_fails() {
    let dir = setup_project();
    fs::remove_file(dir.path().join("traefik/docker-compose.yml")).unwrap();

    paasify_cmd()
        .arg("-c")
        .arg(dir.path())
        .args(["explain", "traefik"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("traefik"));
}

#[test]
fn test_follow_requires_single_stack() {
    let dir = setup_project();

    paasify_cmd()
        .arg("-c")
        .arg(dir.path())
        .args(["logs", "-F"])
        .assert()
        .code(23);
}

// =============================================================================
// Engine Commands
// =============================================================================

#[cfg(unix)]
mod engine {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const FAKE_COMPOSE: &str = r#"#!/bin/sh
for arg in "$@"; do
  if [ "$arg" = "--version" ]; then
    echo "docker-compose version 2.17.0, build 0000000"
    exit 0
  fi
done
file=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "--file" ]; then file="$arg"; fi
  prev="$arg"
done
case " $* " in
  *" config "*) cat "$file" ;;
  *" ps "*) echo "[]" ;;
esac
"#;

    fn fake_compose(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("fake-compose.sh");
        fs::write(&path, FAKE_COMPOSE).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn single_stack_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("paasify.yml"), "stacks:\n  - traefik\n");
        write(
            &dir.path().join("traefik/docker-compose.yml"),
            "services:\n  traefik:\n    image: traefik\n",
        );
        dir
    }

    #[test]
    fn test_build_writes_compose_file() {
        let dir = single_stack_project();
        let bin = fake_compose(dir.path());

        paasify_cmd()
            .arg("-c")
            .arg(dir.path())
            .arg("--compose-bin")
            .arg(&bin)
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains("docker-compose.run.yml"));

        let output = dir.path().join("traefik/docker-compose.run.yml");
        let content = fs::read_to_string(output).unwrap();
        assert!(content.contains("image: traefik"));
    }

    #[test]
    fn test_build_app_stack_without_stack_dir() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("paasify.yml"), "stacks:\n  - app: default:wordpress\n");
        write(
            &dir.path().join(".paasify/collections/default/wordpress/docker-compose.yml"),
            "services:\n  wordpress:\n    image: wordpress\n",
        );
        let bin = fake_compose(dir.path());

        paasify_cmd()
            .arg("-c")
            .arg(dir.path())
            .arg("--compose-bin")
            .arg(&bin)
            .arg("build")
            .assert()
            .success();

        let output = dir.path().join("wordpress/docker-compose.run.yml");
        let content = fs::read_to_string(output).unwrap();
        assert!(content.contains("image: wordpress"));
    }

    #[test]
    fn test_up_before_build_fails() {
        let dir = single_stack_project();
        let bin = fake_compose(dir.path());

        paasify_cmd()
            .arg("-c")
            .arg(dir.path())
            .arg("--compose-bin")
            .arg(&bin)
            .arg("up")
            .assert()
            .code(22);
    }

    #[test]
    fn test_apply_then_ps() {
        let dir = single_stack_project();
        let bin = fake_compose(dir.path());

        paasify_cmd()
            .arg("-c")
            .arg(dir.path())
            .arg("--compose-bin")
            .arg(&bin)
            .arg("apply")
            .assert()
            .success()
            .stdout(predicate::str::contains("Applied 1 stack(s)"));

        paasify_cmd()
            .arg("-c")
            .arg(dir.path())
            .arg("--compose-bin")
            .arg(&bin)
            .args(["ps", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"stack\":\"traefik\""));
    }
}
