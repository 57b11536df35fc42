use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SCM_VARS: &[&str] = &[
    "GERRIT_CHANGE_NUMBER",
    "GERRIT_PATCHSET_NUMBER",
    "GERRIT_PATCHSET_REVISION",
    "GIT_DIR",
    "GIT_WORK_TREE",
];

/// `svcart` with SCM variables cleared and the `.git` search fenced in at
/// `ceiling`.
fn svcart_cmd(ceiling: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_svcart"));
    for var in SCM_VARS {
        cmd.env_remove(var);
    }
    cmd.env("GIT_CEILING_DIRECTORIES", ceiling);
    cmd
}

fn svcart(ceiling: &Path, dir: &Path, args: &[&str]) -> Output {
    svcart_cmd(ceiling)
        .arg("--dir")
        .arg(dir)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "svcart failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn project(root: &tempfile::TempDir) -> PathBuf {
    let dir = root.path().join("project");
    std::fs::create_dir(&dir).unwrap();
    dir
}

#[test]
fn review_change_annotates_version() {
    let root = tempfile::tempdir().unwrap();
    let output = svcart_cmd(root.path())
        .env("GERRIT_CHANGE_NUMBER", "321")
        .env("GERRIT_PATCHSET_NUMBER", "7")
        .env(
            "GERRIT_PATCHSET_REVISION",
            "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef",
        )
        .arg("--dir")
        .arg(project(&root))
        .args(["version", "1.2.3"])
        .output()
        .unwrap();

    assert_eq!(stdout(&output), "1.2.3-review.321.7+deadbee");
}

#[test]
fn no_scm_prints_base_version() {
    let root = tempfile::tempdir().unwrap();
    let dir = project(&root);
    assert_eq!(stdout(&svcart(root.path(), &dir, &["version", "1.2.3"])), "1.2.3");
    assert_eq!(stdout(&svcart(root.path(), &dir, &["info"])), "scm:      none");
}

#[test]
fn metadata_file_is_written() {
    let root = tempfile::tempdir().unwrap();
    let dir = project(&root);
    let out = stdout(&svcart(
        root.path(),
        &dir,
        &["metadata", "--name", "billing", "--base", "1.2.3"],
    ));

    let path = dir.join("build").join("version.json");
    assert_eq!(Path::new(&out), path);

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["name"], "billing");
    assert_eq!(doc["version"], "1.2.3");
    assert!(doc["revision"].is_null());
    assert!(doc["buildDate"].is_string());
    assert!(doc["builtOn"].is_string());
}

#[test]
fn info_json_reports_no_context() {
    let root = tempfile::tempdir().unwrap();
    let dir = project(&root);
    let doc: serde_json::Value = serde_json::from_str(&stdout(&svcart(
        root.path(),
        &dir,
        &["info", "--format", "json"],
    )))
    .unwrap();
    assert!(doc["kind"].is_null());
    assert!(doc["revision"].is_null());
}

#[test]
fn relative_dir_is_resolved_against_cwd() {
    let root = tempfile::tempdir().unwrap();
    let repo = root.path().join("repo");
    std::fs::create_dir_all(repo.join(".git")).unwrap();
    std::fs::write(
        repo.join(".git").join("HEAD"),
        "0123456789abcdef0123456789abcdef01234567\n",
    )
    .unwrap();
    std::fs::create_dir(root.path().join("plain")).unwrap();

    let output = svcart_cmd(root.path())
        .env("SVCART_DIRTY_CHECK", "false")
        .current_dir(&repo)
        .args(["--dir", "../plain", "version", "1.2.3"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "1.2.3");

    let output = svcart_cmd(root.path())
        .env("SVCART_DIRTY_CHECK", "false")
        .current_dir(root.path())
        .args(["--dir", "repo", "version", "1.2.3"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "1.2.3+0123456");
}

#[cfg(unix)]
#[test]
fn non_utf8_variable_does_not_abort() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let root = tempfile::tempdir().unwrap();
    let output = svcart_cmd(root.path())
        .env("SVCART_TEST_NON_UTF8", OsStr::from_bytes(b"\xff\xfe"))
        .arg("--dir")
        .arg(project(&root))
        .args(["version", "1.2.3"])
        .output()
        .unwrap();
    assert_eq!(stdout(&output), "1.2.3");
}
