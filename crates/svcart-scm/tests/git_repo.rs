//! Probing real repositories created with the `git` binary.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use svcart_scm::handler::git::{GIT_DIR_VAR, GIT_WORK_TREE_VAR};
use svcart_scm::{
    Environment, GitCli, GitHandler, ScmConfig, ScmHandler, ScmKind, ScmResolver, ScmTool,
};

fn run_git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn make_git_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    run_git(dir.path(), &["init", "--initial-branch=main"]);
    run_git(dir.path(), &["config", "user.name", "test-user"]);
    run_git(dir.path(), &["config", "user.email", "test@example.com"]);
    run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
    std::fs::write(dir.path().join("README.md"), "service\n").unwrap();
    run_git(dir.path(), &["add", "README.md"]);
    run_git(dir.path(), &["commit", "-m", "initial"]);
    dir
}

fn git_handler(dir: &Path) -> GitHandler {
    git_handler_for(&Environment::new(dir))
}

fn git_handler_for(env: &Environment) -> GitHandler {
    let tool: Arc<dyn ScmTool> = Arc::new(GitCli::default());
    GitHandler::from_env(env, &ScmConfig::default(), tool)
}

#[test]
fn head_sha_returns_40_hex_chars() {
    let repo = make_git_repo();
    let sha = GitCli::default().head_sha(repo.path()).unwrap();
    assert_eq!(sha.len(), 40, "SHA should be 40 hex chars, got: {sha}");
    assert!(sha.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn rev_parse_fails_for_missing_git_dir() {
    let dir = tempfile::tempdir().unwrap();
    let git_dir = format!("--git-dir={}", dir.path().join(".git").display());
    assert!(GitCli::default()
        .run(dir.path(), &[git_dir.as_str(), "rev-parse", "HEAD"])
        .is_err());
}

#[test]
fn handler_matches_git_rev_parse() {
    let repo = make_git_repo();
    let expected = GitCli::default().head_sha(repo.path()).unwrap();
    let handler = git_handler(repo.path());

    assert!(handler.is_available());
    assert_eq!(handler.revision().as_deref(), Some(expected.as_str()));
    assert_eq!(
        handler.annotated_version("1.2.3"),
        format!("1.2.3+{}", &expected[..7])
    );
}

#[test]
fn packed_refs_after_gc() {
    let repo = make_git_repo();
    let expected = GitCli::default().head_sha(repo.path()).unwrap();
    run_git(repo.path(), &["pack-refs", "--all"]);

    let handler = git_handler(repo.path());
    assert_eq!(handler.revision().as_deref(), Some(expected.as_str()));
}

#[test]
fn modified_tracked_file_marks_version_dirty() {
    let repo = make_git_repo();
    std::fs::write(repo.path().join("README.md"), "changed\n").unwrap();

    let handler = git_handler(repo.path());
    assert!(handler.annotated_version("1.0.0").ends_with(".dirty"));
}

#[test]
fn untracked_files_do_not_mark_dirty() {
    let repo = make_git_repo();
    std::fs::write(repo.path().join("scratch.txt"), "tmp\n").unwrap();

    let handler = git_handler(repo.path());
    assert!(!handler.annotated_version("1.0.0").ends_with(".dirty"));
}

#[test]
fn topic_branch_is_in_version() {
    let repo = make_git_repo();
    run_git(repo.path(), &["checkout", "-b", "feature/payments"]);

    let handler = git_handler(repo.path());
    assert!(handler
        .annotated_version("2.1.0")
        .starts_with("2.1.0-feature-payments+"));
}

#[test]
fn subdirectory_resolves_to_enclosing_repo() {
    let repo = make_git_repo();
    let nested = repo.path().join("services").join("api");
    std::fs::create_dir_all(&nested).unwrap();

    let env = Environment::new(&nested);
    let resolver = ScmResolver::with_defaults(&env, &ScmConfig::default());
    assert_eq!(resolver.resolve().kind(), Some(ScmKind::DistributedVcs));
}

#[test]
fn git_dir_override_measures_its_own_index() {
    let pinned = make_git_repo();
    let expected = GitCli::default().head_sha(pinned.path()).unwrap();

    // The enclosing checkout is dirty against its own HEAD but its README
    // matches what `pinned` committed.
    let enclosing = make_git_repo();
    std::fs::write(enclosing.path().join("README.md"), "old\n").unwrap();
    run_git(enclosing.path(), &["commit", "-am", "old readme"]);
    std::fs::write(enclosing.path().join("README.md"), "service\n").unwrap();
    assert!(git_handler(enclosing.path())
        .annotated_version("1.0.0")
        .ends_with(".dirty"));

    let env = Environment::new(enclosing.path()).with_var(
        GIT_DIR_VAR,
        pinned.path().join(".git").display().to_string(),
    );
    let handler = git_handler_for(&env);

    assert_eq!(handler.revision().as_deref(), Some(expected.as_str()));
    assert_eq!(
        handler.annotated_version("1.0.0"),
        format!("1.0.0+{}", &expected[..7])
    );
}

#[test]
fn git_work_tree_override_is_honoured() {
    let pinned = make_git_repo();
    let expected = GitCli::default().head_sha(pinned.path()).unwrap();
    let enclosing = make_git_repo();
    std::fs::write(enclosing.path().join("README.md"), "edited\n").unwrap();

    let env = Environment::new(enclosing.path())
        .with_var(GIT_DIR_VAR, pinned.path().join(".git").display().to_string())
        .with_var(GIT_WORK_TREE_VAR, pinned.path().display().to_string());
    let handler = git_handler_for(&env);

    assert_eq!(
        handler.annotated_version("1.0.0"),
        format!("1.0.0+{}", &expected[..7])
    );
}
