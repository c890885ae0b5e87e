//! Repository-scoped Git workspaces built on `git2` (libgit2).
//!
//! - One working copy per `(owner, repo)` pair: `<clone_base>/<owner>--<repo>`.
//! - Blocking libgit2 work runs under `spawn_blocking`.
//! - SSH auth: `SSH_KEY_PATH` (private key) or ssh-agent fallback.
//! - HTTPS auth: `GIT_HTTP_TOKEN` or `GITHUB_TOKEN` (+ `GIT_HTTP_USER`,
//!   default `oauth2`).
//! - Working trees are force-cleaned and hard-reset to the remote tip before use,
//!   so leftovers from a previously failed run never leak into the next one.

use std::{
    fs,
    path::{Path, PathBuf},
};

use git2::{
    BranchType, Cred, CredentialType, FetchOptions, FetchPrune, IndexAddOption, PushOptions,
    RemoteCallbacks, Repository, ResetType, Signature, StatusOptions,
    build::{CheckoutBuilder, RepoBuilder},
};
use tokio::task;
use tracing::{debug, error, info, instrument};

pub mod errors;
use errors::Result;

/// Manages one local clone per `(owner, repo)` pair under a base directory.
///
/// All mutating operations assume they are the only writer for a given
/// workspace directory; callers serialize access per repository.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    clone_base: PathBuf,
}

impl WorkspaceManager {
    pub fn new(clone_base: impl Into<PathBuf>) -> Self {
        Self {
            clone_base: clone_base.into(),
        }
    }

    /// Local directory assigned to a repository, whether or not it exists yet.
    pub fn workspace_dir(&self, owner: &str, repo: &str) -> PathBuf {
        self.clone_base.join(format!("{owner}--{repo}"))
    }

    /// Clone the repository if no local copy exists, otherwise fetch every
    /// remote with pruning. Returns the workspace directory.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn ensure(&self, owner: &str, repo: &str) -> Result<PathBuf> {
        let target = self.workspace_dir(owner, repo);
        let url = remote_url(owner, repo);
        let clone_base = self.clone_base.clone();

        let dir = target.clone();
        task::spawn_blocking(move || {
            if dir.exists() {
                debug!(path = %dir.display(), "workspace exists, fetching");
                fetch_blocking(&dir)
            } else {
                fs::create_dir_all(&clone_base)?;
                info!(path = %dir.display(), "no local copy, cloning");
                clone_blocking(&url, &dir)
            }
        })
        .await??;

        Ok(target)
    }

    /// Discard any leftover local mutation, check out `branch` (creating a
    /// tracking branch when it only exists on the remote) and hard-reset it
    /// to the remote tip.
    #[instrument(skip(self, dir), fields(branch = %branch))]
    pub async fn checkout(&self, dir: &Path, branch: &str) -> Result<()> {
        let dir = dir.to_path_buf();
        let branch = branch.to_string();
        task::spawn_blocking(move || checkout_blocking(&dir, &branch)).await?
    }

    /// True when the working tree has any modification, untracked files included.
    pub async fn is_dirty(&self, dir: &Path) -> Result<bool> {
        let dir = dir.to_path_buf();
        task::spawn_blocking(move || is_dirty_blocking(&dir)).await?
    }

    /// Stage every change and commit it on the current branch.
    pub async fn commit_all(&self, dir: &Path, message: &str) -> Result<()> {
        let dir = dir.to_path_buf();
        let message = message.to_string();
        task::spawn_blocking(move || commit_all_blocking(&dir, &message)).await?
    }

    /// Push `branch` to `origin`.
    #[instrument(skip(self, dir), fields(branch = %branch))]
    pub async fn push(&self, dir: &Path, branch: &str) -> Result<()> {
        let dir = dir.to_path_buf();
        let branch = branch.to_string();
        task::spawn_blocking(move || push_blocking(&dir, &branch)).await?
    }
}

/// Remote URL for a GitHub-hosted repository.
///
/// SSH when a key is configured (`SSH_KEY_PATH` or the on-disk bot key),
/// token-HTTPS when a token is available, SSH with agent/default credentials
/// otherwise; every transport authenticates through [`auth_callbacks`].
fn remote_url(owner: &str, repo: &str) -> String {
    let ssh_key_configured =
        std::env::var("SSH_KEY_PATH").is_ok() || Path::new("ssh_keys/bot_key").exists();
    if !ssh_key_configured && http_token().is_some() {
        format!("https://github.com/{owner}/{repo}.git")
    } else {
        format!("git@github.com:{owner}/{repo}.git")
    }
}

/// Token used for HTTPS transport, if any is configured.
fn http_token() -> Option<String> {
    std::env::var("GIT_HTTP_TOKEN")
        .or_else(|_| std::env::var("GITHUB_TOKEN"))
        .ok()
}

/// Blocking clone (runs inside `spawn_blocking`).
#[instrument(skip(target), fields(repo = %url))]
fn clone_blocking(url: &str, target: &Path) -> Result<()> {
    info!("start clone");

    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(auth_callbacks());

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_opts);

    match builder.clone(url, target) {
        Ok(_) => {
            info!(path = %target.display(), "clone completed");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "clone failed");
            Err(e.into())
        }
    }
}

/// Fetch all configured remotes with pruning of deleted refs.
fn fetch_blocking(dir: &Path) -> Result<()> {
    let repo = Repository::open(dir)?;
    let remotes = repo.remotes()?;

    for name in remotes.iter().flatten() {
        let mut remote = repo.find_remote(name)?;
        let mut opts = FetchOptions::new();
        opts.prune(FetchPrune::On);
        opts.remote_callbacks(auth_callbacks());
        remote.fetch(&[] as &[&str], Some(&mut opts), None)?;
        debug!(remote = %name, "fetched");
    }

    Ok(())
}

/// Discard local mutation, switch to `branch` and hard-reset to `origin/<branch>`.
///
/// Previous runs may have died mid-pipeline; the working tree is never
/// assumed clean here.
fn checkout_blocking(dir: &Path, branch: &str) -> Result<()> {
    let repo = Repository::open(dir)?;

    // Drop uncommitted edits and untracked files from earlier runs.
    let mut discard = CheckoutBuilder::new();
    discard.force().remove_untracked(true);
    repo.checkout_head(Some(&mut discard))?;

    let refname = format!("refs/heads/{branch}");
    if repo.find_branch(branch, BranchType::Local).is_err() {
        // Branch only exists on the remote: create a local tracking branch.
        let remote_name = format!("origin/{branch}");
        let remote_branch = repo.find_branch(&remote_name, BranchType::Remote)?;
        let tip = remote_branch.get().peel_to_commit()?;
        let mut local = repo.branch(branch, &tip, false)?;
        local.set_upstream(Some(&remote_name))?;
        debug!(branch = %branch, "created tracking branch");
    }

    repo.set_head(&refname)?;
    let mut switch = CheckoutBuilder::new();
    switch.force();
    repo.checkout_head(Some(&mut switch))?;

    // Local history must never diverge from upstream.
    let remote_tip = repo
        .find_branch(&format!("origin/{branch}"), BranchType::Remote)?
        .get()
        .peel_to_commit()?;
    repo.reset(remote_tip.as_object(), ResetType::Hard, None)?;

    info!(branch = %branch, tip = %remote_tip.id(), "workspace at remote tip");
    Ok(())
}

/// Working-tree status, untracked files included.
fn is_dirty_blocking(dir: &Path) -> Result<bool> {
    let repo = Repository::open(dir)?;
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);
    let statuses = repo.statuses(Some(&mut opts))?;
    Ok(!statuses.is_empty())
}

/// Stage everything (additions, modifications, deletions) and commit.
fn commit_all_blocking(dir: &Path, message: &str) -> Result<()> {
    let repo = Repository::open(dir)?;

    let mut index = repo.index()?;
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"].iter(), None)?;
    index.write()?;

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let parent = repo.head()?.peel_to_commit()?;
    let sig = signature(&repo)?;

    let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?;
    info!(commit = %oid, "committed working tree");
    Ok(())
}

/// Push `branch` to `origin` over the authenticated transport.
fn push_blocking(dir: &Path, branch: &str) -> Result<()> {
    let repo = Repository::open(dir)?;
    let mut remote = repo.find_remote("origin")?;

    let mut opts = PushOptions::new();
    opts.remote_callbacks(auth_callbacks());

    let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
    match remote.push(&[refspec.as_str()], Some(&mut opts)) {
        Ok(()) => {
            info!(branch = %branch, "pushed");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, branch = %branch, "push failed");
            Err(e.into())
        }
    }
}

/// Committer identity: repository config when present, a service identity otherwise.
fn signature(repo: &Repository) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig),
        Err(_) => {
            let name = std::env::var("GIT_AUTHOR_NAME").unwrap_or_else(|_| "review-responder".into());
            let email = std::env::var("GIT_AUTHOR_EMAIL")
                .unwrap_or_else(|_| "review-responder@localhost".into());
            Ok(Signature::now(&name, &email)?)
        }
    }
}

/// libgit2 credentials cascade shared by clone, fetch and push.
fn auth_callbacks() -> RemoteCallbacks<'static> {
    let key_path_env = std::env::var("SSH_KEY_PATH").ok();
    let key_path_disk = Path::new("ssh_keys/bot_key");
    let have_disk_key = key_path_disk.exists();

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url_str, username_from_url, allowed| {
        let user = username_from_url.unwrap_or("git");

        // HTTPS with token from env (optional)
        if url_str.starts_with("http") {
            if let Some(token) = http_token() {
                let http_user = std::env::var("GIT_HTTP_USER").unwrap_or_else(|_| "oauth2".into());
                return Cred::userpass_plaintext(&http_user, &token);
            }
        }

        // Prefer explicit SSH key path from env
        if allowed.contains(CredentialType::SSH_KEY) {
            if let Some(ref key) = key_path_env {
                let key_path = Path::new(key);
                if key_path.exists() {
                    let pass = std::env::var("SSH_KEY_PASSPHRASE").ok();
                    return Cred::ssh_key(user, None, key_path, pass.as_deref());
                }
            }
            // fallback: ./ssh_keys/bot_key
            if have_disk_key {
                let pass = std::env::var("SSH_KEY_PASSPHRASE").ok();
                return Cred::ssh_key(user, None, Path::new("ssh_keys/bot_key"), pass.as_deref());
            }
        }

        // Try ssh-agent
        if allowed.contains(CredentialType::SSH_KEY) {
            if let Ok(cred) = Cred::ssh_key_from_agent(user) {
                return Ok(cred);
            }
        }

        // libgit2 default creds (netrc/manager, etc.)
        if allowed.contains(CredentialType::DEFAULT) {
            if let Ok(cred) = Cred::default() {
                return Ok(cred);
            }
        }

        // If server asked only username, provide it
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(user);
        }

        Err(git2::Error::from_str("no usable credentials"))
    });

    callbacks
}
