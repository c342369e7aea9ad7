//! Git sources.
//!
//! Ports only ever need one ref at its tip, so clones fetch a single branch
//! or tag, shallowly where the transport allows it. Submodules are
//! initialized recursively.

use std::cell::Cell;
use std::path::Path;
use std::time::{Duration, Instant};

use git2::build::CheckoutBuilder;
use git2::{Direction, ErrorCode, FetchOptions, RemoteCallbacks, Repository, SubmoduleUpdateOptions};

use crate::sources::{GitSourceArgs, SourceError};

/// Clones a git remote into a directory.
pub trait GitCloner: Send + Sync {
    /// Clone `remote.branch` (a branch or a tag) into `dest` with history
    /// depth 1 and all submodules, giving up once `timeout` has elapsed.
    fn clone_branch(
        &self,
        remote: &GitSourceArgs,
        dest: &Path,
        timeout: Duration,
    ) -> Result<(), SourceError>;
}

/// [`GitCloner`] backed by libgit2.
///
/// The deadline is only checked while data arrives. Stalled connections are
/// bounded by [`set_network_timeouts`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Git2Cloner;

/// Bound libgit2's connect and per-read waits by `timeout`.
///
/// # Safety
///
/// Writes libgit2 globals without synchronization. Call it before any other
/// thread uses git.
pub unsafe fn set_network_timeouts(timeout: Duration) -> Result<(), git2::Error> {
    let millis = timeout_millis(timeout);
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
        git2::opts::set_server_timeout_in_milliseconds(millis)
    }
}

fn timeout_millis(timeout: Duration) -> i32 {
    i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX)
}

/// libgit2's local transport cannot fetch shallowly.
fn is_local_remote(url: &str) -> bool {
    url.starts_with("file://") || (!url.contains("://") && Path::new(url).exists())
}

/// The remote ref a port names.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RemoteRef {
    Branch(String),
    Tag(String),
}

impl RemoteRef {
    /// Look `name` up among the refs the remote advertises. A branch wins
    /// over a tag of the same name.
    fn find(advertised: &[String], name: &str) -> Option<Self> {
        let has = |full: String| advertised.iter().any(|r| *r == full);
        if has(format!("refs/heads/{}", name)) {
            Some(RemoteRef::Branch(name.to_string()))
        } else if has(format!("refs/tags/{}", name)) {
            Some(RemoteRef::Tag(name.to_string()))
        } else {
            None
        }
    }

    fn refspec(&self) -> String {
        match self {
            RemoteRef::Branch(b) => format!("+refs/heads/{0}:refs/remotes/origin/{0}", b),
            RemoteRef::Tag(t) => format!("+refs/tags/{0}:refs/tags/{0}", t),
        }
    }

    /// Where the fetch stores the ref.
    fn local_ref(&self) -> String {
        match self {
            RemoteRef::Branch(b) => format!("refs/remotes/origin/{}", b),
            RemoteRef::Tag(t) => format!("refs/tags/{}", t),
        }
    }
}

/// Fetch options that abort the transfer once `deadline` passes.
fn fetch_options<'a>(
    deadline: Instant,
    timed_out: &'a Cell<bool>,
    shallow: bool,
) -> FetchOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(move |_progress| {
        if Instant::now() >= deadline {
            timed_out.set(true);
            return false;
        }
        true
    });

    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks);
    if shallow {
        fetch.depth(1);
    }
    fetch
}

fn update_submodules(
    repo: &Repository,
    deadline: Instant,
    timed_out: &Cell<bool>,
) -> Result<(), git2::Error> {
    for mut submodule in repo.submodules()? {
        tracing::debug!(
            "Updating submodule {}",
            submodule.name().unwrap_or("<unnamed>")
        );
        let shallow = !submodule.url().is_some_and(is_local_remote);
        let mut options = SubmoduleUpdateOptions::new();
        options.fetch(fetch_options(deadline, timed_out, shallow));
        submodule.update(true, Some(&mut options))?;

        let nested = submodule.open()?;
        update_submodules(&nested, deadline, timed_out)?;
    }
    Ok(())
}

fn clone_ref(
    remote: &GitSourceArgs,
    dest: &Path,
    deadline: Instant,
    timed_out: &Cell<bool>,
) -> Result<(), git2::Error> {
    let repo = Repository::init(dest)?;
    let mut origin = repo.remote("origin", &remote.url)?;

    let advertised: Vec<String> = {
        let connection = origin.connect_auth(Direction::Fetch, None, None)?;
        connection
            .list()?
            .iter()
            .map(|head| head.name().to_string())
            .collect()
    };
    let target = RemoteRef::find(&advertised, &remote.branch).ok_or_else(|| {
        git2::Error::from_str(&format!(
            "no branch or tag named '{}' in {}",
            remote.branch, remote.url
        ))
    })?;
    tracing::debug!("Fetching {}", target.refspec());

    let mut fetch = fetch_options(deadline, timed_out, !is_local_remote(&remote.url));
    origin.fetch(&[target.refspec()], Some(&mut fetch), None)?;

    let commit = repo.find_reference(&target.local_ref())?.peel_to_commit()?;
    match &target {
        RemoteRef::Branch(name) => {
            repo.branch(name, &commit, true)?;
            repo.set_head(&format!("refs/heads/{}", name))?;
        }
        RemoteRef::Tag(_) => repo.set_head_detached(commit.id())?,
    }
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;

    update_submodules(&repo, deadline, timed_out)
}

impl GitCloner for Git2Cloner {
    fn clone_branch(
        &self,
        remote: &GitSourceArgs,
        dest: &Path,
        timeout: Duration,
    ) -> Result<(), SourceError> {
        tracing::info!("Cloning {} ({})", remote.url, remote.branch);

        let deadline = Instant::now() + timeout;
        let timed_out = Cell::new(false);

        clone_ref(remote, dest, deadline, &timed_out).map_err(|e| {
            if timed_out.get() || e.code() == ErrorCode::Timeout {
                SourceError::CloneTimedOut {
                    url: remote.url.clone(),
                    secs: timeout.as_secs(),
                }
            } else {
                SourceError::CloneFailed {
                    url: remote.url.clone(),
                    message: e.message().to_string(),
                }
            }
        })
    }
}
