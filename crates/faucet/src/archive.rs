use std::path::{Path, PathBuf};

use async_trait::async_trait;
use system_utils::process::{run_captured, run_interactive};
use system_utils::ssh::format_failure;
use tokio::process::Command;
use tracing::info;

use crate::error::{DeployError, DeployResult};

const ARCHIVE_DIR: &str = "/tmp";
const ARCHIVE_EXT: &str = ".tar.gz";
const PREFERRED_REMOTE: &str = "origin";

#[async_trait]
pub(crate) trait SourceControl: Send + Sync {
    /// Raw `git remote -v` output for the current checkout.
    async fn remote_listing(&self) -> anyhow::Result<String>;

    /// Writes a gzipped tarball of `tag` from `remote` to `output`.
    async fn archive(&self, remote: &str, tag: &str, output: &Path) -> anyhow::Result<()>;
}

pub(crate) struct GitCli;

#[async_trait]
impl SourceControl for GitCli {
    async fn remote_listing(&self) -> anyhow::Result<String> {
        let mut cmd = Command::new("git");
        cmd.arg("remote").arg("-v");
        let output = run_captured(&mut cmd, "git remote").await?;
        if !output.status.success() {
            anyhow::bail!(format_failure(
                "git remote",
                output.status,
                &output.stdout,
                &output.stderr
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn archive(&self, remote: &str, tag: &str, output: &Path) -> anyhow::Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("archive")
            .arg("-o")
            .arg(output)
            .arg("--format=tar.gz")
            .arg(format!("--remote={remote}"))
            .arg(tag);
        let output = run_interactive(&mut cmd, "git archive").await?;
        if !output.status.success() {
            anyhow::bail!(format_failure(
                "git archive",
                output.status,
                b"",
                &output.stderr
            ));
        }
        Ok(())
    }
}

/// A source tarball for one tag, staged locally before upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Archive {
    pub(crate) local_path: PathBuf,
    pub(crate) tag: String,
    pub(crate) repo_name: String,
}

impl Archive {
    /// Name the archive has once copied into the remote home directory.
    pub(crate) fn file_name(&self) -> String {
        format!("{}{}", self.folder(), ARCHIVE_EXT)
    }

    /// Remote directory the archive is extracted into.
    pub(crate) fn folder(&self) -> String {
        format!("{}-{}", self.repo_name, self.tag)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct GitRemote {
    pub(crate) repo_name: String,
    pub(crate) address: String,
}

pub(crate) struct ArchiveProducer<V> {
    vcs: V,
    archive_dir: PathBuf,
}

impl<V: SourceControl> ArchiveProducer<V> {
    pub(crate) fn new(vcs: V) -> Self {
        Self::in_dir(vcs, PathBuf::from(ARCHIVE_DIR))
    }

    pub(crate) fn in_dir(vcs: V, archive_dir: PathBuf) -> Self {
        Self { vcs, archive_dir }
    }

    #[cfg(test)]
    pub(crate) fn vcs(&self) -> &V {
        &self.vcs
    }

    pub(crate) async fn produce(&self, tag: &str) -> DeployResult<Archive> {
        let listing = self
            .vcs
            .remote_listing()
            .await
            .map_err(|err| DeployError::SourceControl(format!("{err:#}")))?;
        let remote = parse_remote(&listing)?;
        info!(
            event = "archive.remote",
            repo = %remote.repo_name,
            remote = %remote.address,
            "found git remote"
        );
        let archive = Archive {
            local_path: self
                .archive_dir
                .join(format!("{}-{}{}", remote.repo_name, tag, ARCHIVE_EXT)),
            tag: tag.to_string(),
            repo_name: remote.repo_name,
        };
        let archive_error = |message: String| DeployError::Archive {
            tag: tag.to_string(),
            message,
        };
        self.vcs
            .archive(&remote.address, tag, &archive.local_path)
            .await
            .map_err(|err| archive_error(format!("{err:#}")))?;
        // Nothing else verifies the tarball.
        if !archive.local_path.exists() {
            return Err(archive_error(format!(
                "{} was not created",
                archive.local_path.display()
            )));
        }
        info!(
            event = "archive.ready",
            tag,
            path = %archive.local_path.display(),
            "archive ready"
        );
        Ok(archive)
    }
}

/// Picks the `origin` remote (or the first listed) out of `git remote -v`.
pub(crate) fn parse_remote(listing: &str) -> DeployResult<GitRemote> {
    let mut remotes = Vec::new();
    for line in listing.lines().filter(|line| !line.trim().is_empty()) {
        let (name, rest) = line
            .split_once('\t')
            .ok_or_else(|| unparseable_remote(line))?;
        let address = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| unparseable_remote(line))?;
        remotes.push((name.trim(), address));
    }
    let (_, address) = remotes
        .iter()
        .find(|(name, _)| *name == PREFERRED_REMOTE)
        .or_else(|| remotes.first())
        .ok_or_else(|| DeployError::SourceControl("no git remote configured".to_string()))?;
    let repo_name = repo_name(address).ok_or_else(|| {
        DeployError::SourceControl(format!("cannot derive repo name from {address}"))
    })?;
    Ok(GitRemote {
        repo_name,
        address: address.to_string(),
    })
}

fn repo_name(address: &str) -> Option<String> {
    let trimmed = address.trim_end_matches('/');
    let segment = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or_default();
    let stem = match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    };
    if stem.is_empty() || stem == trimmed {
        return None;
    }
    Some(stem.to_string())
}

fn unparseable_remote(line: &str) -> DeployError {
    DeployError::SourceControl(format!("unparseable git remote line: {line}"))
}
