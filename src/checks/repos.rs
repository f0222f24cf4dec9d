use std::path::{Path, PathBuf};

use anyhow::{Context, Error};
use chrono::Utc;
use log::{debug, info};

use osutils::files;

use super::{CheckContext, CheckKind, CheckResult};

const REPOS_DIR: &str = "/etc/zypp/repos.d";
const SERVICES_DIR: &str = "/etc/zypp/services.d";

/// Stale repository files are moved below this directory when fixing.
const BACKUP_DIR: &str = "/var/lib/rhui-check";

/// A zypper repository file.
#[derive(Debug, PartialEq, Eq)]
struct RepoFile {
    path: PathBuf,
    /// Service that created the repository, from the `<service>:<alias>.repo` file name.
    service: Option<String>,
}

impl RepoFile {
    fn from_path(path: PathBuf) -> Option<Self> {
        if path.extension().and_then(|ext| ext.to_str()) != Some("repo") {
            return None;
        }

        let stem = path.file_stem()?.to_str()?;
        let service = stem
            .split_once(':')
            .map(|(service, _)| service.to_string())
            .filter(|service| !service.is_empty());
        Some(Self { path, service })
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lists the repository files of `repos_dir`, sorted by file name.
fn list_repo_files(repos_dir: &Path) -> Result<Vec<RepoFile>, Error> {
    let mut repos: Vec<RepoFile> = std::fs::read_dir(repos_dir)
        .with_context(|| format!("Failed to list '{}'", repos_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(RepoFile::from_path)
        .collect();
    repos.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(repos)
}

/// Returns the repository files whose owning service no longer exists.
fn find_stale(repos: Vec<RepoFile>, services_dir: &Path) -> Vec<RepoFile> {
    repos
        .into_iter()
        .filter(|repo| match &repo.service {
            Some(service) => !services_dir.join(format!("{service}.service")).is_file(),
            None => false,
        })
        .collect()
}

pub(super) fn check_repositories(ctx: &CheckContext) -> CheckResult {
    let repos = match list_repo_files(&ctx.host_path(REPOS_DIR)) {
        Ok(repos) => repos,
        Err(e) => {
            return CheckResult::from_error(
                CheckKind::Repositories,
                "Could not list repositories",
                e,
            )
        }
    };

    if repos.is_empty() {
        return CheckResult::fail(
            CheckKind::Repositories,
            format!("No repositories configured in {REPOS_DIR}"),
        );
    }

    let total = repos.len();
    let stale = find_stale(repos, &ctx.host_path(SERVICES_DIR));
    if stale.is_empty() {
        return CheckResult::pass(
            CheckKind::Repositories,
            format!("{total} repositories, none stale"),
        );
    }

    if !ctx.fix {
        return CheckResult::fail(
            CheckKind::Repositories,
            format!(
                "{} stale repository file(s), rerun with --fix to remove them",
                stale.len()
            ),
        )
        .with_details(stale.iter().map(RepoFile::file_name).collect());
    }

    let backup_dir = ctx.host_path(format!(
        "{BACKUP_DIR}/backup-{}",
        Utc::now().format("%Y%m%dT%H%M%S")
    ));
    fix_stale(&stale, &backup_dir)
}

fn fix_stale(stale: &[RepoFile], backup_dir: &Path) -> CheckResult {
    match move_stale(stale, backup_dir) {
        Ok(moved) => CheckResult::fixed(
            CheckKind::Repositories,
            format!(
                "Moved {} stale repository file(s) to {}",
                moved.len(),
                backup_dir.display()
            ),
        )
        .with_details(moved),
        Err((moved, e)) => {
            let mut details = vec![format!("{e:#}")];
            details.extend(
                moved
                    .iter()
                    .map(|name| format!("Already moved to {}: {name}", backup_dir.display())),
            );
            CheckResult::fail(
                CheckKind::Repositories,
                "Failed to remove stale repository files",
            )
            .with_details(details)
        }
    }
}

/// Moves every stale file into `backup_dir` and returns their names. Stops at the first
/// failure, returning the names moved so far along with the error.
fn move_stale(
    stale: &[RepoFile],
    backup_dir: &Path,
) -> Result<Vec<String>, (Vec<String>, Error)> {
    let mut moved = Vec::with_capacity(stale.len());
    for repo in stale {
        let destination = match files::move_into_dir(&repo.path, backup_dir) {
            Ok(destination) => destination,
            Err(e) => return Err((moved, e)),
        };
        info!(
            "Moved stale repository file '{}' to '{}'",
            repo.path.display(),
            destination.display()
        );
        moved.push(repo.file_name());
    }
    debug!("Backed up {} repository file(s)", moved.len());
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        checks::{testutils::*, CheckStatus},
        framework::Framework,
    };

    const SERVICE_REPO: &str = "SUSE_Linux_Enterprise_Server_15_SP5_x86_64:SLE-Module-Basesystem15-SP5-Pool.repo";
    const STALE_REPO: &str = "SUSE_Linux_Enterprise_Server_15_SP4_x86_64:SLE-Module-Basesystem15-SP4-Pool.repo";
    const PLAIN_REPO: &str = "local.repo";

    fn setup_repos(ctx: &CheckContext) {
        for repo in [SERVICE_REPO, STALE_REPO, PLAIN_REPO] {
            write_host_file(ctx, &format!("{REPOS_DIR}/{repo}"), "[repo]\nenabled=1\n");
        }
        write_host_file(ctx, &format!("{REPOS_DIR}/README"), "not a repo");
        write_host_file(
            ctx,
            &format!("{SERVICES_DIR}/SUSE_Linux_Enterprise_Server_15_SP5_x86_64.service"),
            "[SUSE_Linux_Enterprise_Server_15_SP5_x86_64]\n",
        );
    }

    #[test]
    fn test_repo_file_from_path() {
        assert_eq!(
            RepoFile::from_path(PathBuf::from("/r/SVC:alias.repo")),
            Some(RepoFile {
                path: PathBuf::from("/r/SVC:alias.repo"),
                service: Some("SVC".into()),
            })
        );
        assert_eq!(
            RepoFile::from_path(PathBuf::from("/r/plain.repo"))
                .unwrap()
                .service,
            None
        );
        assert_eq!(
            RepoFile::from_path(PathBuf::from("/r/:alias.repo"))
                .unwrap()
                .service,
            None
        );
        assert_eq!(RepoFile::from_path(PathBuf::from("/r/SVC:alias.bak")), None);
    }

    #[test]
    fn test_check_repositories_missing() {
        let (_root, ctx) = context(Framework::Azure);
        let result = check_repositories(&ctx);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.summary, "Could not list repositories");

        files::create_dirs(ctx.host_path(REPOS_DIR)).unwrap();
        let result = check_repositories(&ctx);
        assert_eq!(
            result.summary,
            "No repositories configured in /etc/zypp/repos.d"
        );
    }

    #[test]
    fn test_check_repositories_stale() {
        let (_root, ctx) = context(Framework::Azure);
        setup_repos(&ctx);

        let result = check_repositories(&ctx);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.details, vec![STALE_REPO]);

        // Nothing is touched without --fix
        assert!(ctx
            .host_path(format!("{REPOS_DIR}/{STALE_REPO}"))
            .is_file());
    }

    #[test]
    fn test_check_repositories_fix() {
        let (_root, mut ctx) = context(Framework::Azure);
        ctx.fix = true;
        setup_repos(&ctx);

        let result = check_repositories(&ctx);
        assert_eq!(result.status, CheckStatus::Fixed);
        assert_eq!(result.details, vec![STALE_REPO]);

        assert!(!ctx
            .host_path(format!("{REPOS_DIR}/{STALE_REPO}"))
            .exists());
        assert!(ctx
            .host_path(format!("{REPOS_DIR}/{SERVICE_REPO}"))
            .is_file());
        assert!(ctx.host_path(format!("{REPOS_DIR}/{PLAIN_REPO}")).is_file());

        let backups: Vec<PathBuf> = std::fs::read_dir(ctx.host_path(BACKUP_DIR))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].join(STALE_REPO).is_file());

        // A second run finds nothing left to fix
        let result = check_repositories(&ctx);
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.summary, "2 repositories, none stale");
    }

    #[test]
    fn test_fix_stale_partial_failure() {
        let (_root, ctx) = context(Framework::Gce);
        let other_stale = "SUSE_Linux_Enterprise_Server_15_SP4_x86_64:SLE-Product-SLES15-SP4-Pool.repo";
        setup_repos(&ctx);
        write_host_file(&ctx, &format!("{REPOS_DIR}/{other_stale}"), "[repo]\n");

        let stale = find_stale(
            list_repo_files(&ctx.host_path(REPOS_DIR)).unwrap(),
            &ctx.host_path(SERVICES_DIR),
        );
        assert_eq!(
            stale.iter().map(RepoFile::file_name).collect::<Vec<_>>(),
            vec![STALE_REPO, other_stale]
        );

        // A leftover from an earlier run blocks the second move
        let backup_dir = ctx.host_path(format!("{BACKUP_DIR}/backup-test"));
        write_host_file(
            &ctx,
            &format!("{BACKUP_DIR}/backup-test/{other_stale}"),
            "old",
        );

        let result = fix_stale(&stale, &backup_dir);
        assert_eq!(result.status, CheckStatus::Fail);
        assert_eq!(result.summary, "Failed to remove stale repository files");
        assert_eq!(result.details.len(), 2);
        assert!(result.details[0].starts_with("Destination already exists"));
        assert_eq!(
            result.details[1],
            format!("Already moved to {}: {STALE_REPO}", backup_dir.display())
        );

        assert!(backup_dir.join(STALE_REPO).is_file());
        assert!(ctx
            .host_path(format!("{REPOS_DIR}/{other_stale}"))
            .is_file());
    }
}
