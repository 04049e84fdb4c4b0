use crate::errors::Result;
use auth_git2::GitAuthenticator;
use git2::{ErrorCode, FetchOptions, Object, RemoteCallbacks, Repository};
use std::path::Path;

/// What the branch workflow needs from the local repository.
pub trait Vcs {
    /// Fetch branches and tags from every remote.
    fn fetch_all(&self) -> Result<()>;
    /// Tag names, most recently created first.
    fn list_tags_by_recency(&self) -> Result<Vec<String>>;
    /// Commit id a tag or ref points to, `None` when nothing matches.
    fn resolve_commit(&self, reference: &str) -> Result<Option<String>>;
}

pub struct Git {
    pub repository: Repository,
}

impl Git {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repository = Repository::discover(path)?;
        Ok(Self { repository })
    }

    /// Read-only view of the repository configuration.
    pub fn config_snapshot(&self) -> Result<git2::Config> {
        let mut config = self.repository.config()?;
        Ok(config.snapshot()?)
    }

    fn creation_time(object: &Object) -> Result<i64> {
        if let Some(tagger) = object.as_tag().and_then(|tag| tag.tagger()) {
            return Ok(tagger.when().seconds());
        }
        Ok(object.peel_to_commit()?.time().seconds())
    }
}

impl Vcs for Git {
    fn fetch_all(&self) -> Result<()> {
        let config = self.repository.config()?;
        let authenticator = GitAuthenticator::default();

        let remotes = self.repository.remotes()?;
        for remote_name in remotes.iter().flatten() {
            log::debug!("Fetching branches and tags from {}", remote_name);

            let mut remote = self.repository.find_remote(remote_name)?;
            let mut callbacks = RemoteCallbacks::new();
            callbacks.credentials(authenticator.credentials(&config));
            let mut options = FetchOptions::new();
            options.remote_callbacks(callbacks);

            let refspecs = [
                format!("+refs/heads/*:refs/remotes/{}/*", remote_name),
                "+refs/tags/*:refs/tags/*".to_string(),
            ];
            remote.fetch(&refspecs, Some(&mut options), Some("git-board: fetch"))?;

            log::info!("✅ Fetched {}", remote_name);
        }

        Ok(())
    }

    fn list_tags_by_recency(&self) -> Result<Vec<String>> {
        let names = self.repository.tag_names(None)?;

        let mut dated = Vec::new();
        for name in names.iter().flatten() {
            let object = self
                .repository
                .revparse_single(&format!("refs/tags/{}", name))?;
            match Self::creation_time(&object) {
                Ok(seconds) => dated.push((seconds, name.to_string())),
                // Tags on trees or blobs carry no date to sort by
                Err(e) => log::debug!("Skipping tag {}: {}", name, e),
            }
        }

        dated.sort_by(|(a_time, a_name), (b_time, b_name)| {
            b_time.cmp(a_time).then_with(|| b_name.cmp(a_name))
        });

        Ok(dated.into_iter().map(|(_, name)| name).collect())
    }

    fn resolve_commit(&self, reference: &str) -> Result<Option<String>> {
        let object = match self
            .repository
            .revparse_single(&format!("refs/tags/{}", reference))
            .or_else(|_| self.repository.revparse_single(reference))
        {
            Ok(object) => object,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let commit = object.peel_to_commit()?;
        Ok(Some(commit.id().to_string()))
    }
}

#[cfg(test)]
pub struct MockVcs {
    pub tags: Vec<(String, String)>,
    pub fetch_error: Option<String>,
    pub tags_error: Option<String>,
    pub fetch_calls: std::sync::Mutex<usize>,
}

#[cfg(test)]
impl MockVcs {
    pub fn new() -> Self {
        Self {
            tags: Vec::new(),
            fetch_error: None,
            tags_error: None,
            fetch_calls: std::sync::Mutex::new(0),
        }
    }

    /// Tags are listed in the order they are added, newest first.
    pub fn with_tag(mut self, tag: &str, commit: &str) -> Self {
        self.tags.push((tag.to_string(), commit.to_string()));
        self
    }

    pub fn failing_fetch(mut self, message: &str) -> Self {
        self.fetch_error = Some(message.to_string());
        self
    }

    pub fn failing_tags(mut self, message: &str) -> Self {
        self.tags_error = Some(message.to_string());
        self
    }
}

#[cfg(test)]
impl Vcs for MockVcs {
    fn fetch_all(&self) -> Result<()> {
        *self.fetch_calls.lock().unwrap() += 1;
        match &self.fetch_error {
            Some(message) => Err(crate::errors::GitBoardError::Git(message.clone())),
            None => Ok(()),
        }
    }

    fn list_tags_by_recency(&self) -> Result<Vec<String>> {
        if let Some(message) = &self.tags_error {
            return Err(crate::errors::GitBoardError::Git(message.clone()));
        }
        Ok(self.tags.iter().map(|(tag, _)| tag.clone()).collect())
    }

    fn resolve_commit(&self, reference: &str) -> Result<Option<String>> {
        Ok(self
            .tags
            .iter()
            .find(|(tag, _)| tag == reference)
            .map(|(_, commit)| commit.clone()))
    }
}
