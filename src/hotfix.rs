use crate::{
    errors::{GitBoardError, Result},
    git::Vcs,
};

/// Hotfix facts gathered during one run.
///
/// `version` is only set once a tag was found for an active hotfix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HotfixState {
    pub active: bool,
    pub version: Option<String>,
    pub branch: Option<String>,
}

impl HotfixState {
    pub fn new(active: bool, branch: Option<String>) -> Self {
        Self {
            active,
            version: None,
            branch,
        }
    }
}

/// Next hotfix version for a tag: `1.4.2` becomes `1.4.3`.
///
/// Every component must be numeric; nothing is normalized, so `v1.4.2` is
/// rejected rather than trimmed.
pub fn increment_version(tag: &str) -> Result<String> {
    let is_numeric = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());

    if let Some(part) = tag.split('.').find(|part| !is_numeric(part)) {
        return Err(GitBoardError::Validation(format!(
            "version component {:?} of tag {:?} is not numeric",
            part, tag
        )));
    }

    let (head, last) = match tag.rsplit_once('.') {
        Some((head, last)) => (Some(head), last),
        None => (None, tag),
    };

    let next = last
        .parse::<u64>()
        .ok()
        .and_then(|number| number.checked_add(1))
        .ok_or_else(|| {
            GitBoardError::Validation(format!("cannot increment version component {:?}", last))
        })?;

    Ok(match head {
        Some(head) => format!("{}.{}", head, next),
        None => next.to_string(),
    })
}

/// Tag lookups on top of the local repository.
pub struct TagResolver<'a, V: Vcs> {
    vcs: &'a V,
}

impl<'a, V: Vcs> TagResolver<'a, V> {
    pub fn new(vcs: &'a V) -> Self {
        Self { vcs }
    }

    /// Most recently created tag, if the repository has any.
    pub fn latest_tag(&self) -> Result<Option<String>> {
        let tags = self.vcs.list_tags_by_recency()?;
        let latest = tags.into_iter().find(|tag| !tag.trim().is_empty());
        match &latest {
            Some(tag) => log::info!("Latest tag: {}", tag),
            None => log::info!("ℹ️  No tag found"),
        }
        Ok(latest)
    }

    /// Commit a tag points to.
    pub fn commit_of(&self, tag: &str) -> Result<Option<String>> {
        log::debug!("Resolving commit for tag {}", tag);
        let commit = self.vcs.resolve_commit(tag)?;
        if commit.is_none() {
            log::warn!("No commit found for tag {}", tag);
        }
        Ok(commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockVcs;

    #[test]
    fn test_increment_version_bumps_last_component() {
        assert_eq!(increment_version("1.4.2").unwrap(), "1.4.3");
        assert_eq!(increment_version("3.2.9").unwrap(), "3.2.10");
        assert_eq!(increment_version("7").unwrap(), "8");
    }

    #[test]
    fn test_increment_version_keeps_other_components_verbatim() {
        assert_eq!(increment_version("01.002.3").unwrap(), "01.002.4");
    }

    #[test]
    fn test_increment_version_rejects_non_numeric_components() {
        for tag in ["1.4.x", "v1.4.2", "1.4.2-rc1", "1..2", "", "1.4."] {
            assert!(
                matches!(increment_version(tag), Err(GitBoardError::Validation(_))),
                "{:?} should be rejected",
                tag
            );
        }
    }

    #[test]
    fn test_increment_version_rejects_overflow() {
        let tag = format!("1.{}", u64::MAX);
        assert!(increment_version(&tag).is_err());
    }

    #[test]
    fn test_tag_resolver_latest_tag() {
        let vcs = MockVcs::new().with_tag("2.0.0", "bbbb").with_tag("1.0.0", "aaaa");
        let resolver = TagResolver::new(&vcs);
        assert_eq!(resolver.latest_tag().unwrap(), Some("2.0.0".to_string()));
        assert_eq!(resolver.commit_of("1.0.0").unwrap(), Some("aaaa".to_string()));
        assert_eq!(resolver.commit_of("9.9.9").unwrap(), None);
    }

    #[test]
    fn test_tag_resolver_without_tags() {
        let vcs = MockVcs::new();
        let resolver = TagResolver::new(&vcs);
        assert_eq!(resolver.latest_tag().unwrap(), None);
    }
}
