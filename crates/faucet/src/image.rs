use std::fmt;

use crate::error::{DeployError, DeployResult};

/// `<repo>/<image>:<tag>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ImageRef {
    pub(crate) repo: String,
    pub(crate) name: String,
    pub(crate) tag: String,
}

impl ImageRef {
    pub(crate) fn parse(reference: &str) -> DeployResult<Self> {
        let invalid = || DeployError::InvalidImage {
            reference: reference.to_string(),
        };
        let (repo, rest) = reference.split_once('/').ok_or_else(invalid)?;
        let (name, tag) = rest.split_once(':').ok_or_else(invalid)?;
        let segments = [repo, name, tag];
        if segments
            .iter()
            .any(|segment| segment.is_empty() || segment.contains(|c: char| c == '/' || c == ':'))
        {
            return Err(invalid());
        }
        Ok(Self {
            repo: repo.to_string(),
            name: name.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Directory a `load` of this repo and tag extracts into.
    pub(crate) fn folder(&self) -> String {
        format!("{}-{}", self.repo, self.tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.repo, self.name, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repo_image_and_tag() {
        let image = ImageRef::parse("acme/app:3").unwrap();
        assert_eq!(image.repo, "acme");
        assert_eq!(image.name, "app");
        assert_eq!(image.tag, "3");
        assert_eq!(image.folder(), "acme-3");
        assert_eq!(image.to_string(), "acme/app:3");
    }

    #[test]
    fn rejects_malformed_references() {
        for reference in [
            "app:3",
            "acme/app",
            "acme/app:",
            "/app:3",
            "acme/:3",
            "registry/acme/app:3",
            "acme/app:3:4",
            "acme:5000/app:3",
            "",
        ] {
            let err = ImageRef::parse(reference).unwrap_err();
            assert!(
                matches!(err, DeployError::InvalidImage { .. }),
                "{reference} should be rejected"
            );
        }
    }
}
