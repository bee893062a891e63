// ABOUTME: Container image references and their fully-qualified form
// ABOUTME: Equality is defined on (registry, repository, tag) after defaults are applied

use serde::Serialize;
use std::fmt;

use super::error::ImageReferenceError;

pub const DEFAULT_REGISTRY: &str = "docker.io";
pub const DEFAULT_TAG: &str = "latest";

const DOCKER_HUB_ALIASES: [&str; 3] = ["docker.io", "index.docker.io", "registry-1.docker.io"];
const MAX_TAG_LENGTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    pub fn parse(raw: &str) -> Result<Self, ImageReferenceError> {
        let (registry, repository, tag) = split(raw)?;

        let registry = match registry {
            Some(host) if DOCKER_HUB_ALIASES.contains(&host) => DEFAULT_REGISTRY,
            Some(host) => host,
            None => DEFAULT_REGISTRY,
        };

        // Official Docker Hub images live under the `library` namespace
        let repository = if registry == DEFAULT_REGISTRY && !repository.contains('/') {
            format!("library/{}", repository)
        } else {
            repository.to_string()
        };

        Ok(Self {
            registry: registry.to_string(),
            repository,
            tag: tag.unwrap_or(DEFAULT_TAG).to_string(),
        })
    }

    pub fn is_docker_hub(&self) -> bool {
        self.registry == DEFAULT_REGISTRY
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.repository, self.tag)
    }
}

/// The tag written in `raw`, if any
pub fn explicit_tag(raw: &str) -> Option<&str> {
    split(raw).ok().and_then(|(_, _, tag)| tag)
}

fn split(raw: &str) -> Result<(Option<&str>, &str, Option<&str>), ImageReferenceError> {
    if raw.is_empty() {
        return Err(ImageReferenceError::Empty);
    }
    if let Some((position, character)) = raw
        .char_indices()
        .find(|(_, c)| c.is_whitespace() || c.is_control())
    {
        return Err(ImageReferenceError::IllegalCharacter {
            reference: raw.to_string(),
            character,
            position,
        });
    }
    if raw.contains('@') {
        return Err(ImageReferenceError::UnsupportedDigest {
            reference: raw.to_string(),
        });
    }

    let (registry, remainder) = match raw.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (Some(first), rest)
        }
        _ => (None, raw),
    };

    if let Some(host) = registry {
        let valid = host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'));
        if !valid {
            return Err(ImageReferenceError::InvalidRegistry {
                reference: raw.to_string(),
                registry: host.to_string(),
            });
        }
    }

    let (repository, tag) = match remainder.split_once(':') {
        Some((repository, tag)) => (repository, Some(tag)),
        None => (remainder, None),
    };

    validate_repository(raw, repository)?;
    if let Some(tag) = tag {
        validate_tag(raw, tag)?;
    }

    Ok((registry, repository, tag))
}

fn validate_repository(raw: &str, repository: &str) -> Result<(), ImageReferenceError> {
    let invalid = |reason: &str| ImageReferenceError::InvalidRepository {
        reference: raw.to_string(),
        reason: reason.to_string(),
    };

    if repository.is_empty() {
        return Err(invalid("repository name is empty"));
    }
    for component in repository.split('/') {
        if component.is_empty() {
            return Err(invalid("repository contains an empty path component"));
        }
        if !component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
        {
            return Err(invalid(
                "only lowercase letters, digits, '.', '_' and '-' are allowed",
            ));
        }
        if !component.starts_with(|c: char| c.is_ascii_alphanumeric())
            || !component.ends_with(|c: char| c.is_ascii_alphanumeric())
        {
            return Err(invalid("path components must start and end with a letter or digit"));
        }
    }
    Ok(())
}

fn validate_tag(raw: &str, tag: &str) -> Result<(), ImageReferenceError> {
    let valid = !tag.is_empty()
        && tag.len() <= MAX_TAG_LENGTH
        && tag.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if valid {
        Ok(())
    } else {
        Err(ImageReferenceError::InvalidTag {
            reference: raw.to_string(),
            tag: tag.to_string(),
        })
    }
}
