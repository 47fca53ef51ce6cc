// GitLab Users API: https://docs.gitlab.com/ee/api/users.html
use std::collections::{btree_set, BTreeSet};

use compact_str::CompactString;
use serde::Deserialize;

/// A GitLab account as returned by the users listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub username: CompactString,
    pub email: Option<CompactString>,
}

/// Domain of a user's email address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailDomain {
    Domain(CompactString),
    /// The account exposes no email.
    NoEmail,
    /// The email has no `@`, or nothing after its last `@`.
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEntry {
    pub username: CompactString,
    pub email: Option<CompactString>,
    pub domain: EmailDomain,
}

/// Distinct email domains, kept in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueDomains(BTreeSet<CompactString>);

/// Result of running the extractor over a user list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub entries: Vec<DomainEntry>,
    pub domains: UniqueDomains,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDto {
    pub username: CompactString,
    #[serde(default)]
    pub email: Option<CompactString>,
}

/// The account owning the token, from `GET /user`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentUserDto {
    pub username: CompactString,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

impl From<UserDto> for UserRecord {
    fn from(dto: UserDto) -> Self {
        let email = dto
            .email
            .map(|email| CompactString::from(email.trim()))
            .filter(|email| !email.is_empty());
        Self { username: dto.username, email }
    }
}

/// Returns everything after the last `@` of `email`, if anything.
pub fn domain_of(email: &str) -> Option<&str> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}

impl EmailDomain {
    pub fn of(email: Option<&str>) -> Self {
        match email {
            None => EmailDomain::NoEmail,
            Some(email) => match domain_of(email) {
                Some(domain) => EmailDomain::Domain(domain.into()),
                None => EmailDomain::Malformed,
            },
        }
    }

    pub fn as_domain(&self) -> Option<&str> {
        match self {
            EmailDomain::Domain(domain) => Some(domain.as_str()),
            EmailDomain::NoEmail | EmailDomain::Malformed => None,
        }
    }
}

impl DomainEntry {
    pub fn new(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            domain: EmailDomain::of(user.email.as_deref()),
        }
    }
}

impl UniqueDomains {
    pub fn insert(&mut self, domain: impl Into<CompactString>) -> bool {
        self.0.insert(domain.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, CompactString> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a UniqueDomains {
    type Item = &'a CompactString;
    type IntoIter = btree_set::Iter<'a, CompactString>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extraction {
    /// Number of users whose account exposes no email
    pub fn without_email(&self) -> usize {
        self.count(|domain| *domain == EmailDomain::NoEmail)
    }

    /// Number of users whose email has no usable domain part
    pub fn malformed(&self) -> usize {
        self.count(|domain| *domain == EmailDomain::Malformed)
    }

    fn count(&self, predicate: impl Fn(&EmailDomain) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.domain)).count()
    }
}

/// Derives one entry per user, in input order, plus the set of distinct domains.
pub fn extract_domains<'a>(users: impl IntoIterator<Item = &'a UserRecord>) -> Extraction {
    let mut extraction = Extraction::default();

    for user in users {
        let entry = DomainEntry::new(user);
        if let Some(domain) = entry.domain.as_domain() {
            extraction.domains.insert(domain);
        }
        extraction.entries.push(entry);
    }

    extraction
}
