//! Set of user logins used for allow/ignore filtering.

use std::collections::HashSet;

/// Logins, compared case-insensitively. No ordering guarantee.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSet {
    logins: HashSet<String>,
}

impl UserSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, login: &str) -> bool {
        self.logins.insert(login.to_lowercase())
    }

    pub fn contains(&self, login: &str) -> bool {
        self.logins.contains(&login.to_lowercase())
    }

    /// Merge `other` into `self`.
    pub fn union_with(&mut self, other: &UserSet) {
        self.logins.extend(other.logins.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for UserSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = UserSet::new();
        set.extend(iter);
        set
    }
}

impl<S: AsRef<str>> Extend<S> for UserSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for login in iter {
            self.insert(login.as_ref());
        }
    }
}
