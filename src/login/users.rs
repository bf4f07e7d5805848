//! Static user list.

use serde::{Deserialize, Serialize};

/// One entry of `login/users.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

impl User {
    /// Username or email equal to `input`, ignoring case.
    pub fn matches(&self, input: &str) -> bool {
        let input = input.to_lowercase();
        let same = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| value.to_lowercase() == input)
        };
        same(&self.username) || same(&self.email)
    }
}

/// `{ "users": [...] }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserDirectory {
    #[serde(default)]
    pub users: Vec<User>,
}

impl UserDirectory {
    /// Finds the user for `input` whose password is exactly `password`.
    pub fn authenticate(&self, input: &str, password: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| user.matches(input))
            .filter(|user| user.password == password)
    }
}

/// What is kept about the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: u64,
    pub name: String,
    pub role: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role.clone(),
        }
    }
}
