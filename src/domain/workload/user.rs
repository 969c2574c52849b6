use std::fmt;
use std::str::FromStr;

use crate::domain::utils::id::UserName;
use crate::error::ParseError;

pub const ADMIN_USER: &str = "admin";

/// A simulated cluster user, as listed in `users.sim`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub name: UserName,
    pub uid: u32,
    pub group: String,
    pub gid: u32,
}

impl User {
    pub fn new(name: impl Into<String>, uid: u32, group: impl Into<String>, gid: u32) -> Self {
        Self { name: UserName::new(name), uid, group: group.into(), gid }
    }

    pub fn is_admin(&self) -> bool {
        self.name.as_str() == ADMIN_USER
    }
}

impl fmt::Display for User {
    /// `name:uid:group:gid`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.name, self.uid, self.group, self.gid)
    }
}

impl FromStr for User {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidUserRecord { line: 0, content: s.to_string() };

        let parts: Vec<&str> = s.trim().split(':').collect();
        let [name, uid, group, gid] = parts.as_slice() else {
            return Err(invalid());
        };
        if name.is_empty() {
            return Err(invalid());
        }

        let uid = uid.parse().map_err(|_| invalid())?;
        let gid = gid.parse().map_err(|_| invalid())?;
        Ok(User::new(*name, uid, *group, gid))
    }
}

pub fn print_users(users: &[User]) -> String {
    users.iter().map(|user| format!("{}\n", user)).collect()
}

pub fn parse_users(text: &str) -> Result<Vec<User>, ParseError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            line.parse::<User>().map_err(|_| ParseError::InvalidUserRecord { line: index + 1, content: line.to_string() })
        })
        .collect()
}
