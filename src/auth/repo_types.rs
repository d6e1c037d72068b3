use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // PHC string, never exposed in JSON
    pub disabled: bool,
    pub photo: String,
    pub sex: String,
    pub age: i32,
    pub phone: String,
}

impl User {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            disabled: false,
            photo: String::new(),
            sex: String::new(),
            age: 0,
            phone: String::new(),
        }
    }
}

/// The only fields a profile upload may touch.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub phone: String,
}

impl ProfileUpdate {
    pub fn apply(self, user: &mut User) {
        user.sex = self.sex;
        user.age = self.age;
        user.phone = self.phone;
    }
}
