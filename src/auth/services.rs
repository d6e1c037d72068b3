use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    dto::{ProfileUploadRequest, RegisterRequest},
    password::{hash_password, needs_rehash, verify_password, DUMMY_HASH},
    repo::UserStore,
    repo_types::User,
};
use crate::error::{AppError, AppResult};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Hashes the password and stores a new, enabled user.
pub async fn register(users: &dyn UserStore, req: RegisterRequest) -> AppResult<User> {
    let username = req.username.trim();
    if !is_valid_username(username) {
        warn!(%username, "invalid username");
        return Err(AppError::validation(
            "Username must be 1-64 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        warn!(%username, "password too short");
        return Err(AppError::validation("Password too short"));
    }
    if req.age < 0 {
        return Err(AppError::validation("Age must not be negative"));
    }

    let mut user = User::new(username, hash_password(&req.password)?);
    user.photo = req.photo;
    user.sex = req.sex;
    user.age = req.age;
    user.phone = req.phone;
    users.create(user.clone()).await?;
    info!(username = %user.username, "user registered");
    Ok(user)
}

/// Checks credentials. Unknown user and wrong password share one message.
/// A hash made under an older scheme is upgraded in place.
pub async fn authenticate(users: &dyn UserStore, username: &str, password: &str) -> AppResult<User> {
    let bad_credentials = || AppError::unauthorized("Incorrect username or password");

    let Some(user) = users.find(username).await? else {
        let _ = verify_password(password, DUMMY_HASH);
        warn!(%username, "login unknown user");
        return Err(bad_credentials());
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(%username, "login invalid password");
        return Err(bad_credentials());
    }

    if user.disabled {
        warn!(%username, "login to disabled account");
        return Err(AppError::unauthorized("Inactive user"));
    }

    if needs_rehash(&user.password_hash) {
        let upgraded = hash_password(password)?;
        match users.set_password_hash(username, &upgraded).await {
            Ok(()) => info!(%username, "password hash upgraded"),
            Err(e) => warn!(%username, error = %e, "password hash upgrade failed"),
        }
    }

    Ok(user)
}

/// Applies a profile upload to the authenticated user only.
pub async fn update_profile(
    users: &dyn UserStore,
    current: &User,
    req: ProfileUploadRequest,
) -> AppResult<User> {
    if let Some(name) = req.username.as_deref() {
        if name != current.username {
            warn!(subject = %current.username, target = %name, "profile upload for another user");
            return Err(AppError::validation(
                "username does not match the authenticated user",
            ));
        }
    }
    if req.profile.age < 0 {
        return Err(AppError::validation("Age must not be negative"));
    }
    users.update_profile(&current.username, req.profile).await
}
