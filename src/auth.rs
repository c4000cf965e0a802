//! Login, patient self-registration and the seeded admin account.
//!
//! Passwords are stored as bcrypt hashes only.

use crate::access::Identity;
use crate::db::{Database, Repository};
use crate::models::{Account, Gender, Patient, User, UserRole};
use crate::validation::{self, ValidationError};
use bcrypt::{hash, verify, BcryptError};
use log::{info, warn};
use thiserror::Error;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Patient sign-up form.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub gender: String,
    pub birth_date: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("An account with this email already exists.")]
    EmailTaken,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Account store failure: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] BcryptError),
}

pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    hash(password, HASH_COST)
}

/// Checks the credentials and returns who logged in.
///
/// Unknown emails and wrong passwords are indistinguishable to the caller.
pub fn login(db: &Database, credentials: &Credentials) -> Result<Identity, AuthError> {
    // No stored password is longer; bcrypt would ignore the excess bytes.
    if credentials.password.len() > validation::PASSWORD_MAX_BYTES {
        warn!("Login failed: oversized password");
        return Err(AuthError::InvalidCredentials);
    }
    let Some(user) = db.users().find_by_email(&credentials.email)? else {
        warn!("Login failed: unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify(&credentials.password, &user.password_hash)? {
        warn!("Login failed for user {}", user.id);
        return Err(AuthError::InvalidCredentials);
    }

    info!("User {} logged in as {}", user.id, user.role);
    Ok(Identity::new(user.id, user.role))
}

/// Creates the user and patient profile together.
pub fn register_patient(db: &Database, form: &Registration) -> Result<Identity, AuthError> {
    let email = validation::email(&form.email)?;
    validation::password(&form.password, &form.confirm_password)?;
    let name = validation::required("Name", &form.name, 30)?;
    let phone = validation::optional("Phone", &form.phone, 11)?;
    let address = validation::optional("Address", &form.address, 40)?;
    let gender = Gender::from_label(&form.gender)
        .ok_or_else(|| ValidationError::new("Gender must be M or F."))?;
    let birth_date = validation::date("Birth date", &form.birth_date)?;
    let password_hash = hash_password(&form.password)?;

    let id = db.transaction(|work| {
        if work.users().email_exists(&email)? {
            return Err(AuthError::EmailTaken);
        }

        let id = work.users().add(&User {
            id: 0,
            email,
            password_hash,
            role: UserRole::Patient,
        })?;
        work.patients().add(&Patient {
            id,
            name,
            phone,
            address,
            birth_date,
            gender,
        })?;
        Ok(id)
    })?;

    info!("Registered patient {id}");
    Ok(Identity::new(id, UserRole::Patient))
}

/// Creates the admin account unless its email is already registered.
///
/// Returns `true` when a new account was created.
pub fn ensure_admin(db: &Database, email: &str, password: &str) -> Result<bool, AuthError> {
    let email = validation::email(email)?;
    validation::password(password, password)?;
    if db.users().email_exists(&email)? {
        return Ok(false);
    }

    let id = db.users().add(&User {
        id: 0,
        email,
        password_hash: hash_password(password)?,
        role: UserRole::Admin,
    })?;
    info!("Created admin account {id}");
    Ok(true)
}

/// Loads the profile owned by a logged-in user.
pub fn load_account(db: &Database, who: &Identity) -> Result<Account, AuthError> {
    let account = match who.role {
        UserRole::Patient => db.patients().get(who.user_id)?.map(Account::Patient),
        UserRole::Doctor => db.doctors().get(who.user_id)?.map(Account::Doctor),
        UserRole::Admin => Some(Account::Admin),
    };
    account.ok_or_else(|| {
        warn!("User {} has no {} profile", who.user_id, who.role);
        AuthError::InvalidCredentials
    })
}
