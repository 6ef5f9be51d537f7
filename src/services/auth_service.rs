use std::collections::HashMap;

use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::models::User;

pub type FieldErrors = HashMap<String, String>;

const ACCESS_TTL_MINUTES: i64 = 60;
const REFRESH_TTL_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    // user id as hex string
    pub sub: String,
    // expiry (unix timestamp seconds)
    pub exp: usize,
    // "access" | "refresh"
    pub token_type: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn make_token(
    state: &AppState,
    user_id: &ObjectId,
    token_type: &str,
    ttl: Duration,
) -> Result<String, String> {
    let claims = Claims {
        sub: user_id.to_hex(),
        exp: (Utc::now() + ttl).timestamp() as usize,
        token_type: token_type.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn generate_tokens(state: &AppState, user_id: &ObjectId) -> Result<TokenPair, String> {
    Ok(TokenPair {
        access: make_token(state, user_id, "access", Duration::minutes(ACCESS_TTL_MINUTES))?,
        refresh: make_token(state, user_id, "refresh", Duration::days(REFRESH_TTL_DAYS))?,
    })
}

pub fn decode_token(state: &AppState, token: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.settings.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

pub async fn login_user(state: &AppState, email: &str, password: &str) -> Result<User, String> {
    let users = state.db.collection::<User>("users");

    let user = users
        .find_one(doc! { "email": email }, None)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "Invalid email or password.".to_string())?;

    if !verify(password, &user.password_hash).unwrap_or(false) {
        return Err("Invalid email or password.".to_string());
    }

    Ok(user)
}

pub async fn register_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<ObjectId, FieldErrors> {
    let mut errs: FieldErrors = HashMap::new();

    let users = state.db.collection::<User>("users");

    // unique email
    match users.find_one(doc! { "email": email }, None).await {
        Ok(Some(_)) => {
            errs.insert("email".into(), "Email has already been taken.".into());
            return Err(errs);
        }
        Ok(None) => {}
        Err(_) => {
            errs.insert("_form".into(), "There is a problem registering this user.".into());
            return Err(errs);
        }
    }

    // unique username
    match users.find_one(doc! { "username": username }, None).await {
        Ok(Some(_)) => {
            errs.insert("username".into(), "Username has already been taken.".into());
            return Err(errs);
        }
        Ok(None) => {}
        Err(_) => {
            errs.insert("_form".into(), "There is a problem registering this user.".into());
            return Err(errs);
        }
    }

    let pw_hash = match hash(password, DEFAULT_COST) {
        Ok(h) => h,
        Err(_) => {
            errs.insert("_form".into(), "There is a problem registering this user.".into());
            return Err(errs);
        }
    };

    let insert = match state
        .db
        .collection("users")
        .insert_one(
            doc! {
                "username": username,
                "email": email,
                "password_hash": pw_hash,
            },
            None,
        )
        .await
    {
        Ok(r) => r,
        Err(_) => {
            errs.insert("_form".into(), "There is a problem registering this user.".into());
            return Err(errs);
        }
    };

    let new_id = insert.inserted_id.as_object_id().ok_or_else(|| {
        let mut e = FieldErrors::new();
        e.insert("_form".into(), "There is a problem registering this user.".into());
        e
    })?;

    Ok(new_id)
}

/// Exchanges a valid refresh token for a new access/refresh pair.
pub async fn refresh_tokens(state: &AppState, refresh_token: &str) -> Result<TokenPair, String> {
    let claims = decode_token(state, refresh_token)?;

    if claims.token_type != "refresh" {
        return Err("Invalid token type.".to_string());
    }

    let user_id = ObjectId::parse_str(&claims.sub).map_err(|e| e.to_string())?;

    let users = state.db.collection::<User>("users");
    users
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "User not found.".to_string())?;

    generate_tokens(state, &user_id)
}
