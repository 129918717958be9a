//! Bearer-token identity seam. The core only ever asks one question here:
//! who is the caller, if anyone.

use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config::{token_expiration_hours, token_key, TOKENS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, verify_password};
use crate::core::kv::KvStore;
use crate::models::models::{TokenData, User};
use crate::store;

pub fn login_user<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let creds: serde_json::Value = serde_json::from_slice(req.body())?;
    let username = creds["username"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    let user = match store::find_user_by_username(kv, username) {
        Ok(Some(u)) => u,
        Ok(None) => return Ok(ApiError::Unauthorized.into()),
        Err(err) => return Ok(err.into()),
    };

    if !verify_password(password, &user.password) {
        return Ok(ApiError::Unauthorized.into());
    }

    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user.id.clone(),
        created_at: now_iso(),
    };
    kv.set_json(&token_key(&token), &data)?;

    let mut tokens: Vec<String> = kv.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.push(token.clone());
    kv.set_json(TOKENS_LIST_KEY, &tokens)?;

    let resp = serde_json::json!({
        "token": token,
        "user_id": user.id
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn logout_user<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let auth_header = req
        .header("Authorization")
        .and_then(|h| h.as_str())
        .unwrap_or_default();

    if !auth_header.starts_with("Bearer ") {
        return Ok(ApiError::Unauthorized.into());
    }

    let token = auth_header.strip_prefix("Bearer ").unwrap();
    kv.delete(&token_key(token))?;

    let mut tokens: Vec<String> = kv.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.retain(|t| t != token);
    kv.set_json(TOKENS_LIST_KEY, &tokens)?;

    let resp = serde_json::json!({
        "message": "Logged out successfully"
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

/// Current-user lookup: None for missing, malformed, expired, or orphaned
/// tokens. Routes that require authentication turn None into a 401.
pub fn validate_token<S: KvStore>(kv: &S, req: &Request) -> Option<String> {
    let auth_header = req.header("Authorization")?.as_str().unwrap_or_default();
    if !auth_header.starts_with("Bearer ") {
        return None;
    }
    let token = auth_header.strip_prefix("Bearer ").unwrap();

    let data = kv.get_json::<TokenData>(&token_key(token)).ok()??;
    if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        let now = chrono::Utc::now();
        let age_hours = (now - created.with_timezone(&chrono::Utc)).num_hours();
        if age_hours > token_expiration_hours() {
            return None;
        }
    }
    // Token may outlive its user
    if kv.get_json::<User>(&crate::config::user_key(&data.user_id)).ok()?.is_none() {
        return None;
    }
    Some(data.user_id)
}
