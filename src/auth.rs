// src/auth.rs
use crate::db::{LocalStore, SESSION_KEY};
use crate::error::{ClientError, Result};
use crate::models::Session;
use jsonwebtoken::dangerous_insecure_decode;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    exp: Option<usize>,
}

/// Reads `exp` from a bearer token without verifying its signature; the
/// backend remains the authority. Opaque tokens never count as expired.
pub fn is_expired(token: &str, now_secs: i64) -> bool {
    match dangerous_insecure_decode::<Claims>(token) {
        Ok(data) => match data.claims.exp {
            Some(exp) => (exp as i64) <= now_secs,
            None => false,
        },
        Err(e) => {
            debug!("Token is not a readable JWT ({}), assuming valid", e);
            false
        }
    }
}

pub fn current_session(store: &LocalStore) -> Option<Session> {
    store.get(SESSION_KEY)
}

pub fn save_session(store: &mut LocalStore, session: &Session) -> Result<()> {
    info!("Logged in as {}", session.email);
    store.set(SESSION_KEY, session)
}

pub fn logout(store: &mut LocalStore) -> Result<()> {
    info!("Session cleared.");
    store.remove(SESSION_KEY)
}

/// Token for an authenticated call. An expired token is dropped from the
/// store and reported as `Unauthorized`, same as a 401 from the backend.
pub fn require_token(store: &mut LocalStore) -> Result<String> {
    let session = current_session(store).ok_or(ClientError::NotLoggedIn)?;
    if is_expired(&session.token, chrono::Utc::now().timestamp()) {
        warn!("Stored token for {} has expired", session.email);
        logout(store)?;
        return Err(ClientError::Unauthorized);
    }
    Ok(session.token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tempfile::tempdir;

    fn token_with_exp(exp: usize) -> String {
        let claims = Claims {
            sub: Some("user-1".to_string()),
            exp: Some(exp),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("test_secret".as_ref()),
        )
        .unwrap()
    }

    #[test]
    fn expiry_is_read_from_claims() {
        assert!(is_expired(&token_with_exp(1_000), 2_000));
        assert!(!is_expired(&token_with_exp(3_000), 2_000));
        assert!(!is_expired("opaque-session-token", 2_000));
    }

    #[test]
    fn expired_session_is_logged_out() {
        let dir = tempdir().unwrap();
        let mut store = LocalStore::open(dir.path().join("s.json")).unwrap();
        save_session(
            &mut store,
            &Session {
                token: token_with_exp(1),
                email: "a@b.c".into(),
            },
        )
        .unwrap();

        assert!(matches!(require_token(&mut store), Err(ClientError::Unauthorized)));
        assert!(current_session(&store).is_none());
        assert!(matches!(require_token(&mut store), Err(ClientError::NotLoggedIn)));
    }

    #[test]
    fn valid_session_yields_token() {
        let dir = tempdir().unwrap();
        let mut store = LocalStore::open(dir.path().join("s.json")).unwrap();
        let token = token_with_exp(10000000000);
        save_session(
            &mut store,
            &Session {
                token: token.clone(),
                email: "a@b.c".into(),
            },
        )
        .unwrap();
        assert_eq!(require_token(&mut store).unwrap(), token);
    }
}
