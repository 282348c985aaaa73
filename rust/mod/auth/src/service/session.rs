use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{info, warn};

use invctl_core::{new_id, Claims, ROOT_ROLE_ID};
use invctl_sql::RecordStore;

use crate::model::{Session, TokenResponse};
use crate::service::password::verify_password;
use crate::service::{AuthError, AuthService};

/// Subject and username of the virtual superuser.
pub const ROOT_USER: &str = "root";

impl AuthService {
    /// Check credentials and issue an access token.
    ///
    /// `root` is checked against the configured hash; everyone else against
    /// their stored argon2id hash.
    pub fn login(&self, username: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let username = username.trim();
        if username == ROOT_USER {
            let ok = self
                .config
                .root_password_hash
                .as_deref()
                .is_some_and(|h| verify_password(password, h));
            if !ok {
                warn!("rejected root login");
                return Err(AuthError::Unauthorized("invalid credentials".into()));
            }
            return self.issue_token(ROOT_USER, ROOT_USER, vec![], vec![ROOT_ROLE_ID.to_string()]);
        }

        let user = self
            .find_by_username(username)?
            .ok_or_else(|| AuthError::Unauthorized("invalid credentials".into()))?;
        if !verify_password(password, &self.password_hash_of(&user.id)?) {
            warn!(username, "rejected login");
            return Err(AuthError::Unauthorized("invalid credentials".into()));
        }
        if !user.active {
            return Err(AuthError::Unauthorized("account is deactivated".into()));
        }

        let groups = self.user_group_names(&user.id)?;
        info!(username, "user logged in");
        self.issue_token(&user.id, &user.username, groups, vec![])
    }

    fn issue_token(
        &self,
        sub: &str,
        name: &str,
        groups: Vec<String>,
        roles: Vec<String>,
    ) -> Result<TokenResponse, AuthError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(self.config.access_token_ttl);
        let session = Session {
            id: new_id(),
            user_id: sub.to_string(),
            issued_at: invctl_core::now_rfc3339(),
            expires_at: exp.to_rfc3339(),
            revoked: false,
        };
        let claims = Claims {
            sub: sub.to_string(),
            name: name.to_string(),
            groups,
            roles,
            sid: session.id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("JWT encode failed: {}", e)))?;

        self.sql.create(&session)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl,
        })
    }

    /// Verify a JWT access token. Fails when expired, badly signed, or when
    /// its session was revoked.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AuthError::Unauthorized(format!("invalid token: {}", e)))?;

        let claims = data.claims;
        match self.sql.find::<Session>(&claims.sid)? {
            Some(s) if !s.revoked => Ok(claims),
            _ => Err(AuthError::Unauthorized("session has been revoked".into())),
        }
    }

    /// Revoke a session (logout).
    pub fn revoke_session(&self, session_id: &str) -> Result<(), AuthError> {
        let mut session: Session = self.sql.load(session_id)?;
        session.revoked = true;
        self.sql.save(&session)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegisterUser;
    use crate::service::testutil;

    fn register(svc: &AuthService, username: &str, role: &str) -> String {
        svc.register(RegisterUser {
            username: username.into(),
            password: "rahasia123".into(),
            password_confirm: "rahasia123".into(),
            role: role.into(),
        })
        .unwrap()
        .id
    }

    #[test]
    fn login_issues_token_with_groups() {
        let svc = testutil::service();
        register(&svc, "dewi", "Lead Technician");

        let token = svc.login("dewi", "rahasia123").unwrap();
        assert_eq!(token.token_type, "Bearer");
        let claims = svc.verify_token(&token.access_token).unwrap();
        assert_eq!(claims.name, "dewi");
        assert_eq!(claims.groups, vec!["Lead Technician"]);
        assert!(!claims.is_root());
    }

    #[test]
    fn bad_credentials_are_unauthorized() {
        let svc = testutil::service();
        register(&svc, "dewi", "Sales");
        assert!(matches!(svc.login("dewi", "wrong-pass"), Err(AuthError::Unauthorized(_))));
        assert!(matches!(svc.login("ghost", "rahasia123"), Err(AuthError::Unauthorized(_))));
        assert!(matches!(svc.login("root", "nope"), Err(AuthError::Unauthorized(_))));
    }

    #[test]
    fn root_login_carries_root_role() {
        let svc = testutil::service();
        let token = svc.login("root", "rootpass123").unwrap();
        let claims = svc.verify_token(&token.access_token).unwrap();
        assert!(claims.is_root());
        assert_eq!(claims.sub, "root");
    }

    #[test]
    fn revoked_and_deactivated_sessions_fail() {
        let svc = testutil::service();
        let id = register(&svc, "eko", "Purchasing");

        let t1 = svc.login("eko", "rahasia123").unwrap();
        let claims = svc.verify_token(&t1.access_token).unwrap();
        svc.revoke_session(&claims.sid).unwrap();
        assert!(svc.verify_token(&t1.access_token).is_err());

        let t2 = svc.login("eko", "rahasia123").unwrap();
        svc.set_active(&id, false).unwrap();
        assert!(svc.verify_token(&t2.access_token).is_err());
        assert!(matches!(svc.login("eko", "rahasia123"), Err(AuthError::Unauthorized(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let svc = testutil::service();
        assert!(matches!(svc.verify_token("abc.def.ghi"), Err(AuthError::Unauthorized(_))));
    }
}
