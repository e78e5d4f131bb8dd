use super::AuthUser;
use crate::errors::ServiceError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header letting a super admin act on behalf of another société
pub const SOCIETE_HEADER: &str = "x-societe-id";

/// Société (and optionally site) a request operates on.
///
/// Resolved from the caller's token. Only super admins may redirect a request
/// to another société through [`SOCIETE_HEADER`]; the header is ignored for
/// everyone else.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub societe_id: Uuid,
    pub site_id: Option<Uuid>,
    pub user: AuthUser,
}

impl TenantContext {
    pub fn resolve(user: AuthUser, override_header: Option<&str>) -> Result<Self, ServiceError> {
        let overridden = match override_header {
            Some(raw) if user.is_super_admin() => Some(Uuid::parse_str(raw.trim()).map_err(
                |_| ServiceError::BadRequest(format!("Invalid {} header", SOCIETE_HEADER)),
            )?),
            _ => None,
        };

        let societe_id = overridden.or(user.societe_id).ok_or_else(|| {
            ServiceError::Forbidden("No société associated with this account".to_string())
        })?;

        Ok(Self {
            societe_id,
            site_id: user.site_id,
            user,
        })
    }

    /// Actor recorded in audit columns
    pub fn actor(&self) -> Option<Uuid> {
        self.user.user_uuid()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

        let header = parts
            .headers
            .get(SOCIETE_HEADER)
            .and_then(|value| value.to_str().ok());

        let context = Self::resolve(user, header)?;
        crate::tracing::record_tenant(&context.societe_id);
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn user(roles: &[&str], societe_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4().to_string(),
            name: None,
            email: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: vec![],
            societe_id,
            site_id: None,
            token_id: String::new(),
        }
    }

    #[test]
    fn token_societe_is_used_by_default() {
        let societe = Uuid::new_v4();
        let ctx = TenantContext::resolve(user(&["USER"], Some(societe)), None).unwrap();
        assert_eq!(ctx.societe_id, societe);
    }

    #[test]
    fn header_override_is_ignored_for_regular_users() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4().to_string();
        let ctx = TenantContext::resolve(user(&["ADMIN"], Some(own)), Some(&other)).unwrap();
        assert_eq!(ctx.societe_id, own);
    }

    #[test]
    fn super_admin_can_switch_societe() {
        let other = Uuid::new_v4();
        let ctx = TenantContext::resolve(
            user(&["SUPER_ADMIN"], Some(Uuid::new_v4())),
            Some(&other.to_string()),
        )
        .unwrap();
        assert_eq!(ctx.societe_id, other);
    }

    #[test]
    fn missing_societe_is_forbidden() {
        assert_matches!(
            TenantContext::resolve(user(&["USER"], None), None),
            Err(ServiceError::Forbidden(_))
        );
        assert_matches!(
            TenantContext::resolve(user(&["SUPER_ADMIN"], None), Some("not-a-uuid")),
            Err(ServiceError::BadRequest(_))
        );
    }
}
