//! Request identity extractors
//!
//! Authentication lives at the API gateway; by the time a request reaches
//! this service the acting user has already been verified and is carried in
//! trusted headers. These extractors only parse those headers.

use actix_web::error::ErrorUnauthorized;
use actix_web::{dev::Payload, Error, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

fn uuid_header(req: &HttpRequest, name: &str) -> Option<Uuid> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
}

/// The authenticated platform user, from `X-User-Id`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            uuid_header(req, "x-user-id")
                .map(AuthenticatedUser)
                .ok_or_else(|| ErrorUnauthorized("Missing or invalid X-User-Id header")),
        )
    }
}

/// The acting administrator, from `X-Admin-Id`.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Uuid);

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            uuid_header(req, "x-admin-id")
                .map(AdminUser)
                .ok_or_else(|| ErrorUnauthorized("Missing or invalid X-Admin-Id header")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn test_authenticated_user_extraction() {
        let user_id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header(("x-user-id", user_id.to_string()))
            .to_http_request();

        let extracted = AuthenticatedUser::extract(&req).await.unwrap();
        assert_eq!(extracted.0, user_id);
    }

    #[actix_web::test]
    async fn test_missing_header_is_rejected() {
        let req = TestRequest::default().to_http_request();
        assert!(AuthenticatedUser::extract(&req).await.is_err());

        let req = TestRequest::default()
            .insert_header(("x-user-id", "not-a-uuid"))
            .to_http_request();
        assert!(AuthenticatedUser::extract(&req).await.is_err());
    }
}
