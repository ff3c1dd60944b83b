use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::verify_token;

/// Bearer-token middleware guarding proposal mutations.
///
/// Public surface (health, identity-provider auth, user creation/profiles,
/// proposal reads) passes through untouched; everything else requires a valid
/// `Authorization: Bearer` token. On success the authenticated user's id is
/// inserted into request extensions for the `AuthenticatedUserId` extractor.
pub struct AuthMiddleware;

fn is_public(method: &Method, path: &str) -> bool {
    path == "/health"
        || path.starts_with("/auth/idp/")
        || path.starts_with("/users")
        || (*method == Method::GET && path.starts_with("/proposals"))
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let auth_header = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match auth_header {
            Some(token) => match verify_token(token) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims.sub);
                    let fut = self.service.call(req);
                    Box::pin(fut)
                }
                Err(app_err) => Box::pin(async move { Err(app_err.into()) }),
            },
            None => {
                let app_err = crate::error::AppError::Unauthorized("Missing token".into());
                Box::pin(async move { Err(app_err.into()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_path_matrix() {
        assert!(is_public(&Method::GET, "/health"));
        assert!(is_public(&Method::POST, "/auth/idp/google/sign-in"));
        assert!(is_public(&Method::POST, "/users"));
        assert!(is_public(&Method::POST, "/users/public-profiles"));
        assert!(is_public(&Method::GET, "/proposals"));
        assert!(is_public(
            &Method::GET,
            "/proposals/9a4c2cb5-7c92-4f0c-bf3e-000000000000"
        ));

        // Mutations on proposals require authentication
        assert!(!is_public(&Method::POST, "/proposals"));
        assert!(!is_public(
            &Method::POST,
            "/proposals/9a4c2cb5-7c92-4f0c-bf3e-000000000000/cancel"
        ));
        assert!(!is_public(
            &Method::POST,
            "/proposals/9a4c2cb5-7c92-4f0c-bf3e-000000000000/fulfill"
        ));
    }
}
