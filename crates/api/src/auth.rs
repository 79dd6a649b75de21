use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse as _, Response},
};
use ledger::{error::AuthFailure, Ledger};
use log::warn;
use model::envelope::bearer_token;

/// Username of an authenticated caller.
#[derive(Clone, Debug)]
pub struct Caller(pub String);

pub async fn middleware(State(ledger): State<Ledger>, mut request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    match ledger.auth.authenticate(token.as_deref()).await {
        Ok(username) => {
            request.extensions_mut().insert(Caller(username));
            next.run(request).await
        }
        Err(AuthFailure::Rejected(rejection)) => {
            warn!("Rejected read: {}", rejection);
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
        Err(AuthFailure::Unavailable(err)) => {
            warn!("Token check failed: {}", err);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
