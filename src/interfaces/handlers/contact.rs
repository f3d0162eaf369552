use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use uuid::Uuid;

use crate::{
    entities::{contact::ContactForm, token::CsrfTokenResponse},
    errors::ContactError,
    utils::request_identity::{client_identifier, session_id},
    AppState,
};

/// Called when the contact form renders. Reuses the caller's session when
/// one is supplied, otherwise starts a new one.
#[get("/contact/csrf-token")]
pub async fn csrf_token(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<impl Responder, ContactError> {
    let session_id = session_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    let identifier = client_identifier(&req, state.trust_x_forwarded_for);
    let (csrf_token, rendered_at) = state
        .contact_handler
        .render_token(&identifier, &session_id)
        .await?;

    Ok(HttpResponse::Ok().json(CsrfTokenResponse {
        csrf_token,
        session_id,
        rendered_at,
    }))
}

#[post("/contact")]
pub async fn submit_contact(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Json<ContactForm>,
) -> Result<impl Responder, ContactError> {
    // Without a session there is no token list to check against.
    let session_id = session_id(&req).ok_or(ContactError::InvalidCsrfToken)?;
    let identifier = client_identifier(&req, state.trust_x_forwarded_for);

    let outcome = state
        .contact_handler
        .submit(&identifier, &session_id, form.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}
