use actix_session::{Session, SessionExt};
use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};

use super::session::{get_role, get_user_id};

/// A session counts as signed in only with both a user id and a known role.
fn is_signed_in(session: &Session) -> bool {
    get_user_id(session).is_some() && get_role(session).is_some()
}

/// Gate for every page behind the login. Anonymous or half-populated
/// sessions are cleared and sent to `/login` with a 303.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let session = req.get_session();
    if is_signed_in(&session) {
        return next.call(req).await.map(ServiceResponse::map_into_left_body);
    }

    if get_user_id(&session).is_some() {
        log::warn!("Session without a valid role on {}, clearing it", req.path());
        session.purge();
    } else {
        log::debug!("Anonymous request to {}, redirecting to login", req.path());
    }
    let response = HttpResponse::SeeOther()
        .insert_header(("Location", "/login"))
        .finish();
    Ok(req.into_response(response).map_into_right_body())
}
