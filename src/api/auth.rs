use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::Result,
    model::{
        api::session::SessionRequest,
        auth::{AuthToken, AUTH_TOKEN_COOKIE},
    },
};

pub fn routes() -> Vec<Route> {
    routes![start_session, end_session]
}

/// Keep a wallet-issued token in the session cookie, so the browser need not
/// attach it to every request.
#[post("/auth/session", data = "<session>", format = "json")]
pub fn start_session(
    session: Json<SessionRequest>,
    cookies: &CookieJar<'_>,
    config: &State<Config>,
) -> Result<()> {
    let SessionRequest { token } = session.into_inner();
    let caller = AuthToken::decode(&token, config.jwt_secret())?;
    info!("Session started for {}", caller.address());
    cookies.add(AuthToken::cookie(token, config));
    Ok(())
}

#[delete("/auth/session")]
pub fn end_session(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
