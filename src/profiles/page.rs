use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Redirect, Response}};

use crate::{include_res, res, session::CurrentUser, store::Store};

use super::{ProfileState, ProfileView};

/// Server-rendered profile. Reloading the page is the refresh.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn profile(
    State(store): State<Store>,
    user: CurrentUser,
) -> Response {
    if user.0.is_none() {
        return Redirect::to("/login?return_url=/p").into_response();
    }

    let mut view = ProfileView::mount(store, &user);
    let details = match view.load().await {
        ProfileState::Loaded(profile) => format!(
            "<dl><dt>Username</dt><dd>{}</dd><dt>Email</dt><dd>{}</dd></dl>",
            res::escape(&profile.username),
            res::escape(&profile.email),
        ),
        ProfileState::NotFound => "<p>User data not found.</p>".to_owned(),
        ProfileState::Unavailable => "<p class=\"error\">Profile is unavailable right now.</p>".to_owned(),
        ProfileState::Idle | ProfileState::Loading => "<p>Loading profile...</p>".to_owned(),
    };

    Html(include_res!(str, "/pages/profile.html").replace("{details}", &details)).into_response()
}
