use axum::{debug_handler, response::{Html, IntoResponse, Redirect, Response}};

use crate::{include_res, session::CurrentUser};

#[debug_handler]
pub(crate) async fn groups_page(CurrentUser(user_id): CurrentUser) -> Response {
    if user_id.is_none() {
        return Redirect::to("/login?return_url=/").into_response();
    }

    Html(include_res!(str, "/pages/groups.html")).into_response()
}
