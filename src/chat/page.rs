use axum::{debug_handler, extract::{Path, State}, response::{Html, IntoResponse, Redirect, Response}};

use crate::{
    include_res,
    models::{Group, GroupId},
    res,
    session::CurrentUser,
    store::{Collection, DocPath, Store},
    AppResult,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn thread_page(
    Path(group_id): Path<GroupId>,
    State(store): State<Store>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<Response> {
    if user_id.is_none() {
        return Ok(Redirect::to(&format!("/login?return_url=/g/{group_id}")).into_response());
    }

    let Some(doc) = store.get_once(&DocPath::new(Collection::Groups, group_id.0.clone())).await? else {
        return res::sorry("group");
    };
    let group = Group::from_document(&doc)?;

    let body = include_res!(str, "/pages/chat.html")
        .replace("{group_id}", &res::escape(&group.id.0))
        .replace("{group_name}", &res::escape(&group.name))
        .replace("{group_description}", &res::escape(&group.description));

    Ok(Html(body).into_response())
}
