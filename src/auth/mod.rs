use axum::{routing::get, Router};
use rand::seq::IndexedRandom;

use crate::{
    models::{UserId, UserProfile},
    store::{Collection, DocPath, Store, StoreError},
    AppState,
};

mod clients;
mod login;
mod lockin;
mod logout;

pub use clients::{ClientProvider, Clients};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page))
        .route("/login/{provider}", get(login::login))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/logout", get(logout::logout))
}

/// Only same-site paths are followed after sign-in or sign-out.
pub(crate) fn local_return_url(return_url: Option<String>, fallback: &str) -> String {
    match return_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") => url,
        _ => fallback.to_owned(),
    }
}

fn random_alias() -> String {
    let adjectives = [
        "Quick", "Lazy", "Mysterious", "Jolly", "Brave", "Silent", "Witty", "Fierce",
        "Clever", "Gentle", "Wild", "Calm", "Bold", "Shy", "Proud", "Happy", "Sad",
        "Eager", "Fancy", "Rusty", "Golden", "Silver", "Bright", "Dark", "Lucky",
    ];

    let nouns = [
        "Fox", "Bear", "Eagle", "Wolf", "Dragon", "Tiger", "Lion", "Owl", "Rabbit",
        "Falcon", "Hawk", "Shark", "Panda", "Kitten", "Puppy", "Phoenix", "Griffin",
        "Unicorn", "Turtle", "Dolphin", "Whale", "Elephant", "Giraffe", "Zebra",
    ];

    let mut rng = rand::rng();
    format!(
        "{} {}",
        adjectives.choose(&mut rng).copied().unwrap_or("Nameless"),
        nouns.choose(&mut rng).copied().unwrap_or("User"),
    )
}

/// Writes `users/{user_id}` the first time someone signs in. Existing
/// profiles are left alone.
pub(crate) async fn provision_profile(
    store: &Store,
    user_id: &UserId,
    display_name: Option<String>,
    email: Option<String>,
) -> Result<(), StoreError> {
    let path = DocPath::new(Collection::Users, user_id.0.clone());
    if store.get_once(&path).await?.is_some() {
        return Ok(());
    }

    let profile = UserProfile {
        username: display_name.unwrap_or_else(random_alias),
        email: email.unwrap_or_default(),
    };
    tracing::info!(user = %user_id, username = %profile.username, "adding profile");
    store.set(&path, profile.fields()).await
}
