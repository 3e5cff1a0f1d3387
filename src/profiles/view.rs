use futures_util::FutureExt;

use crate::{
    models::{UserId, UserProfile},
    screen::Effect,
    session::AuthSession,
    store::{Collection, DocPath, Store, StoreError},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileState {
    Idle,
    Loading,
    Loaded(UserProfile),
    NotFound,
    Unavailable,
}

pub struct ProfileFetched(pub Result<Option<UserProfile>, StoreError>);

/// The signed-in user's profile. Every refresh reads the store again.
pub struct ProfileView {
    store: Store,
    me: Option<UserId>,
    state: ProfileState,
}

impl ProfileView {
    pub fn mount(store: Store, auth: &impl AuthSession) -> Self {
        Self {
            store,
            me: auth.current_user(),
            state: ProfileState::Idle,
        }
    }

    pub fn state(&self) -> &ProfileState {
        &self.state
    }

    pub fn refresh(&mut self) -> Option<Effect<ProfileFetched>> {
        let me = self.me.clone()?;
        self.state = ProfileState::Loading;

        let store = self.store.clone();
        Some(
            async move {
                let path = DocPath::new(Collection::Users, me.0);
                let result = match store.get_once(&path).await {
                    Ok(Some(doc)) => doc.decode::<UserProfile>().map(Some),
                    Ok(None) => Ok(None),
                    Err(err) => Err(err),
                };
                ProfileFetched(result)
            }
            .boxed(),
        )
    }

    pub fn handle(&mut self, ProfileFetched(result): ProfileFetched) {
        self.state = match result {
            Ok(Some(profile)) => ProfileState::Loaded(profile),
            Ok(None) => {
                tracing::warn!(user = ?self.me, "user document not found");
                ProfileState::NotFound
            }
            Err(err) => {
                tracing::error!(user = ?self.me, %err, "error fetching user data");
                ProfileState::Unavailable
            }
        };
    }

    /// Refresh and wait for the result.
    pub async fn load(&mut self) -> &ProfileState {
        if let Some(effect) = self.refresh() {
            let fetched = effect.await;
            self.handle(fetched);
        }
        &self.state
    }
}
