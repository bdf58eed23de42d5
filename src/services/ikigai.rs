//! Ikigai profile embedded in the user document

use bson::oid::ObjectId;
use std::sync::Arc;
use tracing::info;

use crate::auth::Actor;
use crate::db::schemas::IkigaiProfile;
use crate::store::UserStore;
use crate::types::{Result, TrackerError};

pub struct IkigaiService {
    users: Arc<dyn UserStore>,
}

impl IkigaiService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Save the caller's quiz result and mark the quiz as done
    pub async fn create(&self, actor: &Actor, profile: IkigaiProfile) -> Result<IkigaiProfile> {
        if !self.users.set_ikigai(&actor.user_id, Some(profile.clone())).await? {
            return Err(TrackerError::NotFound("User not found".into()));
        }
        info!(user_id = %actor.user_id, archetype = ?profile.archetype, "Saved ikigai profile");
        Ok(profile)
    }

    pub async fn get(&self, actor: &Actor) -> Result<IkigaiProfile> {
        let user = self
            .users
            .get(&actor.user_id)
            .await?
            .ok_or_else(|| TrackerError::NotFound("User not found".into()))?;
        user.ikigai
            .ok_or_else(|| TrackerError::NotFound("Ikigai profile not found".into()))
    }

    /// Replace an existing profile
    pub async fn update(&self, actor: &Actor, profile: IkigaiProfile) -> Result<IkigaiProfile> {
        self.get(actor).await?;
        self.create(actor, profile).await
    }

    /// Clear another user's profile (admin only)
    pub async fn delete_for_user(&self, actor: &Actor, user_id: &ObjectId) -> Result<()> {
        actor.require_admin()?;
        if !self.users.set_ikigai(user_id, None).await? {
            return Err(TrackerError::NotFound("User not found".into()));
        }
        info!(user_id = %user_id, admin = %actor.user_id, "Cleared ikigai profile");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::db::schemas::{Archetype, UserDoc};
    use crate::store::MemoryUserStore;

    fn profile(archetype: Archetype) -> IkigaiProfile {
        IkigaiProfile {
            archetype,
            you_love: "music".into(),
            good_at: "teaching".into(),
            world_needs: "education".into(),
            is_profitable: "tutoring".into(),
        }
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let users = Arc::new(MemoryUserStore::new());
        let user = users
            .insert(UserDoc::new("i@example.com".into(), "h".into(), None, Role::User))
            .await
            .unwrap();
        let actor = Actor::new(user._id.unwrap(), Role::User);
        let admin = Actor::new(ObjectId::new(), Role::Admin);
        let svc = IkigaiService::new(users.clone());

        assert!(matches!(svc.get(&actor).await, Err(TrackerError::NotFound(_))));
        assert!(matches!(
            svc.update(&actor, profile(Archetype::Social)).await,
            Err(TrackerError::NotFound(_))
        ));

        svc.create(&actor, profile(Archetype::Explorador)).await.unwrap();
        svc.update(&actor, profile(Archetype::Reflexivo)).await.unwrap();
        assert_eq!(svc.get(&actor).await.unwrap().archetype, Archetype::Reflexivo);
        assert!(users.get(&actor.user_id).await.unwrap().unwrap().ikigai_quiz_done);

        assert!(matches!(
            svc.delete_for_user(&actor, &actor.user_id).await,
            Err(TrackerError::Forbidden(_))
        ));
        svc.delete_for_user(&admin, &actor.user_id).await.unwrap();
        assert!(matches!(svc.get(&actor).await, Err(TrackerError::NotFound(_))));
    }
}
