//! The public team page.

use serde::Serialize;

use super::Storefront;
use crate::store::paths;
use crate::{Result, Status, TeamMember};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRoster {
    pub members: Vec<TeamMember>,
    /// No active members ("Our team will be introduced soon").
    pub empty: bool,
}

impl TeamRoster {
    /// Active members by their `order` field; ties keep snapshot order.
    pub fn from_members(members: impl IntoIterator<Item = TeamMember>) -> Self {
        let mut members: Vec<TeamMember> = members.into_iter().filter(|m| m.status == Status::Active).collect();
        members.sort_by_key(|m| m.order);
        Self { empty: members.is_empty(), members }
    }
}

impl Storefront {
    pub async fn team(&self) -> Result<TeamRoster> {
        Ok(TeamRoster::from_members(self.store().read(paths::TEAM).await?.records::<TeamMember>()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::store::DocumentStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_team_is_ordered_and_active_only() {
        let (store, shop) = shop();
        assert!(shop.team().await.unwrap().empty);

        store.set(paths::TEAM, json!({
            "m1": { "name": "Maryam", "position": "Founder", "order": 2, "status": "active" },
            "m2": { "name": "Bilal", "position": "Carpenter", "order": 1, "status": "active", "photoURL": "bilal.jpg" },
            "m3": { "name": "Sana", "position": "Designer", "order": 0, "status": "inactive" },
            "m4": { "name": "Omar", "position": "Driver", "status": "active" }
        })).await.unwrap();

        let roster = shop.team().await.unwrap();
        assert!(!roster.empty);
        let names: Vec<&str> = roster.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Omar", "Bilal", "Maryam"]);
        assert_eq!(roster.members[1].photo_url.as_deref(), Some("bilal.jpg"));
        assert_eq!(roster.members[0].id, "m4");
    }

    #[test]
    fn test_roster_without_active_members_is_empty() {
        let hidden = TeamMember { name: "Sana".into(), status: Status::Inactive, ..Default::default() };
        assert_eq!(TeamRoster::from_members([hidden]), TeamRoster { members: Vec::new(), empty: true });
    }
}
