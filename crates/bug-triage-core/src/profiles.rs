//! Enrichment of request profiles with persisted team data.

use crate::lookup::Lookup;
use crate::models::{Skills, TeamProfile};
use crate::store::PersistedProfile;

/// Merges each request profile with the persisted profile of the same
/// `member_id`. Request order and values take precedence; persisted data only
/// adds. Without persisted data the input is returned unchanged.
pub fn enrich_profiles(
    input: &[TeamProfile],
    persisted: &Lookup<Vec<PersistedProfile>>,
) -> Vec<TeamProfile> {
    let persisted = persisted.items();
    input
        .iter()
        .map(|profile| {
            match persisted.iter().find(|p| p.member_id == profile.member_id) {
                Some(stored) => merge(profile, stored),
                None => profile.clone(),
            }
        })
        .collect()
}

fn merge(profile: &TeamProfile, stored: &PersistedProfile) -> TeamProfile {
    let skills = match &profile.skills {
        Some(declared) => Skills {
            languages: union(&declared.languages, &stored.skills.languages),
            frameworks: union(&declared.frameworks, &stored.skills.frameworks),
            domains: union(&declared.domains, &stored.skills.domains),
        },
        None => stored.skills.clone(),
    };
    let modules_owned = union(profile.modules_owned(), &stored.modules_owned);

    TeamProfile {
        member_id: profile.member_id.clone(),
        name: profile.name.clone(),
        skills: Some(skills),
        modules_owned: Some(modules_owned),
        current_load: profile.current_load.or_else(|| stored.open_assigned_bugs()),
    }
}

/// Order-preserving union without duplicates.
fn union(first: &[String], second: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(first.len() + second.len());
    for item in first.iter().chain(second) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
