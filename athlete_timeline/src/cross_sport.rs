use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{CrossSportAmbiguity, CrossSportLink, DatasetRow};
use crate::name_key::NameKey;

#[derive(Debug)]
struct IdentityRef {
    sport: String,
    full_name: String,
    first_name: String,
    last_name: String,
    rows: usize,
}

/// Explicitly links identities of different sports.
///
/// Two identities are linked when their canonical names share a key and they
/// carry the same non-empty date of birth. All their rows then display one
/// shared name. Timelines are not merged: metrics stay per sport.
///
/// A group holding several identities of one sport is not linked, since a
/// shared name would fold two timelines of that sport together. Such groups
/// are returned as ambiguities.
pub fn link_across_sports(
    rows: &mut [DatasetRow],
) -> (Vec<CrossSportLink>, Vec<CrossSportAmbiguity>) {
    // (sport, full name) -> identity
    let mut identities: BTreeMap<(String, String), IdentityRef> = BTreeMap::new();
    let mut dob_of: BTreeMap<(String, String), String> = BTreeMap::new();
    for row in rows.iter() {
        let id_key = (row.sport.clone(), row.full_name.clone());
        identities
            .entry(id_key.clone())
            .or_insert_with(|| IdentityRef {
                sport: row.sport.clone(),
                full_name: row.full_name.clone(),
                first_name: row.first_name.clone(),
                last_name: row.last_name.clone(),
                rows: 0,
            })
            .rows += 1;
        if let Some(dob) = row.date_of_birth.as_ref().filter(|d| !d.trim().is_empty()) {
            dob_of.entry(id_key).or_insert_with(|| dob.trim().to_string());
        }
    }

    let mut groups: BTreeMap<(NameKey, String), Vec<&IdentityRef>> = BTreeMap::new();
    for (id_key, identity) in identities.iter() {
        if let Some(dob) = dob_of.get(id_key) {
            groups
                .entry((NameKey::from_display(&identity.full_name), dob.clone()))
                .or_default()
                .push(identity);
        }
    }

    // (sport, old name) -> (shared name, first, last)
    let mut renames: BTreeMap<(String, String), (String, String, String)> = BTreeMap::new();
    let mut links: Vec<CrossSportLink> = Vec::new();
    let mut ambiguities: Vec<CrossSportAmbiguity> = Vec::new();
    for ((_, dob), members) in groups.iter() {
        let sports: BTreeSet<&str> = members.iter().map(|m| m.sport.as_str()).collect();
        if sports.len() < 2 {
            continue;
        }
        if sports.len() < members.len() {
            let mut per_sport: BTreeMap<&str, usize> = BTreeMap::new();
            for m in members.iter() {
                *per_sport.entry(m.sport.as_str()).or_insert(0) += 1;
            }
            let repeated: Vec<String> = per_sport
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|(sport, _)| sport.to_string())
                .collect();
            let identities: Vec<(String, String)> = members
                .iter()
                .map(|m| (m.sport.clone(), m.full_name.clone()))
                .collect();
            warn!(
                "link_across_sports: {:?} share a name and birth date {:?} but {:?} holds several of them, not linked",
                identities, dob, repeated
            );
            ambiguities.push(CrossSportAmbiguity {
                date_of_birth: dob.clone(),
                repeated_sports: repeated,
                identities,
            });
            continue;
        }
        // Most rows first, then lexicographic.
        let mut chosen = members[0];
        for m in members[1..].iter() {
            if m.rows > chosen.rows || (m.rows == chosen.rows && m.full_name < chosen.full_name) {
                chosen = m;
            }
        }
        for m in members.iter() {
            renames.insert(
                (m.sport.clone(), m.full_name.clone()),
                (
                    chosen.full_name.clone(),
                    chosen.first_name.clone(),
                    chosen.last_name.clone(),
                ),
            );
        }
        let variants: BTreeSet<String> = members.iter().map(|m| m.full_name.clone()).collect();
        info!(
            "link_across_sports: {:?} linked across {:?} as {:?}",
            variants, sports, chosen.full_name
        );
        links.push(CrossSportLink {
            full_name: chosen.full_name.clone(),
            date_of_birth: dob.clone(),
            sports: sports.iter().map(|s| s.to_string()).collect(),
            variants: variants.into_iter().collect(),
        });
    }

    for row in rows.iter_mut() {
        if let Some((name, first, last)) = renames.get(&(row.sport.clone(), row.full_name.clone())) {
            row.full_name = name.clone();
            row.first_name = first.clone();
            row.last_name = last.clone();
        }
    }
    (links, ambiguities)
}
