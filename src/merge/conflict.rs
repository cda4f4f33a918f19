use std::collections::HashMap;

use crate::diff::section_modifications;
use crate::diff::Modification;
use crate::tree::Section;

/// Decides whether two change-sets computed from the same ancestor can be
/// combined, and returns the client change-set to replay onto the server
/// tree. The error is the first conflict found, described for humans.
///
/// The policy is deliberately coarse, applied section by section from the
/// root:
/// - a client `delSec`, or an `addSec`/`modSec` not matched by the same
///   action, on a section the server also touched conflicts;
/// - a client `modSec` on a section the server modified recurses into both
///   nested lists;
/// - a section both sides added is compared as two edits of an empty
///   section, and conflicts as "already exists" unless they are disjoint;
/// - inside any section the client touched, any option-level change on the
///   server side conflicts, even when the client edited other options.
pub fn check_conflicts(
    client_mods: &[Modification],
    server_mods: &[Modification],
    parent_path: &str,
) -> Result<Vec<Modification>, String> {
    if client_mods.is_empty() {
        return Ok(Vec::new());
    }
    check_section(client_mods, server_mods, parent_path)
}

/// Conflict check for a section the client touched, even when its own
/// nested change list is empty (comment or order only).
fn check_section(
    client_mods: &[Modification],
    server_mods: &[Modification],
    parent_path: &str,
) -> Result<Vec<Modification>, String> {
    let server_sections: HashMap<&str, &Modification> = server_mods
        .iter()
        .filter(|m| m.action().is_section_level())
        .map(|m| (m.name(), m))
        .collect();

    let mut replay = Vec::with_capacity(client_mods.len());
    for client in client_mods {
        let Some(server) = server_sections.get(client.name()).copied() else {
            replay.push(client.clone());
            continue;
        };
        let path = format!("{}/{}", parent_path, client.name());
        match (client, server) {
            (
                Modification::AddSection {
                    position,
                    section,
                    ..
                },
                Modification::AddSection {
                    section: server_section,
                    ..
                },
            ) => match join_added_sections(section, server_section, *position, &path) {
                Some(joined) => replay.push(joined),
                None => return Err(format!("Section {} already exists", path)),
            },
            (Modification::AddSection { .. }, _) => {
                return Err(format!("Section {} already exists", path));
            }
            (Modification::DelSection { .. }, _) => {
                return Err(format!("Section {} cannot be deleted, it has been modified", path));
            }
            (
                Modification::ModSection {
                    name,
                    position,
                    comment,
                    reordered,
                    changes,
                },
                Modification::ModSection {
                    changes: server_changes,
                    ..
                },
            ) => {
                let nested = check_section(changes, server_changes, &path)?;
                replay.push(Modification::ModSection {
                    name: name.clone(),
                    position: *position,
                    comment: comment.clone(),
                    reordered: *reordered,
                    changes: nested,
                });
            }
            (Modification::ModSection { .. }, Modification::DelSection { .. }) => {
                return Err(format!("Section {} has been deleted", path));
            }
            (Modification::ModSection { .. }, _) => {
                return Err(format!("Section {} already exists", path));
            }
            _ => replay.push(client.clone()),
        }
    }

    match server_mods.iter().find(|m| m.action().is_option_level()) {
        Some(server) => Err(format!("Option {}/{} has been modified", parent_path, server.name())),
        None => Ok(replay),
    }
}

/// Rewrites a client `addSec` into a `modSec` of the section the server
/// already added, when the two additions do not overlap.
fn join_added_sections(
    client: &Section,
    server: &Section,
    position: usize,
    path: &str,
) -> Option<Modification> {
    let empty = Section::new(client.name());
    let client_changes = section_modifications(&empty, client);
    let server_changes = section_modifications(&empty, server);
    let changes = check_section(&client_changes, &server_changes, path).ok()?;

    let comment = match client.comment() {
        "" => None,
        c if c == server.comment() => None,
        c => Some(c.to_string()),
    };
    Some(Modification::ModSection {
        name: client.name().to_string(),
        position,
        comment,
        reordered: false,
        changes,
    })
}
