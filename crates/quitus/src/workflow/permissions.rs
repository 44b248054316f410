//! Explicit permission table keyed by (role, transition).
//!
//! Every transition is granted to exactly the roles listed here; there is
//! no wildcard role and no name-based bypass. A role missing from the
//! table simply cannot perform the transition.

use crate::auth::Role;
use crate::workflow::statut::Transition;

const PERMISSIONS: &[(Role, Transition)] = &[
    (Role::Secretaire, Transition::Creer),
    (Role::Secretaire, Transition::Soumettre),
    (Role::Secretaire, Transition::Modifier),
    (Role::ControleurBudgetaire, Transition::ValiderCb),
    (Role::ControleurBudgetaire, Transition::RejeterCb),
    (Role::Ordonnateur, Transition::ApprouverOrdonnateur),
    (Role::AgentComptable, Transition::EnregistrerReglement),
    (Role::AgentComptable, Transition::ValiderDefinitivement),
    (Role::AgentComptable, Transition::Cloturer),
    (Role::AgentComptable, Transition::GenererQuitus),
];

/// Whether the role may attempt the transition at all.
pub fn is_allowed(role: Role, transition: Transition) -> bool {
    PERMISSIONS
        .iter()
        .any(|(r, t)| *r == role && *t == transition)
}
