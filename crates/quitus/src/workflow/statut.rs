//! Dossier statuses and the legal transition edges between them.
//!
//! The status graph is fixed: BROUILLON → EN_ATTENTE → VALIDE_CB →
//! VALIDE_ORDONNATEUR → (PAYE | RECETTE_ENREGISTREE) →
//! VALIDE_DEFINITIVEMENT → TERMINE, with a single rejection branch
//! EN_ATTENTE → REJETE_CB and the resubmission cycle REJETE_CB →
//! EN_ATTENTE. Anything else is an illegal edge.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The authoritative dossier status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Statut {
    Brouillon,
    EnAttente,
    ValideCb,
    RejeteCb,
    ValideOrdonnateur,
    Paye,
    RecetteEnregistree,
    ValideDefinitivement,
    Termine,
}

impl Statut {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statut::Brouillon => "BROUILLON",
            Statut::EnAttente => "EN_ATTENTE",
            Statut::ValideCb => "VALIDE_CB",
            Statut::RejeteCb => "REJETE_CB",
            Statut::ValideOrdonnateur => "VALIDE_ORDONNATEUR",
            Statut::Paye => "PAYE",
            Statut::RecetteEnregistree => "RECETTE_ENREGISTREE",
            Statut::ValideDefinitivement => "VALIDE_DEFINITIVEMENT",
            Statut::Termine => "TERMINE",
        }
    }

    /// Strict parse — the status column is authoritative, an unknown
    /// value means corrupted data, never a default.
    pub fn parse(s: &str) -> Result<Self, StatutError> {
        match s {
            "BROUILLON" => Ok(Statut::Brouillon),
            "EN_ATTENTE" => Ok(Statut::EnAttente),
            "VALIDE_CB" => Ok(Statut::ValideCb),
            "REJETE_CB" => Ok(Statut::RejeteCb),
            "VALIDE_ORDONNATEUR" => Ok(Statut::ValideOrdonnateur),
            "PAYE" => Ok(Statut::Paye),
            "RECETTE_ENREGISTREE" => Ok(Statut::RecetteEnregistree),
            "VALIDE_DEFINITIVEMENT" => Ok(Statut::ValideDefinitivement),
            "TERMINE" => Ok(Statut::Termine),
            other => Err(StatutError::Unknown(other.to_string())),
        }
    }

    /// Statuses in which the owning secretary may edit descriptive fields.
    pub fn is_editable(&self) -> bool {
        matches!(self, Statut::Brouillon | Statut::EnAttente | Statut::RejeteCb)
    }
}

impl std::fmt::Display for Statut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation nature — decides which settlement edge applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Nature {
    Depense,
    Recette,
}

impl Nature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Nature::Depense => "DEPENSE",
            Nature::Recette => "RECETTE",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StatutError> {
        match s {
            "DEPENSE" => Ok(Nature::Depense),
            "RECETTE" => Ok(Nature::Recette),
            other => Err(StatutError::UnknownNature(other.to_string())),
        }
    }

    /// The settlement status this nature leads to. The two are mutually
    /// exclusive by construction.
    pub fn statut_reglement(&self) -> Statut {
        match self {
            Nature::Depense => Statut::Paye,
            Nature::Recette => Statut::RecetteEnregistree,
        }
    }
}

#[derive(Error, Debug)]
pub enum StatutError {
    #[error("Unknown dossier status: '{0}'")]
    Unknown(String),

    #[error("Unknown operation nature: '{0}'")]
    UnknownNature(String),
}

/// The intent-bearing workflow operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    Creer,
    Soumettre,
    Modifier,
    ValiderCb,
    RejeterCb,
    ApprouverOrdonnateur,
    EnregistrerReglement,
    ValiderDefinitivement,
    Cloturer,
    GenererQuitus,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Creer => "CREER",
            Transition::Soumettre => "SOUMETTRE",
            Transition::Modifier => "MODIFIER",
            Transition::ValiderCb => "VALIDER_CB",
            Transition::RejeterCb => "REJETER_CB",
            Transition::ApprouverOrdonnateur => "APPROUVER_ORDONNATEUR",
            Transition::EnregistrerReglement => "ENREGISTRER_REGLEMENT",
            Transition::ValiderDefinitivement => "VALIDER_DEFINITIVEMENT",
            Transition::Cloturer => "CLOTURER",
            Transition::GenererQuitus => "GENERER_QUITUS",
        }
    }

    /// Whether this transition may start from the given status. Every
    /// transition is allowed from a fixed, small set of predecessors;
    /// there is no stage skipping.
    pub fn allowed_from(&self, statut: Statut) -> bool {
        match self {
            // Creation has no source status.
            Transition::Creer => false,
            // Resubmission after rejection is the only cycle in the graph.
            Transition::Soumettre => {
                matches!(statut, Statut::Brouillon | Statut::RejeteCb)
            }
            Transition::Modifier => statut.is_editable(),
            Transition::ValiderCb | Transition::RejeterCb => statut == Statut::EnAttente,
            Transition::ApprouverOrdonnateur => statut == Statut::ValideCb,
            Transition::EnregistrerReglement => statut == Statut::ValideOrdonnateur,
            Transition::ValiderDefinitivement => {
                matches!(statut, Statut::Paye | Statut::RecetteEnregistree)
            }
            Transition::Cloturer => statut == Statut::ValideDefinitivement,
            Transition::GenererQuitus => statut == Statut::ValideDefinitivement,
        }
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
