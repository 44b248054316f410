//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use quitus::workflow::{ChecklistItem, Nature, NouveauDossier};

/// Builder for `NouveauDossier` with sensible testing defaults.
pub struct DossierBuilder {
    numero_dossier: String,
    nature: Nature,
    objet: String,
    beneficiaire: String,
    poste_comptable: String,
    nature_document: String,
    dossier_source_id: Option<String>,
}

impl DossierBuilder {
    pub fn new(numero: &str) -> Self {
        Self {
            numero_dossier: numero.to_string(),
            nature: Nature::Depense,
            objet: "Achat de fournitures de bureau".to_string(),
            beneficiaire: "Fournitures Plus SARL".to_string(),
            poste_comptable: "PC-DAKAR-01".to_string(),
            nature_document: "FACTURE".to_string(),
            dossier_source_id: None,
        }
    }

    pub fn nature(mut self, nature: Nature) -> Self {
        self.nature = nature;
        self
    }

    pub fn objet(mut self, objet: &str) -> Self {
        self.objet = objet.to_string();
        self
    }

    pub fn beneficiaire(mut self, beneficiaire: &str) -> Self {
        self.beneficiaire = beneficiaire.to_string();
        self
    }

    pub fn source(mut self, dossier_id: &str) -> Self {
        self.dossier_source_id = Some(dossier_id.to_string());
        self
    }

    pub fn build(self) -> NouveauDossier {
        NouveauDossier {
            numero_dossier: self.numero_dossier,
            nature: self.nature,
            objet: self.objet,
            beneficiaire: self.beneficiaire,
            poste_comptable: self.poste_comptable,
            nature_document: self.nature_document,
            dossier_source_id: self.dossier_source_id,
        }
    }
}

/// Builder for ordonnateur checklists.
pub struct ChecklistBuilder {
    items: Vec<ChecklistItem>,
}

impl ChecklistBuilder {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn mandatory(mut self, categorie: &str, libelle: &str) -> Self {
        let ordre = self.items.len() as i64 + 1;
        self.items.push(ChecklistItem {
            categorie: categorie.to_string(),
            ordre,
            libelle: libelle.to_string(),
            obligatoire: true,
        });
        self
    }

    pub fn optional(mut self, categorie: &str, libelle: &str) -> Self {
        let ordre = self.items.len() as i64 + 1;
        self.items.push(ChecklistItem {
            categorie: categorie.to_string(),
            ordre,
            libelle: libelle.to_string(),
            obligatoire: false,
        });
        self
    }

    pub fn build(self) -> Vec<ChecklistItem> {
        self.items
    }
}
