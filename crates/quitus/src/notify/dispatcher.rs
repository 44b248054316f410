//! Role-aware notification dispatcher.
//!
//! Translates a committed workflow event into inbox rows for the next
//! custodian pool and the originating secretary. Recipients are resolved
//! against the user registry by role — zero, one or many active users per
//! role, all of whom receive the event (fan-out, never a fixed identity).
//!
//! Delivery is at-least-once and idempotent: each row is keyed by
//! `(dossier_id, transition, revision)` + recipient, so redelivering one
//! event cannot duplicate it, while a genuine resubmission cycle (new
//! revision) notifies again. Delivery failures are logged and swallowed —
//! they never fail the transition that caused them.

use chrono::Utc;
use uuid::Uuid;

use crate::auth::{Claims, Role};
use crate::config::RoutageConfig;
use crate::db::dossier_repo::DossierRow;
use crate::db::notification_repo::{self, NotificationRow};
use crate::db::{user_repo, Database};
use crate::notify::{Priorite, TypeNotification};
use crate::workflow::statut::Transition;

/// A committed transition, as seen by the dispatcher. `dossier` carries
/// the post-commit state, including the bumped revision.
#[derive(Debug)]
pub struct WorkflowEvent<'a> {
    pub dossier: &'a DossierRow,
    pub transition: Transition,
    pub actor: &'a Claims,
}

impl WorkflowEvent<'_> {
    fn event_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.dossier.id,
            self.transition.as_str(),
            self.dossier.revision
        )
    }
}

/// One planned delivery before recipient resolution.
struct Delivery {
    target: Target,
    notif_type: TypeNotification,
    priority: Priorite,
    title: String,
    message: String,
}

enum Target {
    User(String),
    RolePool(Role),
}

pub struct Dispatcher {
    db: Database,
    routage: RoutageConfig,
}

impl Dispatcher {
    pub fn new(db: Database, routage: RoutageConfig) -> Self {
        Self { db, routage }
    }

    /// Fans the event out to its recipients. Best-effort: failures are
    /// logged, never returned.
    pub fn dispatch(&self, event: &WorkflowEvent<'_>) {
        for delivery in self.plan(event) {
            let recipients = match &delivery.target {
                Target::User(id) => vec![id.clone()],
                Target::RolePool(role) => {
                    match user_repo::find_active_by_role(&self.db, role.as_str()) {
                        Ok(users) => {
                            if users.is_empty() {
                                log::warn!(
                                    "No active user with role {} to notify for dossier {}",
                                    role,
                                    event.dossier.id
                                );
                            }
                            users.into_iter().map(|u| u.id).collect()
                        }
                        Err(e) => {
                            log::error!(
                                "Failed to resolve role {} for dossier {}: {}",
                                role,
                                event.dossier.id,
                                e
                            );
                            continue;
                        }
                    }
                }
            };

            for user_id in recipients {
                self.deliver(event, &delivery, &user_id);
            }
        }
    }

    fn deliver(&self, event: &WorkflowEvent<'_>, delivery: &Delivery, user_id: &str) {
        let metadata = serde_json::json!({
            "dossierId": event.dossier.id,
            "numeroDossier": event.dossier.numero_dossier,
            "transition": event.transition.as_str(),
        });

        let row = NotificationRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            notif_type: delivery.notif_type.as_str().to_string(),
            priority: delivery.priority.as_str().to_string(),
            title: delivery.title.clone(),
            message: delivery.message.clone(),
            is_read: false,
            read_at: None,
            action_link: Some(format!("/dossiers/{}", event.dossier.id)),
            metadata: Some(metadata.to_string()),
            event_key: event.event_key(),
            created_at: Utc::now().to_rfc3339(),
        };

        match notification_repo::insert_ignore(&self.db, &row) {
            Ok(true) => {}
            Ok(false) => {
                log::debug!(
                    "Notification for event {} to {} already delivered, skipping",
                    row.event_key,
                    user_id
                );
            }
            Err(e) => {
                log::error!(
                    "Failed to deliver notification for event {} to {}: {}",
                    row.event_key,
                    user_id,
                    e
                );
            }
        }
    }

    /// Builds the delivery plan for one transition. Rejections are HIGH
    /// priority, forward progress is MEDIUM, confirmations are LOW.
    fn plan(&self, event: &WorkflowEvent<'_>) -> Vec<Delivery> {
        let numero = &event.dossier.numero_dossier;
        let secretaire = Target::User(event.dossier.secretaire_id.clone());

        match event.transition {
            Transition::Creer | Transition::GenererQuitus => Vec::new(),

            Transition::Soumettre => vec![Delivery {
                target: Target::RolePool(self.routage.apres_soumission),
                notif_type: TypeNotification::Information,
                priority: Priorite::Moyenne,
                title: "Nouveau dossier à contrôler".to_string(),
                message: format!("Le dossier {} a été soumis au contrôle budgétaire", numero),
            }],

            Transition::Modifier => vec![Delivery {
                target: Target::RolePool(self.routage.apres_soumission),
                notif_type: TypeNotification::Information,
                priority: Priorite::Moyenne,
                title: "Dossier modifié".to_string(),
                message: format!("Le dossier {} en attente de contrôle a été modifié", numero),
            }],

            Transition::ValiderCb => vec![
                Delivery {
                    target: secretaire,
                    notif_type: TypeNotification::Validation,
                    priority: Priorite::Moyenne,
                    title: "Dossier validé par le CB".to_string(),
                    message: format!("Le dossier {} a passé le contrôle budgétaire", numero),
                },
                Delivery {
                    target: Target::User(event.actor.user_id.clone()),
                    notif_type: TypeNotification::Confirmation,
                    priority: Priorite::Basse,
                    title: "Validation enregistrée".to_string(),
                    message: format!("Votre validation du dossier {} est enregistrée", numero),
                },
                Delivery {
                    target: Target::RolePool(self.routage.apres_validation_cb),
                    notif_type: TypeNotification::Information,
                    priority: Priorite::Moyenne,
                    title: "Dossier à vérifier".to_string(),
                    message: format!("Le dossier {} attend la vérification de l'ordonnateur", numero),
                },
            ],

            Transition::RejeterCb => {
                let reason = event
                    .dossier
                    .rejection_reason
                    .as_deref()
                    .unwrap_or("motif non précisé");
                vec![Delivery {
                    target: secretaire,
                    notif_type: TypeNotification::Rejet,
                    priority: Priorite::Haute,
                    title: "Dossier rejeté par le CB".to_string(),
                    message: format!("Le dossier {} a été rejeté : {}", numero, reason),
                }]
            }

            Transition::ApprouverOrdonnateur => vec![
                Delivery {
                    target: secretaire,
                    notif_type: TypeNotification::Validation,
                    priority: Priorite::Moyenne,
                    title: "Dossier approuvé par l'ordonnateur".to_string(),
                    message: format!("Le dossier {} a été approuvé", numero),
                },
                Delivery {
                    target: Target::RolePool(self.routage.apres_approbation),
                    notif_type: TypeNotification::Information,
                    priority: Priorite::Moyenne,
                    title: "Dossier à régler".to_string(),
                    message: format!("Le dossier {} attend l'agent comptable", numero),
                },
            ],

            Transition::EnregistrerReglement => vec![Delivery {
                target: secretaire,
                notif_type: TypeNotification::Information,
                priority: Priorite::Moyenne,
                title: "Règlement enregistré".to_string(),
                message: format!("Le règlement du dossier {} a été enregistré", numero),
            }],

            Transition::ValiderDefinitivement => vec![Delivery {
                target: secretaire,
                notif_type: TypeNotification::Validation,
                priority: Priorite::Moyenne,
                title: "Dossier validé définitivement".to_string(),
                message: format!("Le dossier {} est validé définitivement", numero),
            }],

            Transition::Cloturer => vec![Delivery {
                target: secretaire,
                notif_type: TypeNotification::Information,
                priority: Priorite::Basse,
                title: "Dossier terminé".to_string(),
                message: format!("Le dossier {} est clôturé", numero),
            }],
        }
    }
}
