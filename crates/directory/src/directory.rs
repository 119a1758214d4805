//! In-memory client store with a unique document-ID index and set-once
//! online-account linking.

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use gymledger_core::config::DirectoryConfig;
use gymledger_core::types::Client;
use gymledger_core::{GymError, GymResult};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterClientRequest {
    pub document_id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub medical_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub medical_notes: Option<String>,
}

/// Thread-safe in-memory client directory.
pub struct ClientDirectory {
    clients: DashMap<Uuid, Client>,
    /// Index: document ID -> client ID, enforcing directory-wide uniqueness.
    document_index: DashMap<String, Uuid>,
    config: DirectoryConfig,
}

impl ClientDirectory {
    pub fn new(config: &DirectoryConfig) -> Self {
        info!(
            min_phone_digits = config.min_phone_digits,
            "Client directory initialized"
        );
        Self {
            clients: DashMap::new(),
            document_index: DashMap::new(),
            config: config.clone(),
        }
    }

    /// Register a new client. Rejects duplicate document IDs and phones with
    /// fewer than the configured digit count.
    pub fn register(&self, req: RegisterClientRequest) -> GymResult<Client> {
        let document_id = req.document_id.trim().to_string();
        if document_id.is_empty() {
            return Err(GymError::validation("document_id", "must not be empty"));
        }
        if req.name.trim().is_empty() {
            return Err(GymError::validation("name", "must not be empty"));
        }
        self.validate_phone(&req.phone)?;

        if self.document_index.contains_key(&document_id) {
            return Err(GymError::Conflict(format!(
                "document ID {document_id} is already registered"
            )));
        }

        let client = Client {
            id: Uuid::new_v4(),
            document_id: document_id.clone(),
            name: req.name.trim().to_string(),
            email: req.email,
            phone: req.phone,
            birth_date: req.birth_date,
            weight_kg: req.weight_kg,
            medical_notes: req.medical_notes,
            account_id: None,
            inactive: false,
            created_at: Utc::now(),
        };
        self.document_index.insert(document_id, client.id);
        self.clients.insert(client.id, client.clone());

        info!(client_id = %client.id, document_id = %client.document_id, "Client registered");
        Ok(client)
    }

    pub fn get(&self, id: Uuid) -> Option<Client> {
        self.clients.get(&id).map(|r| r.value().clone())
    }

    pub fn find_by_document(&self, document_id: &str) -> Option<Client> {
        self.document_index
            .get(document_id.trim())
            .and_then(|r| self.get(*r.value()))
    }

    /// Update mutable client fields. The document ID is immutable.
    pub fn update(&self, id: Uuid, req: UpdateClientRequest) -> GymResult<Client> {
        if let Some(phone) = &req.phone {
            self.validate_phone(phone)?;
        }
        let mut entry = self
            .clients
            .get_mut(&id)
            .ok_or_else(|| GymError::not_found("client", id))?;
        let c = entry.value_mut();
        if let Some(name) = req.name {
            if name.trim().is_empty() {
                return Err(GymError::validation("name", "must not be empty"));
            }
            c.name = name.trim().to_string();
        }
        if let Some(phone) = req.phone {
            c.phone = phone;
        }
        if let Some(email) = req.email {
            c.email = Some(email);
        }
        if let Some(birth_date) = req.birth_date {
            c.birth_date = Some(birth_date);
        }
        if let Some(weight) = req.weight_kg {
            c.weight_kg = Some(weight);
        }
        if let Some(notes) = req.medical_notes {
            c.medical_notes = Some(notes);
        }
        Ok(c.clone())
    }

    /// Link an online account to the client matching the given document ID.
    /// The link is set exactly once; re-linking is a conflict.
    pub fn link_account(&self, document_id: &str, account_id: Uuid) -> GymResult<Client> {
        let client_id = self
            .document_index
            .get(document_id.trim())
            .map(|r| *r.value())
            .ok_or_else(|| GymError::not_found("client", document_id))?;

        let mut entry = self
            .clients
            .get_mut(&client_id)
            .ok_or_else(|| GymError::not_found("client", client_id))?;
        let c = entry.value_mut();
        if c.account_id.is_some() {
            return Err(GymError::Conflict(format!(
                "client {} already has a linked account",
                c.document_id
            )));
        }
        c.account_id = Some(account_id);
        info!(client_id = %c.id, account_id = %account_id, "Online account linked");
        Ok(c.clone())
    }

    /// Flip the manual inactive flag used by the roster ranking.
    pub fn set_inactive(&self, id: Uuid, inactive: bool) -> GymResult<Client> {
        let mut entry = self
            .clients
            .get_mut(&id)
            .ok_or_else(|| GymError::not_found("client", id))?;
        entry.value_mut().inactive = inactive;
        Ok(entry.value().clone())
    }

    /// Hard-remove a client record. Callers must first pass the ledger's
    /// removal guard; a client with non-cancelled periods stays soft.
    pub fn remove(&self, id: Uuid) -> GymResult<()> {
        let (_, client) = self
            .clients
            .remove(&id)
            .ok_or_else(|| GymError::not_found("client", id))?;
        self.document_index.remove(&client.document_id);
        info!(client_id = %id, document_id = %client.document_id, "Client removed");
        Ok(())
    }

    pub fn all(&self) -> Vec<Client> {
        self.clients.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn validate_phone(&self, phone: &str) -> GymResult<()> {
        let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
        if digits < self.config.min_phone_digits {
            return Err(GymError::validation(
                "phone",
                format!(
                    "needs at least {} digits, found {digits}",
                    self.config.min_phone_digits
                ),
            ));
        }
        Ok(())
    }
}
