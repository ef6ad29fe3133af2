//! Publisher subscribers and their secret-bearing properties.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Property id that carries the subscriber's identifier.
pub const SUBSCRIBER_ID_PROPERTY: &str = "subscriberId";

/// A single configuration property of a subscriber module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProperty {
    pub id: String,
    pub value: Option<String>,
    pub display_name: Option<String>,
    pub display_order: i32,
    pub required: bool,
    /// Secret values are stored as ciphertext.
    pub secret: bool,
    pub module: Option<String>,
}

impl SubscriberProperty {
    pub fn new(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: Some(value.into()),
            display_name: None,
            display_order: 0,
            required: false,
            secret: false,
            module: None,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_display(mut self, name: impl Into<String>, order: i32) -> Self {
        self.display_name = Some(name.into());
        self.display_order = order;
        self
    }
}

/// A policy publisher subscriber: a module plus its ordered properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub module_name: String,
    pub properties: Vec<SubscriberProperty>,
}

impl Subscriber {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            properties: Vec::new(),
        }
    }

    /// Convenience constructor that sets the `subscriberId` property.
    pub fn with_id(module_name: impl Into<String>, subscriber_id: impl Into<String>) -> Self {
        Self::new(module_name).with_property(
            SubscriberProperty::new(SUBSCRIBER_ID_PROPERTY, subscriber_id).required(),
        )
    }

    pub fn with_property(mut self, property: SubscriberProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// The subscriber id, taken from the `subscriberId` property (case-insensitive).
    pub fn subscriber_id(&self) -> Option<&str> {
        self.property(SUBSCRIBER_ID_PROPERTY)
            .and_then(|p| p.value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn property(&self, id: &str) -> Option<&SubscriberProperty> {
        self.properties.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// Overlay `update` onto this subscriber. Properties present in the update
    /// replace the stored ones by id; others are kept; new ones are appended.
    /// A non-empty module name in the update wins.
    pub fn merge_update(&mut self, update: &Subscriber) {
        if !update.module_name.trim().is_empty() {
            self.module_name = update.module_name.clone();
        }
        for incoming in &update.properties {
            match self
                .properties
                .iter_mut()
                .find(|p| p.id.eq_ignore_ascii_case(&incoming.id))
            {
                Some(existing) => *existing = incoming.clone(),
                None => self.properties.push(incoming.clone()),
            }
        }
    }

    /// Replace secret property values with their plaintext. A property whose
    /// value cannot be decrypted keeps its stored value.
    pub fn reveal_secrets(&mut self, decryptor: &dyn SecretDecryptor) {
        for property in self.properties.iter_mut().filter(|p| p.secret) {
            let Some(ciphertext) = property.value.as_deref() else {
                continue;
            };
            match decryptor.decrypt(ciphertext) {
                Ok(plain) => property.value = Some(plain),
                Err(e) => {
                    tracing::error!(
                        module = %self.module_name,
                        property = %property.id,
                        error = %e,
                        "failed to decrypt subscriber secret, keeping stored value"
                    );
                }
            }
        }
    }
}

// ============================================================================
// SECRET DECRYPTION
// ============================================================================

/// Failure reported by a [`SecretDecryptor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Secret decryption failed: {0}")]
pub struct CryptoError(pub String);

/// Collaborator that turns stored ciphertext into plaintext.
pub trait SecretDecryptor: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError>;
}
