//! Message type registry.
//!
//! Types are kept sorted by name and a type's wire index is its position in
//! that order. Peers never negotiate indices, so every peer must register
//! the same set of names; [`MessageRegistry::fingerprint`] gives a cheap
//! value to compare out of band. Once a session has exchanged traffic the
//! registry is sealed, because a late registration would shift the index
//! of every type sorting after it.

use std::fmt;

use thiserror::Error;
use xxhash_rust::xxh3::Xxh3;

use super::connection::Connection;
use crate::protocol::WireMessage;

/// Largest number of types an 8-bit index can address.
pub const MAX_MESSAGE_TYPES: usize = u8::MAX as usize + 1;

/// Handler invoked for every received message of one type.
///
/// Returning `false` marks the message as not handled; the failure is
/// logged and dispatch continues.
pub type MessageCallback = Box<dyn FnMut(&mut WireMessage, &mut Connection) -> bool>;

/// Errors raised while registering message types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Name is already registered.
    #[error("message type {name:?} already registered")]
    Duplicate {
        /// Offending name.
        name: String,
    },
    /// Empty names are rejected.
    #[error("message type name is empty")]
    EmptyName,
    /// Every index is taken.
    #[error("registry full ({max} types)")]
    Full {
        /// Capacity of the registry.
        max: usize,
    },
    /// Registration attempted after traffic started.
    #[error("cannot register {name:?}: indices are fixed once traffic has started")]
    Sealed {
        /// Offending name.
        name: String,
    },
}

/// One registered message type.
pub struct MessageDefinition {
    name: String,
    index: u8,
    callback: MessageCallback,
}

impl MessageDefinition {
    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire index.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.index
    }

    /// Run the handler.
    pub fn invoke(&mut self, message: &mut WireMessage, connection: &mut Connection) -> bool {
        (self.callback)(message, connection)
    }
}

impl fmt::Debug for MessageDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDefinition")
            .field("name", &self.name)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Name-ordered table of message types owned by one session.
#[derive(Debug, Default)]
pub struct MessageRegistry {
    definitions: Vec<MessageDefinition>,
    sealed: bool,
}

impl MessageRegistry {
    /// Empty, unsealed registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a type in name order and renumber the types after it.
    pub fn register<F>(&mut self, name: &str, callback: F) -> Result<u8, RegistryError>
    where
        F: FnMut(&mut WireMessage, &mut Connection) -> bool + 'static,
    {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.sealed {
            return Err(RegistryError::Sealed {
                name: name.to_owned(),
            });
        }
        if self.definitions.len() >= MAX_MESSAGE_TYPES {
            return Err(RegistryError::Full {
                max: MAX_MESSAGE_TYPES,
            });
        }
        let position = match self
            .definitions
            .binary_search_by(|def| def.name.as_str().cmp(name))
        {
            Ok(_) => {
                return Err(RegistryError::Duplicate {
                    name: name.to_owned(),
                });
            }
            Err(position) => position,
        };
        self.definitions.insert(
            position,
            MessageDefinition {
                name: name.to_owned(),
                index: 0,
                callback: Box::new(callback),
            },
        );
        for (index, def) in self.definitions.iter_mut().enumerate().skip(position) {
            // bounded by MAX_MESSAGE_TYPES above
            def.index = index as u8;
        }
        Ok(self.definitions[position].index)
    }

    /// Wire index currently assigned to `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.definitions
            .binary_search_by(|def| def.name.as_str().cmp(name))
            .ok()
            .map(|position| self.definitions[position].index)
    }

    /// Name registered at `index`.
    #[must_use]
    pub fn name_of(&self, index: u8) -> Option<&str> {
        self.definitions
            .get(usize::from(index))
            .map(MessageDefinition::name)
    }

    /// Definition registered at `index`.
    pub fn get_mut(&mut self, index: u8) -> Option<&mut MessageDefinition> {
        self.definitions.get_mut(usize::from(index))
    }

    /// Registered names in index order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(MessageDefinition::name)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Refuse further registrations.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether registrations are refused.
    #[must_use]
    pub const fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Hash of the ordered names; equal on peers with identical layouts.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for def in &self.definitions {
            hasher.update(def.name.as_bytes());
            hasher.update(&[0]);
        }
        hasher.digest()
    }
}
