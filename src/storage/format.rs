//! Cassette document structure

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::interaction::{Interaction, Request, Response};
use crate::mode::Mode;

/// Current cassette format version
pub const CASSETTE_VERSION: u32 = 1;

/// Ordered, versioned collection of recorded interactions
///
/// Interactions can only be appended; `order_index` always equals the
/// interaction's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cassette {
    /// Format version
    pub version: u32,
    /// Mode of the session that created this cassette
    pub mode: Mode,
    /// Creation timestamp (Unix epoch seconds)
    pub created_at: u64,
    interactions: Vec<Interaction>,
}

impl Cassette {
    /// Create a cassette with no interactions
    #[must_use]
    pub fn create_empty(mode: Mode) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Self {
            version: CASSETTE_VERSION,
            mode,
            created_at,
            interactions: Vec::new(),
        }
    }

    /// Recorded interactions in order
    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Interaction at `position`
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Interaction> {
        self.interactions.get(position)
    }

    /// Number of interactions
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Check if the cassette holds no interactions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Order index the next appended interaction will receive
    #[must_use]
    pub fn next_order_index(&self) -> u64 {
        self.interactions.len() as u64
    }

    /// Append an interaction and return its order index
    pub fn push(&mut self, request: Request, response: Response) -> u64 {
        let order_index = self.next_order_index();
        self.interactions.push(Interaction {
            order_index,
            request,
            response,
        });
        order_index
    }

    /// Check structural invariants of a loaded document
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.version != CASSETTE_VERSION {
            return Err(format!(
                "unsupported version {}, expected {CASSETTE_VERSION}",
                self.version
            ));
        }

        for (position, interaction) in self.interactions.iter().enumerate() {
            if interaction.order_index != position as u64 {
                return Err(format!(
                    "interaction at position {position} has order_index {}",
                    interaction.order_index
                ));
            }

            interaction
                .request
                .validate()
                .and_then(|()| interaction.response.validate())
                .map_err(|e| format!("interaction {position}: {e}"))?;
        }

        Ok(())
    }
}
