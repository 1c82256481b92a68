use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::models::Snapshot;

/// Whole-snapshot persistence.
///
/// `load` is called once when a controller starts; `save` after every state
/// change, always with all five collections.
pub trait SnapshotStore: Send {
    fn load(&self) -> Result<Snapshot>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// The named slots a snapshot is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Pantry,
    Preferences,
    MealPlan,
    Shopping,
    Reviews,
}

impl Slot {
    pub const ALL: [Slot; 5] = [
        Self::Pantry,
        Self::Preferences,
        Self::MealPlan,
        Self::Shopping,
        Self::Reviews,
    ];

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Pantry => "pantry",
            Self::Preferences => "preferences",
            Self::MealPlan => "mealplan",
            Self::Shopping => "shopping",
            Self::Reviews => "reviews",
        }
    }
}

/// Serialize one slot of a snapshot to its stored JSON document.
pub fn encode_slot(snapshot: &Snapshot, slot: Slot) -> Result<String> {
    let value = match slot {
        Slot::Pantry => serde_json::to_string(&snapshot.pantry)?,
        Slot::Preferences => serde_json::to_string(&snapshot.preferences)?,
        Slot::MealPlan => serde_json::to_string(&snapshot.meal_plan)?,
        Slot::Shopping => serde_json::to_string(&snapshot.shopping_list)?,
        Slot::Reviews => serde_json::to_string(&snapshot.reviews)?,
    };
    Ok(value)
}

/// Parse a stored JSON document into the matching field of `snapshot`.
pub fn decode_slot(snapshot: &mut Snapshot, slot: Slot, raw: &str) -> Result<()> {
    match slot {
        Slot::Pantry => snapshot.pantry = serde_json::from_str(raw)?,
        Slot::Preferences => snapshot.preferences = serde_json::from_str(raw)?,
        Slot::MealPlan => snapshot.meal_plan = serde_json::from_str(raw)?,
        Slot::Shopping => snapshot.shopping_list = serde_json::from_str(raw)?,
        Slot::Reviews => snapshot.reviews = serde_json::from_str(raw)?,
    }
    Ok(())
}

/// In-memory store. Clones share the same backing snapshot, so a test can keep
/// a handle and inspect what the controller wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Option<Snapshot>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved snapshot, if any.
    #[must_use]
    pub fn stored(&self) -> Option<Snapshot> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.stored().unwrap_or_default())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
