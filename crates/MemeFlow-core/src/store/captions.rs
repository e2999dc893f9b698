use crate::error::CaptionError;
use serde::{Deserialize, Serialize};

/// Change notification emitted by every successful caption mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionChange {
    /// A single slot was replaced.
    Slot { index: usize, revision: u64 },
    /// Every slot was replaced in one step.
    Replaced { revision: u64 },
}

impl CaptionChange {
    pub fn revision(&self) -> u64 {
        match self {
            CaptionChange::Slot { revision, .. } | CaptionChange::Replaced { revision } => {
                *revision
            }
        }
    }
}

/// Ordered caption slots for one template.
///
/// The slot count is fixed at construction; no mutation can change it.
#[derive(Clone, Debug)]
pub struct CaptionStore {
    slots: Vec<String>,
    revision: u64,
}

impl CaptionStore {
    /// Creates a store with `box_count` empty slots.
    pub fn new(box_count: usize) -> Self {
        Self {
            slots: vec![String::new(); box_count],
            revision: 0,
        }
    }

    pub fn box_count(&self) -> usize {
        self.slots.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn captions(&self) -> &[String] {
        &self.slots
    }

    /// Immutable copy of the current captions.
    pub fn snapshot(&self) -> Vec<String> {
        self.slots.clone()
    }

    /// Replaces one slot.
    pub fn set_slot(
        &mut self,
        index: usize,
        text: impl Into<String>,
    ) -> Result<CaptionChange, CaptionError> {
        let box_count = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(CaptionError::IndexOutOfRange { index, box_count })?;
        *slot = text.into();
        self.revision += 1;
        Ok(CaptionChange::Slot {
            index,
            revision: self.revision,
        })
    }

    /// Replaces every slot at once, truncating or padding `values` to the slot count.
    pub fn replace_all<I, S>(&mut self, values: I) -> CaptionChange
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let box_count = self.slots.len();
        let mut next: Vec<String> = values.into_iter().take(box_count).map(Into::into).collect();
        next.resize(box_count, String::new());
        self.slots = next;
        self.revision += 1;
        CaptionChange::Replaced {
            revision: self.revision,
        }
    }
}
