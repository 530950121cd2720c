//! First-writer-wins group key reference shared by all parties of a run

use std::sync::Mutex;

use k256::ProjectivePoint;
use uuid::Uuid;

/// Result of offering a reconstructed key to the reference cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOutcome {
    /// This key became the reference
    Established,
    /// Matches the existing reference
    Matched,
    /// Differs from the existing reference
    Mismatched { reference: ProjectivePoint },
}

#[derive(Debug)]
struct Cell {
    key: Option<ProjectivePoint>,
    run_id: Uuid,
}

/// Compare-and-set cell holding the first reconstructed group key
#[derive(Debug)]
pub struct GroupKeyReference {
    cell: Mutex<Cell>,
}

impl Default for GroupKeyReference {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupKeyReference {
    pub fn new() -> Self {
        Self {
            cell: Mutex::new(Cell {
                key: None,
                run_id: Uuid::new_v4(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cell> {
        match self.cell.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Set the reference if empty, otherwise compare against it
    pub fn compare_and_set(&self, key: ProjectivePoint) -> ReferenceOutcome {
        let mut cell = self.lock();
        match cell.key {
            None => {
                cell.key = Some(key);
                ReferenceOutcome::Established
            }
            Some(reference) if reference == key => ReferenceOutcome::Matched,
            Some(reference) => ReferenceOutcome::Mismatched { reference },
        }
    }

    pub fn get(&self) -> Option<ProjectivePoint> {
        self.lock().key
    }

    pub fn run_id(&self) -> Uuid {
        self.lock().run_id
    }

    /// Clear the reference for a new run and return the new run id
    pub fn reset(&self) -> Uuid {
        let mut cell = self.lock();
        cell.key = None;
        cell.run_id = Uuid::new_v4();
        cell.run_id
    }
}
