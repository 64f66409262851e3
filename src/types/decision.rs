//! Create/delete decision for a single instance.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// What the decision engine wants done for one instance in this run.
///
/// At most one snapshot is ever named for deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Decision {
    pub should_create: bool,
    pub delete: Option<String>,
}

impl Decision {
    pub fn should_delete(&self) -> bool {
        self.delete.is_some()
    }

    pub fn is_noop(&self) -> bool {
        !self.should_create && self.delete.is_none()
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (&self.should_create, &self.delete) {
            (false, None) => write!(f, "Keep"),
            (true, None) => write!(f, "Create"),
            (false, Some(name)) => write!(f, "Delete({name})"),
            (true, Some(name)) => write!(f, "Create+Delete({name})"),
        }
    }
}
