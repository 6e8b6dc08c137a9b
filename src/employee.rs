//! Employees and the acting session identity.

use serde::{Deserialize, Serialize};

use crate::fields::WorkMode;

/// Departments whose staff work on customer sites unless configured otherwise.
pub const DEFAULT_FIELD_DEPARTMENTS: [&str; 2] = ["Service", "Sales"];

/// A member of staff as known to the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub department: String,
    #[serde(default)]
    pub admin: bool,
}

impl Employee {
    pub fn work_mode(&self, field_departments: &[String]) -> WorkMode {
        work_mode_for(&self.department, field_departments)
    }

    /// The identity this employee acts with.
    pub fn actor(&self, field_departments: &[String]) -> Actor {
        Actor {
            id: self.id.clone(),
            name: self.name.clone(),
            is_admin: self.admin,
            work_mode: self.work_mode(field_departments),
        }
    }
}

/// Classify a department. Matching ignores case and surrounding whitespace.
pub fn work_mode_for(department: &str, field_departments: &[String]) -> WorkMode {
    let department = department.trim();
    if field_departments
        .iter()
        .any(|d| d.trim().eq_ignore_ascii_case(department))
    {
        WorkMode::Field
    } else {
        WorkMode::Office
    }
}

/// Who is issuing a command.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub is_admin: bool,
    pub work_mode: WorkMode,
}

impl Actor {
    pub fn admin(id: &str, name: &str) -> Self {
        Actor {
            id: id.to_string(),
            name: name.to_string(),
            is_admin: true,
            work_mode: WorkMode::Office,
        }
    }

    pub fn technician(id: &str, name: &str, work_mode: WorkMode) -> Self {
        Actor {
            id: id.to_string(),
            name: name.to_string(),
            is_admin: false,
            work_mode,
        }
    }
}

/// Read access to the staff roster.
pub trait Roster {
    fn employee(&self, id: &str) -> Option<&Employee>;
}

impl<T: Roster + ?Sized> Roster for &mut T {
    fn employee(&self, id: &str) -> Option<&Employee> {
        (**self).employee(id)
    }
}
