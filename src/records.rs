use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("{0}")]
    Invalid(String),
    #[error("Department name already exists")]
    DuplicateDepartment,
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Department ID {0} does not exist")]
    UnknownDepartment(i64),
    #[error("Student not found")]
    StudentNotFound,
    #[error("Student or Formation not found")]
    EnrollmentTargetNotFound,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RecordsError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDepartment {
    pub name: String,
}

impl NewDepartment {
    pub fn validated(self) -> Result<Self, RecordsError> {
        Ok(Self {
            name: required("name", &self.name)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub department_id: i64,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub department_id: i64,
}

impl NewStudent {
    pub fn validated(self) -> Result<Self, RecordsError> {
        let name = required("name", &self.name)?;
        let email = self.email.trim().to_owned();
        if !is_plausible_email(&email) {
            return Err(RecordsError::Invalid(format!(
                "email is not a valid email address: {email:?}"
            )));
        }
        Ok(Self {
            name,
            email,
            department_id: self.department_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    pub id: i64,
    pub title: String,
    pub theme: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFormation {
    pub title: String,
    pub theme: String,
}

impl NewFormation {
    pub fn validated(self) -> Result<Self, RecordsError> {
        Ok(Self {
            title: required("title", &self.title)?,
            theme: self.theme.trim().to_owned(),
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, RecordsError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RecordsError::Invalid(format!("{field} must not be empty")));
    }
    Ok(value.to_owned())
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
