use thiserror::Error;

use crate::backend::{BackendError, RatingBackend};
use crate::{NewSubject, Subject};

#[derive(Error, Debug)]
pub enum NewSubjectError {
    #[error("Missing field: {0}")]
    FieldMissing(&'static str),

    #[error("This course already exists for the selected school!")]
    Duplicate,

    #[error("Error submitting subject: {0}")]
    Backend(#[from] BackendError),
}

fn required(value: &str, field: &'static str) -> Result<String, NewSubjectError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(NewSubjectError::FieldMissing(field));
    }
    Ok(value.to_string())
}

fn normalized(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_lowercase())
}

/// Checks the form and rejects a course already listed at the same school.
pub fn validate_new_subject(
    existing: &[Subject],
    name: &str,
    university: &str,
    major: &str,
) -> Result<NewSubject, NewSubjectError> {
    let name = required(name, "course name")?;
    let university = required(university, "school")?;
    let major = required(major, "major")?;

    let key = (name.to_lowercase(), university.to_lowercase());
    let duplicate = existing.iter().any(|subject| {
        subject.name.trim().to_lowercase() == key.0
            && normalized(subject.university.as_deref()).as_deref() == Some(key.1.as_str())
    });

    if duplicate {
        return Err(NewSubjectError::Duplicate);
    }

    Ok(NewSubject {
        name,
        university: Some(university),
        major: Some(major),
    })
}

pub async fn add_course<B: RatingBackend + ?Sized>(
    backend: &B,
    existing: &[Subject],
    name: &str,
    university: &str,
    major: &str,
) -> Result<NewSubject, NewSubjectError> {
    let subject = validate_new_subject(existing, name, university, major)?;
    backend.insert_subject(&subject).await?;

    tracing::info!(name = %subject.name, "course added");
    Ok(subject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    fn catalog() -> Vec<Subject> {
        vec![Subject::new("1", " Calculus ")
            .with_university("MIT")
            .with_major("Math")]
    }

    #[test]
    fn all_fields_are_required() {
        assert!(matches!(
            validate_new_subject(&catalog(), "Physics", " ", "Science"),
            Err(NewSubjectError::FieldMissing("school"))
        ));
        assert!(matches!(
            validate_new_subject(&catalog(), "", "MIT", "Science"),
            Err(NewSubjectError::FieldMissing("course name"))
        ));
    }

    #[test]
    fn same_course_at_same_school_is_rejected() {
        assert!(matches!(
            validate_new_subject(&catalog(), "calculus", " mit", "Math"),
            Err(NewSubjectError::Duplicate)
        ));

        let other_school = validate_new_subject(&catalog(), "Calculus", "Harvard", "Math").unwrap();
        assert_eq!(other_school.university.as_deref(), Some("Harvard"));
    }

    #[tokio::test]
    async fn valid_course_is_inserted() {
        let backend = MockBackend::default();

        add_course(&backend, &catalog(), " Linear Algebra ", "MIT", "Math")
            .await
            .unwrap();

        let state = backend.state.borrow();
        assert_eq!(state.inserted_subjects[0].name, "Linear Algebra");
    }
}
