//! Users and the pet records embedded in them.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::{
    error::DomainError,
    ids::{AppointmentId, MedicationId, PetId, UserId},
    validation,
};

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub pets: Vec<Pet>,
}

impl User {
    pub fn new(email: &str, now: OffsetDateTime) -> Result<Self, DomainError> {
        Ok(Self {
            id: UserId::new(),
            email: validation::email(email)?,
            created_at: now,
            pets: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub name: String,
    pub age: u32,
    pub species: String,
    pub breed: String,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub prescriptions: Vec<String>,
}

impl Pet {
    pub fn new(draft: PetDraft) -> Self {
        Self {
            id: PetId::new(),
            image: draft.image,
            name: draft.name,
            age: draft.age,
            species: draft.species,
            breed: draft.breed,
            medications: Vec::new(),
            appointments: Vec::new(),
            prescriptions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub id: MedicationId,
    pub name: String,
    #[serde(with = "calendar_date")]
    pub administered_on: Date,
    pub dosage: String,
}

impl Medication {
    pub fn new(name: &str, administered_on: Date, dosage: &str) -> Result<Self, DomainError> {
        Ok(Self {
            id: MedicationId::new(),
            name: validation::required_text("medication name", name)?,
            administered_on,
            dosage: validation::required_text("dosage", dosage)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_for: OffsetDateTime,
    pub reason: String,
    pub clinic_name: String,
}

impl Appointment {
    pub fn new(
        scheduled_for: OffsetDateTime,
        reason: &str,
        clinic_name: &str,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: AppointmentId::new(),
            scheduled_for,
            reason: validation::required_text("reason", reason)?,
            clinic_name: validation::required_text("clinic name", clinic_name)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetDraft {
    pub image: Option<String>,
    pub name: String,
    pub age: u32,
    pub species: String,
    pub breed: String,
}

impl PetDraft {
    pub fn new(
        name: &str,
        age: u32,
        species: &str,
        breed: &str,
        image: Option<&str>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            image: validation::optional_text(image),
            name: validation::required_text("name", name)?,
            age: validation::pet_age(age)?,
            species: validation::required_text("species", species)?,
            breed: validation::required_text("breed", breed)?,
        })
    }
}

/// Partial update of a pet's own fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetChanges {
    pub image: Option<String>,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub species: Option<String>,
    pub breed: Option<String>,
}

impl PetChanges {
    pub fn is_empty(&self) -> bool {
        self.image.is_none()
            && self.name.is_none()
            && self.age.is_none()
            && self.species.is_none()
            && self.breed.is_none()
    }

    /// Validates every supplied field; blank text counts as not supplied.
    pub fn validated(self) -> Result<Self, DomainError> {
        let text = |field: &'static str, value: Option<String>| {
            match validation::optional_text(value.as_deref()) {
                Some(value) => validation::required_text(field, &value).map(Some),
                None => Ok(None),
            }
        };
        Ok(Self {
            image: validation::optional_text(self.image.as_deref()),
            name: text("name", self.name)?,
            age: self.age.map(validation::pet_age).transpose()?,
            species: text("species", self.species)?,
            breed: text("breed", self.breed)?,
        })
    }
}
