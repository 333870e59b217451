//! Pet records embedded in user documents, with their medical history.
//!
//! Every mutation re-reads the owner's pet list and refreshes the cached copy.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::{Date, OffsetDateTime};
use tracing::info;

use crate::{
    application::{
        error::FeedError,
        store::{
            Collection, DocumentStore, FieldPath, ID_FIELD, Projection, PullMatcher, UpdateOp,
            UpdateOutcome, from_document, to_value,
        },
    },
    cache::{CoherenceManager, Mutation},
    domain::{
        ids::{AppointmentId, MedicationId, PetId, UserId},
        pets::{Appointment, Medication, Pet, PetChanges, PetDraft},
        validation,
    },
};

const PETS_FIELD: &str = "pets";

#[derive(Clone)]
pub struct PetRepository {
    store: Arc<dyn DocumentStore>,
    coherence: Arc<CoherenceManager>,
}

impl PetRepository {
    pub fn new(store: Arc<dyn DocumentStore>, coherence: Arc<CoherenceManager>) -> Self {
        Self { store, coherence }
    }

    /// The user's pets, served from the cache when possible.
    pub async fn list_pets(&self, user: UserId) -> Result<Vec<Pet>, FeedError> {
        self.coherence
            .get_pets(user, || load_pets(self.store.as_ref(), user))
            .await
    }

    pub async fn get_pet(&self, user: UserId, pet: PetId) -> Result<Pet, FeedError> {
        pick(self.list_pets(user).await?, pet)
    }

    pub async fn create_pet(&self, user: UserId, draft: PetDraft) -> Result<Pet, FeedError> {
        let pet = Pet::new(draft);
        let outcome = self
            .store
            .update_one(
                Collection::Users,
                &user.to_string(),
                &[UpdateOp::Push {
                    path: FieldPath::field(PETS_FIELD),
                    value: to_value(&pet)?,
                }],
            )
            .await?;
        if outcome.matched == 0 {
            return Err(FeedError::not_found("user"));
        }
        info!(user_id = %user, pet_id = %pet.id, "pet created");
        pick(self.refresh(user).await?, pet.id)
    }

    pub async fn update_pet(
        &self,
        user: UserId,
        pet: PetId,
        changes: PetChanges,
    ) -> Result<Pet, FeedError> {
        let changes = changes.validated()?;
        if changes.is_empty() {
            return Err(FeedError::invalid("no pet fields supplied"));
        }

        let set = |field: &str, value: Value| UpdateOp::Set {
            path: FieldPath::element(PETS_FIELD, pet, field),
            value,
        };
        let mut ops = Vec::new();
        if let Some(image) = changes.image {
            ops.push(set("image", Value::String(image)));
        }
        if let Some(name) = changes.name {
            ops.push(set("name", Value::String(name)));
        }
        if let Some(age) = changes.age {
            ops.push(set("age", Value::from(age)));
        }
        if let Some(species) = changes.species {
            ops.push(set("species", Value::String(species)));
        }
        if let Some(breed) = changes.breed {
            ops.push(set("breed", Value::String(breed)));
        }

        self.apply(user, &ops).await?;
        info!(user_id = %user, pet_id = %pet, "pet updated");
        pick(self.refresh(user).await?, pet)
    }

    /// Removes the pet and returns the remaining list.
    pub async fn delete_pet(&self, user: UserId, pet: PetId) -> Result<Vec<Pet>, FeedError> {
        let outcome = self
            .apply(
                user,
                &[UpdateOp::Pull {
                    path: FieldPath::field(PETS_FIELD),
                    matcher: PullMatcher::Id(pet.to_string()),
                }],
            )
            .await?;
        if outcome.modified == 0 {
            return Err(FeedError::not_found("pet"));
        }
        info!(user_id = %user, pet_id = %pet, "pet deleted");
        self.refresh(user).await
    }

    pub async fn add_medication(
        &self,
        user: UserId,
        pet: PetId,
        name: &str,
        administered_on: Date,
        dosage: &str,
    ) -> Result<Pet, FeedError> {
        let medication = Medication::new(name, administered_on, dosage)?;
        self.push_record(user, pet, "medications", to_value(&medication)?)
            .await
    }

    pub async fn remove_medication(
        &self,
        user: UserId,
        pet: PetId,
        medication: MedicationId,
    ) -> Result<Pet, FeedError> {
        self.pull_record(
            user,
            pet,
            "medications",
            PullMatcher::Id(medication.to_string()),
            "medication",
        )
        .await
    }

    pub async fn add_appointment(
        &self,
        user: UserId,
        pet: PetId,
        scheduled_for: OffsetDateTime,
        reason: &str,
        clinic_name: &str,
    ) -> Result<Pet, FeedError> {
        let appointment = Appointment::new(scheduled_for, reason, clinic_name)?;
        self.push_record(user, pet, "appointments", to_value(&appointment)?)
            .await
    }

    pub async fn remove_appointment(
        &self,
        user: UserId,
        pet: PetId,
        appointment: AppointmentId,
    ) -> Result<Pet, FeedError> {
        self.pull_record(
            user,
            pet,
            "appointments",
            PullMatcher::Id(appointment.to_string()),
            "appointment",
        )
        .await
    }

    /// Adds a prescription image reference; adding one twice keeps one copy.
    pub async fn add_prescription(
        &self,
        user: UserId,
        pet: PetId,
        image: &str,
    ) -> Result<Pet, FeedError> {
        let image = validation::required_text("prescription", image)?;
        self.apply(
            user,
            &[UpdateOp::AddToSet {
                path: FieldPath::element(PETS_FIELD, pet, "prescriptions"),
                value: Value::String(image),
            }],
        )
        .await?;
        info!(user_id = %user, pet_id = %pet, "prescription added");
        pick(self.refresh(user).await?, pet)
    }

    pub async fn remove_prescription(
        &self,
        user: UserId,
        pet: PetId,
        image: &str,
    ) -> Result<Pet, FeedError> {
        self.pull_record(
            user,
            pet,
            "prescriptions",
            PullMatcher::Value(Value::String(image.trim().to_string())),
            "prescription",
        )
        .await
    }

    async fn push_record(
        &self,
        user: UserId,
        pet: PetId,
        list: &'static str,
        record: Value,
    ) -> Result<Pet, FeedError> {
        self.apply(
            user,
            &[UpdateOp::Push {
                path: FieldPath::element(PETS_FIELD, pet, list),
                value: record,
            }],
        )
        .await?;
        info!(user_id = %user, pet_id = %pet, list, "pet record added");
        pick(self.refresh(user).await?, pet)
    }

    async fn pull_record(
        &self,
        user: UserId,
        pet: PetId,
        list: &'static str,
        matcher: PullMatcher,
        entity: &'static str,
    ) -> Result<Pet, FeedError> {
        let outcome = self
            .apply(
                user,
                &[UpdateOp::Pull {
                    path: FieldPath::element(PETS_FIELD, pet, list),
                    matcher,
                }],
            )
            .await?;
        if outcome.modified == 0 {
            return Err(FeedError::not_found(entity));
        }
        info!(user_id = %user, pet_id = %pet, list, "pet record removed");
        pick(self.refresh(user).await?, pet)
    }

    /// Runs `ops` against the user document. An unmatched update means either
    /// the user or the addressed pet is missing; the error names which.
    async fn apply(&self, user: UserId, ops: &[UpdateOp]) -> Result<UpdateOutcome, FeedError> {
        let outcome = self
            .store
            .update_one(Collection::Users, &user.to_string(), ops)
            .await?;
        if outcome.matched > 0 {
            return Ok(outcome);
        }
        let user_exists = self
            .store
            .find_by_id(
                Collection::Users,
                &user.to_string(),
                Some(&Projection::fields([ID_FIELD])),
            )
            .await?
            .is_some();
        Err(FeedError::not_found(if user_exists { "pet" } else { "user" }))
    }

    async fn refresh(&self, user: UserId) -> Result<Vec<Pet>, FeedError> {
        let pets = load_pets(self.store.as_ref(), user).await?;
        self.coherence
            .record(Mutation::PetsChanged {
                user_id: user,
                pets: pets.clone(),
            })
            .await;
        Ok(pets)
    }
}

async fn load_pets(store: &dyn DocumentStore, user: UserId) -> Result<Vec<Pet>, FeedError> {
    #[derive(Deserialize)]
    struct Pets {
        #[serde(default)]
        pets: Vec<Pet>,
    }

    let document = store
        .find_by_id(
            Collection::Users,
            &user.to_string(),
            Some(&Projection::fields([PETS_FIELD])),
        )
        .await?
        .ok_or_else(|| FeedError::not_found("user"))?;
    Ok(from_document::<Pets>(document)?.pets)
}

fn pick(pets: Vec<Pet>, id: PetId) -> Result<Pet, FeedError> {
    pets.into_iter()
        .find(|pet| pet.id == id)
        .ok_or_else(|| FeedError::not_found("pet"))
}
