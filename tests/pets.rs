use std::sync::Arc;

use petopia::{
    application::{context::FeedContext, error::FeedError},
    cache::{CacheBackend, CacheConfig, FailOpenCache, MemoryBackend},
    domain::{
        ids::{PetId, UserId},
        pets::{Pet, PetChanges, PetDraft},
    },
    infra::memory::MemoryDocumentStore,
};
use time::macros::{date, datetime};

struct Harness {
    ctx: FeedContext,
    backend: Arc<MemoryBackend>,
}

fn harness() -> Harness {
    let config = CacheConfig::default();
    let backend = Arc::new(MemoryBackend::new(config.memory_capacity_non_zero()));
    let cache = FailOpenCache::new(backend.clone(), config.op_timeout());
    Harness {
        ctx: FeedContext::new(Arc::new(MemoryDocumentStore::new()), cache, &config),
        backend,
    }
}

async fn cached_pets(backend: &MemoryBackend, user: UserId) -> Option<Vec<Pet>> {
    backend
        .get(&format!("pets:{user}"))
        .await
        .expect("memory backend")
        .map(|raw| serde_json::from_str(&raw).expect("cached pets decode"))
}

fn corgi() -> PetDraft {
    PetDraft::new("Samu", 3, "Dog", "Corgi", Some("samu.png")).expect("draft")
}

#[tokio::test]
async fn pet_mutations_refresh_the_cached_list() {
    let h = harness();
    let user = h.ctx.users.create_user("owner@example.com").await.expect("user");

    assert!(h.ctx.pets.list_pets(user.id).await.expect("list").is_empty());
    assert_eq!(cached_pets(&h.backend, user.id).await, Some(Vec::new()));

    let pet = h.ctx.pets.create_pet(user.id, corgi()).await.expect("create");
    assert_eq!(pet.name, "Samu");
    assert_eq!(cached_pets(&h.backend, user.id).await, Some(vec![pet.clone()]));

    let updated = h
        .ctx
        .pets
        .update_pet(
            user.id,
            pet.id,
            PetChanges {
                age: Some(4),
                breed: Some("Pembroke Corgi".to_string()),
                ..PetChanges::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.age, 4);
    assert_eq!(updated.breed, "Pembroke Corgi");
    assert_eq!(updated.species, "Dog");
    assert_eq!(
        h.ctx.pets.list_pets(user.id).await.expect("list"),
        vec![updated.clone()]
    );

    let remaining = h.ctx.pets.delete_pet(user.id, pet.id).await.expect("delete");
    assert!(remaining.is_empty());
    assert_eq!(cached_pets(&h.backend, user.id).await, Some(Vec::new()));
}

#[tokio::test]
async fn medical_records_are_added_and_removed() {
    let h = harness();
    let user = h.ctx.users.create_user("vet.fan@example.com").await.expect("user");
    let pet = h.ctx.pets.create_pet(user.id, corgi()).await.expect("create");

    let with_med = h
        .ctx
        .pets
        .add_medication(user.id, pet.id, "Heartworm", date!(2025 - 03 - 14), "1 tablet")
        .await
        .expect("medication");
    assert_eq!(with_med.medications.len(), 1);
    let medication = with_med.medications[0].id;

    let with_visit = h
        .ctx
        .pets
        .add_appointment(
            user.id,
            pet.id,
            datetime!(2025-04-01 9:30 UTC),
            "Annual checkup",
            "Happy Paws Clinic",
        )
        .await
        .expect("appointment");
    assert_eq!(with_visit.appointments.len(), 1);
    let appointment = with_visit.appointments[0].id;

    h.ctx
        .pets
        .add_prescription(user.id, pet.id, "rx-1.png")
        .await
        .expect("prescription");
    let twice = h
        .ctx
        .pets
        .add_prescription(user.id, pet.id, "rx-1.png")
        .await
        .expect("prescription again");
    assert_eq!(twice.prescriptions, ["rx-1.png"]);

    let pet_now = h
        .ctx
        .pets
        .remove_medication(user.id, pet.id, medication)
        .await
        .expect("remove medication");
    assert!(pet_now.medications.is_empty());
    let pet_now = h
        .ctx
        .pets
        .remove_appointment(user.id, pet.id, appointment)
        .await
        .expect("remove appointment");
    assert!(pet_now.appointments.is_empty());
    let pet_now = h
        .ctx
        .pets
        .remove_prescription(user.id, pet.id, "rx-1.png")
        .await
        .expect("remove prescription");
    assert!(pet_now.prescriptions.is_empty());

    assert!(matches!(
        h.ctx
            .pets
            .remove_medication(user.id, pet.id, medication)
            .await,
        Err(FeedError::NotFound {
            entity: "medication"
        })
    ));
    assert_eq!(
        h.ctx.pets.get_pet(user.id, pet.id).await.expect("get"),
        pet_now
    );
}

#[tokio::test]
async fn missing_user_pet_and_empty_changes_are_reported() {
    let h = harness();
    let user = h.ctx.users.create_user("someone@example.com").await.expect("user");

    assert!(matches!(
        h.ctx.pets.create_pet(UserId::new(), corgi()).await,
        Err(FeedError::NotFound { entity: "user" })
    ));
    assert!(matches!(
        h.ctx.pets.list_pets(UserId::new()).await,
        Err(FeedError::NotFound { entity: "user" })
    ));
    assert!(matches!(
        h.ctx
            .pets
            .update_pet(
                user.id,
                PetId::new(),
                PetChanges {
                    name: Some("Ghost".to_string()),
                    ..PetChanges::default()
                },
            )
            .await,
        Err(FeedError::NotFound { entity: "pet" })
    ));
    assert!(matches!(
        h.ctx
            .pets
            .update_pet(user.id, PetId::new(), PetChanges::default())
            .await,
        Err(FeedError::InvalidArgument(_))
    ));
    assert!(matches!(
        h.ctx.pets.get_pet(user.id, PetId::new()).await,
        Err(FeedError::NotFound { entity: "pet" })
    ));
}

#[tokio::test]
async fn duplicate_emails_are_rejected() {
    let h = harness();
    h.ctx.users.create_user("Dup@Example.com").await.expect("first");
    assert!(matches!(
        h.ctx.users.create_user("dup@example.com").await,
        Err(FeedError::InvalidArgument(_))
    ));
    assert!(h
        .ctx
        .users
        .find_by_email("DUP@example.com")
        .await
        .expect("lookup")
        .is_some());
}
