//! Car lifecycle flows that tie the store, the reconciler and image storage
//! together.
//!
//! An update walks `Loaded -> Reconciled -> Persisted -> FilesPurged`. The
//! record save is the durability boundary: file purges run after it and can
//! never undo it. Concurrent updates to one car are last-write-wins.

use tracing::{debug, error, info};
use uuid::Uuid;

use garage_db::{Database, StoreError};
use garage_types::models::{CarFields, CarRecord, NewCar};

use crate::error::ApiError;
use crate::reconcile::reconcile;
use crate::state::AppState;

/// Everything an update request asks for, with uploads already stored.
#[derive(Debug, Default)]
pub struct CarUpdate {
    pub fields: CarFields,
    pub uploaded: Vec<String>,
    pub deleted: Vec<String>,
}

/// Run a store call off the async runtime.
async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Storage(e.into())
        })?
        .map_err(ApiError::from)
}

pub async fn create_car(state: &AppState, owner_id: &str, car: NewCar) -> Result<CarRecord, ApiError> {
    let uploaded = car.images.clone();
    let owner = owner_id.to_string();

    match with_db(state, move |db| db.create_car(&owner, car)).await {
        Ok(created) => {
            info!("Car {} created by {} with {} images", created.id, owner_id, created.images.len());
            Ok(created)
        }
        Err(e) => {
            state.storage.purge(&uploaded).await;
            Err(e)
        }
    }
}

pub async fn list_cars(state: &AppState, owner_id: &str) -> Result<Vec<CarRecord>, ApiError> {
    let owner = owner_id.to_string();
    with_db(state, move |db| db.list_owned(&owner)).await
}

pub async fn get_car(state: &AppState, owner_id: &str, id: Uuid) -> Result<CarRecord, ApiError> {
    let owner = owner_id.to_string();
    with_db(state, move |db| db.find_owned(&owner, &id))
        .await?
        .ok_or(ApiError::NotFound)
}

pub async fn update_car(
    state: &AppState,
    owner_id: &str,
    id: Uuid,
    update: CarUpdate,
) -> Result<CarRecord, ApiError> {
    let uploaded = update.uploaded.clone();
    match apply_update(state, owner_id, id, update).await {
        Ok(car) => Ok(car),
        Err(e) => {
            // Rejected requests must not leave their uploads behind.
            state.storage.purge(&uploaded).await;
            Err(e)
        }
    }
}

async fn apply_update(
    state: &AppState,
    owner_id: &str,
    id: Uuid,
    update: CarUpdate,
) -> Result<CarRecord, ApiError> {
    // Loaded
    let mut car = get_car(state, owner_id, id).await?;

    // Reconciled
    let plan = reconcile(&car.images, &update.uploaded, &update.deleted).map_err(|e| {
        debug!("Car {}: {}", id, e);
        ApiError::LimitExceeded
    })?;

    // Persisted
    update.fields.apply_to(&mut car);
    car.images = plan.next_images;
    let saved = with_db(state, move |db| db.save_car(&car)).await?;

    // FilesPurged
    state.storage.purge(&plan.files_to_delete).await;

    info!(
        "Car {} updated by {}: +{} images, -{} images",
        id,
        owner_id,
        update.uploaded.len(),
        plan.files_to_delete.len()
    );
    Ok(saved)
}

pub async fn delete_car(state: &AppState, owner_id: &str, id: Uuid) -> Result<(), ApiError> {
    let car = get_car(state, owner_id, id).await?;

    let owner = owner_id.to_string();
    if !with_db(state, move |db| db.delete_owned(&owner, &id)).await? {
        return Err(ApiError::NotFound);
    }

    state.storage.purge(&car.images).await;

    info!("Car {} deleted by {} ({} images purged)", id, owner_id, car.images.len());
    Ok(())
}
