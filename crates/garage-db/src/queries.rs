use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use garage_types::models::{CarRecord, MAX_IMAGES, NewCar};

use crate::models::CarRow;
use crate::{Database, StoreError};

const CAR_COLUMNS: &str =
    "id, owner_id, title, description, tags, images, created_at, updated_at";

impl Database {
    // -- Cars --

    /// Insert a new car for `owner_id` under a freshly generated id.
    pub fn create_car(&self, owner_id: &str, car: NewCar) -> Result<CarRecord, StoreError> {
        check_image_count(&car.images)?;

        let now = Utc::now();
        let record = CarRecord {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            title: car.title,
            description: car.description,
            tags: car.tags,
            images: car.images,
            created_at: now,
            updated_at: now,
        };
        let row = CarRow::from_record(&record)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO cars (id, owner_id, title, description, tags, images, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.owner_id,
                    row.title,
                    row.description,
                    row.tags,
                    row.images,
                    row.created_at,
                    row.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(record)
    }

    /// Fetch a car only if `owner_id` owns it. Someone else's car and a
    /// missing car both come back as `None`.
    pub fn find_owned(&self, owner_id: &str, id: &Uuid) -> Result<Option<CarRecord>, StoreError> {
        let row = self.with_conn(|conn| query_owned_car(conn, owner_id, &id.to_string()))?;
        Ok(row.map(CarRow::into_record).transpose()?)
    }

    pub fn list_owned(&self, owner_id: &str) -> Result<Vec<CarRecord>, StoreError> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CAR_COLUMNS} FROM cars WHERE owner_id = ?1 ORDER BY created_at, id"
            ))?;
            let rows = stmt
                .query_map([owner_id], map_car_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|row| row.into_record().map_err(StoreError::from))
            .collect()
    }

    /// Persist the full state of an existing car. Bumps `updated_at`.
    pub fn save_car(&self, car: &CarRecord) -> Result<CarRecord, StoreError> {
        check_image_count(&car.images)?;

        let mut saved = car.clone();
        saved.updated_at = Utc::now();
        let row = CarRow::from_record(&saved)?;

        let changed = self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE cars SET title = ?1, description = ?2, tags = ?3, images = ?4, updated_at = ?5
                 WHERE id = ?6 AND owner_id = ?7",
                params![
                    row.title,
                    row.description,
                    row.tags,
                    row.images,
                    row.updated_at,
                    row.id,
                    row.owner_id,
                ],
            )?;
            Ok(n)
        })?;

        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(saved)
    }

    /// Remove a car if `owner_id` owns it. Returns whether a row was deleted.
    pub fn delete_owned(&self, owner_id: &str, id: &Uuid) -> Result<bool, StoreError> {
        let deleted = self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM cars WHERE id = ?1 AND owner_id = ?2",
                params![id.to_string(), owner_id],
            )?;
            Ok(n)
        })?;
        Ok(deleted > 0)
    }
}

fn check_image_count(images: &[String]) -> Result<(), StoreError> {
    if images.len() > MAX_IMAGES {
        return Err(StoreError::LimitExceeded {
            count: images.len(),
        });
    }
    Ok(())
}

fn query_owned_car(
    conn: &Connection,
    owner_id: &str,
    id: &str,
) -> Result<Option<CarRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CAR_COLUMNS} FROM cars WHERE id = ?1 AND owner_id = ?2"
    ))?;
    let row = stmt.query_row([id, owner_id], map_car_row).optional()?;
    Ok(row)
}

fn map_car_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CarRow> {
    Ok(CarRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        tags: row.get(4)?,
        images: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
