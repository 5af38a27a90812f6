use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use uuid::Uuid;

use tundavala_types::models::TourPackage;

use crate::Database;
use crate::models::{ts_col, uuid_col};

impl Database {
    pub fn create_package(&self, package: &TourPackage) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tour_packages
                    (id, guide_id, title, description, location, price,
                     duration_days, max_people, image_url, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    package.id.to_string(),
                    package.guide_id.to_string(),
                    package.title,
                    package.description,
                    package.location,
                    package.price,
                    package.duration_days,
                    package.max_people,
                    package.image_url,
                    package.active,
                    package.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_package(&self, id: Uuid) -> Result<Option<TourPackage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_PACKAGE))?;
            let package = stmt.query_row([id.to_string()], map_package).optional()?;
            Ok(package)
        })
    }

    pub fn list_packages_for_guide(&self, guide_id: Uuid) -> Result<Vec<TourPackage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE guide_id = ?1 ORDER BY created_at DESC",
                SELECT_PACKAGE
            ))?;
            let packages = stmt
                .query_map([guide_id.to_string()], map_package)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(packages)
        })
    }

    /// Public catalogue: active packages only, optional location filter.
    pub fn list_active_packages(&self, location: Option<&str>) -> Result<Vec<TourPackage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE active = 1
                   AND (?1 IS NULL OR location LIKE '%' || ?1 || '%')
                 ORDER BY created_at DESC",
                SELECT_PACKAGE
            ))?;
            let packages = stmt
                .query_map([location], map_package)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(packages)
        })
    }

    pub fn update_package(
        &self,
        id: Uuid,
        guide_id: Uuid,
        title: Option<&str>,
        description: Option<&str>,
        location: Option<&str>,
        price: Option<i64>,
        duration_days: Option<u32>,
        max_people: Option<u32>,
        image_url: Option<&str>,
        active: Option<bool>,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tour_packages SET
                    title = COALESCE(?3, title),
                    description = COALESCE(?4, description),
                    location = COALESCE(?5, location),
                    price = COALESCE(?6, price),
                    duration_days = COALESCE(?7, duration_days),
                    max_people = COALESCE(?8, max_people),
                    image_url = COALESCE(?9, image_url),
                    active = COALESCE(?10, active)
                 WHERE id = ?1 AND guide_id = ?2",
                params![
                    id.to_string(),
                    guide_id.to_string(),
                    title,
                    description,
                    location,
                    price,
                    duration_days,
                    max_people,
                    image_url,
                    active,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_package(&self, id: Uuid, guide_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM tour_packages WHERE id = ?1 AND guide_id = ?2",
                params![id.to_string(), guide_id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }
}

const SELECT_PACKAGE: &str = "SELECT id, guide_id, title, description, location, price,
        duration_days, max_people, image_url, active, created_at
 FROM tour_packages";

fn map_package(row: &Row) -> rusqlite::Result<TourPackage> {
    Ok(TourPackage {
        id: uuid_col(row, 0)?,
        guide_id: uuid_col(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        location: row.get(4)?,
        price: row.get(5)?,
        duration_days: row.get(6)?,
        max_people: row.get(7)?,
        image_url: row.get(8)?,
        active: row.get(9)?,
        created_at: ts_col(row, 10)?,
    })
}
