//! Donation projects and donations.

use super::{format_time, parse_time, Database};
use crate::error::{FolioError, Result};
use crate::models::{
    Currency, Donation, DonationForm, DonationProject, DonationStatus, DonationTotals,
    NewDonationProject,
};
use crate::validation::normalize_email;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

const DONATION_PROJECT_SELECT: &str = "SELECT p.id, p.title, p.description, p.goal_amount, \
     p.currency, p.is_active, p.is_featured, p.created_at, \
     COALESCE((SELECT SUM(d.amount) FROM donations d \
               WHERE d.project_id = p.id AND d.status = 'completed'), 0) \
     FROM donation_projects p";

const DONATION_COLUMNS: &str = "id, project_id, donor_name, donor_email, amount, currency, \
     message, is_anonymous, status, reference, created_at";

fn row_to_donation_project(row: &Row<'_>) -> rusqlite::Result<DonationProject> {
    let currency: String = row.get(4)?;
    let created_at: String = row.get(7)?;
    Ok(DonationProject {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        goal_amount: row.get(3)?,
        currency: Currency::parse_or_default(&currency),
        is_active: row.get(5)?,
        is_featured: row.get(6)?,
        created_at: parse_time(&created_at),
        raised_amount: row.get(8)?,
    })
}

fn row_to_donation(row: &Row<'_>) -> rusqlite::Result<Donation> {
    let currency: String = row.get(5)?;
    let status: String = row.get(8)?;
    let created_at: String = row.get(10)?;
    Ok(Donation {
        id: row.get(0)?,
        project_id: row.get(1)?,
        donor_name: row.get(2)?,
        donor_email: row.get(3)?,
        amount: row.get(4)?,
        currency: Currency::parse_or_default(&currency),
        message: row.get(6)?,
        is_anonymous: row.get(7)?,
        status: DonationStatus::parse(&status).unwrap_or(DonationStatus::Pending),
        reference: row.get(9)?,
        created_at: parse_time(&created_at),
    })
}

fn select_donation(conn: &Connection, id: i64) -> Result<Donation> {
    conn.query_row(
        &format!("SELECT {} FROM donations WHERE id = ?1", DONATION_COLUMNS),
        params![id],
        row_to_donation,
    )
    .optional()?
    .ok_or(FolioError::NotFound {
        entity: "donation",
        id,
    })
}

impl Database {
    /// Donation projects, featured first. `active_only` hides retired ones.
    pub fn list_donation_projects(&self, active_only: bool) -> Result<Vec<DonationProject>> {
        let filter = if active_only { "WHERE p.is_active = 1" } else { "" };
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} {} ORDER BY p.is_featured DESC, p.created_at DESC, p.id DESC",
            DONATION_PROJECT_SELECT, filter
        ))?;
        let rows = stmt
            .query_map([], row_to_donation_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_donation_project(&self, id: i64) -> Result<DonationProject> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("{} WHERE p.id = ?1", DONATION_PROJECT_SELECT),
            params![id],
            row_to_donation_project,
        )
        .optional()?
        .ok_or(FolioError::NotFound {
            entity: "donation project",
            id,
        })
    }

    pub fn create_donation_project(&self, new: NewDonationProject) -> Result<DonationProject> {
        crate::validation::require_text("title", &new.title, 200)?;
        if !new.goal_amount.is_finite() || new.goal_amount < 0.0 {
            return Err(FolioError::validation("goal_amount", "goal must be a positive amount"));
        }
        let id = {
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO donation_projects (title, description, goal_amount, currency,
                     is_active, is_featured, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6)",
                params![
                    new.title.trim(),
                    new.description,
                    new.goal_amount,
                    new.currency.as_str(),
                    new.is_featured,
                    format_time(Utc::now()),
                ],
            )?;
            conn.last_insert_rowid()
        };
        self.get_donation_project(id)
    }

    /// Record a pending donation against an active project.
    pub fn create_donation(&self, project_id: i64, form: &DonationForm) -> Result<Donation> {
        form.validate()?;
        let donation = self.transaction(|tx| {
            let active: Option<bool> = tx
                .query_row(
                    "SELECT is_active FROM donation_projects WHERE id = ?1",
                    params![project_id],
                    |row| row.get(0),
                )
                .optional()?;
            if active != Some(true) {
                return Err(FolioError::NotFound {
                    entity: "donation project",
                    id: project_id,
                });
            }

            tx.execute(
                &format!(
                    "INSERT INTO donations ({}) VALUES (NULL, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    DONATION_COLUMNS
                ),
                params![
                    project_id,
                    form.donor_name.trim(),
                    normalize_email(&form.donor_email),
                    form.amount,
                    form.currency().as_str(),
                    form.message.as_deref().map(str::trim).filter(|m| !m.is_empty()),
                    form.is_anonymous,
                    DonationStatus::Pending.as_str(),
                    Uuid::new_v4().to_string(),
                    format_time(Utc::now()),
                ],
            )?;
            select_donation(tx, tx.last_insert_rowid())
        })?;

        info!(
            "Recorded pending donation {} of {} {} for project {}",
            donation.reference,
            donation.amount,
            donation.currency.as_str(),
            project_id
        );
        Ok(donation)
    }

    pub fn get_donation(&self, id: i64) -> Result<Donation> {
        let conn = self.lock()?;
        select_donation(&conn, id)
    }

    /// Donations for a project, newest first.
    pub fn donations_for_project(
        &self,
        project_id: i64,
        completed_only: bool,
        limit: usize,
    ) -> Result<Vec<Donation>> {
        let status_filter = if completed_only {
            "AND status = 'completed'"
        } else {
            ""
        };
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM donations WHERE project_id = ?1 {}
             ORDER BY created_at DESC, id DESC LIMIT ?2",
            DONATION_COLUMNS, status_filter
        ))?;
        let rows = stmt
            .query_map(params![project_id, limit as i64], row_to_donation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Completed donations across all projects, newest first.
    pub fn recent_completed_donations(&self, limit: usize) -> Result<Vec<Donation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM donations WHERE status = 'completed'
             ORDER BY created_at DESC, id DESC LIMIT ?1",
            DONATION_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit as i64], row_to_donation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Mark a pending donation as completed.
    pub fn complete_donation(&self, id: i64) -> Result<Donation> {
        let donation = self.transaction(|tx| {
            let donation = select_donation(tx, id)?;
            if donation.status != DonationStatus::Pending {
                return Err(FolioError::Conflict(format!(
                    "donation {} is already {}",
                    id,
                    donation.status.as_str()
                )));
            }
            tx.execute(
                "UPDATE donations SET status = ?1 WHERE id = ?2",
                params![DonationStatus::Completed.as_str(), id],
            )?;
            select_donation(tx, id)
        })?;
        info!("Donation {} marked completed", donation.reference);
        Ok(donation)
    }

    pub fn donation_totals(&self) -> Result<DonationTotals> {
        let conn = self.lock()?;
        Ok(conn.query_row(
            "SELECT
                 COALESCE(SUM(CASE WHEN currency = 'NPR' THEN amount END), 0),
                 COALESCE(SUM(CASE WHEN currency = 'USD' THEN amount END), 0),
                 COUNT(DISTINCT donor_email)
             FROM donations WHERE status = 'completed'",
            [],
            |row| {
                Ok(DonationTotals {
                    total_npr: row.get(0)?,
                    total_usd: row.get(1)?,
                    supporter_count: row.get(2)?,
                })
            },
        )?)
    }
}
