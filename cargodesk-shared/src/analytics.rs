/// Organization analytics report
///
/// Totals are always computed live from `cargo_requests`; nothing is stored.
/// The report has two parts:
///
/// - **Grand totals**: sum of `amount` and number of cargo requests of the
///   organization, whatever their status
/// - **Monthly breakdown**: one entry per (driver, logistician, month, year)
///   of `created_at` in UTC, ordered by year then month
///
/// Amounts are `NUMERIC` in PostgreSQL and [`Decimal`] here, so sums are
/// exact. The database does the grouping; [`assemble_report`] turns the
/// groups into the response shape and derives the grand totals from them.
///
/// # Example
///
/// ```no_run
/// use cargodesk_shared::analytics::organization_report;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, organization_id: Uuid) -> Result<(), sqlx::Error> {
/// if let Some(report) = organization_report(&pool, organization_id).await? {
///     println!("{} cargos worth {}", report.organization.total_cargos, report.organization.total_amount);
/// }
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::organization::Organization;
use crate::models::user::User;

/// Name shown for a participant whose user no longer exists
pub const UNKNOWN_PARTICIPANT: &str = "Unknown";

/// One (driver, logistician, month, year) group as returned by the database
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct MonthlyGroup {
    pub driver_id: Uuid,
    pub logistician_id: Uuid,
    pub month: i32,
    pub year: i32,
    pub total_amount: Decimal,
    pub total_cargos: i64,
}

/// Report header: the organization and its grand totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub total_amount: Decimal,
    pub total_cargos: i64,
}

/// Driver or logistician of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// `None` when the user could not be found
    pub id: Option<Uuid>,
    pub name: String,
}

impl Participant {
    fn resolve(id: Uuid, names: &HashMap<Uuid, String>) -> Self {
        match names.get(&id) {
            Some(name) => Participant {
                id: Some(id),
                name: name.clone(),
            },
            None => Participant {
                id: None,
                name: UNKNOWN_PARTICIPANT.to_string(),
            },
        }
    }
}

/// One entry of the monthly breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEntry {
    pub month: i32,
    pub year: i32,
    pub driver: Participant,
    pub logistician: Participant,
    pub total_amount: Decimal,
    pub total_cargos: i64,
}

/// The full analytics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub organization: OrganizationSummary,
    pub monthly_data: Vec<MonthlyEntry>,
}

/// Groups the cargo requests of an organization
///
/// Ordered by year and month; groups within a month are ordered by driver
/// and logistician ID so the output is stable.
pub async fn monthly_groups(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<MonthlyGroup>, sqlx::Error> {
    sqlx::query_as::<_, MonthlyGroup>(
        r#"
        SELECT driver_id,
               logistician_id,
               EXTRACT(MONTH FROM created_at AT TIME ZONE 'UTC')::INT AS month,
               EXTRACT(YEAR FROM created_at AT TIME ZONE 'UTC')::INT AS year,
               SUM(amount) AS total_amount,
               COUNT(*) AS total_cargos
        FROM cargo_requests
        WHERE organization_id = $1
        GROUP BY driver_id, logistician_id, year, month
        ORDER BY year, month, driver_id, logistician_id
        "#,
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

/// Builds the report from database groups
///
/// `names` maps user IDs to display names; IDs missing from it become
/// [`UNKNOWN_PARTICIPANT`]. Grand totals are the exact sum of the groups,
/// which partition the organization's cargo requests.
pub fn assemble_report(
    organization: &Organization,
    mut groups: Vec<MonthlyGroup>,
    names: &HashMap<Uuid, String>,
) -> AnalyticsReport {
    groups.sort_by_key(|group| (group.year, group.month));

    let total_amount = groups
        .iter()
        .fold(Decimal::new(0, 2), |sum, group| sum + group.total_amount);
    let total_cargos = groups.iter().map(|group| group.total_cargos).sum();

    let monthly_data = groups
        .into_iter()
        .map(|group| MonthlyEntry {
            month: group.month,
            year: group.year,
            driver: Participant::resolve(group.driver_id, names),
            logistician: Participant::resolve(group.logistician_id, names),
            total_amount: group.total_amount,
            total_cargos: group.total_cargos,
        })
        .collect();

    AnalyticsReport {
        organization: OrganizationSummary {
            id: organization.id,
            name: organization.name.clone(),
            total_amount,
            total_cargos,
        },
        monthly_data,
    }
}

/// Computes the analytics report of an organization
///
/// # Returns
///
/// The report, or `None` if the organization doesn't exist
pub async fn organization_report(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Option<AnalyticsReport>, sqlx::Error> {
    let Some(organization) = Organization::find_by_id(pool, organization_id).await? else {
        return Ok(None);
    };

    let groups = monthly_groups(pool, organization_id).await?;

    let mut participant_ids: Vec<Uuid> = groups
        .iter()
        .flat_map(|group| [group.driver_id, group.logistician_id])
        .collect();
    participant_ids.sort_unstable();
    participant_ids.dedup();

    let names = User::display_names(pool, &participant_ids).await?;

    tracing::debug!(
        organization_id = %organization_id,
        groups = groups.len(),
        "Analytics report computed"
    );

    Ok(Some(assemble_report(&organization, groups, &names)))
}
