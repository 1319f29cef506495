//! Reimbursement request repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, info};

use crate::models::{
    NewRequest, ReimbursementRequest, RequestId, RequestStatus, StatusFilter, UserId,
};
use crate::repositories::{RequestRecord, RequestStore};

const REQUEST_COLUMNS: &str = "request_id, submitter_id, resolver_id, amount_cents, category, \
                               description, time_submitted, time_resolved, status";

/// Request repository backed by PostgreSQL
#[derive(Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    /// Create a new request repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for RequestRepository {
    async fn add_request(&self, request: &NewRequest) -> DatabaseResult<RequestId> {
        info!("Creating request for submitter: {}", request.submitter_id);

        let row = sqlx::query(
            r#"
            INSERT INTO requests (submitter_id, amount_cents, category, description, time_submitted, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING request_id
            "#,
        )
        .bind(request.submitter_id)
        .bind(request.amount_cents)
        .bind(&request.category)
        .bind(&request.description)
        .bind(request.time_submitted)
        .bind(RequestStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.try_get("request_id")?),
            None => Err(DatabaseError::NoIdentity("requests")),
        }
    }

    async fn resolve_request(
        &self,
        resolver_id: UserId,
        request_id: RequestId,
        status: RequestStatus,
        resolved_at: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        info!("Resolving request {} as {}", request_id, status);

        let result = sqlx::query(
            r#"
            UPDATE requests
            SET status = $1, resolver_id = $2, time_resolved = $3
            WHERE request_id = $4 AND status = $5
            "#,
        )
        .bind(status.as_str())
        .bind(resolver_id)
        .bind(resolved_at)
        .bind(request_id)
        .bind(RequestStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_request(
        &self,
        request_id: RequestId,
    ) -> DatabaseResult<Option<ReimbursementRequest>> {
        info!("Finding request by ID: {}", request_id);

        let record = sqlx::query_as::<_, RequestRecord>(&format!(
            "SELECT {} FROM requests WHERE request_id = $1",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        record.map(RequestRecord::into_request).transpose()
    }

    async fn query_requests(
        &self,
        submitter_id: Option<UserId>,
        filter: StatusFilter,
    ) -> DatabaseResult<Vec<ReimbursementRequest>> {
        debug!(
            "Querying {:?} requests{}",
            filter,
            if submitter_id.is_some() {
                " belonging to one user"
            } else {
                ""
            }
        );

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM requests WHERE TRUE", REQUEST_COLUMNS));

        if let Some(submitter_id) = submitter_id {
            builder.push(" AND submitter_id = ").push_bind(submitter_id);
        }

        match filter {
            StatusFilter::All => {}
            StatusFilter::Pending => {
                builder
                    .push(" AND status = ")
                    .push_bind(RequestStatus::Pending.as_str());
            }
            StatusFilter::Resolved => {
                builder
                    .push(" AND status IN (")
                    .push_bind(RequestStatus::Approved.as_str())
                    .push(", ")
                    .push_bind(RequestStatus::Denied.as_str())
                    .push(")");
            }
        }

        builder.push(" ORDER BY time_submitted DESC, request_id DESC");

        let records = builder
            .build_query_as::<RequestRecord>()
            .fetch_all(&self.pool)
            .await?;

        records.into_iter().map(RequestRecord::into_request).collect()
    }
}
