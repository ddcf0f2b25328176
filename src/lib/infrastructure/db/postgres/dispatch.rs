//! Postgres implementation of the dispatch storage traits

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{query, query_as, FromRow};

use crate::{
    domain::dispatch::{
        errors::{FetchMessagesError, MarkSentError},
        parse_addresses, MessageRepository, PendingMessage, RecordType, StatusCommitter,
        FETCH_LIMIT,
    },
    infrastructure::db::postgres::PostgresDatabase,
};

const OCCURRED_ON_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, FromRow)]
struct PendingMessageRecord {
    id: i64,
    transaction_number: String,
    rule_id: String,
    occurred_on: String,
    to_addresses: Option<String>,
    bcc_addresses: Option<String>,
    subject: String,
    body_html: String,
    record_type: String,
    sent_at: Option<DateTime<Utc>>,
    comment: String,
}

impl TryFrom<PendingMessageRecord> for PendingMessage {
    type Error = FetchMessagesError;

    fn try_from(record: PendingMessageRecord) -> Result<Self, Self::Error> {
        Ok(PendingMessage {
            id: record.id,
            transaction_number: record.transaction_number,
            rule_id: record.rule_id,
            occurred_at: record.occurred_on,
            subject: record.subject,
            body_html: record.body_html,
            status: record.record_type.parse()?,
            comment: record.comment,
            to_addresses: parse_addresses(record.to_addresses.as_deref()),
            bcc_addresses: parse_addresses(record.bcc_addresses.as_deref()),
            sent_at: record.sent_at,
        })
    }
}

#[async_trait]
impl MessageRepository for PostgresDatabase {
    #[mutants::skip]
    async fn generate_pending(&self) -> Result<(), FetchMessagesError> {
        query("CALL dispatch.generate_pending_emails()")
            .execute(&self.pool)
            .await
            .map_err(|err| {
                FetchMessagesError::GenerateFailed(anyhow!(
                    "failed to execute generate_pending_emails: {:?}",
                    err
                ))
            })?;

        Ok(())
    }

    #[mutants::skip]
    async fn list_eligible(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<PendingMessage>, FetchMessagesError> {
        let records = query_as::<_, PendingMessageRecord>(
            r#"
            SELECT
                id,
                transaction_number,
                rule_id,
                occurred_on,
                to_addresses,
                bcc_addresses,
                subject,
                body_html,
                record_type,
                sent_at,
                comment
            FROM dispatch.outbound_emails
            WHERE record_type = $1
              AND occurred_on = $2
              AND to_addresses IS NOT NULL
            ORDER BY id ASC
            LIMIT $3
            "#,
        )
        .bind(RecordType::Add.as_str())
        .bind(day.format(OCCURRED_ON_FORMAT).to_string())
        .bind(FETCH_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            FetchMessagesError::QueryFailed(anyhow!("failed to query outbound_emails: {:?}", err))
        })?;

        records.into_iter().map(PendingMessage::try_from).collect()
    }

    #[mutants::skip]
    async fn ping(&self) -> Result<(), FetchMessagesError> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|err| FetchMessagesError::Unavailable(err.into()))?;

        Ok(())
    }
}

#[async_trait]
impl StatusCommitter for PostgresDatabase {
    #[mutants::skip]
    async fn mark_sent(&self, transaction_number: &str) -> Result<(), MarkSentError> {
        query("CALL dispatch.mark_email_sent($1)")
            .bind(transaction_number)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
