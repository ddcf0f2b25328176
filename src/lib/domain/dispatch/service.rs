//! Dispatch service

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

#[cfg(test)]
use mockall::mock;

use crate::domain::{
    communication::mailer::{Mailer, OutboundEmail},
    dispatch::{
        errors::{DispatchError, FetchMessagesError},
        EmailBuilder, MessageRepository, PendingMessage, StatusCommitter,
    },
};

/// Outcome of a successful dispatch cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Messages fetched from storage
    pub fetched: usize,

    /// Emails handed to the mail transport
    pub sent: usize,

    /// Messages acknowledged as sent
    pub committed: usize,
}

/// Dispatch service
#[async_trait]
pub trait DispatchService: Clone + Send + Sync + 'static {
    /// Runs one fetch, build, send and acknowledge cycle.
    ///
    /// Cycles never overlap: a call made while another cycle is running
    /// waits for it to finish.
    ///
    /// # Returns
    /// - [`Ok`] with a [`CycleReport`] if every fetched message was sent and acknowledged.
    /// - [`Err`] containing a [`DispatchError`] describing the phase that failed.
    async fn run_cycle(&self) -> Result<CycleReport, DispatchError>;

    /// Lists the messages that are currently eligible for dispatch without
    /// generating new ones or sending anything.
    async fn list_pending(&self) -> Result<Vec<PendingMessage>, FetchMessagesError>;

    /// Checks that the backing store is reachable
    async fn check_storage(&self) -> Result<(), FetchMessagesError>;
}

#[cfg(test)]
mock! {
    pub DispatchService {}

    impl Clone for DispatchService {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl DispatchService for DispatchService {
        async fn run_cycle(&self) -> Result<CycleReport, DispatchError>;
        async fn list_pending(&self) -> Result<Vec<PendingMessage>, FetchMessagesError>;
        async fn check_storage(&self) -> Result<(), FetchMessagesError>;
    }
}

/// Dispatch service implementation
#[derive(Debug, Clone)]
pub struct DispatchServiceImpl<R, C, M>
where
    R: MessageRepository,
    C: StatusCommitter,
    M: Mailer,
{
    repository: Arc<R>,
    committer: Arc<C>,
    mailer: Arc<M>,
    builder: EmailBuilder,
    run_lock: Arc<Mutex<()>>,
}

impl<R, C, M> DispatchServiceImpl<R, C, M>
where
    R: MessageRepository,
    C: StatusCommitter,
    M: Mailer,
{
    /// Creates a new dispatch service.
    ///
    /// Clones share the same run lock.
    pub fn new(repository: Arc<R>, committer: Arc<C>, mailer: Arc<M>, builder: EmailBuilder) -> Self {
        Self {
            repository,
            committer,
            mailer,
            builder,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn trigger_and_fetch(&self) -> Result<Vec<PendingMessage>, FetchMessagesError> {
        self.repository.generate_pending().await?;
        self.repository
            .list_eligible(Local::now().date_naive())
            .await
    }
}

#[async_trait]
impl<R, C, M> DispatchService for DispatchServiceImpl<R, C, M>
where
    R: MessageRepository,
    C: StatusCommitter,
    M: Mailer,
{
    async fn run_cycle(&self) -> Result<CycleReport, DispatchError> {
        let _running = self.run_lock.lock().await;

        debug!("starting dispatch cycle");

        let messages = match self.trigger_and_fetch().await {
            Ok(messages) => messages,
            Err(err) => {
                error!(error = %err, "failed to list mail messages");
                return Err(err.into());
            }
        };

        if messages.is_empty() {
            info!("no messages to send");
            return Ok(CycleReport::default());
        }

        let emails: Vec<OutboundEmail> = messages
            .iter()
            .map(|message| self.builder.build(message))
            .collect();

        if let Err(err) = self.mailer.send_batch(&emails).await {
            error!(error = %err, count = emails.len(), "failed to send emails");
            return Err(err.into());
        }

        let mut committed = 0;

        for message in &messages {
            if let Err(source) = self.committer.mark_sent(&message.transaction_number).await {
                error!(
                    error = %source,
                    transaction_number = %message.transaction_number,
                    committed,
                    "failed to mark message as sent"
                );

                return Err(DispatchError::Commit {
                    transaction_number: message.transaction_number.clone(),
                    committed,
                    source,
                });
            }

            committed += 1;
        }

        info!(count = committed, "mails sent successfully");

        Ok(CycleReport {
            fetched: messages.len(),
            sent: emails.len(),
            committed,
        })
    }

    async fn list_pending(&self) -> Result<Vec<PendingMessage>, FetchMessagesError> {
        debug!("listing pending messages");

        self.repository
            .list_eligible(Local::now().date_naive())
            .await
    }

    async fn check_storage(&self) -> Result<(), FetchMessagesError> {
        self.repository.ping().await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use anyhow::anyhow;
    use mockall::Sequence;
    use testresult::TestResult;

    use crate::domain::{
        communication::mailer::{tests::MockMailer, MailerError},
        dispatch::{
            errors::MarkSentError,
            tests::{pending_message, MockMessageRepository, MockStatusCommitter},
            HtmlEnvelope,
        },
    };

    use super::*;

    fn builder() -> EmailBuilder {
        EmailBuilder::new("sender@example.com", HtmlEnvelope::default())
    }

    fn repository_returning(messages: Vec<PendingMessage>) -> MockMessageRepository {
        let mut repository = MockMessageRepository::new();

        repository
            .expect_generate_pending()
            .returning(|| Ok(()));

        repository
            .expect_list_eligible()
            .returning(move |_| Ok(messages.clone()));

        repository
    }

    fn expect_commits_in_order(committer: &mut MockStatusCommitter, transaction_numbers: &[&str]) {
        let mut seq = Sequence::new();

        for transaction_number in transaction_numbers {
            let expected = transaction_number.to_string();

            committer
                .expect_mark_sent()
                .times(1)
                .in_sequence(&mut seq)
                .withf(move |txn| txn == expected)
                .returning(|_| Ok(()));
        }
    }

    #[tokio::test]
    async fn test_run_cycle_without_messages_has_no_side_effects() -> TestResult {
        let mut mailer = MockMailer::new();
        let mut committer = MockStatusCommitter::new();

        mailer.expect_send_batch().times(0);
        committer.expect_mark_sent().times(0);

        let service = DispatchServiceImpl::new(
            Arc::new(repository_returning(vec![])),
            Arc::new(committer),
            Arc::new(mailer),
            builder(),
        );

        let report = service.run_cycle().await?;

        assert_eq!(report, CycleReport::default());

        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_sends_and_commits_in_fetch_order() -> TestResult {
        let messages = vec![pending_message(1), pending_message(2), pending_message(3)];

        let mut mailer = MockMailer::new();
        let mut committer = MockStatusCommitter::new();

        mailer
            .expect_send_batch()
            .times(1)
            .withf(|emails| {
                emails.len() == 3
                    && emails[0].subject == "Subject 1"
                    && emails[1].subject == "Subject 2"
                    && emails[2].subject == "Subject 3"
            })
            .returning(|_| Ok(()));

        expect_commits_in_order(&mut committer, &["TXN-1", "TXN-2", "TXN-3"]);

        let service = DispatchServiceImpl::new(
            Arc::new(repository_returning(messages)),
            Arc::new(committer),
            Arc::new(mailer),
            builder(),
        );

        let report = service.run_cycle().await?;

        assert_eq!(
            report,
            CycleReport {
                fetched: 3,
                sent: 3,
                committed: 3
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_builds_emails_from_messages() -> TestResult {
        let mut message = pending_message(1);
        message.to_addresses = vec!["a@x".to_string(), "b@x".to_string()];
        message.bcc_addresses = vec!["c@x".to_string()];

        let expected = builder().build(&message);

        let mut mailer = MockMailer::new();
        let mut committer = MockStatusCommitter::new();

        mailer
            .expect_send_batch()
            .times(1)
            .withf(move |emails| emails.len() == 1 && emails[0] == expected)
            .returning(|_| Ok(()));

        committer.expect_mark_sent().times(1).returning(|_| Ok(()));

        let service = DispatchServiceImpl::new(
            Arc::new(repository_returning(vec![message])),
            Arc::new(committer),
            Arc::new(mailer),
            builder(),
        );

        service.run_cycle().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_send_failure_commits_nothing() -> TestResult {
        let messages = vec![pending_message(1), pending_message(2), pending_message(3)];

        let mut mailer = MockMailer::new();
        let mut committer = MockStatusCommitter::new();

        mailer
            .expect_send_batch()
            .times(1)
            .returning(|_| Err(MailerError::SendError(anyhow!("relay rejected the batch"))));

        committer.expect_mark_sent().times(0);

        let service = DispatchServiceImpl::new(
            Arc::new(repository_returning(messages)),
            Arc::new(committer),
            Arc::new(mailer),
            builder(),
        );

        let result = service.run_cycle().await;

        assert!(matches!(result, Err(DispatchError::Send(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_resends_after_send_failure() -> TestResult {
        let messages = vec![pending_message(1), pending_message(2), pending_message(3)];

        let mut repository = MockMessageRepository::new();
        let mut mailer = MockMailer::new();
        let mut committer = MockStatusCommitter::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        repository
            .expect_generate_pending()
            .times(2)
            .returning(|| Ok(()));

        repository
            .expect_list_eligible()
            .times(2)
            .returning(move |_| Ok(messages.clone()));

        mailer
            .expect_send_batch()
            .times(2)
            .withf(|emails| emails.len() == 3)
            .returning(move |_| {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(MailerError::SendError(anyhow!("connection refused")))
                } else {
                    Ok(())
                }
            });

        expect_commits_in_order(&mut committer, &["TXN-1", "TXN-2", "TXN-3"]);

        let service = DispatchServiceImpl::new(
            Arc::new(repository),
            Arc::new(committer),
            Arc::new(mailer),
            builder(),
        );

        assert!(service.run_cycle().await.is_err());

        let report = service.run_cycle().await?;

        assert_eq!(report.committed, 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_stops_at_first_commit_failure() -> TestResult {
        let messages = vec![pending_message(1), pending_message(2), pending_message(3)];

        let mut mailer = MockMailer::new();
        let mut committer = MockStatusCommitter::new();
        let mut seq = Sequence::new();

        mailer.expect_send_batch().times(1).returning(|_| Ok(()));

        committer
            .expect_mark_sent()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|txn| txn == "TXN-1")
            .returning(|_| Ok(()));

        committer
            .expect_mark_sent()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|txn| txn == "TXN-2")
            .returning(|_| Err(MarkSentError::UnknownError(anyhow!("connection reset"))));

        committer
            .expect_mark_sent()
            .times(0)
            .withf(|txn| txn == "TXN-3");

        let service = DispatchServiceImpl::new(
            Arc::new(repository_returning(messages)),
            Arc::new(committer),
            Arc::new(mailer),
            builder(),
        );

        let result = service.run_cycle().await;

        match result {
            Err(DispatchError::Commit {
                transaction_number,
                committed,
                ..
            }) => {
                assert_eq!(transaction_number, "TXN-2");
                assert_eq!(committed, 1);
            }
            other => panic!("expected a commit error, got {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_generate_failure_aborts_before_query() -> TestResult {
        let mut repository = MockMessageRepository::new();
        let mut mailer = MockMailer::new();
        let mut committer = MockStatusCommitter::new();

        repository
            .expect_generate_pending()
            .times(1)
            .returning(|| Err(FetchMessagesError::GenerateFailed(anyhow!("timeout"))));

        repository.expect_list_eligible().times(0);
        mailer.expect_send_batch().times(0);
        committer.expect_mark_sent().times(0);

        let service = DispatchServiceImpl::new(
            Arc::new(repository),
            Arc::new(committer),
            Arc::new(mailer),
            builder(),
        );

        let result = service.run_cycle().await;

        assert!(matches!(
            result,
            Err(DispatchError::Fetch(FetchMessagesError::GenerateFailed(_)))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_query_failure_sends_nothing() -> TestResult {
        let mut repository = MockMessageRepository::new();
        let mut mailer = MockMailer::new();

        repository
            .expect_generate_pending()
            .times(1)
            .returning(|| Ok(()));

        repository
            .expect_list_eligible()
            .times(1)
            .returning(|_| Err(FetchMessagesError::QueryFailed(anyhow!("syntax error"))));

        mailer.expect_send_batch().times(0);

        let service = DispatchServiceImpl::new(
            Arc::new(repository),
            Arc::new(MockStatusCommitter::new()),
            Arc::new(mailer),
            builder(),
        );

        assert!(service.run_cycle().await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_run_cycle_queries_today() -> TestResult {
        let mut repository = MockMessageRepository::new();

        repository
            .expect_generate_pending()
            .times(1)
            .returning(|| Ok(()));

        repository
            .expect_list_eligible()
            .times(1)
            .withf(|day| *day == Local::now().date_naive())
            .returning(|_| Ok(vec![]));

        let service = DispatchServiceImpl::new(
            Arc::new(repository),
            Arc::new(MockStatusCommitter::new()),
            Arc::new(MockMailer::new()),
            builder(),
        );

        service.run_cycle().await?;

        Ok(())
    }

    #[derive(Clone, Default)]
    struct SlowMailer {
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Mailer for SlowMailer {
        async fn send_batch(&self, _emails: &[OutboundEmail]) -> Result<(), MailerError> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(20)).await;

            self.active.fetch_sub(1, Ordering::SeqCst);

            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrent_cycles_are_serialised() -> TestResult {
        let mailer = SlowMailer::default();
        let max_active = mailer.max_active.clone();

        let mut committer = MockStatusCommitter::new();
        committer.expect_mark_sent().times(2).returning(|_| Ok(()));

        let service = DispatchServiceImpl::new(
            Arc::new(repository_returning(vec![pending_message(1)])),
            Arc::new(committer),
            Arc::new(mailer),
            builder(),
        );
        let other = service.clone();

        let (first, second) = tokio::join!(service.run_cycle(), other.run_cycle());

        first?;
        second?;

        assert_eq!(max_active.load(Ordering::SeqCst), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_pending_does_not_generate_or_send() -> TestResult {
        let mut repository = MockMessageRepository::new();
        let mut mailer = MockMailer::new();

        repository.expect_generate_pending().times(0);
        repository
            .expect_list_eligible()
            .times(1)
            .returning(|_| Ok(vec![pending_message(1), pending_message(2)]));

        mailer.expect_send_batch().times(0);

        let service = DispatchServiceImpl::new(
            Arc::new(repository),
            Arc::new(MockStatusCommitter::new()),
            Arc::new(mailer),
            builder(),
        );

        let messages = service.list_pending().await?;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_check_storage_reports_unavailable() {
        let mut repository = MockMessageRepository::new();

        repository
            .expect_ping()
            .times(1)
            .returning(|| Err(FetchMessagesError::Unavailable(anyhow!("connection refused"))));

        let service = DispatchServiceImpl::new(
            Arc::new(repository),
            Arc::new(MockStatusCommitter::new()),
            Arc::new(MockMailer::new()),
            builder(),
        );

        assert!(matches!(
            service.check_storage().await,
            Err(FetchMessagesError::Unavailable(_))
        ));
    }
}
