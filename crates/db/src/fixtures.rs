use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Dispatch-related seed rows are pinned to this date so an operator (or
/// a test) can run `dispatch --date 2026-08-07` against a fresh seed.
pub const SEED_DISPATCH_DATE: &str = "2026-08-07";

const SEED_CLIENT_IDS: &[&str] = &["cli-seed-001", "cli-seed-002", "cli-seed-003"];
const SEED_POLICY_IDS: &[&str] = &["pol-seed-001", "pol-seed-002", "pol-seed-003"];
const SEED_RENEWAL_IDS: &[&str] = &["ren-seed-001", "ren-seed-002"];
const SEED_ENTRY_IDS: &[&str] = &["ent-seed-001", "ent-seed-002"];

/// Demo dataset for the back office: three clients (one without a contact
/// e-mail, one with a pinned birthday), policies across payment
/// frequencies, two renewal cycles due on the pinned dispatch date, a
/// pending commission batch with one discrepant entry, and a partner with
/// an open discount code.
pub struct DemoSeedDataset;

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub clients: usize,
    pub policies: usize,
    pub renewals: usize,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub checks: Vec<(&'static str, bool)>,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|(_, ok)| *ok)
    }
}

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        // Raw string execution: the seed file holds multiple statements.
        tx.execute(Self::SQL).await?;
        tx.commit().await?;

        Ok(SeedResult {
            clients: SEED_CLIENT_IDS.len(),
            policies: SEED_POLICY_IDS.len(),
            renewals: SEED_RENEWAL_IDS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let client_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM client WHERE id IN ('cli-seed-001', 'cli-seed-002', 'cli-seed-003')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("clients", client_count == SEED_CLIENT_IDS.len() as i64));

        let missing_email: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM client WHERE id = 'cli-seed-002' AND email IS NULL",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("client-without-email", missing_email == 1));

        let policy_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM policy WHERE id IN ('pol-seed-001', 'pol-seed-002', 'pol-seed-003')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("policies", policy_count == SEED_POLICY_IDS.len() as i64));

        let due_renewals: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM renewal_config
             WHERE scheduled_send_date = ?1 AND status = 'programada' AND sent_at IS NULL",
        )
        .bind(SEED_DISPATCH_DATE)
        .fetch_one(pool)
        .await?;
        checks.push(("due-renewals", due_renewals == SEED_RENEWAL_IDS.len() as i64));

        let pending_entries: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM commission_entry WHERE batch_id = 'bat-seed-001' AND verified = 0",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("pending-entries", pending_entries == SEED_ENTRY_IDS.len() as i64));

        let open_code: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM discount_code WHERE id = 'cod-seed-001' AND redeemed = 0",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("open-discount-code", open_code == 1));

        Ok(VerificationResult { checks })
    }
}
