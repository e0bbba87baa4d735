// Generation credit ledger: gating, charging and history

use chrono::NaiveDate;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use uuid::Uuid;

use crate::models::generation::{GenerationRecord, MediaKind, NewGenerationRecord};
use crate::models::subscription::{Subscription, SubscriptionError};
use crate::models::user::{DailySlot, User, UserError};
use crate::utils::ServiceError;

/// Cost of one image generation, in cents
pub const IMAGE_COST_CENTS: i64 = 100;
/// Cost of one video generation, in cents
pub const VIDEO_COST_CENTS: i64 = 200;
/// Free image generations per calendar day for regular users
pub const DAILY_FREE_IMAGES: i32 = 20;
/// Videos have no free tier
pub const DAILY_FREE_VIDEOS: i32 = 0;

pub fn cost_cents(kind: MediaKind) -> i64 {
    match kind {
        MediaKind::Image => IMAGE_COST_CENTS,
        MediaKind::Video => VIDEO_COST_CENTS,
    }
}

pub fn daily_free_limit(kind: MediaKind) -> i32 {
    match kind {
        MediaKind::Image => DAILY_FREE_IMAGES,
        MediaKind::Video => DAILY_FREE_VIDEOS,
    }
}

/// Where the charge for a generation lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeSource {
    /// Admins generate without charge or quota
    Unlimited,
    /// Covered by today's free quota
    DailyFree,
    /// Debited from the active subscription's credit balance
    Credit { cost_cents: i64 },
}

impl ChargeSource {
    pub fn charged_cents(&self) -> i64 {
        match self {
            ChargeSource::Credit { cost_cents } => *cost_cents,
            _ => 0,
        }
    }
}

/// Advisory gate decision, computed from a snapshot before the upstream call.
/// The settle step re-checks everything atomically; this only exists to fail
/// fast without burning an upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow(ChargeSource),
    DenyNoSubscription,
    DenyInsufficientCredit,
}

/// Pure gate: role, remaining free slots and subscription snapshot in,
/// decision out.
pub fn decide(
    is_admin: bool,
    kind: MediaKind,
    remaining_free_slots: i32,
    active_credit_cents: Option<i64>,
) -> GateDecision {
    if is_admin {
        return GateDecision::Allow(ChargeSource::Unlimited);
    }

    if remaining_free_slots > 0 {
        return GateDecision::Allow(ChargeSource::DailyFree);
    }

    let cost = cost_cents(kind);
    match active_credit_cents {
        None => GateDecision::DenyNoSubscription,
        Some(balance) if balance < cost => GateDecision::DenyInsufficientCredit,
        Some(_) => GateDecision::Allow(ChargeSource::Credit { cost_cents: cost }),
    }
}

/// Charges generations and appends history rows
#[derive(Debug, Clone, Default)]
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        LedgerService
    }

    /// Preflight gate from current state. Advisory only; settle re-checks.
    pub async fn preflight(
        &self,
        conn: &mut AsyncPgConnection,
        user: &User,
        kind: MediaKind,
        today: NaiveDate,
    ) -> Result<GateDecision, ServiceError> {
        if user.is_admin() {
            return Ok(GateDecision::Allow(ChargeSource::Unlimited));
        }

        Subscription::expire_lapsed(conn, user.id)
            .await
            .map_err(map_sub_err)?;
        let sub = Subscription::find_active_for_user(conn, user.id)
            .await
            .map_err(map_sub_err)?;

        let remaining = user.remaining_daily_slots(today, daily_free_limit(kind));
        Ok(decide(false, kind, remaining, sub.map(|s| s.credit_cents)))
    }

    /// Charge for a completed generation and append its history row, in one
    /// transaction. The charge itself is a conditional UPDATE, so concurrent
    /// settlements for the same user serialize on the row and the losing
    /// request gets a refusal instead of a negative balance or an
    /// over-limit counter.
    pub async fn settle(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        is_admin: bool,
        kind: MediaKind,
        prompt: &str,
        payload: &str,
        today: NaiveDate,
    ) -> Result<(ChargeSource, GenerationRecord), ServiceError> {
        let prompt = prompt.to_string();
        let payload = payload.to_string();

        conn.transaction::<_, ServiceError, _>(|conn| {
            async move {
                let source = if is_admin {
                    ChargeSource::Unlimited
                } else {
                    Self::charge(conn, user_id, kind, today).await?
                };

                let record = GenerationRecord::create(
                    conn,
                    NewGenerationRecord {
                        user_id,
                        media_kind: kind.as_str().to_string(),
                        prompt,
                        payload,
                        cost_cents: source.charged_cents(),
                    },
                )
                .await?;

                Ok((source, record))
            }
            .scope_boxed()
        })
        .await
    }

    /// Free quota first, then credit. Both paths decide by affected rows.
    async fn charge(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        kind: MediaKind,
        today: NaiveDate,
    ) -> Result<ChargeSource, ServiceError> {
        let free_limit = daily_free_limit(kind);
        if free_limit > 0 {
            match User::reserve_daily_slot(conn, user_id, today, free_limit).await {
                Ok(DailySlot::Consumed) => return Ok(ChargeSource::DailyFree),
                Ok(DailySlot::Exhausted) => {},
                Err(UserError::Database(e)) => return Err(e.into()),
                Err(UserError::NotFound) => return Err(ServiceError::NotFound),
                Err(e) => return Err(ServiceError::DatabaseError(e.to_string())),
            }
        }

        let cost = cost_cents(kind);
        let sub = Subscription::try_debit(conn, user_id, cost)
            .await
            .map_err(map_sub_err)?;

        tracing::debug!(
            user_id = %user_id,
            cost_cents = cost,
            balance_cents = sub.credit_cents,
            "Debited generation from subscription credit"
        );

        Ok(ChargeSource::Credit { cost_cents: cost })
    }
}

fn map_sub_err(e: SubscriptionError) -> ServiceError {
    match e {
        SubscriptionError::NoActive => ServiceError::NoSubscription,
        SubscriptionError::InsufficientCredit => ServiceError::InsufficientCredit,
        SubscriptionError::AlreadyActive => {
            ServiceError::ValidationError("already subscribed".to_string())
        },
        SubscriptionError::Database(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_is_unlimited() {
        // Admins bypass quota and credit entirely, even with no subscription
        assert_eq!(
            decide(true, MediaKind::Video, 0, None),
            GateDecision::Allow(ChargeSource::Unlimited)
        );
    }

    #[test]
    fn test_free_quota_covers_images() {
        assert_eq!(
            decide(false, MediaKind::Image, 5, None),
            GateDecision::Allow(ChargeSource::DailyFree)
        );
        // Free quota wins even when credit is available
        assert_eq!(
            decide(false, MediaKind::Image, 1, Some(10_000)),
            GateDecision::Allow(ChargeSource::DailyFree)
        );
    }

    #[test]
    fn test_exhausted_quota_falls_through_to_credit() {
        assert_eq!(
            decide(false, MediaKind::Image, 0, Some(500)),
            GateDecision::Allow(ChargeSource::Credit {
                cost_cents: IMAGE_COST_CENTS
            })
        );
    }

    #[test]
    fn test_no_subscription_refused() {
        assert_eq!(
            decide(false, MediaKind::Image, 0, None),
            GateDecision::DenyNoSubscription
        );
        // Videos have no free tier, so fresh users are refused outright
        assert_eq!(
            decide(false, MediaKind::Video, daily_free_limit(MediaKind::Video), None),
            GateDecision::DenyNoSubscription
        );
    }

    #[test]
    fn test_insufficient_credit_refused() {
        assert_eq!(
            decide(false, MediaKind::Image, 0, Some(99)),
            GateDecision::DenyInsufficientCredit
        );
        // Exact balance is enough
        assert_eq!(
            decide(false, MediaKind::Video, 0, Some(VIDEO_COST_CENTS)),
            GateDecision::Allow(ChargeSource::Credit {
                cost_cents: VIDEO_COST_CENTS
            })
        );
    }

    #[test]
    fn test_charged_cents() {
        assert_eq!(ChargeSource::Unlimited.charged_cents(), 0);
        assert_eq!(ChargeSource::DailyFree.charged_cents(), 0);
        assert_eq!(ChargeSource::Credit { cost_cents: 200 }.charged_cents(), 200);
    }
}
