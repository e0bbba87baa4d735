// Charge gating policy tests
//
// These exercise the pure decision layer of the credit ledger; the atomic
// database paths carry the same rules in their UPDATE predicates.

use encore_backend::models::generation::MediaKind;
use encore_backend::services::ledger::{
    decide, ChargeSource, GateDecision, DAILY_FREE_IMAGES, DAILY_FREE_VIDEOS, IMAGE_COST_CENTS,
    VIDEO_COST_CENTS,
};

#[test]
fn admin_bypasses_quota_and_credit() {
    for kind in [MediaKind::Image, MediaKind::Video] {
        assert_eq!(
            decide(true, kind, 0, None),
            GateDecision::Allow(ChargeSource::Unlimited)
        );
        assert_eq!(
            decide(true, kind, 0, Some(0)),
            GateDecision::Allow(ChargeSource::Unlimited)
        );
    }
}

#[test]
fn free_quota_takes_precedence_over_credit() {
    assert_eq!(
        decide(false, MediaKind::Image, DAILY_FREE_IMAGES, Some(100_000)),
        GateDecision::Allow(ChargeSource::DailyFree)
    );
}

#[test]
fn last_free_slot_is_still_free() {
    assert_eq!(
        decide(false, MediaKind::Image, 1, None),
        GateDecision::Allow(ChargeSource::DailyFree)
    );
}

#[test]
fn exhausted_quota_without_subscription_is_refused_as_no_subscription() {
    assert_eq!(
        decide(false, MediaKind::Image, 0, None),
        GateDecision::DenyNoSubscription
    );
}

#[test]
fn exhausted_quota_with_short_balance_is_refused_as_insufficient() {
    assert_eq!(
        decide(false, MediaKind::Image, 0, Some(IMAGE_COST_CENTS - 1)),
        GateDecision::DenyInsufficientCredit
    );
    assert_eq!(
        decide(false, MediaKind::Video, 0, Some(VIDEO_COST_CENTS - 1)),
        GateDecision::DenyInsufficientCredit
    );
}

#[test]
fn exact_balance_covers_the_charge() {
    assert_eq!(
        decide(false, MediaKind::Image, 0, Some(IMAGE_COST_CENTS)),
        GateDecision::Allow(ChargeSource::Credit {
            cost_cents: IMAGE_COST_CENTS
        })
    );
}

#[test]
fn videos_have_no_free_tier() {
    assert_eq!(DAILY_FREE_VIDEOS, 0);
    // A fresh user with no subscription cannot generate video at all
    assert_eq!(
        decide(false, MediaKind::Video, DAILY_FREE_VIDEOS, None),
        GateDecision::DenyNoSubscription
    );
    // With enough credit the video charge is twice the image charge
    assert_eq!(
        decide(false, MediaKind::Video, 0, Some(VIDEO_COST_CENTS)),
        GateDecision::Allow(ChargeSource::Credit {
            cost_cents: VIDEO_COST_CENTS
        })
    );
    assert_eq!(VIDEO_COST_CENTS, 2 * IMAGE_COST_CENTS);
}

#[test]
fn charge_amounts_only_come_from_credit() {
    assert_eq!(ChargeSource::Unlimited.charged_cents(), 0);
    assert_eq!(ChargeSource::DailyFree.charged_cents(), 0);
    assert_eq!(
        ChargeSource::Credit {
            cost_cents: VIDEO_COST_CENTS
        }
        .charged_cents(),
        VIDEO_COST_CENTS
    );
}
