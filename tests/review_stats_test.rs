// Review aggregation tests

use encore_backend::models::review::ReviewStats;

#[test]
fn zero_reviews_yields_zero_average() {
    let stats = ReviewStats::from_ratings(42, &[]);
    assert_eq!(stats.content_id, 42);
    assert_eq!(stats.review_count, 0);
    assert_eq!(stats.average_rating, 0.0);
}

#[test]
fn average_rounds_half_up_to_one_decimal() {
    // 11 / 3 = 3.666... -> 3.7
    assert_eq!(ReviewStats::from_ratings(1, &[5, 5, 1]).average_rating, 3.7);
    // 10 / 3 = 3.333... -> 3.3
    assert_eq!(ReviewStats::from_ratings(1, &[4, 3, 3]).average_rating, 3.3);
    // 13 / 4 = 3.25 -> rounds up, not to even
    assert_eq!(
        ReviewStats::from_ratings(1, &[5, 4, 3, 1]).average_rating,
        3.3
    );
    // 7 / 2 = 3.5 exactly
    assert_eq!(ReviewStats::from_ratings(1, &[4, 3]).average_rating, 3.5);
}

#[test]
fn extreme_ratings_stay_in_range() {
    assert_eq!(ReviewStats::from_ratings(1, &[1, 1, 1]).average_rating, 1.0);
    assert_eq!(ReviewStats::from_ratings(1, &[5, 5, 5]).average_rating, 5.0);
}

#[test]
fn count_matches_input_length() {
    let ratings: Vec<i32> = (0..250).map(|i| 1 + (i % 5)).collect();
    let stats = ReviewStats::from_ratings(7, &ratings);
    assert_eq!(stats.review_count, 250);
    assert_eq!(stats.average_rating, 3.0);
    assert_eq!(stats.star_counts, [50, 50, 50, 50, 50]);
}

#[test]
fn star_buckets_count_each_rating() {
    let stats = ReviewStats::from_ratings(3, &[5, 5, 1, 3, 3, 3]);
    assert_eq!(stats.star_counts, [1, 0, 3, 0, 2]);
    assert_eq!(stats.review_count, 6);
}
