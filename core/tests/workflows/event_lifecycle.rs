// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Event lifecycle workflow tests.
//!
//! Creation, idempotent reruns, updates, cancellation, deletion and
//! dry runs of booking groups.

use booksync_core::{BookingFilter, EventState, RunMode, RunOptions, WindowEnd};
use booksync_r25::{EventId, SpaceId, state};
use jiff::civil::date;

use crate::common::{
    CANCELLED, DRY_RUN, FakeRemote, Harness, INTERNAL_HOLD, KNE_130, TENTATIVE, UPDATE, booking,
    event_xml, week, zoned,
};

const FIRST_EVENT: EventId = EventId::new(5_550_001);

fn event_text(remote: &FakeRemote, event_id: EventId, name: &str) -> Option<String> {
    let doc = remote.event(event_id)?;
    let event = doc.child(doc.root(), "event")?;
    doc.child_text(event, name).map(ToString::to_string)
}

#[tokio::test]
async fn new_group_creates_event() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7)]);

    // Act
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.created, 1);
    assert_eq!(result.summary.submissions, 1);
    assert_eq!(h.remote.blanks(), 1);

    let r = &h.remote;
    assert_eq!(event_text(r, FIRST_EVENT, "event_name").as_deref(), Some("7_CHEMISTRY SEMINAR"));
    assert_eq!(event_text(r, FIRST_EVENT, "event_title").as_deref(), Some("Chemistry Seminar"));
    assert_eq!(event_text(r, FIRST_EVENT, "alien_uid").as_deref(), Some("BKS_RSRV_7"));
    assert_eq!(event_text(r, FIRST_EVENT, "start_date").as_deref(), Some("2024-01-10"));
    assert_eq!(event_text(r, FIRST_EVENT, "event_type_id").as_deref(), Some("433"));
    assert_eq!(
        event_text(r, FIRST_EVENT, "state").as_deref(),
        Some(EventState::Confirmed.code())
    );

    let summaries = h.remote.summaries();
    assert_eq!(summaries.len(), 1);
    let reservation = &summaries[0].reservations[0];
    assert_eq!(reservation.profile_name.as_deref(), Some("BKS_BOOK_42"));
    assert_eq!(reservation.space_id, Some(SpaceId::new(100)));
    assert_eq!(reservation.state.as_deref(), Some(state::RESERVATION_STANDARD));

    // Nothing to report
    assert!(result.report.is_empty());
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn rerun_without_changes_submits_nothing() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7), booking(43, 7).room(KNE_130, "KNE 130")]);
    h.run(UPDATE).await;
    assert_eq!(h.remote.submissions(), 1);

    // Act
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.unchanged, 1);
    assert_eq!(result.summary.submissions, 0);
    assert_eq!(h.remote.submissions(), 1);
    assert_eq!(h.remote.blanks(), 1);
}

#[tokio::test]
async fn title_case_change_is_not_a_change() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7)]);
    h.run(UPDATE).await;

    // Act
    h.bookings(vec![booking(42, 7).name("CHEMISTRY SEMINAR")]);
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.unchanged, 1);
    assert_eq!(h.remote.submissions(), 1);
}

#[tokio::test]
async fn setup_time_widens_reservation() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7)]);
    h.run(UPDATE).await;

    // Act
    h.bookings(vec![booking(42, 7).setup(30).teardown(15)]);
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.updated, 1);
    let reservation = &h.remote.summaries()[0].reservations[0];
    assert_eq!(reservation.start.as_deref(), Some("2024-01-10T08:30:00-08:00"));
    assert_eq!(reservation.end.as_deref(), Some("2024-01-10T10:15:00-08:00"));

    let doc = h.remote.event(FIRST_EVENT).unwrap();
    let profile = doc.descend(doc.root(), &["event", "profile"]).unwrap();
    let setup = doc.descend(profile, &["setup_profile", "setup_tm"]).unwrap();
    assert_eq!(doc.text(setup), Some("PT30M"));

    // Act - setup removed again
    h.bookings(vec![booking(42, 7)]);
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.updated, 1);
    let doc = h.remote.event(FIRST_EVENT).unwrap();
    let profile = doc.descend(doc.root(), &["event", "profile"]).unwrap();
    assert!(doc.child(profile, "setup_profile").is_none());
    assert!(doc.child(profile, "takedown_profile").is_none());
}

#[tokio::test]
async fn room_move_replaces_space() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7)]);
    h.run(UPDATE).await;

    // Act
    h.bookings(vec![booking(42, 7).room(KNE_130, "KNE 130")]);
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.updated, 1);
    let summaries = h.remote.summaries();
    assert_eq!(summaries[0].reservations.len(), 1);
    assert_eq!(summaries[0].reservations[0].space_id, Some(SpaceId::new(110)));
}

#[tokio::test]
async fn seeded_event_is_adopted() {
    // Arrange - an event created earlier, holding the wrong space
    let h = Harness::new().await;
    let id = h.remote.seed_event(&event_xml(
        777,
        "7_CHEMISTRY SEMINAR",
        &[("BKS_BOOK_42", 8001, Some(110))],
    ));
    h.bookings(vec![booking(42, 7)]);

    // Act
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.updated, 1);
    assert_eq!(h.remote.blanks(), 0);
    let summaries = h.remote.summaries();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].event_id, id);
    let reservation = &summaries[0].reservations[0];
    assert_eq!(reservation.reservation_id.get(), 8001);
    assert_eq!(reservation.space_id, Some(SpaceId::new(100)));
}

#[tokio::test]
async fn cancelled_booking_cancels_event() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7)]);
    h.run(UPDATE).await;

    // Act
    h.bookings(vec![booking(42, 7).status(CANCELLED)]);
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.updated, 1);
    assert_eq!(
        event_text(&h.remote, FIRST_EVENT, "state").as_deref(),
        Some(EventState::Cancelled.code())
    );
    let reservation = &h.remote.summaries()[0].reservations[0];
    assert_eq!(reservation.state.as_deref(), Some(state::RESERVATION_CANCELLED));
    assert_eq!(reservation.space_id, None);

    // Act - cancelled again changes nothing
    let result = h.run(UPDATE).await;
    assert_eq!(result.summary.unchanged, 1);
}

#[tokio::test]
async fn cancelled_booking_keeps_group_event_confirmed() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7), booking(43, 7).room(KNE_130, "KNE 130")]);
    h.run(UPDATE).await;

    // Act
    h.bookings(vec![
        booking(42, 7),
        booking(43, 7).room(KNE_130, "KNE 130").status(TENTATIVE),
    ]);
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.updated, 1);
    assert_eq!(
        event_text(&h.remote, FIRST_EVENT, "state").as_deref(),
        Some(EventState::Confirmed.code())
    );

    let summary = &h.remote.summaries()[0];
    let state_of = |name: &str| {
        summary
            .reservations
            .iter()
            .find(|r| r.profile_name.as_deref() == Some(name))
            .and_then(|r| r.state.clone())
    };
    assert_eq!(state_of("BKS_BOOK_42").as_deref(), Some(state::RESERVATION_STANDARD));
    assert_eq!(state_of("BKS_BOOK_43").as_deref(), Some(state::RESERVATION_CANCELLED));
}

#[tokio::test]
async fn unwanted_group_is_never_created() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![
        booking(42, 7).status(CANCELLED),
        booking(43, 7).status(TENTATIVE),
    ]);

    // Act
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.skipped, 1);
    assert_eq!(h.remote.blanks(), 0);
    assert!(h.remote.summaries().is_empty());
}

#[tokio::test]
async fn ignored_status_is_not_requested() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7).status(INTERNAL_HOLD), booking(43, 8)]);

    // Act
    let result = h.run(UPDATE).await;

    // Assert
    let query = h.source.last_query().unwrap();
    assert!(!query.status_ids.contains(&INTERNAL_HOLD));
    assert_eq!(query.status_ids, vec![1, 2, 3, 5]);
    assert_eq!(result.summary.groups, 1);
    assert_eq!(result.summary.created, 1);
}

#[tokio::test]
async fn window_starts_at_local_midnight() {
    // Arrange
    let h = Harness::new().await;

    // Act
    h.run(DRY_RUN).await;

    // Assert
    let query = h.source.last_query().unwrap();
    assert_eq!(query.start, zoned("2024-01-08T00:00:00-08:00"));
    assert_eq!(query.end, Some(zoned("2024-01-15T00:00:00-08:00")));
    assert_eq!(query.filter, BookingFilter::All);
}

#[tokio::test]
async fn unbounded_window_reaches_far_bookings() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![
        booking(42, 7).times("2030-06-01T09:00:00-07:00", "2030-06-01T10:00:00-07:00"),
    ]);
    let options = RunOptions {
        end: WindowEnd::Unbounded,
        ..week(UPDATE)
    };

    // Act
    let result = h.try_run(&options).await.unwrap();

    // Assert
    assert_eq!(h.source.last_query().unwrap().end, None);
    assert_eq!(result.summary.created, 1);
    assert_eq!(
        event_text(&h.remote, FIRST_EVENT, "start_date").as_deref(),
        Some("2030-06-01")
    );
}

#[tokio::test]
async fn single_booking_filter_touches_one_group() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7), booking(43, 8), booking(44, 8)]);
    let options = RunOptions {
        filter: BookingFilter::Booking(43),
        ..week(UPDATE)
    };

    // Act
    let result = h.try_run(&options).await.unwrap();

    // Assert
    assert_eq!(result.summary.groups, 1);
    let summaries = h.remote.summaries();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].name.starts_with("8_"));
    assert_eq!(summaries[0].reservations.len(), 1);
}

#[tokio::test]
async fn partial_run_keeps_event_date_range() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![
        booking(42, 7),
        booking(43, 7).times("2024-01-12T09:00:00-08:00", "2024-01-12T10:00:00-08:00"),
    ]);
    h.run(UPDATE).await;
    let options = RunOptions {
        filter: BookingFilter::Booking(42),
        ..week(UPDATE)
    };

    // Act
    let result = h.try_run(&options).await.unwrap();

    // Assert
    assert_eq!(result.summary.unchanged, 1);
    assert_eq!(
        event_text(&h.remote, FIRST_EVENT, "start_date").as_deref(),
        Some("2024-01-10")
    );
    assert_eq!(
        event_text(&h.remote, FIRST_EVENT, "end_date").as_deref(),
        Some("2024-01-12")
    );
    assert_eq!(h.remote.summaries()[0].reservations.len(), 2);
}

#[tokio::test]
async fn event_type_follows_first_kept_booking() {
    // Arrange - the tentative booking maps to type 500 but stays out of R25
    let h = Harness::new().await;
    h.bookings(vec![booking(41, 7).status(TENTATIVE), booking(42, 7)]);

    // Act
    let result = h.run(UPDATE).await;

    // Assert
    assert_eq!(result.summary.created, 1);
    assert_eq!(
        event_text(&h.remote, FIRST_EVENT, "event_type_id").as_deref(),
        Some("433")
    );
}

#[tokio::test]
async fn changed_since_filter_skips_stale_bookings() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![
        booking(42, 7).changed("2024-01-01T12:00:00-08:00"),
        booking(43, 8).changed("2024-01-05T12:00:00-08:00"),
        booking(44, 9),
    ]);
    let options = RunOptions {
        filter: BookingFilter::ChangedSince(date(2024, 1, 3)),
        ..week(UPDATE)
    };

    // Act
    let result = h.try_run(&options).await.unwrap();

    // Assert
    assert_eq!(result.summary.groups, 1);
    assert!(h.remote.summaries()[0].name.starts_with("8_"));
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7), booking(43, 8).room(13, "Offsite Hall")]);

    // Act
    let result = h.run(DRY_RUN).await;

    // Assert
    assert_eq!(result.summary.skipped, 2);
    assert_eq!(result.summary.submissions, 0);
    assert_eq!(h.remote.blanks(), 0);
    assert!(h.remote.favorite_ids().is_empty());
    // reported, never sent
    assert!(!result.report.is_empty());
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn dry_run_leaves_existing_event() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7)]);
    h.run(UPDATE).await;

    // Act
    h.bookings(vec![booking(42, 7).setup(30)]);
    let result = h.run(DRY_RUN).await;

    // Assert
    assert_eq!(result.summary.skipped, 1);
    assert_eq!(h.remote.submissions(), 1);
    let reservation = &h.remote.summaries()[0].reservations[0];
    assert_eq!(reservation.start.as_deref(), Some("2024-01-10T09:00:00-08:00"));
}

#[tokio::test]
async fn delete_mode_removes_event() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7)]);
    h.run(UPDATE).await;

    // Act - without update nothing is deleted
    let dry = RunMode {
        delete: true,
        update: false,
    };
    let result = h.run(dry).await;

    // Assert
    assert_eq!(result.summary.skipped, 1);
    assert!(h.remote.deleted().is_empty());

    // Act
    let delete = RunMode {
        delete: true,
        update: true,
    };
    let result = h.run(delete).await;

    // Assert
    assert_eq!(result.summary.deleted, 1);
    assert_eq!(h.remote.deleted(), vec![FIRST_EVENT.get()]);
    assert!(h.remote.summaries().is_empty());
    assert_eq!(h.remote.submissions(), 1);
}

#[tokio::test]
async fn delete_mode_without_event_is_skipped() {
    // Arrange
    let h = Harness::new().await;
    h.bookings(vec![booking(42, 7)]);

    // Act
    let result = h
        .run(RunMode {
            delete: true,
            update: true,
        })
        .await;

    // Assert
    assert_eq!(result.summary.skipped, 1);
    assert_eq!(h.remote.blanks(), 0);
}
