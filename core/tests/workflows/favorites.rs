// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Favorite space workflow tests.

use std::collections::BTreeSet;

use booksync_core::FavoritesConfig;
use booksync_r25::Document;

use crate::common::{DRY_RUN, Harness, SPACE_KNE_130, SPACE_KNE_225, UPDATE, test_config, test_remote};

const SEARCH: &str = r#"<r25:space_searches xmlns:r25="http://www.collegenet.com/r25">
  <r25:search status="est">
    <r25:query_id>1234</r25:query_id>
    <r25:step status="est">
      <r25:step_type_id>1</r25:step_type_id>
      <r25:step_param status="est"><r25:step_param_nbr>0</r25:step_param_nbr><r25:space_id>100</r25:space_id></r25:step_param>
      <r25:step_param status="est"><r25:step_param_nbr>3</r25:step_param_nbr><r25:space_id>200</r25:space_id></r25:step_param>
    </r25:step>
  </r25:search>
</r25:space_searches>"#;

fn search_spaces(doc: &Document) -> BTreeSet<u64> {
    let step = doc.descend(doc.root(), &["search", "step"]).unwrap();
    doc.children_named(step, "step_param")
        .into_iter()
        .filter_map(|p| doc.child_text(p, "space_id"))
        .map(|t| t.parse().unwrap())
        .collect()
}

#[tokio::test]
async fn favorites_follow_mapped_spaces() {
    // Arrange
    let h = Harness::new().await;
    h.remote.seed_favorites(&[SPACE_KNE_225, 999]);

    // Act
    h.run(UPDATE).await;

    // Assert
    assert_eq!(
        h.remote.favorite_ids(),
        BTreeSet::from([SPACE_KNE_225, SPACE_KNE_130])
    );
}

#[tokio::test]
async fn favorites_untouched_in_dry_run() {
    // Arrange
    let h = Harness::new().await;
    h.remote.seed_favorites(&[999]);

    // Act
    h.run(DRY_RUN).await;

    // Assert
    assert_eq!(h.remote.favorite_ids(), BTreeSet::from([999]));
}

#[tokio::test]
async fn favorites_can_be_disabled() {
    // Arrange
    let mut config = test_config();
    config.sync.favorites = FavoritesConfig::None;
    let h = Harness::with(config, test_remote()).await;
    h.remote.seed_favorites(&[999]);

    // Act
    h.run(UPDATE).await;

    // Assert
    assert_eq!(h.remote.favorite_ids(), BTreeSet::from([999]));
}

#[tokio::test]
async fn saved_search_follows_mapped_spaces() {
    // Arrange
    let mut config = test_config();
    config.sync.favorites = FavoritesConfig::SavedSearch { query_id: 1234 };
    let h = Harness::with(config, test_remote()).await;
    h.remote.seed_space_search(SEARCH);

    // Act
    let result = h.run(UPDATE).await;

    // Assert
    assert!(result.report.is_empty());
    let doc = h.remote.space_search().unwrap();
    assert_eq!(
        search_spaces(&doc),
        BTreeSet::from([SPACE_KNE_225, SPACE_KNE_130])
    );

    let step = doc.descend(doc.root(), &["search", "step"]).unwrap();
    let numbers: Vec<_> = doc
        .children_named(step, "step_param")
        .into_iter()
        .filter_map(|p| doc.child_text(p, "step_param_nbr"))
        .collect();
    assert_eq!(numbers, ["0", "4"]);
}

#[tokio::test]
async fn saved_search_untouched_in_dry_run() {
    // Arrange
    let mut config = test_config();
    config.sync.favorites = FavoritesConfig::SavedSearch { query_id: 1234 };
    let h = Harness::with(config, test_remote()).await;
    h.remote.seed_space_search(SEARCH);

    // Act
    h.run(DRY_RUN).await;

    // Assert
    let doc = h.remote.space_search().unwrap();
    assert_eq!(search_spaces(&doc), BTreeSet::from([100, 200]));
}
