use std::collections::HashSet;

use tokio_test::{assert_err, assert_ok};

use anime_recs::{
    error::AppError,
    models::{AnimeTitle, CandidateList, Catalog, Channel, DistanceMatrix, Source},
    services::{merger, select_candidates},
};

fn list(channel: Channel, titles: &[&str]) -> CandidateList {
    assert_ok!(CandidateList::new(
        channel,
        titles.iter().map(|t| AnimeTitle::from(*t)).collect()
    ))
}

fn names(titles: &[AnimeTitle]) -> Vec<&str> {
    titles.iter().map(AnimeTitle::as_str).collect()
}

#[test]
fn selected_candidates_feed_the_merge() {
    let catalog = assert_ok!(Catalog::new(["Akira", "Mushishi", "Monster", "Paprika", "Perfect Blue"]));
    let users = vec!["ginko".to_string()];

    let collab = assert_ok!(DistanceMatrix::from_rows(
        &catalog,
        users.clone(),
        vec![vec![0.9, 0.1, 0.4, 0.2, 0.3]],
    ));
    let content = assert_ok!(DistanceMatrix::from_rows(
        &catalog,
        users,
        vec![vec![0.2, 0.0, 0.1, 0.5, 0.3]],
    ));

    let known: HashSet<AnimeTitle> = [AnimeTitle::from("Mushishi")].into_iter().collect();

    let collab_list = assert_ok!(select_candidates(
        Channel::Collaborative,
        "ginko",
        &collab,
        &catalog,
        &known,
        50
    ));
    let content_list = assert_ok!(select_candidates(
        Channel::Content,
        "ginko",
        &content,
        &catalog,
        &known,
        50
    ));

    assert_eq!(
        names(collab_list.titles()),
        vec!["Paprika", "Perfect Blue", "Monster", "Akira"]
    );
    assert_eq!(
        names(content_list.titles()),
        vec!["Monster", "Akira", "Perfect Blue", "Paprika"]
    );

    let recs = assert_ok!(merger::recommend("ginko", &content_list, &collab_list, 1.0, 3));

    // Perfect Blue 9+8, Monster 8+10, Paprika 10+7, Akira 7+9
    assert_eq!(names(&recs.ranked_titles), vec!["Monster", "Paprika", "Perfect Blue"]);
    assert!(recs.table.iter().all(|e| e.source == Source::Both));
    assert!(!recs.ranked_titles.contains(&AnimeTitle::from("Mushishi")));
}

#[test]
fn merge_is_deterministic() {
    let collab = list(Channel::Collaborative, &["A", "B", "C", "D"]);
    let content = list(Channel::Content, &["D", "E", "A", "F"]);

    let first = assert_ok!(merger::recommend("u", &content, &collab, 1.5, 4));
    let second = assert_ok!(merger::recommend("u", &content, &collab, 1.5, 4));
    assert_eq!(first, second);
}

#[test]
fn truncation_follows_table_length() {
    let collab = list(Channel::Collaborative, &["A", "B"]);
    let content = list(Channel::Content, &["A", "C"]);

    let recs = assert_ok!(merger::recommend("u", &content, &collab, 1.0, 10));
    assert_eq!(recs.ranked_titles.len(), recs.table.len().min(10));
    assert_eq!(recs.ranked_titles.len(), 3);
    assert_eq!(recs.warnings.len(), 1);
}

#[test]
fn non_finite_weight_is_rejected() {
    let collab = list(Channel::Collaborative, &["A"]);
    let content = list(Channel::Content, &["B"]);

    let err = assert_err!(merger::recommend("u", &content, &collab, f64::NAN, 5));
    assert!(matches!(err, AppError::InvalidWeight(_)));
}

#[test]
fn cap_limits_candidates_before_filtering() {
    let catalog = assert_ok!(Catalog::new(["A", "B", "C"]));
    let matrix = assert_ok!(DistanceMatrix::from_rows(
        &catalog,
        vec!["u".to_string()],
        vec![vec![0.1, 0.2, 0.3]],
    ));
    let known: HashSet<AnimeTitle> = [AnimeTitle::from("A")].into_iter().collect();

    let candidates = assert_ok!(select_candidates(
        Channel::Content,
        "u",
        &matrix,
        &catalog,
        &known,
        2
    ));
    assert_eq!(names(candidates.titles()), vec!["B"]);
}
