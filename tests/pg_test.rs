//! Runs against a throwaway postgres database when DATABASE_TEST_BASE_URL and
//! DATABASE_TEST_DEFAULT_URL are set, and is skipped otherwise. Needs the
//! `test-util` feature: `cargo test --features test-util`.

mod common;

use common::*;
use mjscore::error::Error;
use mjscore::keys::ScriptedKeys;
use mjscore::models::{AccessLevel, Player, TableKind};
use mjscore::service::{GroupForm, PlayerForm, Service, TableForm, TournamentForm};

macro_rules! pg_context {
    () => {
        match PgTestContext::from_env() {
            Some(ctx) => ctx,
            None => {
                eprintln!("DATABASE_TEST_BASE_URL not set, skipping postgres test");
                return;
            }
        }
    };
}

#[test]
fn postgres_scoring_round_trip() {
    let ctx = pg_context!();
    let keys = ScriptedKeys::new(vec!["AAAAAAAAAAAA", "AAAAAAAAAAAA", "BBBBBBBBBBBB"]).unwrap();
    let service = Service::new(ctx.db()).with_keys(keys);

    // the second mint collides and is retried inside the same transaction
    let group = service
        .create_group(
            &GroupForm {
                name: "Thursday club".to_string(),
                description: Some("weekly".to_string()),
            },
            Some("alice"),
        )
        .unwrap();
    assert_eq!(key_at(&group.links, AccessLevel::Owner), "AAAAAAAAAAAA");
    assert_eq!(key_at(&group.links, AccessLevel::Edit), "BBBBBBBBBBBB");
    let owner = key_at(&group.links, AccessLevel::Owner);
    let group_id = group.resource.id;

    let tournament = service
        .create_tournament(
            &owner,
            group_id,
            &TournamentForm {
                name: "May league".to_string(),
                rate: Some(0.5),
                started_at: Some(day(2025, 5, 10)),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(tournament.resource.created_by, "alice");
    let tournament_edit = key_at(&tournament.links, AccessLevel::Edit);
    let table = service
        .create_table(
            &tournament_edit,
            tournament.resource.id,
            &TableForm {
                name: "A".to_string(),
                kind: TableKind::Normal,
            },
        )
        .unwrap();
    let table_edit = key_at(&table.links, AccessLevel::Edit);

    let players: Vec<Player> = (1..=4)
        .map(|i| {
            service
                .create_player(
                    &owner,
                    group_id,
                    &PlayerForm {
                        name: format!("P{}", i),
                        nickname: None,
                        display_order: Some(5 - i),
                    },
                )
                .unwrap()
        })
        .collect();
    let ids: Vec<i32> = players.iter().map(|p| p.id).collect();
    service
        .register_participants(&tournament_edit, tournament.resource.id, &ids)
        .unwrap();

    // a rejected game leaves neither rows nor a consumed index behind
    assert_eq!(
        service
            .record_game(
                &table_edit,
                table.resource.id,
                &game_form(vec![score(&players[0], 10, 1), score(&players[1], -9, 2)]),
            )
            .unwrap_err(),
        Error::ScoresNotZeroSum(1)
    );
    let first = service
        .record_game(
            &table_edit,
            table.resource.id,
            &game_form(ranked(&players, &[20, -5, -5, -10])),
        )
        .unwrap();
    assert_eq!(first.resource.game.game_index, 1);
    let second = service
        .record_game(
            &tournament_edit,
            table.resource.id,
            &game_form(ranked(&players, &[15, -5, -5, -5])),
        )
        .unwrap();
    assert_eq!(second.resource.game.game_index, 2);

    let map = service
        .score_map(&tournament_edit, tournament.resource.id)
        .unwrap();
    // display order reverses creation order
    let totals: Vec<(String, i64, f64)> = map
        .players
        .iter()
        .map(|p| (p.name.clone(), p.total, p.converted_total))
        .collect();
    assert_eq!(
        totals,
        vec![
            ("P4".to_string(), -15, -7.5),
            ("P3".to_string(), -10, -5.0),
            ("P2".to_string(), -10, -5.0),
            ("P1".to_string(), 35, 17.5),
        ]
    );

    service
        .delete_game(&table_edit, second.resource.game.id)
        .unwrap();
    let third = service
        .record_game(
            &table_edit,
            table.resource.id,
            &game_form(ranked(&players, &[10, 0, 0, -10])),
        )
        .unwrap();
    assert_eq!(third.resource.game.game_index, 3);

    let stats = service
        .player_stats(&owner, group_id, Some("2025-05-01"), Some("2025-05-31"))
        .unwrap();
    let p1 = stats.players.iter().find(|s| s.player_id == ids[0]).unwrap();
    assert_eq!(p1.game_count, 2);
    assert_eq!(p1.total_score, 30);

    service.delete_group(&owner, group_id).unwrap();
    assert_eq!(service.open(&owner).unwrap_err(), Error::LinkInvalid);
    assert_eq!(service.open(&table_edit).unwrap_err(), Error::LinkInvalid);
}
