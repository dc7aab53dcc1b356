mod common;

use common::*;
use mjscore::error::{Error, ErrorKind};
use mjscore::models::{AccessLevel, ResourceRef, ResourceType, TableKind};
use mjscore::service::{GroupForm, TableForm, TournamentForm};
use mjscore::store::Store;

#[test]
fn edit_key_round_trip() {
    let club = Club::new();
    let id = club.tournament.id;

    let granted = club.service.tournament(&club.tournament_edit, id).unwrap();
    assert_eq!(granted.resource.id, id);
    assert_eq!(granted.access_level, AccessLevel::Edit);

    let form = TournamentForm {
        name: "Renamed".to_string(),
        ..Default::default()
    };
    assert_eq!(
        club.service
            .update_tournament(&club.tournament_view, id, &form)
            .unwrap_err(),
        Error::InsufficientAccess {
            required: AccessLevel::Edit,
            granted: AccessLevel::View,
        }
    );
    let updated = club
        .service
        .update_tournament(&club.tournament_edit, id, &form)
        .unwrap();
    assert_eq!(updated.resource.name, "Renamed");
    // omitted fields are left alone
    assert_eq!(updated.resource.rate, Some(1.0));
    assert_eq!(updated.resource.started_at, club.tournament.started_at);
}

#[test]
fn tournament_update_keeps_omitted_fields() {
    let club = Club::new();
    let id = club.tournament.id;
    let update = |description: Option<&str>| {
        club.service
            .update_tournament(
                &club.tournament_edit,
                id,
                &TournamentForm {
                    name: "May league".to_string(),
                    description: description.map(str::to_string),
                    ..Default::default()
                },
            )
            .unwrap()
            .resource
    };

    assert_eq!(update(Some("spring")).description.as_deref(), Some("spring"));
    let kept = update(None);
    assert_eq!(kept.description.as_deref(), Some("spring"));
    assert_eq!(kept.rate, Some(1.0));
    assert_eq!(update(Some("  ")).description, None);
}

#[test]
fn group_key_reaches_descendants_capped_at_edit() {
    let club = Club::new();
    let game = club.play(&[20, -5, -5, -10]);

    let table = club.service.table(&club.group_owner, club.table.id).unwrap();
    assert_eq!(table.access_level, AccessLevel::Edit);
    let game = club.service.game(&club.group_view, game).unwrap();
    assert_eq!(game.access_level, AccessLevel::View);

    assert_eq!(
        club.service
            .group(&club.group_owner, club.group.id)
            .unwrap()
            .access_level,
        AccessLevel::Owner
    );
    assert_eq!(
        club.service
            .delete_group(&club.group_edit, club.group.id)
            .unwrap_err(),
        Error::InsufficientAccess {
            required: AccessLevel::Owner,
            granted: AccessLevel::Edit,
        }
    );
}

#[test]
fn group_key_stays_inside_its_group() {
    let club = Club::new();
    let other = club
        .service
        .create_group(
            &GroupForm {
                name: "Elsewhere".to_string(),
                description: None,
            },
            None,
        )
        .unwrap();
    let other_owner = key_at(&other.links, AccessLevel::Owner);

    assert_eq!(
        club.service.table(&other_owner, club.table.id).unwrap_err(),
        Error::ResourceMismatch(ResourceRef::Table(club.table.id))
    );
    assert_eq!(
        club.service.group(&other_owner, club.group.id).unwrap_err(),
        Error::ResourceMismatch(ResourceRef::Group(club.group.id))
    );
}

#[test]
fn tournament_key_cannot_read_a_table_directly() {
    let club = Club::new();
    let err = club
        .service
        .table(&club.tournament_view, club.table.id)
        .unwrap_err();
    assert_eq!(
        err,
        Error::LinkMismatch {
            expected: ResourceType::Table,
            found: ResourceType::Tournament,
        }
    );
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[test]
fn parent_key_reaches_only_immediate_children() {
    let club = Club::new();
    let game = club.play(&[20, -5, -5, -10]);

    // a table key may read the games of its own table
    assert_eq!(
        club.service
            .game(&club.table_view, game)
            .unwrap()
            .resource
            .game
            .table_id,
        club.table.id
    );
    // but a tournament key does not reach its grandchildren
    assert_eq!(
        club.service.game(&club.tournament_edit, game).unwrap_err(),
        Error::LinkMismatch {
            expected: ResourceType::Game,
            found: ResourceType::Tournament,
        }
    );
}

#[test]
fn tournament_key_deletes_its_tables() {
    let club = Club::new();
    let before = club.service.store().share_link_count();
    club.play(&[20, -5, -5, -10]);

    club.service
        .delete_table(&club.tournament_edit, club.table.id)
        .unwrap();
    // table links and the game's links are gone, nothing else
    assert_eq!(club.service.store().share_link_count(), before - 2);
    assert_eq!(
        club.service.table(&club.table_view, club.table.id).unwrap_err(),
        Error::LinkInvalid
    );
    let remaining = club
        .service
        .tables(&club.tournament_view, club.tournament.id)
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, club.chip_table.id);
}

#[test]
fn sibling_tournament_key_cannot_delete_table() {
    let club = Club::new();
    let other = club
        .service
        .create_tournament(
            &club.group_edit,
            club.group.id,
            &TournamentForm {
                name: "June league".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
    let other_edit = key_at(&other.links, AccessLevel::Edit);

    assert_eq!(
        club.service
            .delete_table(&other_edit, club.table.id)
            .unwrap_err(),
        Error::ResourceMismatch(ResourceRef::Table(club.table.id))
    );
}

#[test]
fn table_key_is_bound_to_its_table() {
    let club = Club::new();
    assert_eq!(
        club.service
            .table(&club.table_view, club.chip_table.id)
            .unwrap_err(),
        Error::ResourceMismatch(ResourceRef::Table(club.chip_table.id))
    );
    assert_eq!(
        club.service.table(&club.table_view, 9999).unwrap_err(),
        Error::ResourceMismatch(ResourceRef::Table(9999))
    );
}

#[test]
fn outsiders_cannot_tell_real_ids_from_missing_ones() {
    let club = Club::new();
    let game = club.play(&[20, -5, -5, -10]);
    let other = club
        .service
        .create_group(
            &GroupForm {
                name: "Elsewhere".to_string(),
                description: None,
            },
            None,
        )
        .unwrap();
    let outsider = key_at(&other.links, AccessLevel::View);

    for id in &[club.table.id, 9999] {
        assert_eq!(
            club.service.table(&outsider, *id).unwrap_err(),
            Error::ResourceMismatch(ResourceRef::Table(*id))
        );
    }
    for id in &[club.tournament.id, 9999] {
        assert_eq!(
            club.service.tournament(&outsider, *id).unwrap_err(),
            Error::ResourceMismatch(ResourceRef::Tournament(*id))
        );
    }
    for id in &[game, 9999] {
        assert_eq!(
            club.service.game(&outsider, *id).unwrap_err(),
            Error::ResourceMismatch(ResourceRef::Game(*id))
        );
        // parent keys of another branch learn nothing either
        assert_eq!(
            club.service.game(&club.chip_edit, *id).unwrap_err(),
            Error::ResourceMismatch(ResourceRef::Game(*id))
        );
    }
    for id in &[club.players[0].id, 9999] {
        assert_eq!(
            club.service.player(&outsider, *id).unwrap_err(),
            Error::NoSuchPlayer(*id)
        );
    }
    assert_eq!(
        club.service
            .player(&club.group_view, club.players[0].id)
            .unwrap()
            .resource,
        club.players[0]
    );
}

#[test]
fn missing_row_is_reported_to_its_own_key() {
    let club = Club::new();
    // drop the row but keep its links
    club.service.store().delete_tables(&[club.table.id]).unwrap();
    assert_eq!(
        club.service.table(&club.table_view, club.table.id).unwrap_err(),
        Error::NoSuchResource(ResourceRef::Table(club.table.id))
    );
}

#[test]
fn unknown_keys_are_invalid() {
    let club = Club::new();
    for key in &["", "nope", "ABCDEFGHJKMN", "abcdefghjkmn"] {
        let err = club.service.group(key, club.group.id).unwrap_err();
        assert_eq!(err, Error::LinkInvalid);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[test]
fn open_reports_the_issued_resource() {
    let club = Club::new();
    let opened = club.service.open(&club.chip_edit).unwrap();
    assert_eq!(opened.resource, ResourceRef::Table(club.chip_table.id));
    assert_eq!(opened.access_level, AccessLevel::Edit);
    assert_eq!(
        serde_json::to_value(&opened).unwrap(),
        serde_json::json!({
            "type": "table",
            "id": club.chip_table.id,
            "access_level": "EDIT",
        })
    );
}

#[test]
fn open_as_checks_the_key_type() {
    let club = Club::new();
    let opened = club
        .service
        .open_as(&club.tournament_view, ResourceType::Tournament)
        .unwrap();
    assert_eq!(opened.resource.id(), club.tournament.id);
    assert_eq!(
        club.service
            .open_as(&club.tournament_view, ResourceType::Group)
            .unwrap_err(),
        Error::LinkMismatch {
            expected: ResourceType::Group,
            found: ResourceType::Tournament,
        }
    );
}

#[test]
fn links_are_filtered_by_level() {
    let club = Club::new();

    let seen = club.service.links(&club.group_view).unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].short_key, club.group_view);

    let all = club.service.links(&club.group_owner).unwrap();
    let levels: Vec<_> = all.iter().map(|l| l.access_level).collect();
    assert_eq!(
        levels,
        vec![AccessLevel::Owner, AccessLevel::Edit, AccessLevel::View]
    );

    assert_eq!(club.service.links(&club.table_edit).unwrap().len(), 2);
}

#[test]
fn only_the_owner_renames_a_group() {
    let club = Club::new();
    let form = GroupForm {
        name: "Friday club".to_string(),
        description: Some("moved".to_string()),
    };
    assert!(club
        .service
        .update_group(&club.group_edit, club.group.id, &form)
        .is_err());
    let renamed = club
        .service
        .update_group(&club.group_owner, club.group.id, &form)
        .unwrap();
    assert_eq!(renamed.resource.name, "Friday club");
    assert!(renamed.resource.last_updated_at >= club.group.last_updated_at);
}

#[test]
fn deleting_a_group_releases_every_link() {
    let club = Club::new();
    club.play(&[20, -5, -5, -10]);
    club.play(&[15, -5, -5, -5]);
    assert!(club.service.store().share_link_count() > 0);

    club.service
        .delete_group(&club.group_owner, club.group.id)
        .unwrap();
    assert_eq!(club.service.store().share_link_count(), 0);
    assert_eq!(
        club.service
            .group(&club.group_owner, club.group.id)
            .unwrap_err(),
        Error::LinkInvalid
    );
}

#[test]
fn failed_creation_leaves_nothing_behind() {
    let club = Club::new();
    let before = club.service.store().share_link_count();
    let err = club
        .service
        .create_table(
            &club.tournament_edit,
            club.tournament.id,
            &TableForm {
                name: "   ".to_string(),
                kind: TableKind::Normal,
            },
        )
        .unwrap_err();
    assert_eq!(err, Error::MissingField("name"));
    assert_eq!(club.service.store().share_link_count(), before);
}
