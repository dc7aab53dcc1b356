use crate::error::Error;
use crate::models::{
    Game, Group, GroupId, NewGame, NewGroup, NewTable, NewTournament, ResourceRef, ShareLink,
    Table, TableKind, Tournament,
};
use crate::registry::ShareLinkRegistry;
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A freshly created resource with its default share links
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provisioned<T> {
    #[serde(flatten)]
    pub resource: T,
    pub links: Vec<ShareLink>,
}

/// Reject blank required text
pub fn require_text<'s>(field: &'static str, value: &'s str) -> Result<&'s str, Error> {
    let value = value.trim();
    if value.is_empty() {
        Err(Error::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Creates resources together with their default links, in one transaction.
///
/// Children take their `created_by` from the parent row. That field is only
/// informational; access is decided by share links alone.
pub struct ResourceProvisioner<'a, S: Store> {
    store: &'a S,
    registry: ShareLinkRegistry<'a, S>,
}

impl<'a, S: Store> ResourceProvisioner<'a, S> {
    pub fn new(store: &'a S, registry: ShareLinkRegistry<'a, S>) -> Self {
        ResourceProvisioner { store, registry }
    }

    pub fn create_group(
        &self,
        name: &str,
        description: Option<&str>,
        issuer: &str,
    ) -> Result<Provisioned<Group>, Error> {
        let name = require_text("name", name)?;
        self.store.transaction(|| {
            let now = Utc::now();
            let group = self.store.insert_group(&NewGroup {
                name,
                description,
                created_by: issuer,
                created_at: now,
                last_updated_at: now,
            })?;
            let links = self
                .registry
                .provision_defaults(ResourceRef::Group(group.id), issuer)?;
            tracing::info!(group = group.id, "created group");
            Ok(Provisioned {
                resource: group,
                links,
            })
        })
    }

    pub fn create_tournament(
        &self,
        group: &Group,
        name: &str,
        description: Option<&str>,
        rate: f64,
        started_at: DateTime<Utc>,
    ) -> Result<Provisioned<Tournament>, Error> {
        let name = require_text("name", name)?;
        self.store.transaction(|| {
            let now = Utc::now();
            let tournament = self.store.insert_tournament(&NewTournament {
                group_id: group.id,
                name,
                description,
                rate: Some(rate),
                created_by: &group.created_by,
                started_at,
                created_at: now,
            })?;
            let links = self.registry.provision_defaults(
                ResourceRef::Tournament(tournament.id),
                &tournament.created_by,
            )?;
            self.store.touch_group(group.id, now)?;
            tracing::info!(group = group.id, tournament = tournament.id, "created tournament");
            Ok(Provisioned {
                resource: tournament,
                links,
            })
        })
    }

    pub fn create_table(
        &self,
        tournament: &Tournament,
        name: &str,
        kind: TableKind,
    ) -> Result<Provisioned<Table>, Error> {
        let name = require_text("name", name)?;
        self.store.transaction(|| {
            let now = Utc::now();
            let table = self.store.insert_table(&NewTable {
                tournament_id: tournament.id,
                name,
                kind,
                created_by: &tournament.created_by,
                created_at: now,
                last_game_index: 0,
            })?;
            let links = self
                .registry
                .provision_defaults(ResourceRef::Table(table.id), &table.created_by)?;
            self.store.touch_group(tournament.group_id, now)?;
            tracing::info!(tournament = tournament.id, table = table.id, "created table");
            Ok(Provisioned {
                resource: table,
                links,
            })
        })
    }

    /// Create the game row under the table's next sequence index. Scores are
    /// written by the caller inside the same transaction.
    pub fn create_game(
        &self,
        table: &Table,
        group_id: GroupId,
        memo: Option<&str>,
        played_at: Option<DateTime<Utc>>,
    ) -> Result<Provisioned<Game>, Error> {
        self.store.transaction(|| {
            let now = Utc::now();
            let game_index = self.store.next_game_index(table.id)?;
            let game = self.store.insert_game(&NewGame {
                table_id: table.id,
                game_index,
                memo,
                played_at,
                created_by: &table.created_by,
                created_at: now,
            })?;
            let links = self
                .registry
                .provision_defaults(ResourceRef::Game(game.id), &game.created_by)?;
            self.store.touch_group(group_id, now)?;
            tracing::info!(table = table.id, game = game.id, game_index, "created game");
            Ok(Provisioned {
                resource: game,
                links,
            })
        })
    }
}
