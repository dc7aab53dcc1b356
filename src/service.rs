//! Key-authorized operations. Every entry point takes the caller's short key,
//! authorizes it against the resource it acts on and runs inside a single
//! store transaction.

use crate::access::{require_level, AccessResolver, Granted, Scope};
use crate::aggregate::{
    self, ChipPolicy, CrossTable, DateWindow, GroupSnapshot, GroupSummary, PlayerStatsReport,
    ScoreMap, TournamentExport, TournamentSnapshot,
};
use crate::error::Error;
use crate::hierarchy::{HierarchyWalker, Subtree};
use crate::keys::{KeySource, RandomKeys};
use crate::models::{
    AccessLevel, Game, GameId, Group, GroupId, NewPlayer, NewScore, NewTablePlayer,
    NewTournamentPlayer, Player, PlayerId, ResourceRef, ResourceType, Score, ShareLink, Table,
    TableId, TableKind, TablePlayer, Tournament, TournamentId, TournamentPlayer,
};
use crate::provision::{require_text, Provisioned, ResourceProvisioner};
use crate::registry::{ShareLinkRegistry, DEFAULT_KEY_ATTEMPTS};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupForm {
    pub name: String,
    pub description: Option<String>,
}

/// On update every omitted optional field keeps its stored value. A blank
/// description clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TournamentForm {
    pub name: String,
    pub description: Option<String>,
    /// Defaults to 1.0 on creation
    pub rate: Option<f64>,
    /// Defaults to now on creation
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableForm {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: TableKind,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerForm {
    pub name: String,
    pub nickname: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreInput {
    pub player_id: PlayerId,
    pub score: i32,
    pub rank: Option<i32>,
    pub uma: Option<f64>,
    /// Computed as score + uma when absent and uma is given
    pub total_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameForm {
    pub memo: Option<String>,
    pub played_at: Option<DateTime<Utc>>,
    pub scores: Vec<ScoreInput>,
}

/// Replaces memo and play time; replaces the score set when one is given
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameUpdate {
    pub memo: Option<String>,
    pub played_at: Option<DateTime<Utc>>,
    pub scores: Option<Vec<ScoreInput>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameWithScores {
    #[serde(flatten)]
    pub game: Game,
    pub scores: Vec<Score>,
}

/// Check a score set before anything is written
pub fn validate_scores(scores: &[ScoreInput]) -> Result<(), Error> {
    if scores.is_empty() {
        return Err(Error::NoScores);
    }
    let mut seen = HashSet::new();
    for s in scores {
        if !seen.insert(s.player_id) {
            return Err(Error::DuplicateScorePlayer(s.player_id));
        }
        if let Some(rank) = s.rank {
            if rank < 1 {
                return Err(Error::InvalidRank(rank));
            }
        }
    }
    let sum: i64 = scores.iter().map(|s| i64::from(s.score)).sum();
    if sum != 0 {
        return Err(Error::ScoresNotZeroSum(sum));
    }
    Ok(())
}

fn validate_rate(rate: f64) -> Result<f64, Error> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(Error::InvalidRate(rate))
    }
}

/// The request-scoped entry points, over any store
pub struct Service<S: Store> {
    store: S,
    keys: Box<dyn KeySource>,
    mint_attempts: usize,
}

impl<S: Store> Service<S> {
    pub fn new(store: S) -> Self {
        Service {
            store,
            keys: Box::new(RandomKeys),
            mint_attempts: DEFAULT_KEY_ATTEMPTS,
        }
    }

    pub fn with_keys<K: KeySource + 'static>(mut self, keys: K) -> Self {
        self.keys = Box::new(keys);
        self
    }

    pub fn with_mint_attempts(mut self, attempts: usize) -> Self {
        self.mint_attempts = attempts;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn registry(&self) -> ShareLinkRegistry<'_, S> {
        ShareLinkRegistry::new(&self.store, &*self.keys, self.mint_attempts)
    }

    fn walker(&self) -> HierarchyWalker<'_, S> {
        HierarchyWalker::new(&self.store)
    }

    fn access(&self) -> AccessResolver<'_, S> {
        AccessResolver::new(self.registry(), self.walker())
    }

    fn provisioner(&self) -> ResourceProvisioner<'_, S> {
        ResourceProvisioner::new(&self.store, self.registry())
    }

    fn touch(&self, group_id: GroupId) -> Result<(), Error> {
        self.store.touch_group(group_id, Utc::now())
    }

    fn table_group(&self, table: &Table) -> Result<GroupId, Error> {
        Ok(self.walker().tournament_of(table)?.group_id)
    }

    /// Delete everything in `tree` bottom-up, links included
    fn remove_subtree(&self, tree: &Subtree) -> Result<(), Error> {
        let registry = self.registry();
        self.store.delete_game_scores(&tree.games)?;
        self.store.delete_games(&tree.games)?;
        registry.release(ResourceType::Game, &tree.games)?;
        self.store.delete_table_players(&tree.tables)?;
        self.store.delete_tables(&tree.tables)?;
        registry.release(ResourceType::Table, &tree.tables)?;
        self.store.delete_tournament_players(&tree.tournaments)?;
        self.store.delete_tournaments(&tree.tournaments)?;
        registry.release(ResourceType::Tournament, &tree.tournaments)?;
        Ok(())
    }

    fn game_with_scores(&self, game: Game) -> Result<GameWithScores, Error> {
        let scores = self.store.find_game_scores(&[game.id])?;
        Ok(GameWithScores { game, scores })
    }

    fn write_scores(
        &self,
        game_id: GameId,
        group_id: GroupId,
        scores: &[ScoreInput],
    ) -> Result<Vec<Score>, Error> {
        validate_scores(scores)?;
        let walker = self.walker();
        for s in scores {
            walker.player_in_group(s.player_id, group_id)?;
        }
        let rows: Vec<NewScore> = scores
            .iter()
            .map(|s| NewScore {
                game_id,
                player_id: s.player_id,
                score: s.score,
                rank: s.rank,
                uma: s.uma,
                total_score: s
                    .total_score
                    .or_else(|| s.uma.map(|uma| f64::from(s.score) + uma)),
            })
            .collect();
        self.store.insert_scores(&rows)
    }

    // ---- Groups ----

    /// Create a group with its OWNER, EDIT and VIEW links. Without an issuer
    /// an anonymous one is generated.
    pub fn create_group(
        &self,
        form: &GroupForm,
        issuer: Option<&str>,
    ) -> Result<Provisioned<Group>, Error> {
        let issuer = issuer
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.provisioner()
            .create_group(&form.name, form.description.as_deref(), &issuer)
    }

    /// Resolve any key to the resource it was issued for
    pub fn open(&self, key: &str) -> Result<Granted<ResourceRef>, Error> {
        self.store.transaction(|| {
            let link = self.access().open(key)?;
            self.walker().ensure_exists(link.resource())?;
            Ok(Granted::new(link.resource(), link.access_level))
        })
    }

    /// Like `open`, for keys that must have been issued for an `expected` resource
    pub fn open_as(
        &self,
        key: &str,
        expected: ResourceType,
    ) -> Result<Granted<ResourceRef>, Error> {
        self.store.transaction(|| {
            let link = self.access().require_link(key, expected)?;
            self.walker().ensure_exists(link.resource())?;
            Ok(Granted::new(link.resource(), link.access_level))
        })
    }

    /// Links of the key's own resource, up to the key's level
    pub fn links(&self, key: &str) -> Result<Vec<ShareLink>, Error> {
        self.store.transaction(|| {
            let link = self.access().open(key)?;
            self.walker().ensure_exists(link.resource())?;
            self.registry().links(link.resource(), link.access_level)
        })
    }

    pub fn group(&self, key: &str, group_id: GroupId) -> Result<Granted<Group>, Error> {
        self.store.transaction(|| {
            let level = self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            Ok(Granted::new(self.walker().group(group_id)?, level))
        })
    }

    pub fn update_group(
        &self,
        key: &str,
        group_id: GroupId,
        form: &GroupForm,
    ) -> Result<Granted<Group>, Error> {
        self.store.transaction(|| {
            let level = self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::Owner,
                Scope::Exact,
            )?;
            let mut group = self.walker().group(group_id)?;
            group.name = require_text("name", &form.name)?.to_string();
            group.description = form.description.clone();
            group.last_updated_at = Utc::now();
            self.store.save_group(&group)?;
            Ok(Granted::new(group, level))
        })
    }

    /// Delete a group and everything beneath it, share links included
    pub fn delete_group(&self, key: &str, group_id: GroupId) -> Result<(), Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::Owner,
                Scope::Exact,
            )?;
            let tree = self.walker().subtree(ResourceRef::Group(group_id))?;
            self.remove_subtree(&tree)?;
            let players: Vec<PlayerId> = self
                .store
                .find_group_players(group_id)?
                .iter()
                .map(|p| p.id)
                .collect();
            self.store.delete_players(&players)?;
            self.registry().release(ResourceType::Group, &[group_id])?;
            self.store.delete_group(group_id)?;
            tracing::info!(
                group = group_id,
                tournaments = tree.tournaments.len(),
                tables = tree.tables.len(),
                games = tree.games.len(),
                "deleted group"
            );
            Ok(())
        })
    }

    // ---- Tournaments ----

    pub fn create_tournament(
        &self,
        key: &str,
        group_id: GroupId,
        form: &TournamentForm,
    ) -> Result<Provisioned<Tournament>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::Edit,
                Scope::Exact,
            )?;
            let group = self.walker().group(group_id)?;
            let rate = validate_rate(form.rate.unwrap_or(1.0))?;
            self.provisioner().create_tournament(
                &group,
                &form.name,
                form.description.as_deref(),
                rate,
                form.started_at.unwrap_or_else(Utc::now),
            )
        })
    }

    /// Tournaments of a group, newest first
    pub fn tournaments(&self, key: &str, group_id: GroupId) -> Result<Vec<Tournament>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            self.store.find_group_tournaments(group_id)
        })
    }

    pub fn tournament(&self, key: &str, id: TournamentId) -> Result<Granted<Tournament>, Error> {
        self.store.transaction(|| {
            let level = self.access().authorize(
                key,
                ResourceRef::Tournament(id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            Ok(Granted::new(self.walker().tournament(id)?, level))
        })
    }

    pub fn update_tournament(
        &self,
        key: &str,
        id: TournamentId,
        form: &TournamentForm,
    ) -> Result<Granted<Tournament>, Error> {
        self.store.transaction(|| {
            let level = self.access().authorize(
                key,
                ResourceRef::Tournament(id),
                AccessLevel::Edit,
                Scope::Exact,
            )?;
            let mut tournament = self.walker().tournament(id)?;
            tournament.name = require_text("name", &form.name)?.to_string();
            if let Some(description) = &form.description {
                tournament.description = if description.trim().is_empty() {
                    None
                } else {
                    Some(description.clone())
                };
            }
            if let Some(rate) = form.rate {
                tournament.rate = Some(validate_rate(rate)?);
            }
            if let Some(started_at) = form.started_at {
                tournament.started_at = started_at;
            }
            self.store.save_tournament(&tournament)?;
            self.touch(tournament.group_id)?;
            Ok(Granted::new(tournament, level))
        })
    }

    /// Delete a tournament with its tables, games, scores and participants
    pub fn delete_tournament(&self, key: &str, id: TournamentId) -> Result<(), Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Tournament(id),
                AccessLevel::Edit,
                Scope::Exact,
            )?;
            let tournament = self.walker().tournament(id)?;
            let tree = self.walker().subtree(ResourceRef::Tournament(id))?;
            self.remove_subtree(&tree)?;
            self.touch(tournament.group_id)?;
            tracing::info!(tournament = id, tables = tree.tables.len(), "deleted tournament");
            Ok(())
        })
    }

    // ---- Tables ----

    pub fn create_table(
        &self,
        key: &str,
        tournament_id: TournamentId,
        form: &TableForm,
    ) -> Result<Provisioned<Table>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Tournament(tournament_id),
                AccessLevel::Edit,
                Scope::Exact,
            )?;
            let tournament = self.walker().tournament(tournament_id)?;
            self.provisioner()
                .create_table(&tournament, &form.name, form.kind)
        })
    }

    pub fn tables(&self, key: &str, tournament_id: TournamentId) -> Result<Vec<Table>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Tournament(tournament_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            self.store.find_tournament_tables(&[tournament_id])
        })
    }

    pub fn table(&self, key: &str, id: TableId) -> Result<Granted<Table>, Error> {
        self.store.transaction(|| {
            let level = self.access().authorize(
                key,
                ResourceRef::Table(id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            Ok(Granted::new(self.walker().table(id)?, level))
        })
    }

    pub fn update_table(
        &self,
        key: &str,
        id: TableId,
        form: &TableForm,
    ) -> Result<Granted<Table>, Error> {
        self.store.transaction(|| {
            let level = self.access().authorize(
                key,
                ResourceRef::Table(id),
                AccessLevel::Edit,
                Scope::Exact,
            )?;
            let table = self.walker().table(id)?;
            let name = require_text("name", &form.name)?;
            self.store.update_table(id, name, form.kind)?;
            self.touch(self.table_group(&table)?)?;
            Ok(Granted::new(self.walker().table(id)?, level))
        })
    }

    /// Delete a table with its games, scores and seatings. The parent
    /// tournament's key may do this too.
    pub fn delete_table(&self, key: &str, id: TableId) -> Result<(), Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Table(id),
                AccessLevel::Edit,
                Scope::SelfOrParent,
            )?;
            let table = self.walker().table(id)?;
            let group_id = self.table_group(&table)?;
            let tree = self.walker().subtree(ResourceRef::Table(id))?;
            self.remove_subtree(&tree)?;
            self.touch(group_id)?;
            tracing::info!(table = id, games = tree.games.len(), "deleted table");
            Ok(())
        })
    }

    // ---- Players ----

    pub fn create_player(
        &self,
        key: &str,
        group_id: GroupId,
        form: &PlayerForm,
    ) -> Result<Player, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::Edit,
                Scope::Exact,
            )?;
            let player = self.store.insert_player(&NewPlayer {
                group_id,
                name: require_text("name", &form.name)?,
                nickname: form.nickname.as_deref(),
                display_order: form.display_order,
            })?;
            self.touch(group_id)?;
            tracing::info!(group = group_id, player = player.id, "created player");
            Ok(player)
        })
    }

    /// Players of a group by display order
    pub fn players(&self, key: &str, group_id: GroupId) -> Result<Vec<Player>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            self.store.find_group_players(group_id)
        })
    }

    fn authorized_player(
        &self,
        key: &str,
        id: PlayerId,
        required: AccessLevel,
    ) -> Result<Granted<Player>, Error> {
        // players of other groups are as invisible as missing ones
        let link = self.access().require_link(key, ResourceType::Group)?;
        let player = self
            .store
            .find_player(id)?
            .filter(|p| p.group_id == link.resource_id)
            .ok_or(Error::NoSuchPlayer(id))?;
        require_level(link.access_level, required)?;
        Ok(Granted::new(player, link.access_level))
    }

    pub fn player(&self, key: &str, id: PlayerId) -> Result<Granted<Player>, Error> {
        self.store
            .transaction(|| self.authorized_player(key, id, AccessLevel::View))
    }

    pub fn update_player(
        &self,
        key: &str,
        id: PlayerId,
        form: &PlayerForm,
    ) -> Result<Granted<Player>, Error> {
        self.store.transaction(|| {
            let mut granted = self.authorized_player(key, id, AccessLevel::Edit)?;
            let player = &mut granted.resource;
            player.name = require_text("name", &form.name)?.to_string();
            player.nickname = form.nickname.clone();
            player.display_order = form.display_order;
            self.store.save_player(player)?;
            self.touch(player.group_id)?;
            Ok(granted)
        })
    }

    /// Delete a player without recorded scores, with their participations
    /// and seatings
    pub fn delete_player(&self, key: &str, id: PlayerId) -> Result<(), Error> {
        self.store.transaction(|| {
            let player = self.authorized_player(key, id, AccessLevel::Edit)?.resource;
            if !self.store.find_player_scores(id)?.is_empty() {
                return Err(Error::PlayerHasScores(id));
            }
            self.store.delete_player_memberships(id)?;
            self.store.delete_players(&[id])?;
            self.touch(player.group_id)?;
            tracing::info!(group = player.group_id, player = id, "deleted player");
            Ok(())
        })
    }

    // ---- Participants ----

    /// Register group players into a tournament. Nothing is written unless
    /// every player can be registered.
    pub fn register_participants(
        &self,
        key: &str,
        tournament_id: TournamentId,
        player_ids: &[PlayerId],
    ) -> Result<Vec<TournamentPlayer>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Tournament(tournament_id),
                AccessLevel::Edit,
                Scope::Exact,
            )?;
            let tournament = self.walker().tournament(tournament_id)?;
            let mut registered: HashSet<PlayerId> = self
                .store
                .find_tournament_players(&[tournament_id])?
                .into_iter()
                .map(|tp| tp.player_id)
                .collect();
            let walker = self.walker();
            let now = Utc::now();
            let mut added = Vec::with_capacity(player_ids.len());
            for &player_id in player_ids {
                walker.player_in_group(player_id, tournament.group_id)?;
                if !registered.insert(player_id) {
                    return Err(Error::AlreadyParticipant(player_id));
                }
                added.push(self.store.insert_tournament_player(&NewTournamentPlayer {
                    tournament_id,
                    player_id,
                    created_at: now,
                })?);
            }
            self.touch(tournament.group_id)?;
            tracing::info!(
                tournament = tournament_id,
                added = added.len(),
                "registered participants"
            );
            Ok(added)
        })
    }

    /// Registered players, by display order
    pub fn participants(
        &self,
        key: &str,
        tournament_id: TournamentId,
    ) -> Result<Vec<Player>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Tournament(tournament_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            let tournament = self.walker().tournament(tournament_id)?;
            Ok(TournamentSnapshot::load(&self.store, tournament)?.participants)
        })
    }

    /// Unregister a player. Their seatings in the tournament go too; recorded
    /// scores stay.
    pub fn remove_participant(
        &self,
        key: &str,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> Result<(), Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Tournament(tournament_id),
                AccessLevel::Edit,
                Scope::Exact,
            )?;
            let tournament = self.walker().tournament(tournament_id)?;
            if !self
                .store
                .delete_tournament_player(tournament_id, player_id)?
            {
                return Err(Error::NotParticipant(player_id));
            }
            for table in self.store.find_tournament_tables(&[tournament_id])? {
                self.store.delete_table_player(table.id, player_id)?;
            }
            self.touch(tournament.group_id)?;
            Ok(())
        })
    }

    // ---- Seating ----

    pub fn seat_player(
        &self,
        key: &str,
        table_id: TableId,
        player_id: PlayerId,
        seat_position: Option<i32>,
    ) -> Result<TablePlayer, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Table(table_id),
                AccessLevel::Edit,
                Scope::SelfOrParent,
            )?;
            let table = self.walker().table(table_id)?;
            let participant = self
                .store
                .find_tournament_players(&[table.tournament_id])?
                .iter()
                .any(|tp| tp.player_id == player_id);
            if !participant {
                return Err(Error::NotParticipant(player_id));
            }
            let seated = self
                .store
                .find_table_players(table_id)?
                .iter()
                .any(|tp| tp.player_id == player_id);
            if seated {
                return Err(Error::AlreadySeated(player_id));
            }
            let seat = self.store.insert_table_player(&NewTablePlayer {
                table_id,
                player_id,
                seat_position,
                joined_at: Utc::now(),
            })?;
            self.touch(self.table_group(&table)?)?;
            Ok(seat)
        })
    }

    /// Seatings of a table, by seat position
    pub fn seated_players(
        &self,
        key: &str,
        table_id: TableId,
    ) -> Result<Vec<TablePlayer>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Table(table_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            self.store.find_table_players(table_id)
        })
    }

    /// Unseat a player. Refused while they hold a non-zero score on the table.
    pub fn unseat_player(
        &self,
        key: &str,
        table_id: TableId,
        player_id: PlayerId,
    ) -> Result<(), Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Table(table_id),
                AccessLevel::Edit,
                Scope::SelfOrParent,
            )?;
            let table = self.walker().table(table_id)?;
            let games: Vec<GameId> = self
                .store
                .find_table_games(&[table_id])?
                .iter()
                .map(|g| g.id)
                .collect();
            let scored = self
                .store
                .find_game_scores(&games)?
                .iter()
                .any(|s| s.player_id == player_id && s.score != 0);
            if scored {
                return Err(Error::PlayerHasScores(player_id));
            }
            if !self.store.delete_table_player(table_id, player_id)? {
                return Err(Error::NotSeated(player_id));
            }
            self.touch(self.table_group(&table)?)?;
            Ok(())
        })
    }

    // ---- Games ----

    /// Record a game under the table's next sequence index. The parent
    /// tournament's key may do this too.
    pub fn record_game(
        &self,
        key: &str,
        table_id: TableId,
        form: &GameForm,
    ) -> Result<Provisioned<GameWithScores>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Table(table_id),
                AccessLevel::Edit,
                Scope::SelfOrParent,
            )?;
            let table = self.walker().table(table_id)?;
            let group_id = self.table_group(&table)?;
            validate_scores(&form.scores)?;
            let created = self.provisioner().create_game(
                &table,
                group_id,
                form.memo.as_deref(),
                form.played_at,
            )?;
            let scores = self.write_scores(created.resource.id, group_id, &form.scores)?;
            Ok(Provisioned {
                resource: GameWithScores {
                    game: created.resource,
                    scores,
                },
                links: created.links,
            })
        })
    }

    /// Games of a table by sequence index
    pub fn games(&self, key: &str, table_id: TableId) -> Result<Vec<GameWithScores>, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Table(table_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            let games = self.store.find_table_games(&[table_id])?;
            let ids: Vec<GameId> = games.iter().map(|g| g.id).collect();
            let scores = self.store.find_game_scores(&ids)?;
            Ok(games
                .into_iter()
                .map(|game| GameWithScores {
                    scores: scores
                        .iter()
                        .filter(|s| s.game_id == game.id)
                        .cloned()
                        .collect(),
                    game,
                })
                .collect())
        })
    }

    pub fn game(&self, key: &str, id: GameId) -> Result<Granted<GameWithScores>, Error> {
        self.store.transaction(|| {
            let level = self.access().authorize(
                key,
                ResourceRef::Game(id),
                AccessLevel::View,
                Scope::SelfOrParent,
            )?;
            let game = self.walker().game(id)?;
            Ok(Granted::new(self.game_with_scores(game)?, level))
        })
    }

    pub fn update_game(
        &self,
        key: &str,
        id: GameId,
        update: &GameUpdate,
    ) -> Result<Granted<GameWithScores>, Error> {
        self.store.transaction(|| {
            let level = self.access().authorize(
                key,
                ResourceRef::Game(id),
                AccessLevel::Edit,
                Scope::SelfOrParent,
            )?;
            let mut game = self.walker().game(id)?;
            let table = self.walker().table_of(&game)?;
            let group_id = self.table_group(&table)?;
            game.memo = update.memo.clone();
            game.played_at = update.played_at;
            self.store.save_game(&game)?;
            if let Some(scores) = &update.scores {
                validate_scores(scores)?;
                self.store.delete_game_scores(&[id])?;
                self.write_scores(id, group_id, scores)?;
            }
            self.touch(group_id)?;
            Ok(Granted::new(self.game_with_scores(game)?, level))
        })
    }

    pub fn delete_game(&self, key: &str, id: GameId) -> Result<(), Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Game(id),
                AccessLevel::Edit,
                Scope::SelfOrParent,
            )?;
            let game = self.walker().game(id)?;
            let group_id = self.table_group(&self.walker().table_of(&game)?)?;
            self.remove_subtree(&self.walker().subtree(ResourceRef::Game(id))?)?;
            self.touch(group_id)?;
            tracing::info!(table = game.table_id, game = id, "deleted game");
            Ok(())
        })
    }

    // ---- Exports ----

    fn tournament_snapshot(
        &self,
        key: &str,
        tournament_id: TournamentId,
    ) -> Result<TournamentSnapshot, Error> {
        self.access().authorize(
            key,
            ResourceRef::Tournament(tournament_id),
            AccessLevel::View,
            Scope::Exact,
        )?;
        let tournament = self.walker().tournament(tournament_id)?;
        TournamentSnapshot::load(&self.store, tournament)
    }

    /// Score map over every table, CHIP tables included
    pub fn score_map(&self, key: &str, tournament_id: TournamentId) -> Result<ScoreMap, Error> {
        self.store.transaction(|| {
            let snapshot = self.tournament_snapshot(key, tournament_id)?;
            Ok(aggregate::build_score_map(&snapshot, ChipPolicy::Include))
        })
    }

    /// Score map over NORMAL tables only
    pub fn score_map_normal_only(
        &self,
        key: &str,
        tournament_id: TournamentId,
    ) -> Result<ScoreMap, Error> {
        self.store.transaction(|| {
            let snapshot = self.tournament_snapshot(key, tournament_id)?;
            Ok(aggregate::build_score_map(&snapshot, ChipPolicy::Exclude))
        })
    }

    pub fn cross_table(&self, key: &str, tournament_id: TournamentId) -> Result<CrossTable, Error> {
        self.store.transaction(|| {
            let snapshot = self.tournament_snapshot(key, tournament_id)?;
            Ok(aggregate::cross_table(&snapshot))
        })
    }

    pub fn export_tournament(
        &self,
        key: &str,
        tournament_id: TournamentId,
    ) -> Result<TournamentExport, Error> {
        self.store.transaction(|| {
            let snapshot = self.tournament_snapshot(key, tournament_id)?;
            Ok(aggregate::export_tournament(&snapshot))
        })
    }

    /// One export per tournament of the group, newest first
    pub fn group_summary(&self, key: &str, group_id: GroupId) -> Result<GroupSummary, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            let group = self.walker().group(group_id)?;
            let snapshots = self
                .store
                .find_group_tournaments(group_id)?
                .into_iter()
                .map(|t| TournamentSnapshot::load(&self.store, t))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(aggregate::group_summary(&group, &snapshots))
        })
    }

    /// Per player statistics over tournaments started inside the optional
    /// `YYYY-MM-DD` bounds
    pub fn player_stats(
        &self,
        key: &str,
        group_id: GroupId,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<PlayerStatsReport, Error> {
        self.store.transaction(|| {
            self.access().authorize(
                key,
                ResourceRef::Group(group_id),
                AccessLevel::View,
                Scope::Exact,
            )?;
            let window = DateWindow::parse(start, end)?;
            let group = self.walker().group(group_id)?;
            let snapshot = GroupSnapshot::load(&self.store, group)?;
            Ok(aggregate::player_stats(&snapshot, &window))
        })
    }
}
