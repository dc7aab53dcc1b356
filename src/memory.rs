use crate::error::Error;
use crate::models::{
    Game, GameId, Group, GroupId, NewGame, NewGroup, NewPlayer, NewScore, NewShareLink, NewTable,
    NewTablePlayer, NewTournament, NewTournamentPlayer, Player, PlayerId, ResourceRef,
    ResourceType, Score, ShareLink, Table, TableId, TableKind, TablePlayer, Tournament,
    TournamentId, TournamentPlayer,
};
use crate::store::{sort_players, sort_seats, Store};
use chrono::{DateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::cell::RefCell;

#[derive(Debug, Default, Clone)]
struct MemoryState {
    last_id: i32,
    groups: Vec<Group>,
    tournaments: Vec<Tournament>,
    tables: Vec<Table>,
    games: Vec<Game>,
    scores: Vec<Score>,
    players: Vec<Player>,
    tournament_players: Vec<TournamentPlayer>,
    table_players: Vec<TablePlayer>,
    share_links: Vec<ShareLink>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

fn unique_violation(constraint: &str) -> Error {
    Error::DBError(DieselError::DatabaseError(
        DatabaseErrorKind::UniqueViolation,
        Box::new(format!(
            "duplicate key value violates unique constraint \"{}\"",
            constraint
        )),
    ))
}

/// A process local store with the same contracts as the postgres one.
/// Transactions snapshot the whole state and restore it on error.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Number of share links currently stored, for every resource
    pub fn share_link_count(&self) -> usize {
        self.state.borrow().share_links.len()
    }
}

impl Store for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> Result<T, Error>,
    {
        let snapshot = self.state.borrow().clone();
        let res = f();
        if res.is_err() {
            *self.state.borrow_mut() = snapshot;
        }
        res
    }

    // ---- Share links ----

    fn insert_share_link(&self, link: &NewShareLink) -> Result<ShareLink, Error> {
        let mut state = self.state.borrow_mut();
        if state.share_links.iter().any(|l| l.short_key == link.short_key) {
            return Err(Error::ShortKeyTaken);
        }
        if state.share_links.iter().any(|l| {
            l.resource_type == link.resource_type
                && l.resource_id == link.resource_id
                && l.access_level == link.access_level
        }) {
            return Err(unique_violation("share_links_resource_level_unique"));
        }
        let row = ShareLink {
            id: state.next_id(),
            short_key: link.short_key.to_string(),
            resource_type: link.resource_type,
            resource_id: link.resource_id,
            access_level: link.access_level,
            created_by: link.created_by.to_string(),
            created_at: link.created_at,
        };
        state.share_links.push(row.clone());
        Ok(row)
    }

    fn find_share_link(&self, short_key: &str) -> Result<Option<ShareLink>, Error> {
        Ok(self
            .state
            .borrow()
            .share_links
            .iter()
            .find(|l| l.short_key == short_key)
            .cloned())
    }

    fn find_share_links(&self, resource: ResourceRef) -> Result<Vec<ShareLink>, Error> {
        Ok(self
            .state
            .borrow()
            .share_links
            .iter()
            .filter(|l| l.resource() == resource)
            .cloned()
            .collect())
    }

    fn delete_share_links(
        &self,
        resource_type: ResourceType,
        ids: &[i32],
    ) -> Result<usize, Error> {
        let mut state = self.state.borrow_mut();
        let before = state.share_links.len();
        state
            .share_links
            .retain(|l| !(l.resource_type == resource_type && ids.contains(&l.resource_id)));
        Ok(before - state.share_links.len())
    }

    // ---- Groups ----

    fn insert_group(&self, group: &NewGroup) -> Result<Group, Error> {
        let mut state = self.state.borrow_mut();
        let row = Group {
            id: state.next_id(),
            name: group.name.to_string(),
            description: group.description.map(str::to_string),
            created_by: group.created_by.to_string(),
            created_at: group.created_at,
            last_updated_at: group.last_updated_at,
        };
        state.groups.push(row.clone());
        Ok(row)
    }

    fn find_group(&self, id: GroupId) -> Result<Option<Group>, Error> {
        Ok(self.state.borrow().groups.iter().find(|g| g.id == id).cloned())
    }

    fn save_group(&self, group: &Group) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        if let Some(row) = state.groups.iter_mut().find(|g| g.id == group.id) {
            *row = group.clone();
        }
        Ok(())
    }

    fn touch_group(&self, id: GroupId, at: DateTime<Utc>) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        if let Some(row) = state.groups.iter_mut().find(|g| g.id == id) {
            row.last_updated_at = at;
        }
        Ok(())
    }

    fn delete_group(&self, id: GroupId) -> Result<(), Error> {
        self.state.borrow_mut().groups.retain(|g| g.id != id);
        Ok(())
    }

    // ---- Tournaments ----

    fn insert_tournament(&self, tournament: &NewTournament) -> Result<Tournament, Error> {
        let mut state = self.state.borrow_mut();
        let row = Tournament {
            id: state.next_id(),
            group_id: tournament.group_id,
            name: tournament.name.to_string(),
            description: tournament.description.map(str::to_string),
            rate: tournament.rate,
            created_by: tournament.created_by.to_string(),
            started_at: tournament.started_at,
            created_at: tournament.created_at,
        };
        state.tournaments.push(row.clone());
        Ok(row)
    }

    fn find_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, Error> {
        Ok(self
            .state
            .borrow()
            .tournaments
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    fn find_group_tournaments(&self, group_id: GroupId) -> Result<Vec<Tournament>, Error> {
        let mut found: Vec<Tournament> = self
            .state
            .borrow()
            .tournaments
            .iter()
            .filter(|t| t.group_id == group_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(found)
    }

    fn save_tournament(&self, tournament: &Tournament) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        if let Some(row) = state.tournaments.iter_mut().find(|t| t.id == tournament.id) {
            *row = tournament.clone();
        }
        Ok(())
    }

    fn delete_tournaments(&self, ids: &[TournamentId]) -> Result<(), Error> {
        self.state
            .borrow_mut()
            .tournaments
            .retain(|t| !ids.contains(&t.id));
        Ok(())
    }

    // ---- Tables ----

    fn insert_table(&self, table: &NewTable) -> Result<Table, Error> {
        let mut state = self.state.borrow_mut();
        let row = Table {
            id: state.next_id(),
            tournament_id: table.tournament_id,
            name: table.name.to_string(),
            kind: table.kind,
            created_by: table.created_by.to_string(),
            created_at: table.created_at,
            last_game_index: table.last_game_index,
        };
        state.tables.push(row.clone());
        Ok(row)
    }

    fn find_table(&self, id: TableId) -> Result<Option<Table>, Error> {
        Ok(self.state.borrow().tables.iter().find(|t| t.id == id).cloned())
    }

    fn find_tournament_tables(
        &self,
        tournament_ids: &[TournamentId],
    ) -> Result<Vec<Table>, Error> {
        Ok(self
            .state
            .borrow()
            .tables
            .iter()
            .filter(|t| tournament_ids.contains(&t.tournament_id))
            .cloned()
            .collect())
    }

    fn update_table(&self, id: TableId, name: &str, kind: TableKind) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        if let Some(row) = state.tables.iter_mut().find(|t| t.id == id) {
            row.name = name.to_string();
            row.kind = kind;
        }
        Ok(())
    }

    fn next_game_index(&self, id: TableId) -> Result<i32, Error> {
        let mut state = self.state.borrow_mut();
        match state.tables.iter_mut().find(|t| t.id == id) {
            Some(row) => {
                row.last_game_index += 1;
                Ok(row.last_game_index)
            }
            None => Err(Error::DBError(DieselError::NotFound)),
        }
    }

    fn delete_tables(&self, ids: &[TableId]) -> Result<(), Error> {
        self.state.borrow_mut().tables.retain(|t| !ids.contains(&t.id));
        Ok(())
    }

    // ---- Games ----

    fn insert_game(&self, game: &NewGame) -> Result<Game, Error> {
        let mut state = self.state.borrow_mut();
        let row = Game {
            id: state.next_id(),
            table_id: game.table_id,
            game_index: game.game_index,
            memo: game.memo.map(str::to_string),
            played_at: game.played_at,
            created_by: game.created_by.to_string(),
            created_at: game.created_at,
        };
        state.games.push(row.clone());
        Ok(row)
    }

    fn find_game(&self, id: GameId) -> Result<Option<Game>, Error> {
        Ok(self.state.borrow().games.iter().find(|g| g.id == id).cloned())
    }

    fn find_table_games(&self, table_ids: &[TableId]) -> Result<Vec<Game>, Error> {
        let mut found: Vec<Game> = self
            .state
            .borrow()
            .games
            .iter()
            .filter(|g| table_ids.contains(&g.table_id))
            .cloned()
            .collect();
        found.sort_by_key(|g| (g.table_id, g.game_index));
        Ok(found)
    }

    fn save_game(&self, game: &Game) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        if let Some(row) = state.games.iter_mut().find(|g| g.id == game.id) {
            *row = game.clone();
        }
        Ok(())
    }

    fn delete_games(&self, ids: &[GameId]) -> Result<(), Error> {
        self.state.borrow_mut().games.retain(|g| !ids.contains(&g.id));
        Ok(())
    }

    // ---- Scores ----

    fn insert_scores(&self, scores: &[NewScore]) -> Result<Vec<Score>, Error> {
        let mut state = self.state.borrow_mut();
        let mut rows = Vec::with_capacity(scores.len());
        for score in scores {
            let row = Score {
                id: state.next_id(),
                game_id: score.game_id,
                player_id: score.player_id,
                score: score.score,
                rank: score.rank,
                uma: score.uma,
                total_score: score.total_score,
            };
            state.scores.push(row.clone());
            rows.push(row);
        }
        Ok(rows)
    }

    fn find_game_scores(&self, game_ids: &[GameId]) -> Result<Vec<Score>, Error> {
        Ok(self
            .state
            .borrow()
            .scores
            .iter()
            .filter(|s| game_ids.contains(&s.game_id))
            .cloned()
            .collect())
    }

    fn find_player_scores(&self, player_id: PlayerId) -> Result<Vec<Score>, Error> {
        Ok(self
            .state
            .borrow()
            .scores
            .iter()
            .filter(|s| s.player_id == player_id)
            .cloned()
            .collect())
    }

    fn delete_game_scores(&self, game_ids: &[GameId]) -> Result<(), Error> {
        self.state
            .borrow_mut()
            .scores
            .retain(|s| !game_ids.contains(&s.game_id));
        Ok(())
    }

    // ---- Players ----

    fn insert_player(&self, player: &NewPlayer) -> Result<Player, Error> {
        let mut state = self.state.borrow_mut();
        let row = Player {
            id: state.next_id(),
            group_id: player.group_id,
            name: player.name.to_string(),
            nickname: player.nickname.map(str::to_string),
            display_order: player.display_order,
        };
        state.players.push(row.clone());
        Ok(row)
    }

    fn find_player(&self, id: PlayerId) -> Result<Option<Player>, Error> {
        Ok(self.state.borrow().players.iter().find(|p| p.id == id).cloned())
    }

    fn find_group_players(&self, group_id: GroupId) -> Result<Vec<Player>, Error> {
        let mut found: Vec<Player> = self
            .state
            .borrow()
            .players
            .iter()
            .filter(|p| p.group_id == group_id)
            .cloned()
            .collect();
        sort_players(&mut found);
        Ok(found)
    }

    fn save_player(&self, player: &Player) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        if let Some(row) = state.players.iter_mut().find(|p| p.id == player.id) {
            *row = player.clone();
        }
        Ok(())
    }

    fn delete_players(&self, ids: &[PlayerId]) -> Result<(), Error> {
        self.state.borrow_mut().players.retain(|p| !ids.contains(&p.id));
        Ok(())
    }

    // ---- Participation + seating ----

    fn insert_tournament_player(
        &self,
        participant: &NewTournamentPlayer,
    ) -> Result<TournamentPlayer, Error> {
        let mut state = self.state.borrow_mut();
        if state.tournament_players.iter().any(|tp| {
            tp.tournament_id == participant.tournament_id && tp.player_id == participant.player_id
        }) {
            return Err(unique_violation("tournament_players_unique"));
        }
        let row = TournamentPlayer {
            id: state.next_id(),
            tournament_id: participant.tournament_id,
            player_id: participant.player_id,
            created_at: participant.created_at,
        };
        state.tournament_players.push(row.clone());
        Ok(row)
    }

    fn find_tournament_players(
        &self,
        tournament_ids: &[TournamentId],
    ) -> Result<Vec<TournamentPlayer>, Error> {
        Ok(self
            .state
            .borrow()
            .tournament_players
            .iter()
            .filter(|tp| tournament_ids.contains(&tp.tournament_id))
            .cloned()
            .collect())
    }

    fn delete_tournament_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> Result<bool, Error> {
        let mut state = self.state.borrow_mut();
        let before = state.tournament_players.len();
        state
            .tournament_players
            .retain(|tp| !(tp.tournament_id == tournament_id && tp.player_id == player_id));
        Ok(state.tournament_players.len() < before)
    }

    fn delete_tournament_players(&self, tournament_ids: &[TournamentId]) -> Result<(), Error> {
        self.state
            .borrow_mut()
            .tournament_players
            .retain(|tp| !tournament_ids.contains(&tp.tournament_id));
        Ok(())
    }

    fn insert_table_player(&self, seat: &NewTablePlayer) -> Result<TablePlayer, Error> {
        let mut state = self.state.borrow_mut();
        if state
            .table_players
            .iter()
            .any(|tp| tp.table_id == seat.table_id && tp.player_id == seat.player_id)
        {
            return Err(unique_violation("table_players_unique"));
        }
        let row = TablePlayer {
            id: state.next_id(),
            table_id: seat.table_id,
            player_id: seat.player_id,
            seat_position: seat.seat_position,
            joined_at: seat.joined_at,
        };
        state.table_players.push(row.clone());
        Ok(row)
    }

    fn find_table_players(&self, table_id: TableId) -> Result<Vec<TablePlayer>, Error> {
        let mut seats: Vec<TablePlayer> = self
            .state
            .borrow()
            .table_players
            .iter()
            .filter(|tp| tp.table_id == table_id)
            .cloned()
            .collect();
        sort_seats(&mut seats);
        Ok(seats)
    }

    fn delete_table_player(&self, table_id: TableId, player_id: PlayerId) -> Result<bool, Error> {
        let mut state = self.state.borrow_mut();
        let before = state.table_players.len();
        state
            .table_players
            .retain(|tp| !(tp.table_id == table_id && tp.player_id == player_id));
        Ok(state.table_players.len() < before)
    }

    fn delete_table_players(&self, table_ids: &[TableId]) -> Result<(), Error> {
        self.state
            .borrow_mut()
            .table_players
            .retain(|tp| !table_ids.contains(&tp.table_id));
        Ok(())
    }

    fn delete_player_memberships(&self, player_id: PlayerId) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        state.tournament_players.retain(|tp| tp.player_id != player_id);
        state.table_players.retain(|tp| tp.player_id != player_id);
        Ok(())
    }
}
