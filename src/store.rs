use crate::error::Error;
use crate::models::{
    Game, GameId, Group, GroupId, NewGame, NewGroup, NewPlayer, NewScore, NewShareLink, NewTable,
    NewTablePlayer, NewTournament, NewTournamentPlayer, Player, PlayerId, ResourceRef,
    ResourceType, Score, ShareLink, Table, TableId, TableKind, TablePlayer, Tournament,
    TournamentId, TournamentPlayer,
};
use chrono::{DateTime, Utc};

/// Typed access to the relational store.
///
/// Every method runs on the connection (or snapshot) the implementor wraps, so
/// a group of calls made inside [`Store::transaction`] commits or rolls back as
/// one unit. Lookups by id return `Ok(None)` when the row is gone; deciding
/// whether that is an error is left to the caller.
///
/// Ordering contracts that the aggregation output depends on:
/// * tournaments of a group: newest first (`created_at`, then `id`, descending)
/// * tables, scores: ascending `id`
/// * games: ascending `(table_id, game_index)`
/// * players: `display_order` ascending with unset orders last, then `id`
/// * seatings: `seat_position` ascending with unset positions last, then `id`
pub trait Store {
    /// Run `f` atomically. Nested calls open a savepoint.
    fn transaction<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> Result<T, Error>;

    // ---- Share links ----

    /// Insert a link. A clash on `short_key` is reported as `Error::ShortKeyTaken`
    /// and leaves any enclosing transaction usable.
    fn insert_share_link(&self, link: &NewShareLink) -> Result<ShareLink, Error>;
    fn find_share_link(&self, short_key: &str) -> Result<Option<ShareLink>, Error>;
    fn find_share_links(&self, resource: ResourceRef) -> Result<Vec<ShareLink>, Error>;
    /// Delete every link of `resource_type` whose resource id is in `ids`
    fn delete_share_links(&self, resource_type: ResourceType, ids: &[i32])
        -> Result<usize, Error>;

    // ---- Groups ----

    fn insert_group(&self, group: &NewGroup) -> Result<Group, Error>;
    fn find_group(&self, id: GroupId) -> Result<Option<Group>, Error>;
    fn save_group(&self, group: &Group) -> Result<(), Error>;
    fn touch_group(&self, id: GroupId, at: DateTime<Utc>) -> Result<(), Error>;
    fn delete_group(&self, id: GroupId) -> Result<(), Error>;

    // ---- Tournaments ----

    fn insert_tournament(&self, tournament: &NewTournament) -> Result<Tournament, Error>;
    fn find_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, Error>;
    fn find_group_tournaments(&self, group_id: GroupId) -> Result<Vec<Tournament>, Error>;
    fn save_tournament(&self, tournament: &Tournament) -> Result<(), Error>;
    fn delete_tournaments(&self, ids: &[TournamentId]) -> Result<(), Error>;

    // ---- Tables ----

    fn insert_table(&self, table: &NewTable) -> Result<Table, Error>;
    fn find_table(&self, id: TableId) -> Result<Option<Table>, Error>;
    fn find_tournament_tables(&self, tournament_ids: &[TournamentId])
        -> Result<Vec<Table>, Error>;
    fn update_table(&self, id: TableId, name: &str, kind: TableKind) -> Result<(), Error>;
    /// Bump and return the table's game counter
    fn next_game_index(&self, id: TableId) -> Result<i32, Error>;
    fn delete_tables(&self, ids: &[TableId]) -> Result<(), Error>;

    // ---- Games ----

    fn insert_game(&self, game: &NewGame) -> Result<Game, Error>;
    fn find_game(&self, id: GameId) -> Result<Option<Game>, Error>;
    fn find_table_games(&self, table_ids: &[TableId]) -> Result<Vec<Game>, Error>;
    fn save_game(&self, game: &Game) -> Result<(), Error>;
    fn delete_games(&self, ids: &[GameId]) -> Result<(), Error>;

    // ---- Scores ----

    fn insert_scores(&self, scores: &[NewScore]) -> Result<Vec<Score>, Error>;
    fn find_game_scores(&self, game_ids: &[GameId]) -> Result<Vec<Score>, Error>;
    fn find_player_scores(&self, player_id: PlayerId) -> Result<Vec<Score>, Error>;
    fn delete_game_scores(&self, game_ids: &[GameId]) -> Result<(), Error>;

    // ---- Players ----

    fn insert_player(&self, player: &NewPlayer) -> Result<Player, Error>;
    fn find_player(&self, id: PlayerId) -> Result<Option<Player>, Error>;
    fn find_group_players(&self, group_id: GroupId) -> Result<Vec<Player>, Error>;
    fn save_player(&self, player: &Player) -> Result<(), Error>;
    fn delete_players(&self, ids: &[PlayerId]) -> Result<(), Error>;

    // ---- Participation + seating ----

    fn insert_tournament_player(
        &self,
        participant: &NewTournamentPlayer,
    ) -> Result<TournamentPlayer, Error>;
    fn find_tournament_players(
        &self,
        tournament_ids: &[TournamentId],
    ) -> Result<Vec<TournamentPlayer>, Error>;
    /// Returns whether a row was removed
    fn delete_tournament_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> Result<bool, Error>;
    fn delete_tournament_players(&self, tournament_ids: &[TournamentId]) -> Result<(), Error>;

    fn insert_table_player(&self, seat: &NewTablePlayer) -> Result<TablePlayer, Error>;
    fn find_table_players(&self, table_id: TableId) -> Result<Vec<TablePlayer>, Error>;
    /// Returns whether a row was removed
    fn delete_table_player(&self, table_id: TableId, player_id: PlayerId) -> Result<bool, Error>;
    fn delete_table_players(&self, table_ids: &[TableId]) -> Result<(), Error>;

    /// Drop every participation and seating of a player
    fn delete_player_memberships(&self, player_id: PlayerId) -> Result<(), Error>;
}

/// Order players by `display_order` (unset last), then id
pub fn sort_players(players: &mut [Player]) {
    players.sort_by_key(|p| (p.display_order.is_none(), p.display_order, p.id));
}

/// Order seatings by `seat_position` (unset last), then id
pub fn sort_seats(seats: &mut [TablePlayer]) {
    seats.sort_by_key(|s| (s.seat_position.is_none(), s.seat_position, s.id));
}
