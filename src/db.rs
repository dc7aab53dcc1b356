use crate::diesel::prelude::*;
use crate::error::Error;
use crate::models::{
    Game, GameId, Group, GroupId, NewGame, NewGroup, NewPlayer, NewScore, NewShareLink, NewTable,
    NewTablePlayer, NewTournament, NewTournamentPlayer, Player, PlayerId, ResourceRef,
    ResourceType, Score, ShareLink, Table, TableId, TableKind, TablePlayer, Tournament,
    TournamentId, TournamentPlayer,
};
use crate::schema::{
    games, groups, players, scores, share_links, table_players, tables, tournament_players,
    tournaments,
};
use crate::store::{sort_players, sort_seats, Store};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

embed_migrations!("migrations");

/// Name of the unique constraint on `share_links.short_key`
pub const SHORT_KEY_CONSTRAINT: &str = "share_links_short_key_unique";

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

pub fn init_db_pool(db_url: &str, max_size: u32) -> Result<PgPool, PoolError> {
    let manage = ConnectionManager::<PgConnection>::new(db_url);
    Pool::builder().max_size(max_size).build(manage)
}

/// A database connection wrapper, which associates the database with functions to manipulate it
pub struct DBWrapper {
    db: PooledConnection<ConnectionManager<PgConnection>>,
}

impl DBWrapper {
    /// Check a connection out of the pool
    pub fn from_pg_pool(pool: &PgPool) -> Result<DBWrapper, Error> {
        Ok(DBWrapper { db: pool.get()? })
    }

    /// Bring the schema up to date
    pub fn run_migrations(&self) -> Result<(), Error> {
        embedded_migrations::run(&*self.db)?;
        Ok(())
    }
}

impl Store for DBWrapper {
    fn transaction<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce() -> Result<T, Error>,
    {
        self.db.transaction::<T, Error, _>(f)
    }

    // ---- Share links ----

    fn insert_share_link(&self, link: &NewShareLink) -> Result<ShareLink, Error> {
        // savepoint, so a collision doesn't abort the caller's transaction
        let inserted = self.db.transaction::<ShareLink, DieselError, _>(|| {
            diesel::insert_into(share_links::table)
                .values(link)
                .get_result::<ShareLink>(&self.db)
        });
        match inserted {
            Ok(link) => Ok(link),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
                if info.constraint_name() == Some(SHORT_KEY_CONSTRAINT) =>
            {
                Err(Error::ShortKeyTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_share_link(&self, short_key: &str) -> Result<Option<ShareLink>, Error> {
        use share_links::dsl;
        Ok(dsl::share_links
            .filter(dsl::short_key.eq(short_key))
            .first::<ShareLink>(&self.db)
            .optional()?)
    }

    fn find_share_links(&self, resource: ResourceRef) -> Result<Vec<ShareLink>, Error> {
        use share_links::dsl;
        Ok(dsl::share_links
            .filter(
                dsl::resource_type
                    .eq(resource.resource_type())
                    .and(dsl::resource_id.eq(resource.id())),
            )
            .order(dsl::id.asc())
            .load::<ShareLink>(&self.db)?)
    }

    fn delete_share_links(
        &self,
        resource_type: ResourceType,
        ids: &[i32],
    ) -> Result<usize, Error> {
        use share_links::dsl;
        if ids.is_empty() {
            return Ok(0);
        }
        Ok(diesel::delete(
            dsl::share_links.filter(
                dsl::resource_type
                    .eq(resource_type)
                    .and(dsl::resource_id.eq_any(ids)),
            ),
        )
        .execute(&self.db)?)
    }

    // ---- Groups ----

    fn insert_group(&self, group: &NewGroup) -> Result<Group, Error> {
        Ok(diesel::insert_into(groups::table)
            .values(group)
            .get_result::<Group>(&self.db)?)
    }

    fn find_group(&self, id: GroupId) -> Result<Option<Group>, Error> {
        Ok(groups::dsl::groups
            .find(id)
            .first::<Group>(&self.db)
            .optional()?)
    }

    fn save_group(&self, group: &Group) -> Result<(), Error> {
        diesel::update(groups::dsl::groups.find(group.id))
            .set(group)
            .execute(&self.db)?;
        Ok(())
    }

    fn touch_group(&self, id: GroupId, at: DateTime<Utc>) -> Result<(), Error> {
        use groups::dsl;
        diesel::update(dsl::groups.find(id))
            .set(dsl::last_updated_at.eq(at))
            .execute(&self.db)?;
        Ok(())
    }

    fn delete_group(&self, id: GroupId) -> Result<(), Error> {
        diesel::delete(groups::dsl::groups.find(id)).execute(&self.db)?;
        Ok(())
    }

    // ---- Tournaments ----

    fn insert_tournament(&self, tournament: &NewTournament) -> Result<Tournament, Error> {
        Ok(diesel::insert_into(tournaments::table)
            .values(tournament)
            .get_result::<Tournament>(&self.db)?)
    }

    fn find_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, Error> {
        Ok(tournaments::dsl::tournaments
            .find(id)
            .first::<Tournament>(&self.db)
            .optional()?)
    }

    fn find_group_tournaments(&self, group_id: GroupId) -> Result<Vec<Tournament>, Error> {
        use tournaments::dsl;
        Ok(dsl::tournaments
            .filter(dsl::group_id.eq(group_id))
            .order((dsl::created_at.desc(), dsl::id.desc()))
            .load::<Tournament>(&self.db)?)
    }

    fn save_tournament(&self, tournament: &Tournament) -> Result<(), Error> {
        diesel::update(tournaments::dsl::tournaments.find(tournament.id))
            .set(tournament)
            .execute(&self.db)?;
        Ok(())
    }

    fn delete_tournaments(&self, ids: &[TournamentId]) -> Result<(), Error> {
        use tournaments::dsl;
        if ids.is_empty() {
            return Ok(());
        }
        diesel::delete(dsl::tournaments.filter(dsl::id.eq_any(ids))).execute(&self.db)?;
        Ok(())
    }

    // ---- Tables ----

    fn insert_table(&self, table: &NewTable) -> Result<Table, Error> {
        Ok(diesel::insert_into(tables::table)
            .values(table)
            .get_result::<Table>(&self.db)?)
    }

    fn find_table(&self, id: TableId) -> Result<Option<Table>, Error> {
        Ok(tables::dsl::tables
            .find(id)
            .first::<Table>(&self.db)
            .optional()?)
    }

    fn find_tournament_tables(
        &self,
        tournament_ids: &[TournamentId],
    ) -> Result<Vec<Table>, Error> {
        use tables::dsl;
        if tournament_ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(dsl::tables
            .filter(dsl::tournament_id.eq_any(tournament_ids))
            .order(dsl::id.asc())
            .load::<Table>(&self.db)?)
    }

    fn update_table(&self, id: TableId, name: &str, kind: TableKind) -> Result<(), Error> {
        use tables::dsl;
        diesel::update(dsl::tables.find(id))
            .set((dsl::name.eq(name), dsl::kind.eq(kind)))
            .execute(&self.db)?;
        Ok(())
    }

    fn next_game_index(&self, id: TableId) -> Result<i32, Error> {
        use tables::dsl;
        Ok(diesel::update(dsl::tables.find(id))
            .set(dsl::last_game_index.eq(dsl::last_game_index + 1))
            .returning(dsl::last_game_index)
            .get_result::<i32>(&self.db)?)
    }

    fn delete_tables(&self, ids: &[TableId]) -> Result<(), Error> {
        use tables::dsl;
        if ids.is_empty() {
            return Ok(());
        }
        diesel::delete(dsl::tables.filter(dsl::id.eq_any(ids))).execute(&self.db)?;
        Ok(())
    }

    // ---- Games ----

    fn insert_game(&self, game: &NewGame) -> Result<Game, Error> {
        Ok(diesel::insert_into(games::table)
            .values(game)
            .get_result::<Game>(&self.db)?)
    }

    fn find_game(&self, id: GameId) -> Result<Option<Game>, Error> {
        Ok(games::dsl::games
            .find(id)
            .first::<Game>(&self.db)
            .optional()?)
    }

    fn find_table_games(&self, table_ids: &[TableId]) -> Result<Vec<Game>, Error> {
        use games::dsl;
        if table_ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(dsl::games
            .filter(dsl::table_id.eq_any(table_ids))
            .order((dsl::table_id.asc(), dsl::game_index.asc()))
            .load::<Game>(&self.db)?)
    }

    fn save_game(&self, game: &Game) -> Result<(), Error> {
        diesel::update(games::dsl::games.find(game.id))
            .set(game)
            .execute(&self.db)?;
        Ok(())
    }

    fn delete_games(&self, ids: &[GameId]) -> Result<(), Error> {
        use games::dsl;
        if ids.is_empty() {
            return Ok(());
        }
        diesel::delete(dsl::games.filter(dsl::id.eq_any(ids))).execute(&self.db)?;
        Ok(())
    }

    // ---- Scores ----

    fn insert_scores(&self, new_scores: &[NewScore]) -> Result<Vec<Score>, Error> {
        if new_scores.is_empty() {
            return Ok(vec![]);
        }
        Ok(diesel::insert_into(scores::table)
            .values(new_scores)
            .get_results::<Score>(&self.db)?)
    }

    fn find_game_scores(&self, game_ids: &[GameId]) -> Result<Vec<Score>, Error> {
        use scores::dsl;
        if game_ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(dsl::scores
            .filter(dsl::game_id.eq_any(game_ids))
            .order(dsl::id.asc())
            .load::<Score>(&self.db)?)
    }

    fn find_player_scores(&self, player_id: PlayerId) -> Result<Vec<Score>, Error> {
        use scores::dsl;
        Ok(dsl::scores
            .filter(dsl::player_id.eq(player_id))
            .order(dsl::id.asc())
            .load::<Score>(&self.db)?)
    }

    fn delete_game_scores(&self, game_ids: &[GameId]) -> Result<(), Error> {
        use scores::dsl;
        if game_ids.is_empty() {
            return Ok(());
        }
        diesel::delete(dsl::scores.filter(dsl::game_id.eq_any(game_ids))).execute(&self.db)?;
        Ok(())
    }

    // ---- Players ----

    fn insert_player(&self, player: &NewPlayer) -> Result<Player, Error> {
        Ok(diesel::insert_into(players::table)
            .values(player)
            .get_result::<Player>(&self.db)?)
    }

    fn find_player(&self, id: PlayerId) -> Result<Option<Player>, Error> {
        Ok(players::dsl::players
            .find(id)
            .first::<Player>(&self.db)
            .optional()?)
    }

    fn find_group_players(&self, group_id: GroupId) -> Result<Vec<Player>, Error> {
        use players::dsl;
        let mut found = dsl::players
            .filter(dsl::group_id.eq(group_id))
            .order(dsl::id.asc())
            .load::<Player>(&self.db)?;
        sort_players(&mut found);
        Ok(found)
    }

    fn save_player(&self, player: &Player) -> Result<(), Error> {
        diesel::update(players::dsl::players.find(player.id))
            .set(player)
            .execute(&self.db)?;
        Ok(())
    }

    fn delete_players(&self, ids: &[PlayerId]) -> Result<(), Error> {
        use players::dsl;
        if ids.is_empty() {
            return Ok(());
        }
        diesel::delete(dsl::players.filter(dsl::id.eq_any(ids))).execute(&self.db)?;
        Ok(())
    }

    // ---- Participation + seating ----

    fn insert_tournament_player(
        &self,
        participant: &NewTournamentPlayer,
    ) -> Result<TournamentPlayer, Error> {
        Ok(diesel::insert_into(tournament_players::table)
            .values(participant)
            .get_result::<TournamentPlayer>(&self.db)?)
    }

    fn find_tournament_players(
        &self,
        tournament_ids: &[TournamentId],
    ) -> Result<Vec<TournamentPlayer>, Error> {
        use tournament_players::dsl;
        if tournament_ids.is_empty() {
            return Ok(vec![]);
        }
        Ok(dsl::tournament_players
            .filter(dsl::tournament_id.eq_any(tournament_ids))
            .order(dsl::id.asc())
            .load::<TournamentPlayer>(&self.db)?)
    }

    fn delete_tournament_player(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> Result<bool, Error> {
        use tournament_players::dsl;
        let removed = diesel::delete(
            dsl::tournament_players.filter(
                dsl::tournament_id
                    .eq(tournament_id)
                    .and(dsl::player_id.eq(player_id)),
            ),
        )
        .execute(&self.db)?;
        Ok(removed > 0)
    }

    fn delete_tournament_players(&self, tournament_ids: &[TournamentId]) -> Result<(), Error> {
        use tournament_players::dsl;
        if tournament_ids.is_empty() {
            return Ok(());
        }
        diesel::delete(dsl::tournament_players.filter(dsl::tournament_id.eq_any(tournament_ids)))
            .execute(&self.db)?;
        Ok(())
    }

    fn insert_table_player(&self, seat: &NewTablePlayer) -> Result<TablePlayer, Error> {
        Ok(diesel::insert_into(table_players::table)
            .values(seat)
            .get_result::<TablePlayer>(&self.db)?)
    }

    fn find_table_players(&self, table_id: TableId) -> Result<Vec<TablePlayer>, Error> {
        use table_players::dsl;
        let mut seats = dsl::table_players
            .filter(dsl::table_id.eq(table_id))
            .order(dsl::id.asc())
            .load::<TablePlayer>(&self.db)?;
        sort_seats(&mut seats);
        Ok(seats)
    }

    fn delete_table_player(&self, table_id: TableId, player_id: PlayerId) -> Result<bool, Error> {
        use table_players::dsl;
        let removed = diesel::delete(
            dsl::table_players.filter(dsl::table_id.eq(table_id).and(dsl::player_id.eq(player_id))),
        )
        .execute(&self.db)?;
        Ok(removed > 0)
    }

    fn delete_table_players(&self, table_ids: &[TableId]) -> Result<(), Error> {
        use table_players::dsl;
        if table_ids.is_empty() {
            return Ok(());
        }
        diesel::delete(dsl::table_players.filter(dsl::table_id.eq_any(table_ids)))
            .execute(&self.db)?;
        Ok(())
    }

    fn delete_player_memberships(&self, player_id: PlayerId) -> Result<(), Error> {
        diesel::delete(
            tournament_players::dsl::tournament_players
                .filter(tournament_players::dsl::player_id.eq(player_id)),
        )
        .execute(&self.db)?;
        diesel::delete(
            table_players::dsl::table_players.filter(table_players::dsl::player_id.eq(player_id)),
        )
        .execute(&self.db)?;
        Ok(())
    }
}
