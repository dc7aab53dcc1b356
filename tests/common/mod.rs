#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use diesel::{Connection, PgConnection, RunQueryDsl};
use dotenv::dotenv;
use std::env;

use mjscore::db::{init_db_pool, DBWrapper, PgPool};
use mjscore::memory::MemoryStore;
use mjscore::models::{AccessLevel, Group, Player, ShareLink, Table, TableKind, Tournament};
use mjscore::service::{
    GameForm, GroupForm, PlayerForm, ScoreInput, Service, TableForm, TournamentForm,
};

/// The key of the link at `level` in a freshly provisioned link set
pub fn key_at(links: &[ShareLink], level: AccessLevel) -> String {
    links
        .iter()
        .find(|l| l.access_level == level)
        .map(|l| l.short_key.clone())
        .unwrap_or_else(|| panic!("no {} link provisioned", level))
}

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 18, 0, 0).unwrap()
}

pub fn score(player: &Player, score: i32, rank: i32) -> ScoreInput {
    ScoreInput {
        player_id: player.id,
        score,
        rank: Some(rank),
        uma: None,
        total_score: None,
    }
}

/// Score inputs for the players in seat order, ranked by position in `scores`
pub fn ranked(players: &[Player], scores: &[i32]) -> Vec<ScoreInput> {
    players
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(i, (p, s))| score(p, *s, i as i32 + 1))
        .collect()
}

pub fn game_form(scores: Vec<ScoreInput>) -> GameForm {
    GameForm {
        memo: None,
        played_at: None,
        scores,
    }
}

/// A group with one tournament (started 2025-05-10), a normal table and a chip
/// table, and four registered players seated at the normal table
pub struct Club {
    pub service: Service<MemoryStore>,
    pub group: Group,
    pub group_owner: String,
    pub group_edit: String,
    pub group_view: String,
    pub tournament: Tournament,
    pub tournament_edit: String,
    pub tournament_view: String,
    pub table: Table,
    pub table_edit: String,
    pub table_view: String,
    pub chip_table: Table,
    pub chip_edit: String,
    pub players: Vec<Player>,
}

impl Club {
    pub fn new() -> Club {
        Club::with_service(Service::new(MemoryStore::new()))
    }

    pub fn with_service(service: Service<MemoryStore>) -> Club {
        let group = service
            .create_group(
                &GroupForm {
                    name: "Thursday club".to_string(),
                    description: None,
                },
                Some("alice"),
            )
            .unwrap();
        let group_owner = key_at(&group.links, AccessLevel::Owner);

        let tournament = service
            .create_tournament(
                &group_owner,
                group.resource.id,
                &TournamentForm {
                    name: "May league".to_string(),
                    description: None,
                    rate: None,
                    started_at: Some(day(2025, 5, 10)),
                },
            )
            .unwrap();
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
        let chip_table = service
            .create_table(
                &tournament_edit,
                tournament.resource.id,
                &TableForm {
                    name: "Chips".to_string(),
                    kind: TableKind::Chip,
                },
            )
            .unwrap();

        let players: Vec<Player> = ["East", "South", "West", "North"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                service
                    .create_player(
                        &group_owner,
                        group.resource.id,
                        &PlayerForm {
                            name: name.to_string(),
                            nickname: None,
                            display_order: Some(i as i32 + 1),
                        },
                    )
                    .unwrap()
            })
            .collect();
        let ids: Vec<i32> = players.iter().map(|p| p.id).collect();
        service
            .register_participants(&tournament_edit, tournament.resource.id, &ids)
            .unwrap();
        for (seat, player) in players.iter().enumerate() {
            service
                .seat_player(
                    &tournament_edit,
                    table.resource.id,
                    player.id,
                    Some(seat as i32 + 1),
                )
                .unwrap();
        }

        Club {
            group_edit: key_at(&group.links, AccessLevel::Edit),
            group_view: key_at(&group.links, AccessLevel::View),
            group_owner,
            tournament_view: key_at(&tournament.links, AccessLevel::View),
            tournament_edit,
            tournament: tournament.resource,
            table_edit: key_at(&table.links, AccessLevel::Edit),
            table_view: key_at(&table.links, AccessLevel::View),
            table: table.resource,
            chip_edit: key_at(&chip_table.links, AccessLevel::Edit),
            chip_table: chip_table.resource,
            group: group.resource,
            players,
            service,
        }
    }

    /// Record a game at the normal table, scores in seat order
    pub fn play(&self, scores: &[i32]) -> i32 {
        self.service
            .record_game(
                &self.table_edit,
                self.table.id,
                &game_form(ranked(&self.players, scores)),
            )
            .unwrap()
            .resource
            .game
            .id
    }
}

// postgres database test helper
// the helper creates a new database for tests and drops it once done
pub struct PgTestContext {
    default_url: String,
    db_name: String,
    pool: Option<PgPool>,
}

impl PgTestContext {
    /// None unless DATABASE_TEST_BASE_URL and DATABASE_TEST_DEFAULT_URL are set
    pub fn from_env() -> Option<PgTestContext> {
        dotenv().ok();
        let base_url = env::var("DATABASE_TEST_BASE_URL").ok()?;
        let default_url = env::var("DATABASE_TEST_DEFAULT_URL").ok()?;
        let db_name = format!("mjscore_test_{}", uuid::Uuid::new_v4().to_simple());
        Some(PgTestContext::new(&base_url, &default_url, &db_name))
    }

    fn new(base_url: &str, default_url: &str, db_name: &str) -> Self {
        // connect to default db and create test db
        let conn =
            PgConnection::establish(default_url).expect("cannot connect to default pg database");
        diesel::sql_query(format!("CREATE DATABASE {}", db_name))
            .execute(&conn)
            .expect("couldn't create test database");

        // connect to test db and run migrations
        let pool = init_db_pool(&format!("{}/{}", base_url, db_name), 2)
            .expect("cannot connect to test database");
        DBWrapper::from_pg_pool(&pool)
            .and_then(|db| db.run_migrations())
            .expect("running migrations failed");

        PgTestContext {
            default_url: default_url.to_string(),
            db_name: db_name.to_string(),
            pool: Some(pool),
        }
    }

    pub fn db(&self) -> DBWrapper {
        let pool = self.pool.as_ref().expect("test database already removed");
        DBWrapper::from_pg_pool(pool).expect("cannot check out a connection")
    }
}

impl Drop for PgTestContext {
    fn drop(&mut self) {
        // close pooled connections before dropping the database
        self.pool.take();
        let conn = PgConnection::establish(&self.default_url)
            .expect("cannot connect to default pg database");
        diesel::sql_query(format!(
            "SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = '{}';",
            self.db_name
        ))
        .execute(&conn)
        .expect("cannot disconnect db users");
        diesel::sql_query(format!("DROP DATABASE {}", self.db_name))
            .execute(&conn)
            .expect("cannot drop test database");
    }
}
