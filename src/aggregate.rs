//! Score aggregation. Everything here works on rows that were already loaded
//! and authorized; nothing touches the store except the snapshot loaders.

use crate::error::Error;
use crate::models::{
    Game, GameId, Group, GroupId, Player, PlayerId, Score, Table, TableId, TableKind, Tournament,
    TournamentId, TournamentPlayer,
};
use crate::store::Store;
use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Rate used when a tournament has none (or zero), so converted totals never collapse to 0
pub const FALLBACK_RATE: f64 = 0.001;

pub fn effective_rate(rate: Option<f64>) -> f64 {
    match rate {
        Some(rate) if rate != 0.0 => rate,
        _ => FALLBACK_RATE,
    }
}

/// Round to `places` decimals, exact ties going to the even digit
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round_ties_even() / factor
}

/// Whether CHIP tables count towards score map totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipPolicy {
    Include,
    Exclude,
}

impl ChipPolicy {
    fn admits(&self, table: &Table) -> bool {
        match self {
            ChipPolicy::Include => true,
            ChipPolicy::Exclude => table.kind != TableKind::Chip,
        }
    }
}

/// Everything under one tournament
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentSnapshot {
    pub tournament: Tournament,
    pub tables: Vec<Table>,
    pub games: Vec<Game>,
    pub scores: Vec<Score>,
    /// Registered players, in display order
    pub participants: Vec<Player>,
}

impl TournamentSnapshot {
    pub fn load<S: Store>(store: &S, tournament: Tournament) -> Result<TournamentSnapshot, Error> {
        let tables = store.find_tournament_tables(&[tournament.id])?;
        let table_ids: Vec<TableId> = tables.iter().map(|t| t.id).collect();
        let games = store.find_table_games(&table_ids)?;
        let game_ids: Vec<GameId> = games.iter().map(|g| g.id).collect();
        let scores = store.find_game_scores(&game_ids)?;
        let registered: HashSet<PlayerId> = store
            .find_tournament_players(&[tournament.id])?
            .into_iter()
            .map(|tp| tp.player_id)
            .collect();
        let participants = store
            .find_group_players(tournament.group_id)?
            .into_iter()
            .filter(|p| registered.contains(&p.id))
            .collect();
        Ok(TournamentSnapshot {
            tournament,
            tables,
            games,
            scores,
            participants,
        })
    }

    /// Scores paired with the table they were recorded on
    fn table_scores(&self) -> impl Iterator<Item = (TableId, &Score)> + '_ {
        let table_of: HashMap<GameId, TableId> =
            self.games.iter().map(|g| (g.id, g.table_id)).collect();
        self.scores
            .iter()
            .filter_map(move |s| table_of.get(&s.game_id).map(|t| (*t, s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub id: TableId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TableKind,
}

impl From<&Table> for TableSummary {
    fn from(table: &Table) -> Self {
        TableSummary {
            id: table.id,
            name: table.name.clone(),
            kind: table.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerScoreRow {
    pub id: PlayerId,
    pub name: String,
    /// Sum per table, only for tables the player scored on
    pub scores: BTreeMap<TableId, i64>,
    pub total: i64,
    pub converted_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreMap {
    pub tournament_id: TournamentId,
    pub tables: Vec<TableSummary>,
    pub players: Vec<PlayerScoreRow>,
    pub rate: f64,
}

/// Per participant, per table score sums with a rate converted total
pub fn build_score_map(snapshot: &TournamentSnapshot, policy: ChipPolicy) -> ScoreMap {
    let rate = effective_rate(snapshot.tournament.rate);
    let admitted: HashSet<TableId> = snapshot
        .tables
        .iter()
        .filter(|t| policy.admits(t))
        .map(|t| t.id)
        .collect();

    let mut players: Vec<PlayerScoreRow> = snapshot
        .participants
        .iter()
        .map(|p| PlayerScoreRow {
            id: p.id,
            name: p.name.clone(),
            scores: BTreeMap::new(),
            total: 0,
            converted_total: 0.0,
        })
        .collect();
    let slot: HashMap<PlayerId, usize> = players
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id, i))
        .collect();

    for (table_id, score) in snapshot.table_scores() {
        if !admitted.contains(&table_id) {
            continue;
        }
        if let Some(&i) = slot.get(&score.player_id) {
            *players[i].scores.entry(table_id).or_insert(0) += i64::from(score.score);
        }
    }

    for player in players.iter_mut() {
        player.total = player.scores.values().sum();
        player.converted_total = round_to(player.total as f64 * rate, 2);
    }

    ScoreMap {
        tournament_id: snapshot.tournament.id,
        tables: snapshot
            .tables
            .iter()
            .filter(|t| admitted.contains(&t.id))
            .map(TableSummary::from)
            .collect(),
        players,
        rate,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub name: String,
}

impl From<&Player> for PlayerRef {
    fn from(player: &Player) -> Self {
        PlayerRef {
            id: player.id,
            name: player.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTableColumn {
    #[serde(flatten)]
    pub table: TableSummary,
    pub scores: BTreeMap<PlayerId, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTable {
    pub tournament_id: TournamentId,
    pub players: Vec<PlayerRef>,
    pub tables: Vec<CrossTableColumn>,
}

/// Pivot of participant score sums per table. Every table is listed.
pub fn cross_table(snapshot: &TournamentSnapshot) -> CrossTable {
    let participants: HashSet<PlayerId> = snapshot.participants.iter().map(|p| p.id).collect();
    let mut sums = snapshot
        .table_scores()
        .filter(|(_, s)| participants.contains(&s.player_id))
        .map(|(table_id, s)| (table_id, (s.player_id, i64::from(s.score))))
        .into_group_map();

    CrossTable {
        tournament_id: snapshot.tournament.id,
        players: snapshot.participants.iter().map(PlayerRef::from).collect(),
        tables: snapshot
            .tables
            .iter()
            .map(|t| {
                let mut scores = BTreeMap::new();
                for (player, score) in sums.remove(&t.id).unwrap_or_default() {
                    *scores.entry(player).or_insert(0) += score;
                }
                CrossTableColumn {
                    table: TableSummary::from(t),
                    scores,
                }
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TournamentRef {
    pub id: TournamentId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub id: PlayerId,
    pub name: String,
    pub games_played: usize,
    pub total_score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TournamentExport {
    pub tournament: TournamentRef,
    pub players: Vec<ExportRow>,
}

/// Games played and raw score total per participant
pub fn export_tournament(snapshot: &TournamentSnapshot) -> TournamentExport {
    let players = snapshot
        .participants
        .iter()
        .map(|p| {
            let own: Vec<&Score> = snapshot
                .scores
                .iter()
                .filter(|s| s.player_id == p.id)
                .collect();
            ExportRow {
                id: p.id,
                name: p.name.clone(),
                games_played: own.len(),
                total_score: own.iter().map(|s| i64::from(s.score)).sum(),
            }
        })
        .collect();
    TournamentExport {
        tournament: TournamentRef {
            id: snapshot.tournament.id,
            name: snapshot.tournament.name.clone(),
        },
        players,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRef {
    pub id: GroupId,
    pub name: String,
}

impl From<&Group> for GroupRef {
    fn from(group: &Group) -> Self {
        GroupRef {
            id: group.id,
            name: group.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    pub group: GroupRef,
    pub tournaments: Vec<TournamentExport>,
}

pub fn group_summary(group: &Group, snapshots: &[TournamentSnapshot]) -> GroupSummary {
    GroupSummary {
        group: GroupRef::from(group),
        tournaments: snapshots.iter().map(export_tournament).collect(),
    }
}

/// Inclusive window on the UTC calendar date of `started_at`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Parse optional `YYYY-MM-DD` bounds. Blank input means unbounded.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<DateWindow, Error> {
        let window = DateWindow {
            start: parse_date(start)?,
            end: parse_date(end)?,
        };
        if let (Some(start), Some(end)) = (window.start, window.end) {
            if start > end {
                return Err(Error::InvertedDateWindow);
            }
        }
        Ok(window)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.start.map_or(true, |s| s <= day) && self.end.map_or(true, |e| day <= e)
    }
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, Error> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| Error::MalformedDate(text.to_string())),
    }
}

/// Everything under one group, for statistics
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSnapshot {
    pub group: Group,
    pub players: Vec<Player>,
    pub tournaments: Vec<Tournament>,
    pub tables: Vec<Table>,
    pub games: Vec<Game>,
    pub scores: Vec<Score>,
    pub participations: Vec<TournamentPlayer>,
}

impl GroupSnapshot {
    pub fn load<S: Store>(store: &S, group: Group) -> Result<GroupSnapshot, Error> {
        let players = store.find_group_players(group.id)?;
        let tournaments = store.find_group_tournaments(group.id)?;
        let tournament_ids: Vec<TournamentId> = tournaments.iter().map(|t| t.id).collect();
        let tables = store.find_tournament_tables(&tournament_ids)?;
        let table_ids: Vec<TableId> = tables.iter().map(|t| t.id).collect();
        let games = store.find_table_games(&table_ids)?;
        let game_ids: Vec<GameId> = games.iter().map(|g| g.id).collect();
        let scores = store.find_game_scores(&game_ids)?;
        let participations = store.find_tournament_players(&tournament_ids)?;
        Ok(GroupSnapshot {
            group,
            players,
            tournaments,
            tables,
            games,
            scores,
            participations,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub player_name: String,
    pub tournament_count: usize,
    pub game_count: usize,
    pub rank1_count: usize,
    pub rank2_count: usize,
    pub rank3_count: usize,
    pub rank4_or_lower_count: usize,
    pub average_rank: f64,
    pub total_score: i64,
    pub total_balance: f64,
}

impl PlayerStats {
    fn empty(player: &Player) -> Self {
        PlayerStats {
            player_id: player.id,
            player_name: player.name.clone(),
            tournament_count: 0,
            game_count: 0,
            rank1_count: 0,
            rank2_count: 0,
            rank3_count: 0,
            rank4_or_lower_count: 0,
            average_rank: 0.0,
            total_score: 0,
            total_balance: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatsReport {
    pub group: GroupRef,
    pub period: DateWindow,
    pub players: Vec<PlayerStats>,
}

/// Per player statistics over the tournaments that started inside `window`.
/// Every player of the group is listed, idle ones with zeros.
pub fn player_stats(snapshot: &GroupSnapshot, window: &DateWindow) -> PlayerStatsReport {
    let in_window: HashSet<TournamentId> = snapshot
        .tournaments
        .iter()
        .filter(|t| window.contains(t.started_at))
        .map(|t| t.id)
        .collect();
    let tournament_of_table: HashMap<TableId, TournamentId> = snapshot
        .tables
        .iter()
        .map(|t| (t.id, t.tournament_id))
        .collect();
    let counted_games: HashSet<GameId> = snapshot
        .games
        .iter()
        .filter(|g| {
            tournament_of_table
                .get(&g.table_id)
                .map_or(false, |t| in_window.contains(t))
        })
        .map(|g| g.id)
        .collect();
    let scores_by_player = snapshot
        .scores
        .iter()
        .filter(|s| counted_games.contains(&s.game_id))
        .map(|s| (s.player_id, s))
        .into_group_map();

    let players = snapshot
        .players
        .iter()
        .map(|player| {
            let mut stats = PlayerStats::empty(player);
            stats.tournament_count = snapshot
                .participations
                .iter()
                .filter(|tp| tp.player_id == player.id && in_window.contains(&tp.tournament_id))
                .map(|tp| tp.tournament_id)
                .unique()
                .count();

            let scores = scores_by_player
                .get(&player.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut rank_sum = 0i64;
            let mut ranked = 0usize;
            for score in scores {
                stats.game_count += 1;
                stats.total_score += i64::from(score.score);
                stats.total_balance += score.total_score.unwrap_or(0.0);
                if let Some(rank) = score.rank {
                    rank_sum += i64::from(rank);
                    ranked += 1;
                    match rank {
                        1 => stats.rank1_count += 1,
                        2 => stats.rank2_count += 1,
                        3 => stats.rank3_count += 1,
                        r if r >= 4 => stats.rank4_or_lower_count += 1,
                        _ => {}
                    }
                }
            }
            if ranked > 0 {
                stats.average_rank = round_to(rank_sum as f64 / ranked as f64, 2);
            }
            stats.total_balance = round_to(stats.total_balance, 1);
            stats
        })
        .collect();

    PlayerStatsReport {
        group: GroupRef::from(&snapshot.group),
        period: *window,
        players,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn tournament(id: TournamentId, rate: Option<f64>, started_at: DateTime<Utc>) -> Tournament {
        Tournament {
            id,
            group_id: 1,
            name: format!("t{}", id),
            description: None,
            rate,
            created_by: "u".to_string(),
            started_at,
            created_at: started_at,
        }
    }

    fn table(id: TableId, tournament_id: TournamentId, kind: TableKind) -> Table {
        Table {
            id,
            tournament_id,
            name: format!("table {}", id),
            kind,
            created_by: "u".to_string(),
            created_at: at(2025, 1, 1),
            last_game_index: 0,
        }
    }

    fn game(id: GameId, table_id: TableId) -> Game {
        Game {
            id,
            table_id,
            game_index: id,
            memo: None,
            played_at: None,
            created_by: "u".to_string(),
            created_at: at(2025, 1, 1),
        }
    }

    fn player(id: PlayerId) -> Player {
        Player {
            id,
            group_id: 1,
            name: format!("p{}", id),
            nickname: None,
            display_order: None,
        }
    }

    fn scores(game_id: GameId, values: &[i32]) -> Vec<Score> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Score {
                id: game_id * 10 + i as i32,
                game_id,
                player_id: i as i32 + 1,
                score: *v,
                rank: Some(i as i32 + 1),
                uma: None,
                total_score: Some(f64::from(*v) + 0.25),
            })
            .collect()
    }

    /// Two tables, one game each: [[+20,-5,-5,-10],[+15,-5,-5,-5]]
    fn two_tables(second_kind: TableKind, rate: Option<f64>) -> TournamentSnapshot {
        let mut all = scores(1, &[20, -5, -5, -10]);
        all.extend(scores(2, &[15, -5, -5, -5]));
        TournamentSnapshot {
            tournament: tournament(1, rate, at(2025, 5, 1)),
            tables: vec![
                table(10, 1, TableKind::Normal),
                table(11, 1, second_kind),
            ],
            games: vec![game(1, 10), game(2, 11)],
            scores: all,
            participants: (1..=4).map(player).collect(),
        }
    }

    #[test]
    fn score_map_accumulates_per_table() {
        let map = build_score_map(&two_tables(TableKind::Normal, Some(1.0)), ChipPolicy::Include);
        assert_eq!(map.tables.len(), 2);
        let first = &map.players[0];
        assert_eq!(first.scores.get(&10), Some(&20));
        assert_eq!(first.scores.get(&11), Some(&15));
        assert_eq!(first.total, 35);
        let totals: Vec<i64> = map.players.iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![35, -10, -10, -15]);
        assert_eq!(totals.iter().sum::<i64>(), 0);
    }

    #[test]
    fn chip_tables_follow_policy() {
        let snapshot = two_tables(TableKind::Chip, Some(1.0));
        let all = build_score_map(&snapshot, ChipPolicy::Include);
        let normal = build_score_map(&snapshot, ChipPolicy::Exclude);
        assert_eq!(all.players[0].total, 35);
        assert_eq!(normal.players[0].total, 20);
        assert_eq!(normal.tables.len(), 1);
        assert!(normal.players[0].scores.get(&11).is_none());
    }

    #[test]
    fn converted_total_uses_rate() {
        let snapshot = two_tables(TableKind::Normal, Some(0.3333));
        let map = build_score_map(&snapshot, ChipPolicy::Include);
        assert_eq!(map.players[0].converted_total, 11.67);
        assert_eq!(map.players[3].converted_total, -5.0);

        let unset = build_score_map(&two_tables(TableKind::Normal, None), ChipPolicy::Include);
        assert_eq!(unset.rate, FALLBACK_RATE);
        assert_eq!(
            unset.players[0].converted_total,
            round_to(35.0 * FALLBACK_RATE, 2)
        );
        let zero = build_score_map(&two_tables(TableKind::Normal, Some(0.0)), ChipPolicy::Include);
        assert_eq!(zero.rate, FALLBACK_RATE);
    }

    #[test]
    fn converted_ties_round_to_even() {
        let snapshot = TournamentSnapshot {
            tournament: tournament(1, Some(0.125), at(2025, 5, 1)),
            tables: vec![table(10, 1, TableKind::Normal)],
            games: vec![game(1, 10)],
            scores: scores(1, &[5, 1, -1, -5]),
            participants: (1..=4).map(player).collect(),
        };
        let map = build_score_map(&snapshot, ChipPolicy::Include);
        let converted: Vec<(PlayerId, f64)> = map
            .players
            .iter()
            .map(|p| (p.id, p.converted_total))
            .sorted_by_key(|(id, _)| *id)
            .collect();
        assert_eq!(converted, vec![(1, 0.62), (2, 0.12), (3, -0.12), (4, -0.62)]);
        assert_eq!(round_to(4.375, 2), 4.38);
        assert_eq!(round_to(0.25, 1), 0.2);
    }

    #[test]
    fn score_map_wire_shape() {
        let map = build_score_map(&two_tables(TableKind::Chip, Some(1.0)), ChipPolicy::Include);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["tournament_id"], 1);
        assert_eq!(json["tables"][1]["type"], "chip");
        assert_eq!(json["players"][0]["scores"]["10"], 20);
        assert_eq!(json["players"][0]["converted_total"], 35.0);
    }

    #[test]
    fn empty_tournament_aggregates_to_empty() {
        let snapshot = TournamentSnapshot {
            tournament: tournament(1, Some(1.0), at(2025, 5, 1)),
            tables: vec![],
            games: vec![],
            scores: vec![],
            participants: vec![],
        };
        assert!(build_score_map(&snapshot, ChipPolicy::Include).players.is_empty());
        assert!(cross_table(&snapshot).tables.is_empty());
        assert!(export_tournament(&snapshot).players.is_empty());
    }

    #[test]
    fn cross_table_pivots_by_table() {
        let cross = cross_table(&two_tables(TableKind::Normal, Some(1.0)));
        assert_eq!(cross.players.len(), 4);
        assert_eq!(cross.tables[0].scores.get(&4), Some(&-10));
        assert_eq!(cross.tables[1].scores.get(&1), Some(&15));
    }

    #[test]
    fn export_counts_games() {
        let export = export_tournament(&two_tables(TableKind::Normal, Some(1.0)));
        assert_eq!(export.players[0].games_played, 2);
        assert_eq!(export.players[0].total_score, 35);
        assert_eq!(export.players[3].total_score, -15);
    }

    #[test]
    fn window_parsing() {
        assert_eq!(DateWindow::parse(None, Some("")), Ok(DateWindow::default()));
        assert_eq!(
            DateWindow::parse(Some("2025/04/01"), None),
            Err(Error::MalformedDate("2025/04/01".to_string()))
        );
        assert_eq!(
            DateWindow::parse(Some("2025-06-02"), Some("2025-06-01")),
            Err(Error::InvertedDateWindow)
        );
    }

    #[test]
    fn window_is_inclusive_on_calendar_dates() {
        let window = DateWindow::parse(Some("2025-04-01"), Some("2025-06-01")).unwrap();
        assert!(window.contains(at(2025, 5, 1)));
        assert!(window.contains(Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 0).unwrap()));
        assert!(!window.contains(at(2025, 6, 2)));
        let later = DateWindow::parse(Some("2025-06-02"), Some("2025-06-30")).unwrap();
        assert!(!later.contains(at(2025, 5, 1)));
    }

    fn group_snapshot() -> GroupSnapshot {
        let spring = two_tables(TableKind::Normal, Some(1.0));
        let participations = (1..=3)
            .map(|p| TournamentPlayer {
                id: p,
                tournament_id: 1,
                player_id: p,
                created_at: at(2025, 5, 1),
            })
            .collect();
        GroupSnapshot {
            group: Group {
                id: 1,
                name: "club".to_string(),
                description: None,
                created_by: "u".to_string(),
                created_at: at(2025, 1, 1),
                last_updated_at: at(2025, 1, 1),
            },
            players: (1..=5).map(player).collect(),
            tournaments: vec![spring.tournament],
            tables: spring.tables,
            games: spring.games,
            scores: spring.scores,
            participations,
        }
    }

    #[test]
    fn stats_follow_the_window() {
        let snapshot = group_snapshot();
        let inside = player_stats(
            &snapshot,
            &DateWindow::parse(Some("2025-04-01"), Some("2025-06-01")).unwrap(),
        );
        assert_eq!(inside.players.len(), 5);
        let first = &inside.players[0];
        assert_eq!(first.tournament_count, 1);
        assert_eq!(first.game_count, 2);
        assert_eq!(first.rank1_count, 2);
        assert_eq!(first.average_rank, 1.0);
        assert_eq!(first.total_score, 35);
        assert_eq!(first.total_balance, 35.5);
        assert_eq!(inside.players[3].rank4_or_lower_count, 2);
        // player 4 scored but never registered
        assert_eq!(inside.players[3].tournament_count, 0);
        assert_eq!(inside.players[4].game_count, 0);

        let outside = player_stats(
            &snapshot,
            &DateWindow::parse(Some("2025-06-02"), Some("2025-06-30")).unwrap(),
        );
        assert!(outside
            .players
            .iter()
            .all(|p| p.game_count == 0 && p.tournament_count == 0));
    }

    #[test]
    fn missing_ranks_are_left_out_of_the_average() {
        let mut snapshot = group_snapshot();
        for score in snapshot.scores.iter_mut().filter(|s| s.player_id == 2) {
            score.rank = None;
            score.total_score = None;
        }
        snapshot.scores[1].rank = Some(3);
        let report = player_stats(&snapshot, &DateWindow::default());
        let second = &report.players[1];
        assert_eq!(second.game_count, 2);
        assert_eq!(second.average_rank, 3.0);
        assert_eq!(second.total_balance, 0.0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["period"]["start"], serde_json::Value::Null);
        assert_eq!(json["group"]["name"], "club");
    }
}
