use super::schema::{
    games, groups, players, scores, share_links, table_players, tables, tournament_players,
    tournaments,
};
use crate::error::Error;
use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::cmp::min;
use std::convert::TryFrom;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

pub type GroupId = i32;
pub type TournamentId = i32;
pub type TableId = i32;
pub type GameId = i32;
pub type ScoreId = i32;
pub type PlayerId = i32;
pub type ShareLinkId = i32;
pub type TournamentPlayerId = i32;
pub type TablePlayerId = i32;

/// Implement the text column mapping for a tag enum. The wire string is the
/// same one stored in the database.
macro_rules! text_tag {
    ($ty:ident, $field:expr, { $($variant:ident => $tag:expr),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $tag),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($ty::$variant),)+
                    _ => Err(Error::InvalidTag {
                        field: $field,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ToSql<Text, Pg> for $ty {
            fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
                out.write_all(self.as_str().as_bytes())?;
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Pg> for $ty {
            fn from_sql(bytes: Option<&[u8]>) -> deserialize::Result<Self> {
                let tag = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
                tag.parse::<$ty>().map_err(|e| e.to_string().into())
            }
        }
    };
}

/// The kind of resource a share link points at
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[serde(rename_all = "lowercase")]
#[sql_type = "Text"]
pub enum ResourceType {
    Group,
    Tournament,
    Table,
    Game,
}

text_tag!(ResourceType, "resource_type", {
    Group => "group",
    Tournament => "tournament",
    Table => "table",
    Game => "game",
});

impl ResourceType {
    /// The type of the immediate parent in the hierarchy
    pub fn parent(&self) -> Option<ResourceType> {
        match self {
            ResourceType::Group => None,
            ResourceType::Tournament => Some(ResourceType::Group),
            ResourceType::Table => Some(ResourceType::Tournament),
            ResourceType::Game => Some(ResourceType::Table),
        }
    }

    /// The levels minted for every new resource of this type
    pub fn default_levels(&self) -> &'static [AccessLevel] {
        match self {
            ResourceType::Group => &[AccessLevel::Owner, AccessLevel::Edit, AccessLevel::View],
            _ => &[AccessLevel::Edit, AccessLevel::View],
        }
    }
}

/// Capability carried by a share link. Variants are declared in priority order,
/// so the derived `Ord` is the VIEW < EDIT < OWNER ordering.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[serde(rename_all = "UPPERCASE")]
#[sql_type = "Text"]
pub enum AccessLevel {
    View,
    Edit,
    Owner,
}

text_tag!(AccessLevel, "access_level", {
    View => "VIEW",
    Edit => "EDIT",
    Owner => "OWNER",
});

impl AccessLevel {
    pub fn priority(&self) -> u8 {
        match self {
            AccessLevel::View => 1,
            AccessLevel::Edit => 2,
            AccessLevel::Owner => 3,
        }
    }

    /// Whether this level is enough for an operation requiring `required`
    pub fn satisfies(&self, required: AccessLevel) -> bool {
        self.priority() >= required.priority()
    }

    /// Level conveyed onto descendants when a group key is used below its group.
    /// OWNER never carries over.
    pub fn inherited(&self) -> AccessLevel {
        min(*self, AccessLevel::Edit)
    }
}

/// Table scoring mode
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[serde(rename_all = "lowercase")]
#[sql_type = "Text"]
pub enum TableKind {
    Normal,
    Chip,
}

text_tag!(TableKind, "table_type", {
    Normal => "normal",
    Chip => "chip",
});

impl Default for TableKind {
    fn default() -> Self {
        TableKind::Normal
    }
}

/// A strongly typed reference to one linkable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ResourceRef {
    Group(GroupId),
    Tournament(TournamentId),
    Table(TableId),
    Game(GameId),
}

impl ResourceRef {
    pub fn new(resource_type: ResourceType, id: i32) -> ResourceRef {
        match resource_type {
            ResourceType::Group => ResourceRef::Group(id),
            ResourceType::Tournament => ResourceRef::Tournament(id),
            ResourceType::Table => ResourceRef::Table(id),
            ResourceType::Game => ResourceRef::Game(id),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            ResourceRef::Group(_) => ResourceType::Group,
            ResourceRef::Tournament(_) => ResourceType::Tournament,
            ResourceRef::Table(_) => ResourceType::Table,
            ResourceRef::Game(_) => ResourceType::Game,
        }
    }

    pub fn id(&self) -> i32 {
        match *self {
            ResourceRef::Group(id)
            | ResourceRef::Tournament(id)
            | ResourceRef::Table(id)
            | ResourceRef::Game(id) => id,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource_type(), self.id())
    }
}

// ---- Rows ----

#[derive(Queryable, AsChangeset, Serialize, Debug, Clone, PartialEq)]
#[table_name = "groups"]
#[changeset_options(treat_none_as_null = "true")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "groups"]
pub struct NewGroup<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub created_by: &'a str,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Queryable, AsChangeset, Serialize, Debug, Clone, PartialEq)]
#[table_name = "tournaments"]
#[changeset_options(treat_none_as_null = "true")]
pub struct Tournament {
    pub id: TournamentId,
    pub group_id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub rate: Option<f64>,
    pub created_by: String,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "tournaments"]
pub struct NewTournament<'a> {
    pub group_id: GroupId,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub rate: Option<f64>,
    pub created_by: &'a str,
    pub started_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Serialize, Debug, Clone, PartialEq)]
pub struct Table {
    pub id: TableId,
    pub tournament_id: TournamentId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TableKind,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub last_game_index: i32,
}

#[derive(Insertable)]
#[table_name = "tables"]
pub struct NewTable<'a> {
    pub tournament_id: TournamentId,
    pub name: &'a str,
    pub kind: TableKind,
    pub created_by: &'a str,
    pub created_at: DateTime<Utc>,
    pub last_game_index: i32,
}

#[derive(Queryable, AsChangeset, Serialize, Debug, Clone, PartialEq)]
#[table_name = "games"]
#[changeset_options(treat_none_as_null = "true")]
pub struct Game {
    pub id: GameId,
    pub table_id: TableId,
    pub game_index: i32,
    pub memo: Option<String>,
    pub played_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "games"]
pub struct NewGame<'a> {
    pub table_id: TableId,
    pub game_index: i32,
    pub memo: Option<&'a str>,
    pub played_at: Option<DateTime<Utc>>,
    pub created_by: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Serialize, Debug, Clone, PartialEq)]
pub struct Score {
    pub id: ScoreId,
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub score: i32,
    pub rank: Option<i32>,
    pub uma: Option<f64>,
    pub total_score: Option<f64>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[table_name = "scores"]
pub struct NewScore {
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub score: i32,
    pub rank: Option<i32>,
    pub uma: Option<f64>,
    pub total_score: Option<f64>,
}

#[derive(Queryable, AsChangeset, Serialize, Debug, Clone, PartialEq)]
#[table_name = "players"]
#[changeset_options(treat_none_as_null = "true")]
pub struct Player {
    pub id: PlayerId,
    pub group_id: GroupId,
    pub name: String,
    pub nickname: Option<String>,
    pub display_order: Option<i32>,
}

#[derive(Insertable)]
#[table_name = "players"]
pub struct NewPlayer<'a> {
    pub group_id: GroupId,
    pub name: &'a str,
    pub nickname: Option<&'a str>,
    pub display_order: Option<i32>,
}

#[derive(Queryable, Serialize, Debug, Clone, PartialEq)]
pub struct TournamentPlayer {
    pub id: TournamentPlayerId,
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "tournament_players"]
pub struct NewTournamentPlayer {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Serialize, Debug, Clone, PartialEq)]
pub struct TablePlayer {
    pub id: TablePlayerId,
    pub table_id: TableId,
    pub player_id: PlayerId,
    pub seat_position: Option<i32>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[table_name = "table_players"]
pub struct NewTablePlayer {
    pub table_id: TableId,
    pub player_id: PlayerId,
    pub seat_position: Option<i32>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Queryable, Serialize, Debug, Clone, PartialEq)]
pub struct ShareLink {
    #[serde(skip)]
    pub id: ShareLinkId,
    pub short_key: String,
    pub resource_type: ResourceType,
    pub resource_id: i32,
    pub access_level: AccessLevel,
    #[serde(skip)]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl ShareLink {
    pub fn resource(&self) -> ResourceRef {
        ResourceRef::new(self.resource_type, self.resource_id)
    }
}

#[derive(Insertable)]
#[table_name = "share_links"]
pub struct NewShareLink<'a> {
    pub short_key: &'a str,
    pub resource_type: ResourceType,
    pub resource_id: i32,
    pub access_level: AccessLevel,
    pub created_by: &'a str,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<(&str, i32)> for ResourceRef {
    type Error = Error;

    fn try_from((resource_type, id): (&str, i32)) -> Result<Self, Self::Error> {
        Ok(ResourceRef::new(resource_type.parse()?, id))
    }
}
