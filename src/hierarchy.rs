use crate::error::Error;
use crate::models::{
    Game, GameId, Group, GroupId, Player, PlayerId, ResourceRef, Table, TableId, Tournament,
    TournamentId,
};
use crate::store::Store;

/// Ids of every resource beneath (and including) a deleted root
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Subtree {
    pub tournaments: Vec<TournamentId>,
    pub tables: Vec<TableId>,
    pub games: Vec<GameId>,
}

/// Ancestor and descendant lookups across Group > Tournament > Table > Game.
/// Typed getters fail with `NoSuchResource` on a missing row. The relation
/// checks used for authorization treat a missing row as unrelated instead.
pub struct HierarchyWalker<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> HierarchyWalker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        HierarchyWalker { store }
    }

    pub fn group(&self, id: GroupId) -> Result<Group, Error> {
        self.store
            .find_group(id)?
            .ok_or(Error::NoSuchResource(ResourceRef::Group(id)))
    }

    pub fn tournament(&self, id: TournamentId) -> Result<Tournament, Error> {
        self.store
            .find_tournament(id)?
            .ok_or(Error::NoSuchResource(ResourceRef::Tournament(id)))
    }

    pub fn table(&self, id: TableId) -> Result<Table, Error> {
        self.store
            .find_table(id)?
            .ok_or(Error::NoSuchResource(ResourceRef::Table(id)))
    }

    pub fn game(&self, id: GameId) -> Result<Game, Error> {
        self.store
            .find_game(id)?
            .ok_or(Error::NoSuchResource(ResourceRef::Game(id)))
    }

    pub fn group_of(&self, tournament: &Tournament) -> Result<Group, Error> {
        self.group(tournament.group_id)
    }

    pub fn tournament_of(&self, table: &Table) -> Result<Tournament, Error> {
        self.tournament(table.tournament_id)
    }

    pub fn table_of(&self, game: &Game) -> Result<Table, Error> {
        self.table(game.table_id)
    }

    /// Fail with `NoSuchResource` unless the row exists
    pub fn ensure_exists(&self, resource: ResourceRef) -> Result<(), Error> {
        match resource {
            ResourceRef::Group(id) => self.group(id).map(|_| ()),
            ResourceRef::Tournament(id) => self.tournament(id).map(|_| ()),
            ResourceRef::Table(id) => self.table(id).map(|_| ()),
            ResourceRef::Game(id) => self.game(id).map(|_| ()),
        }
    }

    /// The immediate parent, or `None` for a group
    pub fn parent_of(&self, resource: ResourceRef) -> Result<Option<ResourceRef>, Error> {
        Ok(match resource {
            ResourceRef::Group(id) => {
                self.group(id)?;
                None
            }
            ResourceRef::Tournament(id) => {
                Some(ResourceRef::Group(self.tournament(id)?.group_id))
            }
            ResourceRef::Table(id) => Some(ResourceRef::Tournament(self.table(id)?.tournament_id)),
            ResourceRef::Game(id) => Some(ResourceRef::Table(self.game(id)?.table_id)),
        })
    }

    /// The group at the root of `resource`'s branch, `None` when the resource
    /// or one of its ancestors is missing
    pub fn group_id_of(&self, resource: ResourceRef) -> Result<Option<GroupId>, Error> {
        let mut current = resource;
        loop {
            current = match self.parent_of(current) {
                Ok(Some(parent)) => parent,
                Ok(None) => return Ok(Some(current.id())),
                Err(Error::NoSuchResource(_)) => return Ok(None),
                Err(e) => return Err(e),
            };
        }
    }

    /// Whether `parent` is the immediate parent of `child`. False when `child`
    /// is missing.
    pub fn belongs_to(&self, child: ResourceRef, parent: ResourceRef) -> Result<bool, Error> {
        match self.parent_of(child) {
            Ok(found) => Ok(found == Some(parent)),
            Err(Error::NoSuchResource(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Load a player of `group_id`. Missing players and players of other
    /// groups are reported alike.
    pub fn player_in_group(&self, player_id: PlayerId, group_id: GroupId) -> Result<Player, Error> {
        self.store
            .find_player(player_id)?
            .filter(|p| p.group_id == group_id)
            .ok_or(Error::PlayerOutsideGroup {
                player: player_id,
                group: group_id,
            })
    }

    /// Collect the ids beneath `root`, root included
    pub fn subtree(&self, root: ResourceRef) -> Result<Subtree, Error> {
        let mut tree = Subtree::default();
        match root {
            ResourceRef::Group(id) => {
                tree.tournaments = self
                    .store
                    .find_group_tournaments(id)?
                    .into_iter()
                    .map(|t| t.id)
                    .collect();
                tree.tables = self.table_ids(&tree.tournaments)?;
                tree.games = self.game_ids(&tree.tables)?;
            }
            ResourceRef::Tournament(id) => {
                tree.tournaments = vec![id];
                tree.tables = self.table_ids(&tree.tournaments)?;
                tree.games = self.game_ids(&tree.tables)?;
            }
            ResourceRef::Table(id) => {
                tree.tables = vec![id];
                tree.games = self.game_ids(&tree.tables)?;
            }
            ResourceRef::Game(id) => tree.games = vec![id],
        }
        Ok(tree)
    }

    fn table_ids(&self, tournaments: &[TournamentId]) -> Result<Vec<TableId>, Error> {
        Ok(self
            .store
            .find_tournament_tables(tournaments)?
            .into_iter()
            .map(|t| t.id)
            .collect())
    }

    fn game_ids(&self, tables: &[TableId]) -> Result<Vec<GameId>, Error> {
        Ok(self
            .store
            .find_table_games(tables)?
            .into_iter()
            .map(|g| g.id)
            .collect())
    }
}
