use crate::models::{AccessLevel, GroupId, PlayerId, ResourceRef, ResourceType};
use thiserror::Error;

/// Coarse classification used by callers to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    ValidationFailed,
    KeyGenerationExhausted,
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    DBError(#[from] diesel::result::Error),
    #[error("database pool error: could not establish database connection")]
    R2D2Error(#[from] r2d2::Error),
    #[error("database migration failed: {0}")]
    MigrationError(#[from] diesel_migrations::RunMigrationsError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A freshly generated key collided with an existing one. Consumed by the
    /// minting loop, never surfaced on its own.
    #[error("short key is already taken")]
    ShortKeyTaken,
    #[error("could not generate a unique share key after {attempts} attempts")]
    KeyGenerationExhausted { attempts: usize },

    #[error("invalid or expired share link")]
    LinkInvalid,
    #[error("no such {0}")]
    NoSuchResource(ResourceRef),
    #[error("no such player: {0}")]
    NoSuchPlayer(PlayerId),
    #[error("player {0} is not a participant of that tournament")]
    NotParticipant(PlayerId),
    #[error("player {0} is not seated at that table")]
    NotSeated(PlayerId),

    #[error("share link is for a {found}, not a {expected}")]
    LinkMismatch {
        expected: ResourceType,
        found: ResourceType,
    },
    #[error("share link does not grant access to {0}")]
    ResourceMismatch(ResourceRef),
    #[error("{required} access is required (share link grants {granted})")]
    InsufficientAccess {
        required: AccessLevel,
        granted: AccessLevel,
    },

    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("unknown {field}: {value}")]
    InvalidTag { field: &'static str, value: String },
    #[error("scores must sum to zero (sum is {0})")]
    ScoresNotZeroSum(i64),
    #[error("a game needs at least one score")]
    NoScores,
    #[error("player {0} has more than one score in the same game")]
    DuplicateScorePlayer(PlayerId),
    #[error("invalid rank: {0}")]
    InvalidRank(i32),
    #[error("rate must be a positive finite number (got {0})")]
    InvalidRate(f64),
    #[error("malformed date (expected YYYY-MM-DD): {0}")]
    MalformedDate(String),
    #[error("date window starts after it ends")]
    InvertedDateWindow,
    #[error("player {player} does not belong to group {group}")]
    PlayerOutsideGroup { player: PlayerId, group: GroupId },
    #[error("player {0} is already registered in that tournament")]
    AlreadyParticipant(PlayerId),
    #[error("player {0} is already seated at that table")]
    AlreadySeated(PlayerId),
    #[error("player {0} has recorded scores")]
    PlayerHasScores(PlayerId),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            LinkInvalid | NoSuchResource(_) | NoSuchPlayer(_) | NotParticipant(_)
            | NotSeated(_) => ErrorKind::NotFound,
            LinkMismatch { .. } | ResourceMismatch(_) | InsufficientAccess { .. } => {
                ErrorKind::PermissionDenied
            }
            MissingField(_)
            | InvalidTag { .. }
            | ScoresNotZeroSum(_)
            | NoScores
            | DuplicateScorePlayer(_)
            | InvalidRank(_)
            | InvalidRate(_)
            | MalformedDate(_)
            | InvertedDateWindow
            | PlayerOutsideGroup { .. }
            | AlreadyParticipant(_)
            | AlreadySeated(_)
            | PlayerHasScores(_)
            | InvalidConfig(_) => ErrorKind::ValidationFailed,
            KeyGenerationExhausted { .. } => ErrorKind::KeyGenerationExhausted,
            DBError(_) | R2D2Error(_) | MigrationError(_) | ShortKeyTaken => ErrorKind::Internal,
        }
    }

    /// HTTP status the boundary layer should answer with
    pub fn status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::PermissionDenied => 403,
            ErrorKind::ValidationFailed => 400,
            ErrorKind::KeyGenerationExhausted | ErrorKind::Internal => 500,
        }
    }

    /// Stable machine readable code
    pub fn code(&self) -> &'static str {
        use Error::*;
        match self {
            DBError(_) | R2D2Error(_) | MigrationError(_) | ShortKeyTaken => "internal_error",
            InvalidConfig(_) => "invalid_config",
            KeyGenerationExhausted { .. } => "key_generation_exhausted",
            LinkInvalid => "link_invalid",
            NoSuchResource(_) | NoSuchPlayer(_) => "not_found",
            NotParticipant(_) => "not_participant",
            NotSeated(_) => "not_seated",
            LinkMismatch { .. } => "link_mismatch",
            ResourceMismatch(_) => "resource_mismatch",
            InsufficientAccess { .. } => "permission_denied",
            MissingField(_) => "missing_field",
            InvalidTag { .. } => "invalid_value",
            ScoresNotZeroSum(_) => "scores_not_zero_sum",
            NoScores => "no_scores",
            DuplicateScorePlayer(_) => "duplicate_player",
            InvalidRank(_) => "invalid_rank",
            InvalidRate(_) => "invalid_rate",
            MalformedDate(_) => "malformed_date",
            InvertedDateWindow => "inverted_date_window",
            PlayerOutsideGroup { .. } => "player_outside_group",
            AlreadyParticipant(_) => "already_participant",
            AlreadySeated(_) => "already_seated",
            PlayerHasScores(_) => "player_has_scores",
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;
        match (self, other) {
            (DBError(_), DBError(_))
            | (R2D2Error(_), R2D2Error(_))
            | (MigrationError(_), MigrationError(_))
            | (ShortKeyTaken, ShortKeyTaken)
            | (LinkInvalid, LinkInvalid)
            | (NoScores, NoScores)
            | (InvertedDateWindow, InvertedDateWindow) => true,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (KeyGenerationExhausted { attempts: a }, KeyGenerationExhausted { attempts: b }) => {
                a == b
            }
            (NoSuchResource(a), NoSuchResource(b)) | (ResourceMismatch(a), ResourceMismatch(b)) => {
                a == b
            }
            (NoSuchPlayer(a), NoSuchPlayer(b))
            | (NotParticipant(a), NotParticipant(b))
            | (NotSeated(a), NotSeated(b))
            | (DuplicateScorePlayer(a), DuplicateScorePlayer(b))
            | (AlreadyParticipant(a), AlreadyParticipant(b))
            | (AlreadySeated(a), AlreadySeated(b))
            | (PlayerHasScores(a), PlayerHasScores(b))
            | (InvalidRank(a), InvalidRank(b)) => a == b,
            (
                LinkMismatch { expected, found },
                LinkMismatch {
                    expected: other_expected,
                    found: other_found,
                },
            ) => expected == other_expected && found == other_found,
            (
                InsufficientAccess { required, granted },
                InsufficientAccess {
                    required: other_required,
                    granted: other_granted,
                },
            ) => required == other_required && granted == other_granted,
            (MissingField(a), MissingField(b)) => a == b,
            (
                InvalidTag { field, value },
                InvalidTag {
                    field: other_field,
                    value: other_value,
                },
            ) => field == other_field && value == other_value,
            (ScoresNotZeroSum(a), ScoresNotZeroSum(b)) => a == b,
            (InvalidRate(a), InvalidRate(b)) => a.to_bits() == b.to_bits(),
            (MalformedDate(a), MalformedDate(b)) => a == b,
            (
                PlayerOutsideGroup { player, group },
                PlayerOutsideGroup {
                    player: other_player,
                    group: other_group,
                },
            ) => player == other_player && group == other_group,
            _ => false,
        }
    }
}

impl Eq for Error {}
