table! {
    games (id) {
        id -> Int4,
        table_id -> Int4,
        game_index -> Int4,
        memo -> Nullable<Text>,
        played_at -> Nullable<Timestamptz>,
        created_by -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    groups (id) {
        id -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        created_by -> Text,
        created_at -> Timestamptz,
        last_updated_at -> Timestamptz,
    }
}

table! {
    players (id) {
        id -> Int4,
        group_id -> Int4,
        name -> Text,
        nickname -> Nullable<Text>,
        display_order -> Nullable<Int4>,
    }
}

table! {
    scores (id) {
        id -> Int4,
        game_id -> Int4,
        player_id -> Int4,
        score -> Int4,
        rank -> Nullable<Int4>,
        uma -> Nullable<Float8>,
        total_score -> Nullable<Float8>,
    }
}

table! {
    share_links (id) {
        id -> Int4,
        short_key -> Varchar,
        resource_type -> Text,
        resource_id -> Int4,
        access_level -> Text,
        created_by -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    table_players (id) {
        id -> Int4,
        table_id -> Int4,
        player_id -> Int4,
        seat_position -> Nullable<Int4>,
        joined_at -> Timestamptz,
    }
}

table! {
    tables (id) {
        id -> Int4,
        tournament_id -> Int4,
        name -> Text,
        kind -> Text,
        created_by -> Text,
        created_at -> Timestamptz,
        last_game_index -> Int4,
    }
}

table! {
    tournament_players (id) {
        id -> Int4,
        tournament_id -> Int4,
        player_id -> Int4,
        created_at -> Timestamptz,
    }
}

table! {
    tournaments (id) {
        id -> Int4,
        group_id -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        rate -> Nullable<Float8>,
        created_by -> Text,
        started_at -> Timestamptz,
        created_at -> Timestamptz,
    }
}

joinable!(games -> tables (table_id));
joinable!(players -> groups (group_id));
joinable!(scores -> games (game_id));
joinable!(scores -> players (player_id));
joinable!(table_players -> players (player_id));
joinable!(table_players -> tables (table_id));
joinable!(tables -> tournaments (tournament_id));
joinable!(tournament_players -> players (player_id));
joinable!(tournament_players -> tournaments (tournament_id));
joinable!(tournaments -> groups (group_id));

allow_tables_to_appear_in_same_query!(
    games,
    groups,
    players,
    scores,
    share_links,
    table_players,
    tables,
    tournament_players,
    tournaments,
);
